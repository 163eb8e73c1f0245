use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::state::StateLabel;

/// Identifier of a tracked object.
///
/// Assigned by the store at creation time. Identifiers are positive,
/// monotonically increasing, and never reused, so a value of zero or below
/// can never name an object and is rejected on construction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ObjectId(i64);

impl ObjectId {
    /// Create an `ObjectId`, rejecting non-positive values.
    pub fn new(value: i64) -> Result<Self, TypeError> {
        if value <= 0 {
            return Err(TypeError::NonPositiveId(value));
        }
        Ok(Self(value))
    }

    /// The raw integer value.
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|e| TypeError::InvalidId(format!("{s:?}: {e}")))?;
        Self::new(value)
    }
}

impl TryFrom<i64> for ObjectId {
    type Error = TypeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ObjectId> for i64 {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

/// A tracked object together with its current state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedObject {
    pub id: ObjectId,
    pub state: StateLabel,
}

impl TrackedObject {
    pub fn new(id: ObjectId, state: StateLabel) -> Self {
        Self { id, state }
    }
}
