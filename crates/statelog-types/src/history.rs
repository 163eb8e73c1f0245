use std::fmt;

use serde::{Deserialize, Serialize};

use crate::object::ObjectId;
use crate::state::StateLabel;
use crate::temporal::Timestamp;

/// Store-wide sequence number of a history entry.
///
/// Only meaningful for ordering: a larger `ChangeId` was committed later.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(i64);

impl ChangeId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChangeId({})", self.0)
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One immutable record of a state an object held.
///
/// The owning object is implied by the query that produced the entry, so it
/// is kept out of the serialized form: the wire shape is
/// `{change_id, state, timestamp}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub change_id: ChangeId,
    #[serde(skip_serializing)]
    pub object_id: ObjectId,
    pub state: StateLabel,
    pub timestamp: Timestamp,
}

impl HistoryEntry {
    pub fn new(
        change_id: ChangeId,
        object_id: ObjectId,
        state: StateLabel,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            change_id,
            object_id,
            state,
            timestamp,
        }
    }
}
