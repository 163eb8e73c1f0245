use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A non-empty state label.
///
/// Labels are stored exactly as given, whitespace included; construction
/// only rejects the empty string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StateLabel(String);

impl StateLabel {
    /// State every object starts in.
    pub const CREATED: &'static str = "created";

    pub fn new(label: impl Into<String>) -> Result<Self, TypeError> {
        let label = label.into();
        if label.is_empty() {
            return Err(TypeError::EmptyState);
        }
        Ok(Self(label))
    }

    /// The initial `"created"` label.
    pub fn created() -> Self {
        Self(Self::CREATED.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_created(&self) -> bool {
        self.0 == Self::CREATED
    }
}

impl fmt::Debug for StateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateLabel({:?})", self.0)
    }
}

impl fmt::Display for StateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StateLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StateLabel {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for StateLabel {
    type Error = TypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StateLabel> for String {
    fn from(label: StateLabel) -> Self {
        label.0
    }
}
