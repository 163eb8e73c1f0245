use statelog_types::{ObjectId, TypeError};

/// Errors from object store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Caller supplied empty or malformed input. Nothing was touched.
    #[error("validation error: {0}")]
    Validation(String),

    /// The referenced object does not exist. Nothing was written.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// Storage could not be opened, read, or committed. The operation was
    /// rolled back in full.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub(crate) fn corrupt(what: &str, reason: impl std::fmt::Display) -> Self {
        Self::StorageUnavailable(format!("corrupt {what}: {reason}"))
    }
}

impl From<TypeError> for StoreError {
    fn from(e: TypeError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::StorageUnavailable(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
