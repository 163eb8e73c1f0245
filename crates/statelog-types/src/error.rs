use thiserror::Error;

/// Errors produced by type construction and parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("state label must not be empty")]
    EmptyState,

    #[error("identifier must be a positive integer, got {0}")]
    NonPositiveId(i64),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },
}
