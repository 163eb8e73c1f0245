//! Foundation types for statelog.
//!
//! This crate provides the identity, temporal, and record types shared by the
//! store, the HTTP server, and the CLI. Every other statelog crate depends on
//! `statelog-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] — Store-assigned positive integer identifying a tracked object
//! - [`ChangeId`] — Store-wide monotonically increasing history sequence number
//! - [`StateLabel`] — Non-empty state text, validated on construction
//! - [`Timestamp`] — UTC instant with a fixed-width ISO-8601 text form
//! - [`TrackedObject`] — An object and its current state
//! - [`HistoryEntry`] — One immutable record of a state an object held

pub mod error;
pub mod history;
pub mod object;
pub mod state;
pub mod temporal;

pub use error::TypeError;
pub use history::{ChangeId, HistoryEntry};
pub use object::{ObjectId, TrackedObject};
pub use state::StateLabel;
pub use temporal::Timestamp;
