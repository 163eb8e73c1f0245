//! Object state store for statelog.
//!
//! An object and its history entries form one aggregate. Every state change,
//! creation included, appends exactly one history entry, and the state write
//! and the history append commit together or not at all.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`SqliteObjectStore`] -- durable two-table SQLite store
//! - [`InMemoryObjectStore`] -- `RwLock`-guarded store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Ids and change ids are assigned by the store and never reused.
//! 2. A state update that matches no object appends nothing.
//! 3. Writes are serialized; a history's change ids follow commit order.
//! 4. Timestamps never decrease as change ids increase.
//! 5. All I/O errors are propagated as [`StoreError::StorageUnavailable`],
//!    never retried internally.

pub mod audit;
pub mod config;
pub mod error;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use audit::{AuditReport, HistoryAuditor, Violation, ViolationKind};
pub use config::{JournalMode, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use sqlite::{IntegritySummary, SqliteObjectStore};
pub use traits::ObjectStore;
