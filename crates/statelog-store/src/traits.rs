use statelog_types::{HistoryEntry, ObjectId, StateLabel, TrackedObject};

use crate::error::StoreResult;

/// Store of tracked objects and their state history.
///
/// All implementations must satisfy these invariants:
/// - Every object has at least one history entry, its `"created"` entry.
/// - An object's entries ordered by change id are exactly the states it has
///   held, and the last one equals its current state.
/// - A state write and its history append commit atomically. A failed or
///   not-found operation leaves no trace.
/// - Writes to the same object are serialized: concurrent updates all
///   land, and the final state is the one with the greatest change id.
pub trait ObjectStore: Send + Sync {
    /// Create an object in the `"created"` state and record its creation
    /// entry. Returns the new id.
    fn create_object(&self) -> StoreResult<ObjectId>;

    /// Set an object's state and append the matching history entry.
    ///
    /// Returns the appended entry, or `StoreError::NotFound` (with nothing
    /// written) if no object has this id.
    fn update_object_state(
        &self,
        id: ObjectId,
        new_state: &StateLabel,
    ) -> StoreResult<HistoryEntry>;

    /// Read an object's current state.
    fn get_object(&self, id: ObjectId) -> StoreResult<TrackedObject>;

    /// Read an object's full history, oldest first.
    ///
    /// Returns `StoreError::NotFound` if no object has this id; an existing
    /// object never yields an empty history.
    fn get_object_history(&self, id: ObjectId) -> StoreResult<Vec<HistoryEntry>>;

    /// Read an object and its full history from one consistent snapshot.
    ///
    /// No write is observed between the two, so the last entry always
    /// matches the returned state.
    fn get_object_with_history(
        &self,
        id: ObjectId,
    ) -> StoreResult<(TrackedObject, Vec<HistoryEntry>)>;

    /// Ids of all objects, ascending.
    fn object_ids(&self) -> StoreResult<Vec<ObjectId>>;

    /// Number of objects in the store.
    fn object_count(&self) -> StoreResult<u64> {
        Ok(self.object_ids()?.len() as u64)
    }

    /// Validate a raw state label, then update.
    ///
    /// Empty input is rejected with `StoreError::Validation` before storage
    /// is touched.
    fn update_object_state_text(
        &self,
        id: ObjectId,
        new_state: &str,
    ) -> StoreResult<HistoryEntry> {
        let label = StateLabel::new(new_state)?;
        self.update_object_state(id, &label)
    }
}
