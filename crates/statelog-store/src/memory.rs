use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use statelog_types::{ChangeId, HistoryEntry, ObjectId, StateLabel, Timestamp, TrackedObject};

use crate::error::{StoreError, StoreResult};
use crate::traits::ObjectStore;

/// In-memory object store.
///
/// Intended for tests and embedding. Objects and the store-wide history log
/// live behind one `RwLock`, so a state change and its history append are a
/// single critical section and writers are fully serialized.
pub struct InMemoryObjectStore {
    inner: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    objects: BTreeMap<ObjectId, StateLabel>,
    log: Vec<HistoryEntry>,
    by_object: HashMap<ObjectId, Vec<usize>>,
    last_object_id: i64,
    last_change_id: i64,
}

impl MemoryState {
    fn append(&mut self, object_id: ObjectId, state: StateLabel) -> HistoryEntry {
        self.last_change_id += 1;
        let timestamp = Timestamp::next_after(self.log.last().map(|e| e.timestamp));
        let entry = HistoryEntry::new(
            ChangeId::new(self.last_change_id),
            object_id,
            state,
            timestamp,
        );
        self.by_object
            .entry(object_id)
            .or_default()
            .push(self.log.len());
        self.log.push(entry.clone());
        entry
    }
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryState::default()),
        }
    }

    /// Total number of history entries across all objects.
    pub fn history_len(&self) -> StoreResult<usize> {
        Ok(self.read()?.log.len())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.inner
            .read()
            .map_err(|_| StoreError::StorageUnavailable("in-memory store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.inner
            .write()
            .map_err(|_| StoreError::StorageUnavailable("in-memory store lock poisoned".into()))
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn create_object(&self) -> StoreResult<ObjectId> {
        let mut state = self.write()?;
        let id = ObjectId::new(state.last_object_id + 1)?;
        state.last_object_id = id.get();
        state.objects.insert(id, StateLabel::created());
        let entry = state.append(id, StateLabel::created());
        tracing::debug!(object_id = %id, change_id = %entry.change_id, "created object");
        Ok(id)
    }

    fn update_object_state(
        &self,
        id: ObjectId,
        new_state: &StateLabel,
    ) -> StoreResult<HistoryEntry> {
        let mut state = self.write()?;
        match state.objects.get_mut(&id) {
            Some(current) => *current = new_state.clone(),
            None => return Err(StoreError::NotFound(id)),
        }
        let entry = state.append(id, new_state.clone());
        tracing::debug!(
            object_id = %id,
            change_id = %entry.change_id,
            state = %new_state,
            "updated object state"
        );
        Ok(entry)
    }

    fn get_object(&self, id: ObjectId) -> StoreResult<TrackedObject> {
        let state = self.read()?;
        state
            .objects
            .get(&id)
            .map(|label| TrackedObject::new(id, label.clone()))
            .ok_or(StoreError::NotFound(id))
    }

    fn get_object_history(&self, id: ObjectId) -> StoreResult<Vec<HistoryEntry>> {
        Ok(self.get_object_with_history(id)?.1)
    }

    fn get_object_with_history(
        &self,
        id: ObjectId,
    ) -> StoreResult<(TrackedObject, Vec<HistoryEntry>)> {
        let state = self.read()?;
        let current = state.objects.get(&id).ok_or(StoreError::NotFound(id))?;
        let positions = state.by_object.get(&id).map(Vec::as_slice).unwrap_or_default();
        let history = positions.iter().map(|&i| state.log[i].clone()).collect();
        Ok((TrackedObject::new(id, current.clone()), history))
    }

    fn object_ids(&self) -> StoreResult<Vec<ObjectId>> {
        Ok(self.read()?.objects.keys().copied().collect())
    }

    fn object_count(&self) -> StoreResult<u64> {
        Ok(self.read()?.objects.len() as u64)
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (objects, entries) = match self.inner.read() {
            Ok(state) => (state.objects.len(), state.log.len()),
            Err(_) => (0, 0),
        };
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &objects)
            .field("history_len", &entries)
            .finish()
    }
}
