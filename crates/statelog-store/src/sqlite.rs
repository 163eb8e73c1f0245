use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{
    params, Connection, OpenFlags, OptionalExtension, Transaction, TransactionBehavior,
};
use statelog_types::{ChangeId, HistoryEntry, ObjectId, StateLabel, Timestamp, TrackedObject};

use crate::config::{JournalMode, StoreConfig};
use crate::error::{StoreError, StoreResult};
use crate::traits::ObjectStore;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS objects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        state TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS state_history (
        change_id INTEGER PRIMARY KEY AUTOINCREMENT,
        object_id INTEGER NOT NULL,
        state TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        FOREIGN KEY (object_id) REFERENCES objects(id)
    );
    CREATE INDEX IF NOT EXISTS idx_state_history_object
        ON state_history (object_id, change_id);
";

/// Durable object store on a single SQLite database.
///
/// One connection is opened at construction and shared behind a `Mutex`.
/// Every operation is one transaction; writes begin `IMMEDIATE` so the
/// database write lock is held from the first statement, which also
/// serializes writers in other processes sharing the file.
pub struct SqliteObjectStore {
    conn: Mutex<Connection>,
    location: PathBuf,
}

/// Table-level consistency counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntegritySummary {
    pub objects: u64,
    pub history_entries: u64,
    /// History rows whose object does not exist.
    pub orphaned_entries: u64,
    /// Objects with no history rows at all.
    pub objects_without_history: u64,
}

impl IntegritySummary {
    pub fn is_consistent(&self) -> bool {
        self.orphaned_entries == 0 && self.objects_without_history == 0
    }
}

impl SqliteObjectStore {
    /// Open (creating if absent) the database at `config.path` and ensure the
    /// schema exists. Safe to call on every process start.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        let conn = Connection::open_with_flags(&config.path, flags)
            .map_err(|e| unavailable(&config.path, e))?;
        let store = Self::prepare(conn, config)?;
        tracing::info!(path = %config.path.display(), "object store ready");
        Ok(store)
    }

    /// A private in-memory database, discarded on drop.
    pub fn in_memory() -> StoreResult<Self> {
        let config = StoreConfig {
            path: PathBuf::from(":memory:"),
            journal_mode: JournalMode::Memory,
            ..StoreConfig::default()
        };
        let conn = Connection::open_in_memory().map_err(|e| unavailable(&config.path, e))?;
        Self::prepare(conn, &config)
    }

    fn prepare(mut conn: Connection, config: &StoreConfig) -> StoreResult<Self> {
        apply_pragmas(&conn, config).map_err(|e| unavailable(&config.path, e))?;
        initialize_schema(&mut conn).map_err(|e| unavailable(&config.path, e))?;
        Ok(Self {
            conn: Mutex::new(conn),
            location: config.path.clone(),
        })
    }

    /// Count objects, history rows, and rows that break the pairing
    /// invariant, in one read transaction.
    pub fn integrity_summary(&self) -> StoreResult<IntegritySummary> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let summary = IntegritySummary {
            objects: count(&tx, "SELECT COUNT(*) FROM objects")?,
            history_entries: count(&tx, "SELECT COUNT(*) FROM state_history")?,
            orphaned_entries: count(
                &tx,
                "SELECT COUNT(*) FROM state_history h
                 LEFT JOIN objects o ON o.id = h.object_id
                 WHERE o.id IS NULL",
            )?,
            objects_without_history: count(
                &tx,
                "SELECT COUNT(*) FROM objects o
                 WHERE NOT EXISTS (SELECT 1 FROM state_history h WHERE h.object_id = o.id)",
            )?,
        };
        tx.commit()?;
        Ok(summary)
    }

    fn connection(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::StorageUnavailable("connection mutex poisoned".into()))
    }
}

impl ObjectStore for SqliteObjectStore {
    fn create_object(&self) -> StoreResult<ObjectId> {
        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO objects (state) VALUES (?1)",
            params![StateLabel::CREATED],
        )?;
        let id = object_id_from_row(tx.last_insert_rowid())?;
        let entry = append_history(&tx, id, &StateLabel::created())?;
        tx.commit()?;

        tracing::debug!(object_id = %id, change_id = %entry.change_id, "created object");
        Ok(id)
    }

    fn update_object_state(
        &self,
        id: ObjectId,
        new_state: &StateLabel,
    ) -> StoreResult<HistoryEntry> {
        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE objects SET state = ?1 WHERE id = ?2",
            params![new_state.as_str(), id.get()],
        )?;
        if changed == 0 {
            // Dropping the transaction rolls it back.
            return Err(StoreError::NotFound(id));
        }
        let entry = append_history(&tx, id, new_state)?;
        tx.commit()?;

        tracing::debug!(
            object_id = %id,
            change_id = %entry.change_id,
            state = %new_state,
            "updated object state"
        );
        Ok(entry)
    }

    fn get_object(&self, id: ObjectId) -> StoreResult<TrackedObject> {
        let conn = self.connection()?;
        let state = read_state(&conn, id)?.ok_or(StoreError::NotFound(id))?;
        Ok(TrackedObject::new(id, state))
    }

    fn get_object_history(&self, id: ObjectId) -> StoreResult<Vec<HistoryEntry>> {
        Ok(self.get_object_with_history(id)?.1)
    }

    fn get_object_with_history(
        &self,
        id: ObjectId,
    ) -> StoreResult<(TrackedObject, Vec<HistoryEntry>)> {
        let mut conn = self.connection()?;
        // Both reads share the transaction's snapshot.
        let tx = conn.transaction()?;
        let state = read_state(&tx, id)?.ok_or(StoreError::NotFound(id))?;
        let history = read_history(&tx, id)?;
        tx.commit()?;
        Ok((TrackedObject::new(id, state), history))
    }

    fn object_ids(&self) -> StoreResult<Vec<ObjectId>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT id FROM objects ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(object_id_from_row(row?)?);
        }
        Ok(ids)
    }

    fn object_count(&self) -> StoreResult<u64> {
        let conn = self.connection()?;
        count(&conn, "SELECT COUNT(*) FROM objects")
    }
}

impl std::fmt::Debug for SqliteObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteObjectStore")
            .field("location", &self.location)
            .finish()
    }
}

/// Insert the history row for a state the object now holds.
///
/// Must run inside the transaction that changed the object's state.
fn append_history(
    tx: &Transaction<'_>,
    object_id: ObjectId,
    state: &StateLabel,
) -> StoreResult<HistoryEntry> {
    let last: Option<String> = tx
        .query_row(
            "SELECT timestamp FROM state_history ORDER BY change_id DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    let last = last.as_deref().map(decode_timestamp).transpose()?;
    let timestamp = Timestamp::next_after(last);

    tx.execute(
        "INSERT INTO state_history (object_id, state, timestamp) VALUES (?1, ?2, ?3)",
        params![object_id.get(), state.as_str(), timestamp.to_iso8601()],
    )?;
    Ok(HistoryEntry::new(
        ChangeId::new(tx.last_insert_rowid()),
        object_id,
        state.clone(),
        timestamp,
    ))
}

fn read_state(conn: &Connection, id: ObjectId) -> StoreResult<Option<StateLabel>> {
    let state: Option<String> = conn
        .query_row(
            "SELECT state FROM objects WHERE id = ?1",
            params![id.get()],
            |row| row.get(0),
        )
        .optional()?;
    state.map(decode_state).transpose()
}

fn read_history(conn: &Connection, id: ObjectId) -> StoreResult<Vec<HistoryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT change_id, state, timestamp FROM state_history
         WHERE object_id = ?1
         ORDER BY change_id ASC",
    )?;
    let rows = stmt.query_map(params![id.get()], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (change_id, state, timestamp) = row?;
        entries.push(HistoryEntry::new(
            ChangeId::new(change_id),
            id,
            decode_state(state)?,
            decode_timestamp(&timestamp)?,
        ));
    }
    Ok(entries)
}

fn apply_pragmas(conn: &Connection, config: &StoreConfig) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    // journal_mode answers with the mode now in effect.
    let _mode: String = conn.pragma_update_and_check(
        None,
        "journal_mode",
        config.journal_mode.pragma_value(),
        |row| row.get(0),
    )?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
}

fn initialize_schema(conn: &mut Connection) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA)?;
    tx.commit()
}

fn count(conn: &Connection, sql: &str) -> StoreResult<u64> {
    let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    u64::try_from(n).map_err(|_| StoreError::corrupt("row count", n))
}

fn object_id_from_row(value: i64) -> StoreResult<ObjectId> {
    ObjectId::new(value).map_err(|e| StoreError::corrupt("object id", e))
}

fn decode_state(value: String) -> StoreResult<StateLabel> {
    StateLabel::new(value).map_err(|e| StoreError::corrupt("state label", e))
}

fn decode_timestamp(value: &str) -> StoreResult<Timestamp> {
    Timestamp::parse(value).map_err(|e| StoreError::corrupt("history timestamp", e))
}

fn unavailable(path: &Path, e: rusqlite::Error) -> StoreError {
    StoreError::StorageUnavailable(format!("cannot open {}: {e}", path.display()))
}
