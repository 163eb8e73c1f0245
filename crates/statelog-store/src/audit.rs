use statelog_types::{ChangeId, HistoryEntry, ObjectId, TrackedObject};

use crate::error::StoreResult;
use crate::traits::ObjectStore;

/// Result of auditing one object's history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditReport {
    pub object_id: ObjectId,
    pub entry_count: usize,
    pub violations: Vec<Violation>,
}

impl AuditReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific invariant violation found in a history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub change_id: Option<ChangeId>,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    EmptyHistory,
    MissingCreationEntry,
    ChangeIdOrder,
    TimestampOrder,
    StateMismatch,
}

/// Checks that an object and its history still form a consistent aggregate.
pub struct HistoryAuditor;

impl HistoryAuditor {
    /// Audit a single object read from `store`.
    pub fn audit_object<S: ObjectStore + ?Sized>(
        store: &S,
        id: ObjectId,
    ) -> StoreResult<AuditReport> {
        let (object, history) = store.get_object_with_history(id)?;
        Ok(Self::check(&object, &history))
    }

    /// Audit every object in `store`, in id order.
    pub fn audit_all<S: ObjectStore + ?Sized>(store: &S) -> StoreResult<Vec<AuditReport>> {
        store
            .object_ids()?
            .into_iter()
            .map(|id| Self::audit_object(store, id))
            .collect()
    }

    /// Check an object against its history entries, oldest first.
    pub fn check(object: &TrackedObject, history: &[HistoryEntry]) -> AuditReport {
        let mut violations = Vec::new();

        let Some(first) = history.first() else {
            violations.push(Violation {
                change_id: None,
                kind: ViolationKind::EmptyHistory,
                description: "object has no history entries".into(),
            });
            return AuditReport {
                object_id: object.id,
                entry_count: 0,
                violations,
            };
        };

        if !first.state.is_created() {
            violations.push(Violation {
                change_id: Some(first.change_id),
                kind: ViolationKind::MissingCreationEntry,
                description: format!(
                    "first entry is {:?}, expected \"created\"",
                    first.state.as_str()
                ),
            });
        }

        for pair in history.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.change_id <= prev.change_id {
                violations.push(Violation {
                    change_id: Some(next.change_id),
                    kind: ViolationKind::ChangeIdOrder,
                    description: format!(
                        "change id {} does not follow {}",
                        next.change_id, prev.change_id
                    ),
                });
            }
            if next.timestamp < prev.timestamp {
                violations.push(Violation {
                    change_id: Some(next.change_id),
                    kind: ViolationKind::TimestampOrder,
                    description: format!(
                        "timestamp {} is earlier than {}",
                        next.timestamp, prev.timestamp
                    ),
                });
            }
        }

        // `history` is non-empty here.
        let last = &history[history.len() - 1];
        if last.state != object.state {
            violations.push(Violation {
                change_id: Some(last.change_id),
                kind: ViolationKind::StateMismatch,
                description: format!(
                    "current state {:?} differs from last recorded {:?}",
                    object.state.as_str(),
                    last.state.as_str()
                ),
            });
        }

        AuditReport {
            object_id: object.id,
            entry_count: history.len(),
            violations,
        }
    }
}
