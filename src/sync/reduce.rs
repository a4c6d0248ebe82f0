//! Folds live subscription events into a previously fetched snapshot.

use crate::model::Record;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// The mutation kind carried by a subscription event.
///
/// Unknown action strings decode to `Other`, which reduces as a no-op, so a
/// newer server cannot break an older client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    Create,
    Update,
    Delete,
    #[serde(other)]
    Other,
}

serde_plain::derive_display_from_serialize!(EventAction);
serde_plain::derive_fromstr_from_deserialize!(EventAction);

/// One `{action, record}` notification from a live subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordEvent<T> {
    pub action: EventAction,
    pub record: T,
}

impl RecordEvent<Value> {
    /// Decodes the raw record into `T`. Returns `None` (and logs) when the
    /// record does not fit; the caller leaves its snapshot unchanged.
    pub fn decoded<T: DeserializeOwned>(&self) -> Option<RecordEvent<T>> {
        match serde_json::from_value(self.record.clone()) {
            Ok(record) => Some(RecordEvent {
                action: self.action,
                record,
            }),
            Err(e) => {
                warn!("Dropping {} event with undecodable record: {e}", self.action);
                None
            }
        }
    }
}

/// Applies one event to a snapshot, producing a new snapshot. The input is
/// never mutated, so a consumer comparing by identity sees every change.
///
/// - `create` appends the record literally; a second create for an id
///   already present appends again rather than deduplicating.
/// - `update` replaces the record whose id matches; an unknown id is a
///   silent no-op, not an error.
/// - `delete` removes the record whose id matches; an unknown id is a
///   silent no-op.
/// - anything else leaves the snapshot unchanged.
pub fn apply_event<T>(snapshot: &[T], event: &RecordEvent<T>) -> Vec<T>
where
    T: Record + Clone,
{
    match event.action {
        EventAction::Create => {
            let mut next = snapshot.to_vec();
            next.push(event.record.clone());
            next
        }
        EventAction::Update => snapshot
            .iter()
            .map(|record| {
                if record.id() == event.record.id() {
                    event.record.clone()
                } else {
                    record.clone()
                }
            })
            .collect(),
        EventAction::Delete => snapshot
            .iter()
            .filter(|record| record.id() != event.record.id())
            .cloned()
            .collect(),
        EventAction::Other => snapshot.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, LedgerEntry};

    fn entry(id: &str, amount: i64) -> LedgerEntry {
        LedgerEntry {
            id: id.to_string(),
            year: 2025,
            month: 3,
            amount: Amount::from_minor(amount),
            category: "c1".to_string(),
            ..LedgerEntry::default()
        }
    }

    fn event(action: EventAction, record: LedgerEntry) -> RecordEvent<LedgerEntry> {
        RecordEvent { action, record }
    }

    #[test]
    fn test_create_appends() {
        let snapshot = vec![entry("e1", 100)];
        let next = apply_event(&snapshot, &event(EventAction::Create, entry("e2", 200)));
        assert_eq!(next.len(), 2);
        assert_eq!(next[1].id, "e2");
    }

    #[test]
    fn test_create_does_not_deduplicate() {
        let snapshot = vec![entry("e1", 100)];
        let next = apply_event(&snapshot, &event(EventAction::Create, entry("e1", 100)));
        assert_eq!(next.len(), 2);
    }

    #[test]
    fn test_update_replaces_by_id() {
        let snapshot = vec![entry("e1", 100), entry("e2", 200)];
        let next = apply_event(&snapshot, &event(EventAction::Update, entry("e1", 150)));
        assert_eq!(next[0].amount.minor(), 150);
        assert_eq!(next[1].amount.minor(), 200);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let snapshot = vec![entry("e1", 100)];
        let next = apply_event(&snapshot, &event(EventAction::Update, entry("e9", 999)));
        assert_eq!(next, snapshot);
    }

    #[test]
    fn test_delete_removes_by_id() {
        let snapshot = vec![entry("e1", 100), entry("e2", 200)];
        let next = apply_event(&snapshot, &event(EventAction::Delete, entry("e1", 100)));
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].id, "e2");
    }

    #[test]
    fn test_delete_unknown_id_is_noop() {
        let snapshot = vec![entry("e1", 100)];
        let next = apply_event(&snapshot, &event(EventAction::Delete, entry("e9", 0)));
        assert_eq!(next, snapshot);
    }

    #[test]
    fn test_unknown_action_is_noop() {
        let snapshot = vec![entry("e1", 100)];
        let next = apply_event(&snapshot, &event(EventAction::Other, entry("e2", 200)));
        assert_eq!(next, snapshot);
    }

    #[test]
    fn test_input_snapshot_is_not_mutated() {
        let snapshot = vec![entry("e1", 100)];
        let _ = apply_event(&snapshot, &event(EventAction::Update, entry("e1", 150)));
        assert_eq!(snapshot[0].amount.minor(), 100);
    }

    #[test]
    fn test_replay_sequence() {
        // create e1, create e2, update e1, delete e2 leaves exactly the
        // updated e1.
        let mut snapshot = Vec::new();
        snapshot = apply_event(&snapshot, &event(EventAction::Create, entry("e1", 500)));
        snapshot = apply_event(&snapshot, &event(EventAction::Create, entry("e2", 200)));
        snapshot = apply_event(&snapshot, &event(EventAction::Update, entry("e1", 700)));
        snapshot = apply_event(&snapshot, &event(EventAction::Delete, entry("e2", 0)));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, "e1");
        assert_eq!(snapshot[0].amount.minor(), 700);
    }

    #[test]
    fn test_action_decodes_unknown_string() {
        let action: EventAction = serde_json::from_str("\"upsert\"").unwrap();
        assert_eq!(action, EventAction::Other);
    }
}
