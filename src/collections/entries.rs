//! The typed client and view binding for the `entries` collection.

use crate::collections::{parse_record, parse_records};
use crate::model::{Amount, LedgerEntry, PeriodKey};
use crate::store::{period_filter, EventHandler, ListQuery, RecordStore, Unsubscribe, ENTRIES};
use crate::sync::{apply_event, CancelToken, Collection, RecordEvent};
use crate::Result;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Fields a caller supplies when adding an entry; the period is supplied
/// separately so the record always lands in the month being viewed.
#[derive(Debug, Clone, Serialize)]
pub struct NewEntry {
    pub amount: Amount,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Partial update for an entry. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Stateless request functions for the `entries` collection.
#[derive(Clone)]
pub struct EntryClient {
    store: Arc<dyn RecordStore>,
}

impl EntryClient {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, key: PeriodKey, cancel: &CancelToken) -> Result<Vec<LedgerEntry>> {
        let query = ListQuery::filtered(period_filter(key));
        let rows = self.store.list(ENTRIES, &query, cancel).await?;
        parse_records(ENTRIES, rows)
    }

    pub async fn add(&self, key: PeriodKey, payload: &NewEntry) -> Result<LedgerEntry> {
        let mut body = serde_json::to_value(payload).expect("NewEntry serializes");
        merge_period(&mut body, key);
        let row = self.store.create(ENTRIES, body).await?;
        parse_record(ENTRIES, row)
    }

    pub async fn update(&self, id: &str, payload: &EntryPatch) -> Result<LedgerEntry> {
        let body = serde_json::to_value(payload).expect("EntryPatch serializes");
        let row = self.store.update(ENTRIES, id, body).await?;
        parse_record(ENTRIES, row)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(ENTRIES, id).await
    }

    pub async fn subscribe(&self, key: PeriodKey, handler: EventHandler) -> Result<Unsubscribe> {
        self.store
            .subscribe(ENTRIES, Some(period_filter(key)), handler)
            .await
    }
}

/// Binds [`EntryClient`] to a synchronized view: the snapshot is the
/// period's entries, kept current by the standard reducer.
pub struct EntryCollection {
    client: EntryClient,
}

impl EntryCollection {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            client: EntryClient::new(store),
        }
    }
}

#[async_trait::async_trait]
impl Collection for EntryCollection {
    type Param = PeriodKey;
    type Snapshot = Vec<LedgerEntry>;

    async fn fetch(&self, param: &PeriodKey, cancel: &CancelToken) -> Result<Self::Snapshot> {
        self.client.list(*param, cancel).await
    }

    async fn subscribe(&self, param: &PeriodKey, handler: EventHandler) -> Result<Unsubscribe> {
        self.client.subscribe(*param, handler).await
    }

    fn reduce(&self, snapshot: &Self::Snapshot, event: &RecordEvent<Value>) -> Self::Snapshot {
        match event.decoded::<LedgerEntry>() {
            Some(event) => apply_event(snapshot, &event),
            None => snapshot.clone(),
        }
    }
}

/// Adds the period fields to a creation payload.
pub(super) fn merge_period(body: &mut Value, key: PeriodKey) {
    if let Some(map) = body.as_object_mut() {
        map.insert("month".to_string(), json!(key.month));
        map.insert("year".to_string(), json!(key.year));
    }
}
