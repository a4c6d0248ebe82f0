//! An in-memory implementation of the `RecordStore` trait.
//!
//! Note: this is compiled even in the "production" version of this app so
//! that we can run the whole app, top-to-bottom, without a live record
//! store. Tests use it too; the failure, delay, and call-count
//! instrumentation below exists so they can observe the engine from the
//! transport side.

use crate::model::PeriodKey;
use crate::store::filter::{parse_clauses, record_matches, Clause};
use crate::store::{
    EventHandler, ListQuery, RecordStore, Unsubscribe, CATEGORIES, CATEGORY_BUDGETS, ENTRIES,
    GROUPS, PREFERENCES,
};
use crate::sync::{CancelToken, EventAction, RecordEvent};
use crate::{Error, Result};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// An in-memory record store: per-collection JSON records, the same filter
/// semantics as the remote query language, and synchronous event fan-out to
/// matching subscribers.
#[derive(Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Vec<Value>>,
    subs: Vec<Subscriber>,
    next_sub: u64,
    list_calls: HashMap<String, u32>,
    subscribe_calls: HashMap<String, u32>,
    unsubscribe_calls: u32,
    fail_lists: HashSet<String>,
    fail_subscribes: HashSet<String>,
    list_delay: Option<Duration>,
}

struct Subscriber {
    id: u64,
    collection: String,
    matcher: Matcher,
    handler: EventHandler,
}

/// A subscriber's filter, parsed once at subscribe time. A malformed filter
/// matches nothing, the same zero-rows policy the listing side has.
enum Matcher {
    All,
    Clauses(Vec<Clause>),
    Nothing,
}

impl Matcher {
    fn from_filter(filter: Option<&str>) -> Self {
        match filter {
            None => Matcher::All,
            Some(filter) => match parse_clauses(filter) {
                Some(clauses) => Matcher::Clauses(clauses),
                None => Matcher::Nothing,
            },
        }
    }

    fn matches(&self, record: &Value) -> bool {
        match self {
            Matcher::All => true,
            Matcher::Clauses(clauses) => record_matches(clauses, record),
            Matcher::Nothing => false,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with a demonstration budget for the current
    /// month.
    pub fn with_demo_data() -> Self {
        let store = Self::new();
        let period = PeriodKey::current();

        let income = store.insert(GROUPS, json!({"name": "Income"}));
        let essentials = store.insert(GROUPS, json!({"name": "Essentials"}));
        let leisure = store.insert(GROUPS, json!({"name": "Leisure"}));
        let income_id = id_of(&income);
        let essentials_id = id_of(&essentials);
        let leisure_id = id_of(&leisure);

        let salary = store.insert(
            CATEGORIES,
            json!({"name": "Salary", "type": "income", "groupId": income_id, "defaultBudget": 350000}),
        );
        let rent = store.insert(
            CATEGORIES,
            json!({"name": "Rent", "type": "expense", "groupId": essentials_id, "defaultBudget": 120000}),
        );
        let groceries = store.insert(
            CATEGORIES,
            json!({"name": "Groceries", "type": "expense", "groupId": essentials_id, "defaultBudget": 45000}),
        );
        let dining = store.insert(
            CATEGORIES,
            json!({"name": "Dining Out", "type": "expense", "groupId": leisure_id, "defaultBudget": 20000}),
        );
        store.insert(
            CATEGORIES,
            json!({"name": "Streaming", "type": "expense", "groupId": leisure_id, "defaultBudget": 3000}),
        );

        let month = period.month;
        let year = period.year;
        for (category, amount, comment) in [
            (id_of(&salary), 350000, "salary"),
            (id_of(&rent), 120000, "rent"),
            (id_of(&groceries), 8234, "groceries"),
            (id_of(&groceries), 4150, "farmers market"),
            (id_of(&dining), 5600, "pizza night"),
        ] {
            store.insert(
                ENTRIES,
                json!({"year": year, "month": month, "amount": amount, "category": category, "comment": comment}),
            );
        }
        for (category, amount) in [
            (id_of(&salary), 350000),
            (id_of(&rent), 120000),
            (id_of(&groceries), 45000),
            (id_of(&dining), 15000),
        ] {
            store.insert(
                CATEGORY_BUDGETS,
                json!({"year": year, "month": month, "amount": amount, "category": category}),
            );
        }
        store.insert(
            PREFERENCES,
            json!({"config": {"reportOrdering": {"groupOrder": [income_id, essentials_id, leisure_id]}}}),
        );
        store
    }

    /// Inserts a record directly, assigning an id and timestamps. Does not
    /// emit an event; this is for seeding.
    pub fn insert(&self, collection: &str, payload: Value) -> Value {
        let record = stamp_new(payload);
        self.lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        record
    }

    /// The raw records of a collection.
    pub fn records(&self, collection: &str) -> Vec<Value> {
        self.lock()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// How many times `list` has been called for a collection.
    pub fn list_calls(&self, collection: &str) -> u32 {
        self.lock().list_calls.get(collection).copied().unwrap_or(0)
    }

    /// How many times `subscribe` has been called for a collection.
    pub fn subscribe_calls(&self, collection: &str) -> u32 {
        self.lock()
            .subscribe_calls
            .get(collection)
            .copied()
            .unwrap_or(0)
    }

    /// How many subscriptions have actually been closed. Idempotent
    /// re-closes do not count.
    pub fn unsubscribe_calls(&self) -> u32 {
        self.lock().unsubscribe_calls
    }

    /// The number of currently open subscriptions on a collection.
    pub fn live_subscriptions(&self, collection: &str) -> usize {
        self.lock()
            .subs
            .iter()
            .filter(|s| s.collection == collection)
            .count()
    }

    /// Makes `list` fail with a transport error for a collection.
    pub fn fail_lists(&self, collection: &str, fail: bool) {
        let mut inner = self.lock();
        if fail {
            inner.fail_lists.insert(collection.to_string());
        } else {
            inner.fail_lists.remove(collection);
        }
    }

    /// Makes `subscribe` fail with a transport error for a collection.
    pub fn fail_subscribes(&self, collection: &str, fail: bool) {
        let mut inner = self.lock();
        if fail {
            inner.fail_subscribes.insert(collection.to_string());
        } else {
            inner.fail_subscribes.remove(collection);
        }
    }

    /// Delays every `list` call, so tests can hold fetches in flight.
    pub fn set_list_delay(&self, delay: Option<Duration>) {
        self.lock().list_delay = delay;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store lock poisoned")
    }

    /// Fans an event out to matching subscribers, in registration order,
    /// with the store lock released.
    fn dispatch(&self, collection: &str, action: EventAction, record: Value) {
        let handlers: Vec<EventHandler> = {
            let inner = self.lock();
            inner
                .subs
                .iter()
                .filter(|s| s.collection == collection && s.matcher.matches(&record))
                .map(|s| Arc::clone(&s.handler))
                .collect()
        };
        let event = RecordEvent { action, record };
        for handler in handlers {
            handler(event.clone());
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn list(
        &self,
        collection: &str,
        query: &ListQuery,
        cancel: &CancelToken,
    ) -> Result<Vec<Value>> {
        let delay = {
            let mut inner = self.lock();
            *inner.list_calls.entry(collection.to_string()).or_default() += 1;
            inner.list_delay
        };
        if let Some(delay) = delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(Error::Cancelled),
            }
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let inner = self.lock();
        if inner.fail_lists.contains(collection) {
            return Err(Error::transport(format!(
                "injected failure listing '{collection}'"
            )));
        }
        let rows = inner
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default();
        drop(inner);

        let mut rows = match &query.filter {
            None => rows,
            Some(filter) => match parse_clauses(filter) {
                // Malformed filter: zero rows, not an error.
                None => Vec::new(),
                Some(clauses) => rows
                    .into_iter()
                    .filter(|row| record_matches(&clauses, row))
                    .collect(),
            },
        };
        if let Some(sort) = &query.sort {
            let (field, descending) = match sort.strip_prefix('-') {
                Some(field) => (field, true),
                None => (sort.as_str(), false),
            };
            rows.sort_by(|a, b| {
                let ordering = compare_fields(a.get(field), b.get(field));
                if descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }

    async fn create(&self, collection: &str, payload: Value) -> Result<Value> {
        let record = stamp_new(payload);
        self.lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        self.dispatch(collection, EventAction::Create, record.clone());
        Ok(record)
    }

    async fn update(&self, collection: &str, id: &str, payload: Value) -> Result<Value> {
        let record = {
            let mut inner = self.lock();
            let rows = inner.collections.entry(collection.to_string()).or_default();
            let row = rows
                .iter_mut()
                .find(|row| row.get("id").and_then(Value::as_str) == Some(id))
                .ok_or_else(|| {
                    Error::transport_status(404, format!("no record '{id}' in '{collection}'"))
                })?;
            if let (Some(target), Some(patch)) = (row.as_object_mut(), payload.as_object()) {
                for (key, value) in patch {
                    target.insert(key.clone(), value.clone());
                }
                target.insert("updatedAt".to_string(), json!(timestamp()));
            }
            row.clone()
        };
        self.dispatch(collection, EventAction::Update, record.clone());
        Ok(record)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let record = {
            let mut inner = self.lock();
            let rows = inner.collections.entry(collection.to_string()).or_default();
            let position = rows
                .iter()
                .position(|row| row.get("id").and_then(Value::as_str) == Some(id))
                .ok_or_else(|| {
                    Error::transport_status(404, format!("no record '{id}' in '{collection}'"))
                })?;
            rows.remove(position)
        };
        self.dispatch(collection, EventAction::Delete, record);
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &str,
        filter: Option<String>,
        handler: EventHandler,
    ) -> Result<Unsubscribe> {
        let id = {
            let mut inner = self.lock();
            *inner
                .subscribe_calls
                .entry(collection.to_string())
                .or_default() += 1;
            if inner.fail_subscribes.contains(collection) {
                return Err(Error::transport(format!(
                    "injected failure subscribing to '{collection}'"
                )));
            }
            let id = inner.next_sub;
            inner.next_sub += 1;
            inner.subs.push(Subscriber {
                id,
                collection: collection.to_string(),
                matcher: Matcher::from_filter(filter.as_deref()),
                handler,
            });
            id
        };
        let inner = Arc::clone(&self.inner);
        Ok(Unsubscribe::new(move || {
            let mut inner = inner.lock().expect("memory store lock poisoned");
            let before = inner.subs.len();
            inner.subs.retain(|s| s.id != id);
            if inner.subs.len() < before {
                inner.unsubscribe_calls += 1;
            }
        }))
    }
}

/// Turns a creation payload into a stored record: id and timestamps
/// assigned, the way the real store does it. A caller-supplied id is kept.
fn stamp_new(payload: Value) -> Value {
    let mut record = match payload {
        Value::Object(map) => Value::Object(map),
        other => json!({ "value": other }),
    };
    if let Some(map) = record.as_object_mut() {
        let now = timestamp();
        if !map.contains_key("id") {
            map.insert("id".to_string(), json!(new_id()));
        }
        map.insert("createdAt".to_string(), json!(now.clone()));
        map.insert("updatedAt".to_string(), json!(now));
    }
    record
}

/// 15-character lowercase alphanumeric id, the record store's own format.
fn new_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    hex[..15].to_string()
}

fn timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3fZ").to_string()
}

fn id_of(record: &Value) -> String {
    record
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::period_filter;

    fn entry_payload(month: u32, amount: i64) -> Value {
        json!({"year": 2025, "month": month, "amount": amount, "category": "c1"})
    }

    #[tokio::test]
    async fn test_list_filters_by_period() {
        let store = MemoryStore::new();
        store.insert("entries", entry_payload(3, 100));
        store.insert("entries", entry_payload(4, 200));
        let query = ListQuery::filtered(period_filter(PeriodKey::new(3, 2025)));
        let rows = store
            .list("entries", &query, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["amount"], json!(100));
    }

    #[tokio::test]
    async fn test_list_malformed_filter_returns_zero_rows() {
        let store = MemoryStore::new();
        store.insert("entries", entry_payload(3, 100));
        let query = ListQuery::filtered("year > 2025");
        let rows = store
            .list("entries", &query, &CancelToken::new())
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let store = MemoryStore::new();
        store.insert("groups", json!({"name": "Zoo"}));
        store.insert("groups", json!({"name": "Alpha"}));
        let rows = store
            .list("groups", &ListQuery::sorted("name"), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(rows[0]["name"], json!("Alpha"));
    }

    #[tokio::test]
    async fn test_list_cancelled_token_wins() {
        let store = MemoryStore::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = store
            .list("entries", &ListQuery::default(), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_update_missing_record_is_transport_error() {
        let store = MemoryStore::new();
        let err = store
            .update("entries", "nope", json!({"amount": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport { status: Some(404), .. }));
    }

    #[tokio::test]
    async fn test_subscription_receives_matching_events_in_order() {
        let store = MemoryStore::new();
        let seen: Arc<Mutex<Vec<(EventAction, i64)>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let handler: EventHandler = Arc::new(move |event| {
            let amount = event.record["amount"].as_i64().unwrap_or(0);
            sink.lock().unwrap().push((event.action, amount));
        });
        let _unsub = store
            .subscribe(
                "entries",
                Some(period_filter(PeriodKey::new(3, 2025))),
                handler,
            )
            .await
            .unwrap();

        let created = store.create("entries", entry_payload(3, 100)).await.unwrap();
        // Different month: filtered out.
        store.create("entries", entry_payload(4, 999)).await.unwrap();
        store
            .update("entries", id_of(&created).as_str(), json!({"amount": 150}))
            .await
            .unwrap();
        store
            .delete("entries", id_of(&created).as_str())
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (EventAction::Create, 100),
                (EventAction::Update, 150),
                (EventAction::Delete, 150),
            ]
        );
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let store = MemoryStore::new();
        let handler: EventHandler = Arc::new(|_| {});
        let unsub = store.subscribe("entries", None, handler).await.unwrap();
        assert_eq!(store.live_subscriptions("entries"), 1);
        unsub.call();
        unsub.call();
        assert_eq!(store.live_subscriptions("entries"), 0);
        assert_eq!(store.unsubscribe_calls(), 1);
    }
}
