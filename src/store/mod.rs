//! The record store boundary.
//!
//! `RecordStore` is the transport seam: an untyped CRUD-plus-subscribe trait
//! with a production HTTP implementation and an in-memory implementation.
//! Typed parsing is layered on top in [`crate::collections`].

mod filter;
mod http;
mod memory;
mod realtime;

pub use filter::period_filter;
pub use http::HttpStore;
pub use memory::MemoryStore;

use crate::sync::{CancelToken, RecordEvent};
use crate::Result;
use serde_json::Value;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex};

pub const ENTRIES: &str = "entries";
pub const CATEGORY_BUDGETS: &str = "category_budgets";
pub const GROUPS: &str = "groups";
pub const CATEGORIES: &str = "categories";
pub const PREFERENCES: &str = "preferences";

/// Callback invoked with every mutation event matching a subscription, in
/// the order the backend emits them.
pub type EventHandler = Arc<dyn Fn(RecordEvent<Value>) + Send + Sync>;

/// Parameters for a filtered listing.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// A filter expression, e.g. `year = 2025 && month = 3`. See
    /// [`period_filter`]. A filter naming fields the collection does not
    /// have silently matches zero rows; that is remote query-language
    /// policy and both store implementations preserve it.
    pub filter: Option<String>,
    /// Field to sort by, with a leading `-` for descending.
    pub sort: Option<String>,
    /// Fetch at most this many records instead of the full list.
    pub limit: Option<u32>,
}

impl ListQuery {
    /// A query for everything matching `filter`.
    pub fn filtered(filter: impl Into<String>) -> Self {
        Self {
            filter: Some(filter.into()),
            ..Self::default()
        }
    }

    /// A query for the full collection sorted by `sort`.
    pub fn sorted(sort: impl Into<String>) -> Self {
        Self {
            sort: Some(sort.into()),
            ..Self::default()
        }
    }

    /// A query for the first `limit` records.
    pub fn first(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

/// Closes a live subscription.
///
/// Calling [`Unsubscribe::call`] is synchronous and idempotent: the channel
/// teardown it triggers proceeds in the background, and second and later
/// calls do nothing. This is what lets a superseding pipeline close the
/// previous generation's channel without awaiting it.
pub struct Unsubscribe {
    inner: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Unsubscribe {
    pub(crate) fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner: Mutex::new(Some(Box::new(f))),
        }
    }

    /// Closes the subscription. Safe to call any number of times.
    pub fn call(&self) {
        let f = self.inner.lock().expect("unsubscribe lock poisoned").take();
        if let Some(f) = f {
            f();
        }
    }
}

impl Debug for Unsubscribe {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let pending = self
            .inner
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false);
        f.debug_struct("Unsubscribe").field("pending", &pending).finish()
    }
}

/// The transport to one remote record store.
///
/// All payloads are raw JSON records; the typed layer above decodes them.
/// Write operations are not retried here; retry policy, if any, belongs to
/// the caller.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Lists the records of `collection` matching `query`. Fails with
    /// `Error::Cancelled` if `cancel` fires before the listing completes.
    async fn list(
        &self,
        collection: &str,
        query: &ListQuery,
        cancel: &CancelToken,
    ) -> Result<Vec<Value>>;

    /// Creates a record and returns it as stored (id and timestamps
    /// assigned).
    async fn create(&self, collection: &str, payload: Value) -> Result<Value>;

    /// Applies a partial payload to the record with `id` and returns the
    /// updated record.
    async fn update(&self, collection: &str, id: &str, payload: Value) -> Result<Value>;

    /// Deletes the record with `id`.
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Opens a live channel for mutations of `collection`, scoped by the
    /// same `filter` language as [`RecordStore::list`]. Resolves once the
    /// channel is confirmed open; every subsequent matching mutation is
    /// handed to `handler` in emission order.
    async fn subscribe(
        &self,
        collection: &str,
        filter: Option<String>,
        handler: EventHandler,
    ) -> Result<Unsubscribe>;
}

/// Selects the record store implementation.
///
/// This allows for running the program without a live backend. When
/// `BUDGET_SYNC_IN_MEMORY_MODE` is set and non-zero in length the mode will
/// be `Mode::Memory`, otherwise it will be `Mode::Remote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Remote,
    Memory,
}

impl Mode {
    pub fn from_env() -> Self {
        match std::env::var("BUDGET_SYNC_IN_MEMORY_MODE") {
            Ok(value) if !value.is_empty() => Mode::Memory,
            _ => Mode::Remote,
        }
    }
}

/// Creates the record store for `mode`. The memory store comes pre-seeded
/// with demonstration data.
pub fn record_store(base_url: &str, mode: Mode) -> Result<Arc<dyn RecordStore>> {
    Ok(match mode {
        Mode::Remote => Arc::new(HttpStore::new(base_url)?),
        Mode::Memory => Arc::new(MemoryStore::with_demo_data()),
    })
}
