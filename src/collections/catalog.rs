//! The typed client for `groups` and `categories`, and their view bindings.
//!
//! Both collections are session-static relative to the period: they are
//! listed once, name-sorted by the server, and kept live by an unfiltered
//! subscription of their own.

use crate::collections::parse_records;
use crate::model::{Category, Group};
use crate::store::{EventHandler, ListQuery, RecordStore, Unsubscribe, CATEGORIES, GROUPS};
use crate::sync::{apply_event, CancelToken, Collection, RecordEvent};
use crate::Result;
use serde_json::Value;
use std::sync::Arc;

/// Stateless request functions for the `groups` and `categories`
/// collections.
#[derive(Clone)]
pub struct CategoryGroupClient {
    store: Arc<dyn RecordStore>,
}

impl CategoryGroupClient {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn list_groups(&self, cancel: &CancelToken) -> Result<Vec<Group>> {
        let rows = self
            .store
            .list(GROUPS, &ListQuery::sorted("name"), cancel)
            .await?;
        parse_records(GROUPS, rows)
    }

    pub async fn list_categories(&self, cancel: &CancelToken) -> Result<Vec<Category>> {
        let rows = self
            .store
            .list(CATEGORIES, &ListQuery::sorted("name"), cancel)
            .await?;
        parse_records(CATEGORIES, rows)
    }

    pub async fn subscribe_groups(&self, handler: EventHandler) -> Result<Unsubscribe> {
        self.store.subscribe(GROUPS, None, handler).await
    }

    pub async fn subscribe_categories(&self, handler: EventHandler) -> Result<Unsubscribe> {
        self.store.subscribe(CATEGORIES, None, handler).await
    }
}

/// Binds the `groups` collection to a synchronized view. The parameter is
/// `()`: the view starts once per session and never restarts.
pub struct GroupCollection {
    client: CategoryGroupClient,
}

impl GroupCollection {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            client: CategoryGroupClient::new(store),
        }
    }
}

#[async_trait::async_trait]
impl Collection for GroupCollection {
    type Param = ();
    type Snapshot = Vec<Group>;

    async fn fetch(&self, _param: &(), cancel: &CancelToken) -> Result<Self::Snapshot> {
        self.client.list_groups(cancel).await
    }

    async fn subscribe(&self, _param: &(), handler: EventHandler) -> Result<Unsubscribe> {
        self.client.subscribe_groups(handler).await
    }

    fn reduce(&self, snapshot: &Self::Snapshot, event: &RecordEvent<Value>) -> Self::Snapshot {
        match event.decoded::<Group>() {
            Some(event) => apply_event(snapshot, &event),
            None => snapshot.clone(),
        }
    }
}

/// Binds the `categories` collection to a synchronized view.
pub struct CategoryCollection {
    client: CategoryGroupClient,
}

impl CategoryCollection {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            client: CategoryGroupClient::new(store),
        }
    }
}

#[async_trait::async_trait]
impl Collection for CategoryCollection {
    type Param = ();
    type Snapshot = Vec<Category>;

    async fn fetch(&self, _param: &(), cancel: &CancelToken) -> Result<Self::Snapshot> {
        self.client.list_categories(cancel).await
    }

    async fn subscribe(&self, _param: &(), handler: EventHandler) -> Result<Unsubscribe> {
        self.client.subscribe_categories(handler).await
    }

    fn reduce(&self, snapshot: &Self::Snapshot, event: &RecordEvent<Value>) -> Self::Snapshot {
        match event.decoded::<Category>() {
            Some(event) => apply_event(snapshot, &event),
            None => snapshot.clone(),
        }
    }
}
