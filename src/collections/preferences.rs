//! The typed client and view binding for the singleton `preferences`
//! record.

use crate::collections::parse_record;
use crate::model::Preferences;
use crate::store::{EventHandler, ListQuery, RecordStore, Unsubscribe, PREFERENCES};
use crate::sync::{CancelToken, Collection, EventAction, RecordEvent};
use crate::Result;
use serde_json::Value;
use std::sync::Arc;

/// Stateless request functions for the `preferences` collection, which
/// holds at most one record and may hold none.
#[derive(Clone)]
pub struct PreferencesClient {
    store: Arc<dyn RecordStore>,
}

impl PreferencesClient {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// The preferences record, if one exists.
    pub async fn get(&self, cancel: &CancelToken) -> Result<Option<Preferences>> {
        let rows = self
            .store
            .list(PREFERENCES, &ListQuery::first(1), cancel)
            .await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(parse_record(PREFERENCES, row)?)),
            None => Ok(None),
        }
    }

    pub async fn subscribe(&self, handler: EventHandler) -> Result<Unsubscribe> {
        self.store.subscribe(PREFERENCES, None, handler).await
    }
}

/// Binds [`PreferencesClient`] to a synchronized view whose snapshot is the
/// optional singleton record.
pub struct PreferencesCollection {
    client: PreferencesClient,
}

impl PreferencesCollection {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            client: PreferencesClient::new(store),
        }
    }
}

#[async_trait::async_trait]
impl Collection for PreferencesCollection {
    type Param = ();
    type Snapshot = Option<Preferences>;

    async fn fetch(&self, _param: &(), cancel: &CancelToken) -> Result<Self::Snapshot> {
        self.client.get(cancel).await
    }

    async fn subscribe(&self, _param: &(), handler: EventHandler) -> Result<Unsubscribe> {
        self.client.subscribe(handler).await
    }

    /// Create and update both install the event's record as the singleton;
    /// delete clears it when the id matches.
    fn reduce(&self, snapshot: &Self::Snapshot, event: &RecordEvent<Value>) -> Self::Snapshot {
        let Some(event) = event.decoded::<Preferences>() else {
            return snapshot.clone();
        };
        match event.action {
            EventAction::Create | EventAction::Update => Some(event.record),
            EventAction::Delete => match snapshot {
                Some(current) if current.id == event.record.id => None,
                other => other.clone(),
            },
            EventAction::Other => snapshot.clone(),
        }
    }
}
