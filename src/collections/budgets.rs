//! The typed client and view binding for the `category_budgets` collection.

use crate::collections::entries::merge_period;
use crate::collections::{parse_record, parse_records};
use crate::model::{Amount, CategoryBudget, PeriodKey};
use crate::store::{
    period_filter, EventHandler, ListQuery, RecordStore, Unsubscribe, CATEGORY_BUDGETS,
};
use crate::sync::{apply_event, CancelToken, Collection, RecordEvent};
use crate::Result;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct NewCategoryBudget {
    pub amount: Amount,
    pub category: String,
}

/// Only the amount of an existing budget can change; the category and
/// period are its identity.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetPatch {
    pub amount: Amount,
}

/// Stateless request functions for the `category_budgets` collection.
///
/// The backing store enforces at most one budget per (category, month,
/// year); a create that would violate that fails with a transport error.
#[derive(Clone)]
pub struct CategoryBudgetClient {
    store: Arc<dyn RecordStore>,
}

impl CategoryBudgetClient {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, key: PeriodKey, cancel: &CancelToken) -> Result<Vec<CategoryBudget>> {
        let query = ListQuery::filtered(period_filter(key));
        let rows = self.store.list(CATEGORY_BUDGETS, &query, cancel).await?;
        parse_records(CATEGORY_BUDGETS, rows)
    }

    pub async fn add(&self, key: PeriodKey, payload: &NewCategoryBudget) -> Result<CategoryBudget> {
        let mut body = serde_json::to_value(payload).expect("NewCategoryBudget serializes");
        merge_period(&mut body, key);
        let row = self.store.create(CATEGORY_BUDGETS, body).await?;
        parse_record(CATEGORY_BUDGETS, row)
    }

    pub async fn update(&self, id: &str, payload: &BudgetPatch) -> Result<CategoryBudget> {
        let body = serde_json::to_value(payload).expect("BudgetPatch serializes");
        let row = self.store.update(CATEGORY_BUDGETS, id, body).await?;
        parse_record(CATEGORY_BUDGETS, row)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(CATEGORY_BUDGETS, id).await
    }

    pub async fn subscribe(&self, key: PeriodKey, handler: EventHandler) -> Result<Unsubscribe> {
        self.store
            .subscribe(CATEGORY_BUDGETS, Some(period_filter(key)), handler)
            .await
    }
}

/// Binds [`CategoryBudgetClient`] to a synchronized view.
pub struct CategoryBudgetCollection {
    client: CategoryBudgetClient,
}

impl CategoryBudgetCollection {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            client: CategoryBudgetClient::new(store),
        }
    }
}

#[async_trait::async_trait]
impl Collection for CategoryBudgetCollection {
    type Param = PeriodKey;
    type Snapshot = Vec<CategoryBudget>;

    async fn fetch(&self, param: &PeriodKey, cancel: &CancelToken) -> Result<Self::Snapshot> {
        self.client.list(*param, cancel).await
    }

    async fn subscribe(&self, param: &PeriodKey, handler: EventHandler) -> Result<Unsubscribe> {
        self.client.subscribe(*param, handler).await
    }

    fn reduce(&self, snapshot: &Self::Snapshot, event: &RecordEvent<Value>) -> Self::Snapshot {
        match event.decoded::<CategoryBudget>() {
            Some(event) => apply_event(snapshot, &event),
            None => snapshot.clone(),
        }
    }
}
