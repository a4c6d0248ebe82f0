//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::store::MemoryStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// A memory store seeded with a small fixed-id budget for March 2025:
/// groups g1/g2, categories c1 (expense, g1), c2 (expense, g2) and c3
/// (income, g1), entries e1/e2 and budget b1, and a preferences record that
/// puts g2 first.
pub(crate) fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.insert("groups", json!({"id": "g1", "name": "Essentials"}));
    store.insert("groups", json!({"id": "g2", "name": "Leisure"}));
    store.insert(
        "categories",
        json!({"id": "c1", "name": "Groceries", "type": "expense", "groupId": "g1", "defaultBudget": 40000}),
    );
    store.insert(
        "categories",
        json!({"id": "c2", "name": "Dining Out", "type": "expense", "groupId": "g2", "defaultBudget": 20000}),
    );
    store.insert(
        "categories",
        json!({"id": "c3", "name": "Salary", "type": "income", "groupId": "g1", "defaultBudget": 0}),
    );
    store.insert(
        "entries",
        json!({"id": "e1", "year": 2025, "month": 3, "amount": 500, "category": "c1"}),
    );
    store.insert(
        "entries",
        json!({"id": "e2", "year": 2025, "month": 3, "amount": 1200, "category": "c2", "comment": "pizza"}),
    );
    store.insert(
        "category_budgets",
        json!({"id": "b1", "year": 2025, "month": 3, "amount": 40000, "category": "c1"}),
    );
    store.insert(
        "preferences",
        json!({"id": "p1", "config": {"reportOrdering": {"groupOrder": ["g2", "g1"]}}}),
    );
    Arc::new(store)
}

/// Polls `predicate` until it holds, panicking after `timeout`. Works under
/// paused test time too, since the sleep auto-advances the clock.
pub(crate) async fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) {
    tokio::time::timeout(timeout, async {
        loop {
            if predicate() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
