//! The application façade over the engine: one synchronized view per
//! collection, merged report state, ordering-aware accessors, and the
//! mutation commands.

use crate::collections::{
    BudgetPatch, CategoryBudgetClient, CategoryBudgetCollection, CategoryCollection, EntryClient,
    EntryCollection, EntryPatch, GroupCollection, NewCategoryBudget, NewEntry,
    PreferencesCollection,
};
use crate::model::{
    Amount, BudgetReport, Category, CategoryBudget, Group, LedgerEntry, PeriodKey, Preferences,
};
use crate::ordering::{sort_categories_by_group_preference, sort_groups_by_preference};
use crate::store::RecordStore;
use crate::sync::{merge2, SyncedView, ViewState};
use crate::Result;
use std::sync::{Arc, Mutex};
use tracing::error;

/// Owns the five synchronized views (entries and category budgets scoped by
/// the period; groups, categories and preferences session-static) and the
/// typed clients used for mutations.
///
/// `set_month` and `set_year` are the sole triggers for pipeline restarts.
/// Mutations go straight to the record store; their effects come back
/// through the live subscriptions, so there is no local echo to reconcile.
pub struct BudgetService {
    entry_client: EntryClient,
    budget_client: CategoryBudgetClient,
    entries: SyncedView<EntryCollection>,
    budgets: SyncedView<CategoryBudgetCollection>,
    groups: SyncedView<GroupCollection>,
    categories: SyncedView<CategoryCollection>,
    preferences: SyncedView<PreferencesCollection>,
    period: Mutex<PeriodKey>,
    /// The last composite ready value, surfaced as stale while a new
    /// generation loads.
    report_stale: Mutex<Option<BudgetReport>>,
}

impl BudgetService {
    /// Starts every view against `store`, scoped to `period`.
    pub fn start(store: Arc<dyn RecordStore>, period: PeriodKey) -> Self {
        Self {
            entry_client: EntryClient::new(Arc::clone(&store)),
            budget_client: CategoryBudgetClient::new(Arc::clone(&store)),
            entries: SyncedView::start(EntryCollection::new(Arc::clone(&store)), period),
            budgets: SyncedView::start(CategoryBudgetCollection::new(Arc::clone(&store)), period),
            groups: SyncedView::start(GroupCollection::new(Arc::clone(&store)), ()),
            categories: SyncedView::start(CategoryCollection::new(Arc::clone(&store)), ()),
            preferences: SyncedView::start(PreferencesCollection::new(store), ()),
            period: Mutex::new(period),
            report_stale: Mutex::new(None),
        }
    }

    pub fn period(&self) -> PeriodKey {
        *self.period.lock().expect("period lock poisoned")
    }

    /// Moves the report to another month of the current year.
    pub fn set_month(&self, month: u32) {
        let key = {
            let mut period = self.period.lock().expect("period lock poisoned");
            period.month = month;
            *period
        };
        self.set_period(key);
    }

    /// Moves the report to the same month of another year.
    pub fn set_year(&self, year: i32) {
        let key = {
            let mut period = self.period.lock().expect("period lock poisoned");
            period.year = year;
            *period
        };
        self.set_period(key);
    }

    fn set_period(&self, key: PeriodKey) {
        self.entries.set_param(key);
        self.budgets.set_param(key);
    }

    /// The composite report state for the current period, recomputed from
    /// the constituent views on every read.
    pub fn report(&self) -> ViewState<BudgetReport> {
        let stale = self
            .report_stale
            .lock()
            .expect("report stale lock poisoned")
            .clone();
        let merged = merge2(
            &self.entries.state(),
            &self.budgets.state(),
            stale,
            |entries, budgets| BudgetReport {
                entries: entries.clone(),
                category_budgets: budgets.clone(),
            },
        );
        if let ViewState::Ready(report) = &merged {
            *self
                .report_stale
                .lock()
                .expect("report stale lock poisoned") = Some(report.clone());
        }
        merged
    }

    /// Groups in display order: the user's preferred order first, the rest
    /// by name. Empty until the groups view is ready.
    pub fn groups(&self) -> Vec<Group> {
        let preferences = self.preferences();
        let groups = self.groups.state().value().cloned().unwrap_or_default();
        sort_groups_by_preference(&groups, preferences.as_ref())
    }

    /// All categories, as listed (name-sorted by the server).
    pub fn categories(&self) -> Vec<Category> {
        self.categories.state().value().cloned().unwrap_or_default()
    }

    /// One group's categories in display order.
    pub fn categories_for_group(&self, group_id: &str) -> Vec<Category> {
        let preferences = self.preferences();
        let members: Vec<Category> = self
            .categories()
            .into_iter()
            .filter(|category| category.group_id == group_id)
            .collect();
        sort_categories_by_group_preference(&members, group_id, preferences.as_ref())
    }

    pub fn preferences(&self) -> Option<Preferences> {
        self.preferences.state().value().cloned().flatten()
    }

    /// Resolves when any constituent view publishes a state change.
    pub async fn changed(&self) {
        use futures::future::select_all;
        use futures::FutureExt;

        let mut entries = self.entries.watch();
        let mut budgets = self.budgets.watch();
        let mut groups = self.groups.watch();
        let mut categories = self.categories.watch();
        let mut preferences = self.preferences.watch();
        let waiters = vec![
            async move { entries.changed().await.ok() }.boxed(),
            async move { budgets.changed().await.ok() }.boxed(),
            async move { groups.changed().await.ok() }.boxed(),
            async move { categories.changed().await.ok() }.boxed(),
            async move { preferences.changed().await.ok() }.boxed(),
        ];
        let _ = select_all(waiters).await;
    }

    /// Adds an entry to the month currently being viewed. A failure is
    /// logged for the operator and returned; it is not retried here.
    pub async fn add_entry(&self, payload: NewEntry) -> Result<LedgerEntry> {
        let key = self.period();
        self.entry_client.add(key, &payload).await.inspect_err(|e| {
            error!("failed to add entry for {key}: {e}");
        })
    }

    pub async fn update_entry(&self, id: &str, patch: EntryPatch) -> Result<LedgerEntry> {
        self.entry_client.update(id, &patch).await.inspect_err(|e| {
            error!("failed to update entry '{id}': {e}");
        })
    }

    pub async fn delete_entry(&self, id: &str) -> Result<()> {
        self.entry_client.delete(id).await.inspect_err(|e| {
            error!("failed to delete entry '{id}': {e}");
        })
    }

    /// Creates or updates the budget for one category in the current
    /// period. The uniqueness of (category, month, year) is the store's
    /// invariant; this only decides between create and update from the
    /// current snapshot.
    pub async fn save_budget(&self, category_id: &str, amount: Amount) -> Result<()> {
        let existing: Option<CategoryBudget> = self
            .budgets
            .state()
            .value()
            .and_then(|budgets| budgets.iter().find(|b| b.category == category_id).cloned());
        let result = match existing {
            Some(budget) if budget.amount == amount => return Ok(()),
            Some(budget) => self
                .budget_client
                .update(&budget.id, &BudgetPatch { amount })
                .await
                .map(|_| ()),
            None if amount.is_zero() => return Ok(()),
            None => self
                .budget_client
                .add(
                    self.period(),
                    &NewCategoryBudget {
                        amount,
                        category: category_id.to_string(),
                    },
                )
                .await
                .map(|_| ()),
        };
        result.inspect_err(|e| error!("failed to save budget for category '{category_id}': {e}"))
    }

    /// Saves a whole budget form. Every category is attempted; the first
    /// failure is returned after the rest have run.
    pub async fn batch_save_budgets(&self, budgets: &[(String, Amount)]) -> Result<()> {
        let mut first_error = None;
        for (category_id, amount) in budgets {
            if let Err(e) = self.save_budget(category_id, *amount).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Tears down every view and closes their subscriptions.
    pub fn dispose(&self) {
        self.entries.dispose();
        self.budgets.dispose();
        self.groups.dispose();
        self.categories.dispose();
        self.preferences.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, CATEGORY_BUDGETS, ENTRIES};
    use crate::test::{seeded_store, wait_until};
    use serde_json::json;
    use std::time::Duration;

    /// Starts a service and waits until the report is ready with both of
    /// its live subscriptions open, so a mutation issued next cannot slip
    /// past the channel.
    async fn ready_service(store: &Arc<MemoryStore>) -> BudgetService {
        let service = BudgetService::start(
            Arc::clone(store) as Arc<dyn RecordStore>,
            PeriodKey::new(3, 2025),
        );
        wait_until(Duration::from_secs(1), || {
            service.report().is_ready()
                && store.live_subscriptions(ENTRIES) == 1
                && store.live_subscriptions(CATEGORY_BUDGETS) == 1
        })
        .await;
        service
    }

    #[tokio::test]
    async fn test_report_becomes_ready() {
        let store = seeded_store();
        let service = ready_service(&store).await;
        let report = service.report();
        let value = report.value().expect("report should carry a value");
        assert_eq!(value.entries.len(), 2);
        assert_eq!(value.category_budgets.len(), 1);
    }

    #[tokio::test]
    async fn test_groups_follow_preference_order() {
        let store = seeded_store();
        let service = ready_service(&store).await;
        wait_until(Duration::from_secs(1), || {
            !service.groups().is_empty() && service.preferences().is_some()
        })
        .await;
        // Seeded preference order puts g2 (Leisure) before g1 (Essentials).
        let groups = service.groups();
        assert_eq!(groups[0].id, "g2");
        assert_eq!(groups[1].id, "g1");
    }

    #[tokio::test]
    async fn test_set_month_restarts_period_views() {
        let store = seeded_store();
        let service = ready_service(&store).await;
        assert_eq!(store.list_calls(ENTRIES), 1);
        service.set_month(4);
        wait_until(Duration::from_secs(1), || {
            service.report().is_ready() && store.list_calls(ENTRIES) == 2
        })
        .await;
        assert_eq!(store.list_calls(CATEGORY_BUDGETS), 2);
        let report = service.report();
        assert!(report.value().unwrap().entries.is_empty());
    }

    #[tokio::test]
    async fn test_added_entry_arrives_through_subscription() {
        let store = seeded_store();
        let service = ready_service(&store).await;
        service
            .add_entry(NewEntry {
                amount: Amount::from_minor(1234),
                category: "c1".to_string(),
                comment: Some("coffee".to_string()),
            })
            .await
            .unwrap();
        wait_until(Duration::from_secs(1), || {
            service
                .report()
                .value()
                .is_some_and(|report| report.entries.len() == 3)
        })
        .await;
    }

    #[tokio::test]
    async fn test_save_budget_creates_then_updates() {
        let store = seeded_store();
        let service = ready_service(&store).await;

        // c2 has no budget yet: a save creates one.
        service
            .save_budget("c2", Amount::from_minor(5000))
            .await
            .unwrap();
        wait_until(Duration::from_secs(1), || {
            service
                .report()
                .value()
                .is_some_and(|report| report.category_budgets.len() == 2)
        })
        .await;

        // A second save with a new amount updates in place.
        service
            .save_budget("c2", Amount::from_minor(7000))
            .await
            .unwrap();
        wait_until(Duration::from_secs(1), || {
            service.report().value().is_some_and(|report| {
                report
                    .category_budgets
                    .iter()
                    .any(|b| b.category == "c2" && b.amount.minor() == 7000)
            })
        })
        .await;
        assert_eq!(store.records(CATEGORY_BUDGETS).len(), 2);
    }

    #[tokio::test]
    async fn test_save_budget_skips_equal_and_zero() {
        let store = seeded_store();
        let service = ready_service(&store).await;
        let before = store.records(CATEGORY_BUDGETS).len();
        // c1 already holds 40000; saving the same amount is a no-op.
        service
            .save_budget("c1", Amount::from_minor(40000))
            .await
            .unwrap();
        // A zero for a category with no budget creates nothing.
        service.save_budget("c2", Amount::from_minor(0)).await.unwrap();
        assert_eq!(store.records(CATEGORY_BUDGETS).len(), before);
    }

    #[tokio::test]
    async fn test_dispose_closes_subscriptions() {
        let store = seeded_store();
        let service = ready_service(&store).await;
        wait_until(Duration::from_secs(1), || {
            store.live_subscriptions(ENTRIES) == 1
        })
        .await;
        service.dispose();
        assert_eq!(store.live_subscriptions(ENTRIES), 0);
        assert!(service.report().is_disposed());
    }

    #[tokio::test]
    async fn test_report_error_when_entries_fail() {
        let store = Arc::new(MemoryStore::new());
        store.insert(ENTRIES, json!({"year": 2025, "month": 3, "amount": 1, "category": "c1"}));
        store.fail_lists(ENTRIES, true);
        let service = BudgetService::start(
            Arc::clone(&store) as Arc<dyn RecordStore>,
            PeriodKey::new(3, 2025),
        );
        wait_until(Duration::from_secs(1), || service.report().error().is_some()).await;
        assert!(!service.report().has_value());
    }
}
