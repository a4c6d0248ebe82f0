//! Types that represent the core data model, such as `LedgerEntry` and `Category`.
mod amount;
mod budget;
mod category;
mod entry;
mod period;
mod preferences;

pub use amount::{Amount, ParseAmountError};
pub use budget::CategoryBudget;
pub use category::{Category, CategoryType, Group};
pub use entry::LedgerEntry;
pub use period::PeriodKey;
pub use preferences::{Preferences, PreferencesConfig, ReportOrdering};
use serde::{Deserialize, Serialize};

/// Implemented by record types that carry a store-assigned id. The event
/// reducer keys replacement and removal on this id.
pub trait Record {
    fn id(&self) -> &str;
}

/// The composite value a consumer of one period observes: the period's
/// ledger entries and category budgets together. Derived, never persisted
/// remotely.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BudgetReport {
    /// This month's ledger entries.
    pub entries: Vec<LedgerEntry>,
    /// This month's per-category budgets.
    pub category_budgets: Vec<CategoryBudget>,
}
