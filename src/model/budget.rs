//! The category budget record: one planned amount per category and month.

use crate::model::{Amount, Record};
use serde::{Deserialize, Serialize};

/// A budgeted amount for one category in one month, from the
/// `category_budgets` collection.
///
/// The backing store enforces at most one record per
/// (category, month, year) with a unique index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBudget {
    pub id: String,
    pub year: i32,
    pub month: u32,
    pub amount: Amount,
    pub category: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Record for CategoryBudget {
    fn id(&self) -> &str {
        &self.id
    }
}
