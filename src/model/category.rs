//! Category and group records. Categories partition into groups; both are
//! session-static relative to the period.

use crate::model::{Amount, Record};
use serde::{Deserialize, Serialize};

/// Whether entries in a category count toward earning or spending.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Income,
    #[default]
    Expense,
}

serde_plain::derive_display_from_serialize!(CategoryType);
serde_plain::derive_fromstr_from_deserialize!(CategoryType);

/// A spending or income category from the `categories` collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    /// Id of the [`Group`] this category belongs to.
    pub group_id: String,
    /// Suggested monthly budget, used to prefill the budget form.
    #[serde(default)]
    pub default_budget: Amount,
}

impl Record for Category {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A named group of categories from the `groups` collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
}

impl Record for Group {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_category_type_strings() {
        assert_eq!(CategoryType::Income.to_string(), "income");
        assert_eq!(CategoryType::from_str("expense").unwrap(), CategoryType::Expense);
    }

    #[test]
    fn test_deserialize_category() {
        let json = r#"{
            "id": "c1",
            "name": "Groceries",
            "type": "expense",
            "groupId": "g1",
            "defaultBudget": 40000
        }"#;
        let category: Category = serde_json::from_str(json).unwrap();
        assert_eq!(category.category_type, CategoryType::Expense);
        assert_eq!(category.group_id, "g1");
        assert_eq!(category.default_budget.minor(), 40000);
    }
}
