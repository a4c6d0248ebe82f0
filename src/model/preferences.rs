//! The singleton preferences record holding report ordering choices.

use crate::model::Record;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The `preferences` collection holds at most one of these; it may be absent
/// entirely for a fresh install.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub id: String,
    #[serde(default)]
    pub config: PreferencesConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_ordering: Option<ReportOrdering>,
}

/// User-chosen display order for the report page. Ids absent from these lists
/// fall back to alphabetical placement after the listed ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOrdering {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_order: Option<Vec<String>>,
    /// Per-group category ordering, keyed by group id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_order: Option<HashMap<String, Vec<String>>>,
}

impl Record for Preferences {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_config() {
        let json = r#"{
            "id": "p1",
            "config": {
                "reportOrdering": {
                    "groupOrder": ["g2", "g1"],
                    "categoryOrder": {"g1": ["c3", "c1"]}
                }
            }
        }"#;
        let prefs: Preferences = serde_json::from_str(json).unwrap();
        let ordering = prefs.config.report_ordering.unwrap();
        assert_eq!(ordering.group_order.unwrap(), vec!["g2", "g1"]);
        assert_eq!(
            ordering.category_order.unwrap().get("g1").unwrap(),
            &vec!["c3".to_string(), "c1".to_string()]
        );
    }

    #[test]
    fn test_deserialize_empty_config() {
        let prefs: Preferences = serde_json::from_str(r#"{"id":"p1","config":{}}"#).unwrap();
        assert!(prefs.config.report_ordering.is_none());
    }
}
