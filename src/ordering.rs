//! Applies user preference ordering to report groups and categories.

use crate::model::{Category, Group, Preferences};
use std::cmp::Ordering;

/// Anything the resolver can order: an id to match against the preference
/// list and a name for the alphabetical fallback.
pub trait Orderable {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

impl Orderable for Group {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Orderable for Category {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

/// Orders `items` by the user's preference list: ids named in
/// `preferred_ids` come first, in that order (ids with no matching item are
/// skipped); everything else follows sorted by name. An absent or empty
/// preference returns the items unchanged: no sort is forced, because the
/// caller's existing order (for example the server's name sort) already
/// stands.
pub fn order_by_preference<T>(items: &[T], preferred_ids: Option<&[String]>) -> Vec<T>
where
    T: Orderable + Clone,
{
    let preferred_ids = match preferred_ids {
        Some(ids) if !ids.is_empty() => ids,
        _ => return items.to_vec(),
    };

    let preferred: Vec<T> = preferred_ids
        .iter()
        .filter_map(|id| items.iter().find(|item| item.id() == id))
        .cloned()
        .collect();

    let mut remaining: Vec<T> = items
        .iter()
        .filter(|item| preferred_ids.iter().all(|id| id != item.id()))
        .cloned()
        .collect();
    remaining.sort_by(|a, b| compare_names(a.name(), b.name()));

    let mut ordered = preferred;
    ordered.extend(remaining);
    ordered
}

/// Orders groups by the preference record's `groupOrder`.
pub fn sort_groups_by_preference(groups: &[Group], preferences: Option<&Preferences>) -> Vec<Group> {
    let preferred = preferences
        .and_then(|p| p.config.report_ordering.as_ref())
        .and_then(|ordering| ordering.group_order.as_deref());
    order_by_preference(groups, preferred)
}

/// Orders the categories of one group by the preference record's
/// `categoryOrder` entry for that group.
pub fn sort_categories_by_group_preference(
    categories: &[Category],
    group_id: &str,
    preferences: Option<&Preferences>,
) -> Vec<Category> {
    let preferred = preferences
        .and_then(|p| p.config.report_ordering.as_ref())
        .and_then(|ordering| ordering.category_order.as_ref())
        .and_then(|orders| orders.get(group_id))
        .map(Vec::as_slice);
    order_by_preference(categories, preferred)
}

/// Case-insensitive name comparison. Collation is not locale-tailored;
/// Unicode lowercasing is close enough for display ordering.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PreferencesConfig, ReportOrdering};
    use std::collections::HashMap;

    fn group(id: &str, name: &str) -> Group {
        Group {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn ids(groups: &[Group]) -> Vec<&str> {
        groups.iter().map(|g| g.id.as_str()).collect()
    }

    fn prefs_with_group_order(order: &[&str]) -> Preferences {
        Preferences {
            id: "p1".to_string(),
            config: PreferencesConfig {
                report_ordering: Some(ReportOrdering {
                    group_order: Some(order.iter().map(|s| s.to_string()).collect()),
                    category_order: None,
                }),
            },
        }
    }

    #[test]
    fn test_no_preference_returns_unchanged() {
        let items = vec![group("a", "Zed"), group("b", "Ann")];
        assert_eq!(ids(&order_by_preference(&items, None)), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_preference_returns_unchanged() {
        let items = vec![group("a", "Zed"), group("b", "Ann")];
        let empty: Vec<String> = Vec::new();
        assert_eq!(ids(&order_by_preference(&items, Some(&empty))), vec!["a", "b"]);
    }

    #[test]
    fn test_preference_overrides_alphabetical() {
        let items = vec![group("a", "Zed"), group("b", "Ann")];
        let preferred = vec!["a".to_string()];
        assert_eq!(ids(&order_by_preference(&items, Some(&preferred))), vec!["a", "b"]);
    }

    #[test]
    fn test_remaining_items_sort_by_name() {
        let items = vec![group("a", "Zed"), group("b", "Mid"), group("c", "Ann")];
        let preferred = vec!["b".to_string()];
        assert_eq!(
            ids(&order_by_preference(&items, Some(&preferred))),
            vec!["b", "c", "a"]
        );
    }

    #[test]
    fn test_unknown_preferred_ids_are_skipped() {
        let items = vec![group("a", "Zed")];
        let preferred = vec!["ghost".to_string(), "a".to_string()];
        assert_eq!(ids(&order_by_preference(&items, Some(&preferred))), vec!["a"]);
    }

    #[test]
    fn test_sort_groups_reads_preferences() {
        let groups = vec![group("g1", "Essentials"), group("g2", "Income")];
        let prefs = prefs_with_group_order(&["g2", "g1"]);
        assert_eq!(
            ids(&sort_groups_by_preference(&groups, Some(&prefs))),
            vec!["g2", "g1"]
        );
    }

    #[test]
    fn test_sort_groups_without_preferences_is_unchanged() {
        let groups = vec![group("g2", "Income"), group("g1", "Essentials")];
        assert_eq!(
            ids(&sort_groups_by_preference(&groups, None)),
            vec!["g2", "g1"]
        );
    }

    #[test]
    fn test_sort_categories_uses_group_entry() {
        let categories = vec![
            Category {
                id: "c1".to_string(),
                name: "Rent".to_string(),
                group_id: "g1".to_string(),
                ..Category::default()
            },
            Category {
                id: "c2".to_string(),
                name: "Groceries".to_string(),
                group_id: "g1".to_string(),
                ..Category::default()
            },
        ];
        let prefs = Preferences {
            id: "p1".to_string(),
            config: PreferencesConfig {
                report_ordering: Some(ReportOrdering {
                    group_order: None,
                    category_order: Some(HashMap::from([(
                        "g1".to_string(),
                        vec!["c1".to_string()],
                    )])),
                }),
            },
        };
        let ordered = sort_categories_by_group_preference(&categories, "g1", Some(&prefs));
        assert_eq!(ordered[0].id, "c1");
        assert_eq!(ordered[1].id, "c2");
        // No entry for this group: unchanged.
        let other = sort_categories_by_group_preference(&categories, "g9", Some(&prefs));
        assert_eq!(other[0].id, "c1");
    }
}
