//! Typed clients for each remote collection, layered over the untyped
//! [`RecordStore`](crate::store::RecordStore) transport, plus the
//! [`Collection`](crate::sync::Collection) bindings that attach them to
//! synchronized views.

mod budgets;
mod catalog;
mod entries;
mod preferences;

pub use budgets::{BudgetPatch, CategoryBudgetClient, CategoryBudgetCollection, NewCategoryBudget};
pub use catalog::{CategoryCollection, CategoryGroupClient, GroupCollection};
pub use entries::{EntryClient, EntryCollection, EntryPatch, NewEntry};
pub use preferences::{PreferencesClient, PreferencesCollection};

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decodes the raw records of a listing into their model type.
pub(crate) fn parse_records<T: DeserializeOwned>(collection: &str, rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| parse_record(collection, row))
        .collect()
}

pub(crate) fn parse_record<T: DeserializeOwned>(collection: &str, row: Value) -> Result<T> {
    serde_json::from_value(row).map_err(|e| Error::decode(format!("{collection} record"), e))
}
