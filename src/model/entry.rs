//! The ledger entry record: one income or expense posting in a month.

use crate::model::{Amount, Record};
use serde::{Deserialize, Serialize};

/// A single ledger entry as stored in the `entries` collection.
///
/// Entries are immutable except through an explicit update command. The
/// `created_at`/`updated_at` stamps are assigned by the record store and kept
/// in its wire format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: String,
    pub year: i32,
    pub month: u32,
    pub amount: Amount,
    /// Id of the [`Category`](crate::model::Category) this entry is posted to.
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Record for LedgerEntry {
    fn id(&self) -> &str {
        &self.id
    }
}
