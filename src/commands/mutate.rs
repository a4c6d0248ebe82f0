//! Commands that write to the record store: add an entry, set a category
//! budget, delete an entry. Failures are reported and not retried.

use crate::collections::{
    BudgetPatch, CategoryBudgetClient, CategoryGroupClient, EntryClient, NewCategoryBudget,
    NewEntry,
};
use crate::model::{Amount, PeriodKey};
use crate::store::RecordStore;
use crate::sync::CancelToken;
use anyhow::{bail, Context};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

pub async fn add_entry(
    store: Arc<dyn RecordStore>,
    period: PeriodKey,
    amount: &str,
    category: &str,
    comment: Option<&str>,
) -> anyhow::Result<()> {
    let amount = Amount::from_str(amount).context("The --amount value is not a valid amount")?;
    let category = resolve_category(&store, category).await?;
    let client = EntryClient::new(store);
    let entry = client
        .add(
            period,
            &NewEntry {
                amount,
                category,
                comment: comment.map(str::to_string),
            },
        )
        .await?;
    info!("Added entry {} for {} in {period}", entry.id, entry.amount);
    Ok(())
}

pub async fn set_budget(
    store: Arc<dyn RecordStore>,
    period: PeriodKey,
    category: &str,
    amount: &str,
) -> anyhow::Result<()> {
    let amount = Amount::from_str(amount).context("The --amount value is not a valid amount")?;
    let category = resolve_category(&store, category).await?;
    let client = CategoryBudgetClient::new(Arc::clone(&store));

    // One budget exists per (category, month, year); decide between create
    // and update from the current listing.
    let budgets = client.list(period, &CancelToken::new()).await?;
    let budget = match budgets.iter().find(|b| b.category == category) {
        Some(existing) => client.update(&existing.id, &BudgetPatch { amount }).await?,
        None => {
            client
                .add(period, &NewCategoryBudget { amount, category })
                .await?
        }
    };
    info!(
        "Budget for category '{}' in {period} is now {}",
        budget.category, budget.amount
    );
    Ok(())
}

pub async fn delete_entry(store: Arc<dyn RecordStore>, id: &str) -> anyhow::Result<()> {
    let client = EntryClient::new(store);
    client.delete(id).await?;
    info!("Deleted entry {id}");
    Ok(())
}

/// Accepts a category id or a (case-insensitive) category name.
async fn resolve_category(store: &Arc<dyn RecordStore>, input: &str) -> anyhow::Result<String> {
    let client = CategoryGroupClient::new(Arc::clone(store));
    let categories = client.list_categories(&CancelToken::new()).await?;
    if let Some(category) = categories.iter().find(|c| c.id == input) {
        return Ok(category.id.clone());
    }
    if let Some(category) = categories
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(input))
    {
        return Ok(category.id.clone());
    }
    bail!("No category with id or name '{input}'");
}
