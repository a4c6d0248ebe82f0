//! The `budget report` command: load the month's composite view, print it,
//! optionally keep following live changes.

use crate::cache::ReactiveCache;
use crate::computation::Computation;
use crate::model::{BudgetReport, PeriodKey};
use crate::service::BudgetService;
use crate::store::RecordStore;
use crate::sync::ViewState;
use anyhow::{bail, Context};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn report(
    store: Arc<dyn RecordStore>,
    budget_home: &Path,
    period: PeriodKey,
    follow: bool,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(budget_home)
        .with_context(|| format!("Unable to create {}", budget_home.display()))?;
    let cache = ReactiveCache::open(budget_home.join("cache.json"));
    let key = ReactiveCache::report_key(period);

    // Mention the last known report for this period while the fresh one
    // loads.
    let cached = cache.get(&key).borrow().clone();
    if let Some(cached) = cached.as_deref() {
        match serde_json::from_str::<BudgetReport>(cached) {
            Ok(report) => info!(
                "last known report for {period}: {} entries, {} category budgets",
                report.entries.len(),
                report.category_budgets.len()
            ),
            Err(e) => warn!("ignoring unreadable cached report for {period}: {e}"),
        }
    }

    let service = BudgetService::start(store, period);

    // Wait for the first settled state.
    loop {
        match service.report() {
            ViewState::Idle | ViewState::Loading { .. } => service.changed().await,
            ViewState::Ready(report) => {
                print_report(&service, &report);
                remember(&cache, &key, &report);
                break;
            }
            ViewState::Error(e) => bail!("unable to load the report for {period}: {e}"),
            ViewState::Disposed => bail!("the report view was disposed while loading"),
        }
    }

    if follow {
        info!("following live changes for {period}; press Ctrl-C to stop");
        loop {
            service.changed().await;
            match service.report() {
                ViewState::Ready(report) => {
                    print_report(&service, &report);
                    remember(&cache, &key, &report);
                }
                ViewState::Error(e) => bail!("the live report failed: {e}"),
                _ => {}
            }
        }
    }

    service.dispose();
    Ok(())
}

/// Caches the JSON-encoded report so the next run can mention it before the
/// network answers.
fn remember(cache: &ReactiveCache, key: &str, report: &BudgetReport) {
    match serde_json::to_string(report) {
        Ok(json) => cache.set(key, json),
        Err(e) => warn!("unable to encode report for the cache: {e}"),
    }
}

fn print_report(service: &BudgetService, report: &BudgetReport) {
    let categories = service.categories();
    let computation = Computation::new(report, &categories);

    println!("Budget report for {}", service.period());
    for group in service.groups() {
        println!(
            "\n{}  (spent {} of {})",
            group.name,
            computation.group_spending(&group.id),
            computation.group_budget(&group.id),
        );
        for category in service.categories_for_group(&group.id) {
            println!(
                "  {:<24} {:>14}  of {:>14}",
                category.name,
                computation.category_spending(&category.id).to_string(),
                computation.category_budget(&category.id).to_string(),
            );
        }
    }

    println!(
        "\nExpected: earn {}, spend {}, goal {}",
        computation.expected_earning(),
        computation.expected_spending(),
        computation.goal(),
    );
    println!(
        "Actual:   earned {}, spent {}, net {}",
        computation.total_earned(),
        computation.total_spent(),
        computation.reality(),
    );
    println!(
        "Usage:    {:.1}% of budget, {} remaining",
        computation.budget_usage(),
        computation.remaining_to_spend(),
    );
}
