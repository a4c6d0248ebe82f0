//! These structs provide the CLI interface for the budget CLI.

use crate::model::PeriodKey;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// The base URL the record store serves from when run locally with its
/// defaults.
pub const DEFAULT_URL: &str = "http://127.0.0.1:8090";

/// budget: a command-line client for a record-store-backed personal budget.
///
/// The program keeps a live view of one month's ledger entries and category
/// budgets against a remote record store, prints the month's report, and can
/// add, update and delete records. With `report --follow` it stays attached
/// to the store's realtime channel and re-prints as changes arrive.
///
/// Set BUDGET_SYNC_IN_MEMORY_MODE=1 to run against a seeded in-memory store
/// instead of a live backend.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the budget report for a month.
    Report(ReportArgs),
    /// Add a ledger entry to the selected month.
    Add(AddArgs),
    /// Set the budgeted amount for a category in the selected month.
    SetBudget(SetBudgetArgs),
    /// Delete a ledger entry by id.
    Delete(DeleteArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber crate
    /// for instructions.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// Base URL of the record store.
    #[arg(long, env = "BUDGET_URL", default_value = DEFAULT_URL)]
    url: String,

    /// The directory where the local report cache is held. Defaults to
    /// ~/budget
    #[arg(long, env = "BUDGET_HOME", default_value_t = default_budget_home())]
    budget_home: DisplayPath,

    /// Month to operate on, 1 through 12. Defaults to the current month.
    #[arg(long)]
    month: Option<u32>,

    /// Year to operate on. Defaults to the current year.
    #[arg(long)]
    year: Option<i32>,
}

impl Common {
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn budget_home(&self) -> &DisplayPath {
        &self.budget_home
    }

    /// The period selected by `--month`/`--year`, defaulting to now.
    pub fn period(&self) -> PeriodKey {
        let current = PeriodKey::current();
        PeriodKey {
            month: self.month.unwrap_or(current.month),
            year: self.year.unwrap_or(current.year),
        }
    }
}

/// Args for the `budget report` command.
#[derive(Debug, Parser, Clone)]
pub struct ReportArgs {
    /// Keep the realtime channel open and re-print the report as changes
    /// arrive.
    #[arg(long)]
    follow: bool,
}

impl ReportArgs {
    pub fn follow(&self) -> bool {
        self.follow
    }
}

/// Args for the `budget add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    /// The amount, e.g. "12.34". A dollar sign and commas are accepted.
    #[arg(long)]
    amount: String,

    /// The category to post the entry to, by id or by name.
    #[arg(long)]
    category: String,

    /// An optional note stored with the entry.
    #[arg(long)]
    comment: Option<String>,
}

impl AddArgs {
    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

/// Args for the `budget set-budget` command.
#[derive(Debug, Parser, Clone)]
pub struct SetBudgetArgs {
    /// The category to budget, by id or by name.
    #[arg(long)]
    category: String,

    /// The budgeted amount, e.g. "450.00".
    #[arg(long)]
    amount: String,
}

impl SetBudgetArgs {
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }
}

/// Args for the `budget delete` command.
#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    /// The id of the entry to delete.
    id: String,
}

impl DeleteArgs {
    pub fn id(&self) -> &str {
        &self.id
    }
}

fn default_budget_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("budget"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --budget-home or BUDGET_HOME instead of relying on the default \
                budget home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("budget")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
