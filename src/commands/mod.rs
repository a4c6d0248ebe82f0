//! Command handlers for the budget CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod mutate;
mod report;

pub use mutate::{add_entry, delete_entry, set_budget};
pub use report::report;
