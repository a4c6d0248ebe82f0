use budget_sync::args::{Args, Command};
use budget_sync::store::{record_store, Mode};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> anyhow::Result<()> {
    trace!("{args:?}");
    let common = args.common();

    // This allows for running the program without a live record store. When
    // BUDGET_SYNC_IN_MEMORY_MODE is set and non-zero in length, then the mode
    // will be Mode::Memory, otherwise it will be Mode::Remote.
    let mode = Mode::from_env();
    let store = record_store(common.url(), mode)?;
    let period = common.period();

    // Route to the appropriate command handler
    let _: () = match args.command() {
        Command::Report(report_args) => {
            budget_sync::commands::report(
                store,
                common.budget_home().path(),
                period,
                report_args.follow(),
            )
            .await?
        }

        Command::Add(add_args) => {
            budget_sync::commands::add_entry(
                store,
                period,
                add_args.amount(),
                add_args.category(),
                add_args.comment(),
            )
            .await?
        }

        Command::SetBudget(set_args) => {
            budget_sync::commands::set_budget(store, period, set_args.category(), set_args.amount())
                .await?
        }

        Command::Delete(delete_args) => {
            budget_sync::commands::delete_entry(store, delete_args.id()).await?
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
