//! # openbridge CLI entry point
//!
//! Parses command-line arguments, opens the state directory and dispatches
//! to the subcommand handlers.

use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use openbridge_cli::{
    EXIT_FAILED,
    monitor::{MonitorArgs, run_monitor},
    transfer::{
        CancelArgs, FundArgs, ListArgs, ReleaseArgs, StatusArgs, SubmitArgs, run_cancel,
        run_fund, run_list, run_release, run_status, run_submit,
    },
    workspace::Workspace,
};

/// OpenBridge: custodial cross-chain bridge orchestrator.
///
/// Submits transfers through the risk gate and route optimizer, drives them
/// across the source and destination ledgers, and reconciles balances.
#[derive(Parser, Debug)]
#[command(name = "openbridge", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// State directory holding records, audit journal and ledger snapshots.
    #[arg(long, global = true, default_value = ".openbridge")]
    state_dir: PathBuf,

    /// Path to a JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print records as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit a transfer and drive it as far as possible.
    Submit(SubmitArgs),

    /// Show a transfer, optionally resuming it.
    Status(StatusArgs),

    /// List transfers.
    List(ListArgs),

    /// Cancel a transfer before any ledger mutation.
    Cancel(CancelArgs),

    /// Release funds from custody for a transfer awaiting release.
    Release(ReleaseArgs),

    /// Credit an account on a simulated ledger.
    Fund(FundArgs),

    /// Reconcile ledger balances against completed transfers.
    Monitor(MonitorArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::debug!(state_dir = %cli.state_dir.display(), "openbridge starting");

    let ws = match Workspace::open(&cli.state_dir, cli.config.as_deref()) {
        Ok(ws) => ws,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(EXIT_FAILED);
        }
    };

    let result = match &cli.command {
        Commands::Submit(args) => run_submit(&ws, args, cli.json).await,
        Commands::Status(args) => run_status(&ws, args, cli.json).await,
        Commands::List(args) => run_list(&ws, args, cli.json),
        Commands::Cancel(args) => run_cancel(&ws, args, cli.json).await,
        Commands::Release(args) => run_release(&ws, args, cli.json).await,
        Commands::Fund(args) => run_fund(&ws, args).await,
        Commands::Monitor(args) => run_monitor(&ws, args).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_FAILED)
        }
    }
}
