//! # Monitor subcommand
//!
//! Reconciles the simulated ledgers against the transfer records, either
//! once or on the configured interval until Ctrl-C.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use openbridge_relay::DriftReport;
use tokio::sync::watch;

use crate::{EXIT_FAILED, EXIT_OK, workspace::Workspace};

/// Arguments for `openbridge monitor`.
#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Check once and exit instead of polling.
    #[arg(long)]
    pub once: bool,
}

pub async fn run_monitor(ws: &Workspace, args: &MonitorArgs) -> Result<u8> {
    let monitor = Arc::new(ws.monitor());
    if args.once {
        let report = monitor.check_once().await?;
        print_report(&report);
        return Ok(if report.is_clean() { EXIT_OK } else { EXIT_FAILED });
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = monitor.spawn(shutdown_rx);
    tracing::info!(
        interval_secs = ws.config.monitor.poll_interval_secs,
        "monitoring, press Ctrl-C to stop"
    );
    tokio::signal::ctrl_c().await?;
    shutdown_tx.send(true)?;
    handle.await?;
    Ok(EXIT_OK)
}

fn print_report(report: &DriftReport) {
    println!("Balance check at {}", report.checked_at);
    println!("  Completed transfers: {}", report.expected.completed);
    for snapshot in &report.snapshots {
        let expected = report.expected.for_ledger(snapshot.ledger);
        println!(
            "  {}: observed {} expected {} drift {}",
            snapshot.ledger,
            snapshot.amount,
            expected,
            snapshot.amount - expected
        );
    }
    for ledger in &report.unreachable {
        println!("  {ledger}: unreachable");
    }
    for error in &report.errors {
        println!("  {error}");
    }
}
