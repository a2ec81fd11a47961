//! # Transfer subcommands
//!
//! `submit`, `status`, `list`, `cancel`, `release` and `fund`. Each opens the
//! state directory, runs one orchestrator operation, persists the simulated
//! ledgers and returns the process exit code.

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use openbridge_relay::LedgerAdapter;
use openbridge_types::{
    Direction, LedgerId, RequestId, SignedTransfer, TransferRecord, TransferRequest,
};
use rust_decimal::Decimal;

use crate::{
    EXIT_OK, exit_code,
    workspace::{CUSTODY_LABEL, Workspace, account},
};

/// Arguments for `openbridge submit`.
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Initiator account label.
    #[arg(long)]
    pub from: String,
    /// Amount to move, before fees.
    #[arg(long)]
    pub amount: Decimal,
    /// `s2d` (lock and mint) or `d2s` (burn and release).
    #[arg(long, default_value = "s2d")]
    pub direction: Direction,
    /// Client-chosen request id; generated when omitted. Re-submitting an id
    /// replays the original transfer.
    #[arg(long)]
    pub id: Option<String>,
    /// Stop after risk assessment and routing, without touching a ledger.
    #[arg(long)]
    pub prepare_only: bool,
}

/// Arguments for `openbridge status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Request id.
    pub id: String,
    /// Drive the transfer further if it is not terminal.
    #[arg(long)]
    pub resume: bool,
    /// Initiator label, needed to sign when resuming a `s2d` transfer.
    #[arg(long)]
    pub from: Option<String>,
}

/// Arguments for `openbridge list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only transfers halted for manual reconciliation.
    #[arg(long, conflicts_with = "pending")]
    pub halted: bool,
    /// Only `d2s` transfers waiting for the custodial release.
    #[arg(long)]
    pub pending: bool,
}

/// Arguments for `openbridge cancel`.
#[derive(Args, Debug)]
pub struct CancelArgs {
    /// Request id.
    pub id: String,
}

/// Arguments for `openbridge release`.
#[derive(Args, Debug)]
pub struct ReleaseArgs {
    /// Request id of a `d2s` transfer awaiting release.
    pub id: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LedgerArg {
    Source,
    Dest,
}

impl From<LedgerArg> for LedgerId {
    fn from(arg: LedgerArg) -> Self {
        match arg {
            LedgerArg::Source => Self::Source,
            LedgerArg::Dest => Self::Destination,
        }
    }
}

/// Arguments for `openbridge fund`.
#[derive(Args, Debug)]
pub struct FundArgs {
    /// Account label to credit.
    #[arg(long)]
    pub account: String,
    /// Amount to credit.
    #[arg(long)]
    pub amount: Decimal,
    /// Ledger to credit. Destination credits count as opening supply.
    #[arg(long, value_enum, default_value = "source")]
    pub ledger: LedgerArg,
    /// Also set the simulated source network load, in `[0, 1]`.
    #[arg(long)]
    pub network_load: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn run_submit(ws: &Workspace, args: &SubmitArgs, json: bool) -> Result<u8> {
    let initiator = account(&args.from);
    let request = match &args.id {
        Some(raw) => TransferRequest::with_id(
            RequestId::parse(raw)?,
            args.direction,
            args.amount,
            initiator,
        ),
        None => TransferRequest::new(args.direction, args.amount, initiator),
    };
    let orchestrator = ws.orchestrator(&[args.from.as_str()])?;
    let outcome = if args.prepare_only {
        orchestrator.prepare(request).await
    } else {
        orchestrator.submit(request).await
    };
    ws.save()?;
    let record = outcome?;
    print_record(&record, json)?;
    Ok(exit_code(record.status))
}

pub async fn run_status(ws: &Workspace, args: &StatusArgs, json: bool) -> Result<u8> {
    let id = RequestId::parse(&args.id)?;
    let labels: Vec<&str> = args.from.as_deref().into_iter().collect();
    let orchestrator = ws.orchestrator(&labels)?;
    let record = if args.resume {
        let record = orchestrator.resume(&id).await;
        ws.save()?;
        record?
    } else {
        orchestrator.record(&id)?
    };
    print_record(&record, json)?;
    Ok(exit_code(record.status))
}

pub fn run_list(ws: &Workspace, args: &ListArgs, json: bool) -> Result<u8> {
    let orchestrator = ws.orchestrator(&[])?;
    let records = if args.halted {
        orchestrator.halted_records()?
    } else if args.pending {
        orchestrator.pending_releases()?
    } else {
        orchestrator.records()?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(EXIT_OK);
    }
    if records.is_empty() {
        println!("No transfers found.");
        return Ok(EXIT_OK);
    }
    println!("Transfers ({}):", records.len());
    for record in &records {
        println!(
            "  {:<40} {:<16} {:<18} {:>16} {}",
            record.id(),
            record.request.direction,
            record.status,
            record.request.amount,
            record.request.initiator.short()
        );
    }
    Ok(EXIT_OK)
}

pub async fn run_cancel(ws: &Workspace, args: &CancelArgs, json: bool) -> Result<u8> {
    let id = RequestId::parse(&args.id)?;
    let record = ws.orchestrator(&[])?.cancel(&id).await?;
    print_record(&record, json)?;
    Ok(exit_code(record.status))
}

/// Play the custodian: pay the net amount from custody back to the
/// initiator on the source ledger, then confirm the release.
pub async fn run_release(ws: &Workspace, args: &ReleaseArgs, json: bool) -> Result<u8> {
    let id = RequestId::parse(&args.id)?;
    let orchestrator = ws.orchestrator(&[])?;
    let record = orchestrator.record(&id)?;
    if record.request.direction != Direction::DestToSource || !record.awaiting_release {
        bail!("transfer {id} is {} and not awaiting release", record.status);
    }
    let net = record
        .net_amount()
        .context("transfer has no route selection")?;

    let custody = &ws.config.custody_account;
    if *custody != account(CUSTODY_LABEL) {
        bail!("custody account is not a development key; release it on the ledger and run `status --resume`");
    }
    let state = ws.ledger.load_account(custody).await?;
    let signed = SignedTransfer::sign(
        &openbridge_relay::Keyring::dev_key(CUSTODY_LABEL),
        id.clone(),
        record.request.initiator.clone(),
        net,
        state.next_sequence(),
    );
    let tx = ws.ledger.submit_signed_transfer(&signed).await?;
    tracing::info!(request_id = %id, tx = %tx, %net, "custodial release submitted");

    let outcome = orchestrator.confirm_source_release(&id, tx).await;
    ws.save()?;
    let record = outcome?;
    print_record(&record, json)?;
    Ok(exit_code(record.status))
}

pub async fn run_fund(ws: &Workspace, args: &FundArgs) -> Result<u8> {
    if args.amount <= Decimal::ZERO {
        bail!("amount must be positive, got {}", args.amount);
    }
    let target = account(&args.account);
    let balance = match LedgerId::from(args.ledger) {
        LedgerId::Source => {
            ws.ledger.fund(&target, args.amount);
            ws.ledger.balance(&target).await?
        }
        LedgerId::Destination => {
            ws.bridge.credit(&target, args.amount);
            ws.bridge.balance_of(&target)
        }
    };
    if let Some(load) = args.network_load {
        if !(Decimal::ZERO..=Decimal::ONE).contains(&load) {
            bail!("network load must be within [0, 1], got {load}");
        }
        ws.ledger.set_network_load(load);
    }
    ws.save()?;
    println!("{} ({}) balance: {balance}", args.account, target.short());
    Ok(EXIT_OK)
}

fn print_record(record: &TransferRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }
    println!("Transfer: {}", record.id());
    println!("  Direction: {}", record.request.direction);
    println!("  Status: {}", record.status);
    println!("  Amount: {}", record.request.amount);
    println!("  Initiator: {}", record.request.initiator);
    if let Some(assessment) = &record.assessment {
        println!(
            "  Risk: score {} / threshold {} ({})",
            assessment.score,
            assessment.threshold,
            if assessment.accepted { "accepted" } else { "rejected" }
        );
    }
    if let Some(selection) = &record.selection {
        println!(
            "  Route: {} (fee {} at rate {}, net {})",
            selection.route, selection.fee, selection.fee_rate, selection.net_amount
        );
    }
    if let Some(tx) = &record.source_tx {
        println!("  Source tx: {tx}");
    }
    if let Some(tx) = &record.dest_tx {
        println!("  Destination tx: {tx}");
    }
    if record.awaiting_release {
        println!("  Awaiting custodial release on the source ledger");
    }
    if let Some(reason) = &record.failure {
        println!("  Failure: {reason}");
    }
    for change in &record.history {
        println!("    {} at {}", change.status, change.at);
    }
    Ok(())
}
