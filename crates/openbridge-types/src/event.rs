//! Structured bridge events.
//!
//! The orchestrator and the balance monitor publish every notable outcome as
//! a [`BridgeEvent`]. Operator tooling subscribes to these instead of
//! scraping logs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, Direction, LedgerId, RequestId, RiskFeatures, TransferStatus, TxRef};

/// Something that happened to a transfer or a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// The request failed validation; no record was created.
    TransferInvalid { request_id: String, reason: String },
    /// The risk gate accepted the transfer.
    TransferAccepted { request_id: RequestId, score: Decimal },
    /// The risk gate rejected the transfer.
    TransferRejected {
        request_id: RequestId,
        score: Decimal,
        threshold: Decimal,
        features: RiskFeatures,
    },
    RouteSelected {
        request_id: RequestId,
        route: String,
        fee: Decimal,
        net_amount: Decimal,
    },
    /// A mutation landed on one of the ledgers.
    MutationConfirmed {
        request_id: RequestId,
        ledger: LedgerId,
        tx: TxRef,
    },
    /// `DestToSource`: the burn is confirmed and the custodian must release
    /// `amount` to `account` on the source ledger.
    ReleaseRequested {
        request_id: RequestId,
        account: AccountId,
        amount: Decimal,
    },
    TransferCompleted {
        request_id: RequestId,
        direction: Direction,
        net_amount: Decimal,
    },
    TransferCancelled { request_id: RequestId },
    TransferFailed { request_id: RequestId, reason: String },
    /// One side committed and the other could not be. Needs an operator.
    TransferHalted {
        request_id: RequestId,
        status_before: TransferStatus,
        reason: String,
    },
    /// Observed balance differs from expected by more than the tolerance.
    DriftDetected {
        ledger: LedgerId,
        expected: Decimal,
        observed: Decimal,
        drift: Decimal,
        observed_at: DateTime<Utc>,
    },
    /// The monitor could not observe a ledger this tick.
    LedgerUnreachable { ledger: LedgerId, reason: String },
}

impl BridgeEvent {
    /// Short event name, for log lines and metrics labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TransferInvalid { .. } => "transfer_invalid",
            Self::TransferAccepted { .. } => "transfer_accepted",
            Self::TransferRejected { .. } => "transfer_rejected",
            Self::RouteSelected { .. } => "route_selected",
            Self::MutationConfirmed { .. } => "mutation_confirmed",
            Self::ReleaseRequested { .. } => "release_requested",
            Self::TransferCompleted { .. } => "transfer_completed",
            Self::TransferCancelled { .. } => "transfer_cancelled",
            Self::TransferFailed { .. } => "transfer_failed",
            Self::TransferHalted { .. } => "transfer_halted",
            Self::DriftDetected { .. } => "drift_detected",
            Self::LedgerUnreachable { .. } => "ledger_unreachable",
        }
    }

    /// The transfer this event concerns, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            Self::TransferAccepted { request_id, .. }
            | Self::TransferRejected { request_id, .. }
            | Self::RouteSelected { request_id, .. }
            | Self::MutationConfirmed { request_id, .. }
            | Self::ReleaseRequested { request_id, .. }
            | Self::TransferCompleted { request_id, .. }
            | Self::TransferCancelled { request_id }
            | Self::TransferFailed { request_id, .. }
            | Self::TransferHalted { request_id, .. } => Some(request_id),
            Self::TransferInvalid { .. }
            | Self::DriftDetected { .. }
            | Self::LedgerUnreachable { .. } => None,
        }
    }
}
