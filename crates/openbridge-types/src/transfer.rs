//! Transfer request and record types.
//!
//! ## State Machine
//!
//! ```text
//!   CREATED ──▶ RISK_ASSESSED ──▶ ROUTE_SELECTED ──▶ SOURCE_SIDE_DONE ──▶ DEST_SIDE_DONE ──▶ COMPLETED
//!      │              │  │              │                    │                   │
//!      │              │  └──▶ REJECTED  │                    │                   │
//!      └──────────────┴─────────────────┴──▶ CANCELLED       │                   │
//!   any in-flight state ──────────────────────────────────▶ FAILED | HALTED ◀───┘
//! ```
//!
//! Forward transitions advance exactly one step, so a `COMPLETED` record has
//! necessarily passed through every intermediate state in order. Terminal
//! states never transition again.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    AccountId, BridgeError, RequestId, Result, RiskAssessment, RouteSelection, TxRef, constants,
};

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Which way value moves across the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Lock on the source ledger, mint on the destination ledger.
    SourceToDest,
    /// Burn on the destination ledger, release on the source ledger.
    DestToSource,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceToDest => write!(f, "SOURCE_TO_DEST"),
            Self::DestToSource => write!(f, "DEST_TO_SOURCE"),
        }
    }
}

impl FromStr for Direction {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "source-to-dest" | "s2d" => Ok(Self::SourceToDest),
            "dest-to-source" | "d2s" => Ok(Self::DestToSource),
            other => Err(BridgeError::Validation {
                request_id: String::new(),
                reason: format!("unrecognized direction '{other}'"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// TransferRequest
// ---------------------------------------------------------------------------

/// A client's request to move `amount` across the bridge.
///
/// Immutable once accepted: the orchestrator stores it verbatim inside the
/// [`TransferRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub id: RequestId,
    pub direction: Direction,
    pub amount: Decimal,
    /// Account whose funds move. The same key controls it on both ledgers.
    pub initiator: AccountId,
    pub created_at: DateTime<Utc>,
}

impl TransferRequest {
    /// Create a request with a freshly generated id.
    #[must_use]
    pub fn new(direction: Direction, amount: Decimal, initiator: AccountId) -> Self {
        Self::with_id(RequestId::new(), direction, amount, initiator)
    }

    /// Create a request with a client-supplied id.
    #[must_use]
    pub fn with_id(
        id: RequestId,
        direction: Direction,
        amount: Decimal,
        initiator: AccountId,
    ) -> Self {
        Self {
            id,
            direction,
            amount,
            initiator,
            created_at: Utc::now(),
        }
    }

    /// Structural validation.
    ///
    /// # Errors
    /// Returns [`BridgeError::Validation`] for non-positive amounts, amounts
    /// with more than [`constants::AMOUNT_PRECISION`] decimal places, amounts
    /// above `max_amount`, or an empty initiator.
    pub fn validate(&self, max_amount: Option<Decimal>) -> Result<()> {
        let invalid = |reason: String| BridgeError::Validation {
            request_id: self.id.to_string(),
            reason,
        };
        if self.amount <= Decimal::ZERO {
            return Err(invalid(format!("amount must be positive, got {}", self.amount)));
        }
        if self.amount.normalize().scale() > constants::AMOUNT_PRECISION {
            return Err(invalid(format!(
                "amount {} has more than {} decimal places",
                self.amount,
                constants::AMOUNT_PRECISION
            )));
        }
        if let Some(max) = max_amount {
            if self.amount > max {
                return Err(invalid(format!(
                    "amount {} exceeds maximum {max}",
                    self.amount
                )));
            }
        }
        if self.initiator.is_empty() {
            return Err(invalid("initiator account must not be empty".to_string()));
        }
        Ok(())
    }

    /// Two requests with the same id are replays only if every parameter
    /// except the creation time agrees.
    #[must_use]
    pub fn same_parameters(&self, other: &Self) -> bool {
        self.id == other.id
            && self.direction == other.direction
            && self.amount == other.amount
            && self.initiator == other.initiator
    }
}

// ---------------------------------------------------------------------------
// TransferStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferStatus {
    /// Request validated and recorded.
    Created,
    /// The risk gate produced an assessment that accepted the transfer.
    RiskAssessed,
    /// The risk gate rejected the transfer. Terminal; no chain mutation.
    Rejected,
    /// Route, fee and net amount are fixed on the record.
    RouteSelected,
    /// The first-side mutation (lock or burn) is confirmed.
    SourceSideDone,
    /// The second-side mutation (mint or release) is confirmed.
    DestSideDone,
    /// Both sides confirmed. Terminal.
    Completed,
    /// Cancelled before any chain mutation was submitted. Terminal.
    Cancelled,
    /// Gave up with no irreversible mutation committed. Terminal.
    Failed,
    /// One side committed, the other could not be. Terminal; requires
    /// manual reconciliation.
    Halted,
}

impl TransferStatus {
    /// Whether the record will never change again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::Completed | Self::Cancelled | Self::Failed | Self::Halted
        )
    }

    /// Whether a chain mutation may already have been issued.
    #[must_use]
    pub fn is_cancellable(self) -> bool {
        matches!(self, Self::Created | Self::RiskAssessed | Self::RouteSelected)
    }

    /// The next state on the happy path, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Created => Some(Self::RiskAssessed),
            Self::RiskAssessed => Some(Self::RouteSelected),
            Self::RouteSelected => Some(Self::SourceSideDone),
            Self::SourceSideDone => Some(Self::DestSideDone),
            Self::DestSideDone => Some(Self::Completed),
            _ => None,
        }
    }

    /// Can a record in this state move to `target`?
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match target {
            Self::Rejected => self == Self::RiskAssessed,
            Self::Cancelled => self.is_cancellable(),
            Self::Failed | Self::Halted => true,
            _ => self.next() == Some(target),
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::RiskAssessed => write!(f, "RISK_ASSESSED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::RouteSelected => write!(f, "ROUTE_SELECTED"),
            Self::SourceSideDone => write!(f, "SOURCE_SIDE_DONE"),
            Self::DestSideDone => write!(f, "DEST_SIDE_DONE"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Halted => write!(f, "HALTED"),
        }
    }
}

// ---------------------------------------------------------------------------
// TransferRecord
// ---------------------------------------------------------------------------

/// One entry of a record's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: TransferStatus,
    pub at: DateTime<Utc>,
}

/// The single source of truth for a transfer's progress.
///
/// `source_tx` and `dest_tx` name the ledger the transaction landed on, not
/// the leg: for `DestToSource` the burn is `dest_tx` and the release is
/// `source_tx`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub request: TransferRequest,
    pub status: TransferStatus,
    pub assessment: Option<RiskAssessment>,
    pub selection: Option<RouteSelection>,
    pub source_tx: Option<TxRef>,
    pub dest_tx: Option<TxRef>,
    /// Adapter calls issued on behalf of this transfer, retries included.
    pub attempts: u32,
    /// Why the record is `Failed` or `Halted`.
    pub failure: Option<String>,
    /// Set (by compare-and-swap) right before the first chain mutation is
    /// submitted. Once set the transfer can no longer be cancelled.
    pub mutation_submitted_at: Option<DateTime<Utc>>,
    /// `DestToSource` only: the burn is confirmed and the source-side
    /// release is pending external confirmation.
    pub awaiting_release: bool,
    pub history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransferRecord {
    /// A fresh record in `Created`.
    #[must_use]
    pub fn new(request: TransferRequest) -> Self {
        let now = Utc::now();
        Self {
            request,
            status: TransferStatus::Created,
            assessment: None,
            selection: None,
            source_tx: None,
            dest_tx: None,
            attempts: 0,
            failure: None,
            mutation_submitted_at: None,
            awaiting_release: false,
            history: vec![StatusChange {
                status: TransferStatus::Created,
                at: now,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn id(&self) -> &RequestId {
        &self.request.id
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `target`, recording the change in the history.
    ///
    /// # Errors
    /// Returns [`BridgeError::InvalidTransition`] if the move is not allowed.
    pub fn advance(&mut self, target: TransferStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(BridgeError::InvalidTransition {
                request_id: self.request.id.to_string(),
                from: self.status,
                to: target,
            });
        }
        let now = Utc::now();
        self.status = target;
        self.history.push(StatusChange {
            status: target,
            at: now,
        });
        self.updated_at = now;
        Ok(())
    }

    /// Move to a terminal failure state with a reason.
    pub fn fail(&mut self, target: TransferStatus, reason: impl Into<String>) -> Result<()> {
        debug_assert!(matches!(
            target,
            TransferStatus::Failed | TransferStatus::Halted
        ));
        self.advance(target)?;
        self.failure = Some(reason.into());
        Ok(())
    }

    /// Fee charged, once a route is selected.
    #[must_use]
    pub fn fee(&self) -> Option<Decimal> {
        self.selection.as_ref().map(|s| s.fee)
    }

    /// Amount delivered on the other side, once a route is selected.
    #[must_use]
    pub fn net_amount(&self) -> Option<Decimal> {
        self.selection.as_ref().map(|s| s.net_amount)
    }

    /// Statuses visited, in order.
    #[must_use]
    pub fn visited(&self) -> Vec<TransferStatus> {
        self.history.iter().map(|c| c.status).collect()
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl TransferRequest {
    /// A request from a throwaway initiator.
    pub fn dummy(direction: Direction, amount: Decimal) -> Self {
        Self::new(direction, amount, AccountId::new("dummy-initiator"))
    }
}
