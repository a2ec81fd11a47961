//! Risk assessment types.
//!
//! The risk gate is a pure function of the request, a context snapshot and
//! the configured [`RiskWeights`]:
//!
//! ```text
//! amount_factor  = 1 - min(amount / amount_ceiling, 1)
//! load_factor    = 1 - clamp(network_load, 0, 1)
//! history_factor = min(completed_transfers / history_saturation, 1)
//!
//! score = Σ(w_i * factor_i) / Σ(w_i)         accepted ⇔ score ≥ threshold
//! ```
//!
//! A higher score means a safer transfer. Every assessment keeps the raw
//! inputs and the normalized factors so the audit trail can replay it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Direction, RequestId};

/// Observed context a transfer is scored against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskContext {
    /// Source network congestion in `[0, 1]`. Values outside are clamped.
    pub network_load: Decimal,
    /// Completed transfers previously made by the initiator.
    pub completed_transfers: u32,
}

impl RiskContext {
    /// Worst-case context, used when the network load cannot be observed.
    #[must_use]
    pub fn fail_closed(completed_transfers: u32) -> Self {
        Self {
            network_load: Decimal::ONE,
            completed_transfers,
        }
    }
}

/// Relative weights of the three normalized features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskWeights {
    pub amount: Decimal,
    pub network_load: Decimal,
    pub history: Decimal,
}

impl RiskWeights {
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.amount + self.network_load + self.history
    }
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            amount: Decimal::new(4, 1),
            network_load: Decimal::new(4, 1),
            history: Decimal::new(2, 1),
        }
    }
}

/// Inputs and normalized factors behind a score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFeatures {
    pub amount: Decimal,
    pub direction: Direction,
    pub network_load: Decimal,
    pub completed_transfers: u32,
    pub amount_factor: Decimal,
    pub load_factor: Decimal,
    pub history_factor: Decimal,
}

/// Outcome of the risk gate for one request. Produced exactly once per
/// request id and kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub request_id: RequestId,
    /// Safety score in `[0, 1]`.
    pub score: Decimal,
    pub threshold: Decimal,
    pub accepted: bool,
    pub features: RiskFeatures,
    pub decided_at: DateTime<Utc>,
}
