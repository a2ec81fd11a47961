//! Risk gate: hard admission check before any chain mutation.
//!
//! The gate scores a proposed transfer from its amount, the source network
//! load and the initiator's history, then accepts it iff the score reaches
//! the configured threshold. See [`openbridge_types::risk`] for the formula.
//!
//! ## Design Principles
//!
//! - **Deterministic**: same inputs and weights, same score
//! - **Fail-closed**: callers pass [`RiskContext::fail_closed`] when the
//!   network load cannot be observed
//! - **Audited**: every decision is appended to the [`AuditLog`] exactly once

use std::sync::Arc;

use chrono::Utc;
use openbridge_types::{
    Direction, RequestId, Result, RiskAssessment, RiskConfig, RiskContext, RiskFeatures,
    constants,
};
use rust_decimal::Decimal;

use crate::AuditLog;

/// Configured scorer plus the audit log it writes to.
pub struct RiskGate {
    config: RiskConfig,
    audit: Arc<AuditLog>,
}

impl RiskGate {
    #[must_use]
    pub fn new(config: RiskConfig, audit: Arc<AuditLog>) -> Self {
        Self { config, audit }
    }

    #[must_use]
    pub fn threshold(&self) -> Decimal {
        self.config.threshold
    }

    #[must_use]
    pub fn audit_log(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    /// Score a transfer without recording anything.
    #[must_use]
    pub fn score(
        &self,
        amount: Decimal,
        direction: Direction,
        context: RiskContext,
    ) -> (Decimal, RiskFeatures) {
        let amount_factor = Decimal::ONE - (amount / self.config.amount_ceiling).min(Decimal::ONE);
        let load_factor = Decimal::ONE - context.network_load.clamp(Decimal::ZERO, Decimal::ONE);
        let history_factor = (Decimal::from(context.completed_transfers)
            / Decimal::from(self.config.history_saturation))
        .min(Decimal::ONE);

        let w = &self.config.weights;
        let weighted = w.amount * amount_factor
            + w.network_load * load_factor
            + w.history * history_factor;
        let score = (weighted / w.total())
            .clamp(Decimal::ZERO, Decimal::ONE)
            .round_dp(constants::SCORE_PRECISION);

        let features = RiskFeatures {
            amount,
            direction,
            network_load: context.network_load,
            completed_transfers: context.completed_transfers,
            amount_factor,
            load_factor,
            history_factor,
        };
        (score, features)
    }

    /// Assess a transfer and record the decision.
    ///
    /// A rejection is an `Ok` assessment with `accepted == false`; the caller
    /// decides what rejection means for the transfer.
    ///
    /// # Errors
    /// Returns [`openbridge_types::BridgeError::DuplicateAssessment`] if the
    /// request id was already assessed, or a storage error from the journal.
    pub fn evaluate(
        &self,
        request_id: &RequestId,
        amount: Decimal,
        direction: Direction,
        context: RiskContext,
    ) -> Result<RiskAssessment> {
        let (score, features) = self.score(amount, direction, context);
        let threshold = self.config.threshold;
        let accepted = score >= threshold;
        let assessment = RiskAssessment {
            request_id: request_id.clone(),
            score,
            threshold,
            accepted,
            features,
            decided_at: Utc::now(),
        };
        self.audit.append(assessment.clone())?;

        if accepted {
            tracing::info!(
                request_id = %request_id,
                %score,
                %threshold,
                "risk gate accepted transfer"
            );
        } else {
            tracing::warn!(
                request_id = %request_id,
                %score,
                %threshold,
                amount_factor = %assessment.features.amount_factor,
                load_factor = %assessment.features.load_factor,
                history_factor = %assessment.features.history_factor,
                "risk gate rejected transfer"
            );
        }
        Ok(assessment)
    }
}
