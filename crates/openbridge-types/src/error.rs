//! Error types for the OpenBridge orchestrator.
//!
//! All errors use the `OB_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Request validation errors
//! - 2xx: Risk gate errors
//! - 3xx: Route / fee errors
//! - 4xx: Transfer lifecycle errors
//! - 5xx: Network / adapter errors
//! - 6xx: Consistency errors (reconciliation)
//! - 7xx: Storage errors
//! - 9xx: Configuration / internal errors
//!
//! Every variant raised on behalf of a transfer carries its request id so
//! operator tooling can correlate it with the risk audit log and the
//! transfer record history.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{LedgerId, TransferStatus};

/// Central error enum for all OpenBridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// The request failed validation (bad amount, unknown direction,
    /// reused id with different parameters). Never retried.
    #[error("OB_ERR_100: Invalid request {request_id}: {reason}")]
    Validation { request_id: String, reason: String },

    // =================================================================
    // Risk Errors (2xx)
    // =================================================================
    /// The risk gate rejected the transfer. A business outcome, not a
    /// system fault.
    #[error("OB_ERR_200: Transfer {request_id} rejected by risk gate: score {score} < threshold {threshold}")]
    RiskRejected {
        request_id: String,
        score: Decimal,
        threshold: Decimal,
    },

    /// The audit log already holds an assessment for this request id.
    #[error("OB_ERR_201: Risk assessment already recorded for {request_id}")]
    DuplicateAssessment { request_id: String },

    // =================================================================
    // Route Errors (3xx)
    // =================================================================
    /// No route could be selected (empty route table).
    #[error("OB_ERR_300: No route available for {request_id}")]
    NoRouteAvailable { request_id: String },

    // =================================================================
    // Lifecycle Errors (4xx)
    // =================================================================
    /// No record exists for this request id.
    #[error("OB_ERR_400: Transfer not found: {request_id}")]
    TransferNotFound { request_id: String },

    /// Cancellation was requested after a chain mutation was submitted.
    #[error("OB_ERR_401: Transfer {request_id} cannot be cancelled in {status}")]
    NotCancellable {
        request_id: String,
        status: TransferStatus,
    },

    /// A state transition that would move a record backwards.
    #[error("OB_ERR_402: Invalid transition for {request_id}: {from} -> {to}")]
    InvalidTransition {
        request_id: String,
        from: TransferStatus,
        to: TransferStatus,
    },

    // =================================================================
    // Network Errors (5xx)
    // =================================================================
    /// A ledger could not be reached within the retry budget.
    #[error("OB_ERR_500: Network error on {ledger} for {request_id}: {reason}")]
    Network {
        request_id: String,
        ledger: LedgerId,
        reason: String,
    },

    // =================================================================
    // Consistency Errors (6xx)
    // =================================================================
    /// Observed chain state disagrees with the records. Surfaced to an
    /// operator, never auto-resolved.
    #[error("OB_ERR_600: Consistency error on {ledger}: {reason}")]
    Consistency { ledger: LedgerId, reason: String },

    // =================================================================
    // Storage Errors (7xx)
    // =================================================================
    /// A compare-and-swap lost against a concurrent writer.
    #[error("OB_ERR_700: Concurrent modification of {request_id}: expected version {expected}, found {actual}")]
    ConcurrentModification {
        request_id: String,
        expected: u64,
        actual: u64,
    },

    /// The record store failed.
    #[error("OB_ERR_701: Storage error: {0}")]
    Storage(String),

    // =================================================================
    // Configuration / Internal (9xx)
    // =================================================================
    /// Invalid route table or missing adapter configuration. Aborts startup.
    #[error("OB_ERR_900: Fatal configuration error: {0}")]
    FatalConfig(String),

    /// Serialization / deserialization error.
    #[error("OB_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Unrecoverable internal error.
    #[error("OB_ERR_902: Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// The request id this error was raised for, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Validation { request_id, .. }
            | Self::RiskRejected { request_id, .. }
            | Self::DuplicateAssessment { request_id }
            | Self::NoRouteAvailable { request_id }
            | Self::TransferNotFound { request_id }
            | Self::NotCancellable { request_id, .. }
            | Self::InvalidTransition { request_id, .. }
            | Self::Network { request_id, .. }
            | Self::ConcurrentModification { request_id, .. } => Some(request_id),
            _ => None,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, BridgeError>;

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// AdapterError
// ---------------------------------------------------------------------------

/// Failure reported by a ledger adapter.
///
/// Only [`AdapterError::is_retryable`] failures are retried by the
/// orchestrator; everything else is classified immediately.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// Transient transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// The local wait expired. The operation may still land.
    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    /// The submitted sequence number was not the next one for the account.
    #[error("sequence conflict: expected {expected}, got {submitted}")]
    SequenceConflict { expected: u64, submitted: u64 },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("signature verification failed")]
    SignatureInvalid,
}

impl AdapterError {
    /// Timeouts, transport errors and stale sequence numbers are worth
    /// another attempt; everything else is permanent.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::SequenceConflict { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = BridgeError::TransferNotFound {
            request_id: "req-1".into(),
        };
        let msg = format!("{err}");
        assert!(msg.starts_with("OB_ERR_400"), "Got: {msg}");
        assert!(msg.contains("req-1"));
    }

    #[test]
    fn risk_rejected_display() {
        let err = BridgeError::RiskRejected {
            request_id: "req-2".into(),
            score: Decimal::new(4, 1),
            threshold: Decimal::new(7, 1),
        };
        let msg = format!("{err}");
        assert!(msg.contains("OB_ERR_200"));
        assert!(msg.contains("0.4"));
        assert!(msg.contains("0.7"));
    }

    #[test]
    fn not_cancellable_display() {
        let err = BridgeError::NotCancellable {
            request_id: "req-3".into(),
            status: TransferStatus::SourceSideDone,
        };
        let msg = format!("{err}");
        assert!(msg.contains("OB_ERR_401"));
        assert!(msg.contains("SOURCE_SIDE_DONE"));
    }

    #[test]
    fn all_errors_have_ob_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(BridgeError::FatalConfig("no routes".into())),
            Box::new(BridgeError::Storage("disk".into())),
            Box::new(BridgeError::Consistency {
                ledger: LedgerId::Source,
                reason: "drift".into(),
            }),
            Box::new(BridgeError::ConcurrentModification {
                request_id: "r".into(),
                expected: 1,
                actual: 2,
            }),
            Box::new(BridgeError::Internal("test".into())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("OB_ERR_"),
                "Error missing OB_ERR_ prefix: {msg}"
            );
        }
    }

    #[test]
    fn request_id_is_carried() {
        let err = BridgeError::Network {
            request_id: "req-9".into(),
            ledger: LedgerId::Destination,
            reason: "down".into(),
        };
        assert_eq!(err.request_id(), Some("req-9"));
        assert_eq!(BridgeError::Internal("x".into()).request_id(), None);
    }

    #[test]
    fn retryable_classification() {
        assert!(AdapterError::Network("reset".into()).is_retryable());
        assert!(AdapterError::Timeout(100).is_retryable());
        assert!(
            AdapterError::SequenceConflict {
                expected: 2,
                submitted: 1
            }
            .is_retryable()
        );
        assert!(!AdapterError::InvalidAmount("zero".into()).is_retryable());
        assert!(!AdapterError::SignatureInvalid.is_retryable());
        assert!(
            !AdapterError::InsufficientFunds {
                needed: Decimal::ONE,
                available: Decimal::ZERO
            }
            .is_retryable()
        );
    }
}
