//! Bounded retries for adapter mutations.
//!
//! Each attempt is bounded by the policy's call timeout. After a retryable
//! failure the chain is probed by request id before anything is resubmitted:
//! a mutation whose response was lost is adopted, not repeated. A probe that
//! itself fails, or any attempt that timed out, leaves the outcome unknown,
//! which callers must treat as "may have landed".

use std::future::Future;

use openbridge_types::{AdapterError, RequestId, RetryPolicy, TxRef};

use crate::ports::AdapterResult;

/// A mutation that is known to have landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Landed {
    pub tx: TxRef,
    /// Adapter calls made, probes excluded.
    pub attempts: u32,
    /// Found by a probe rather than returned by a submission.
    pub adopted: bool,
}

/// A mutation that did not land, or whose fate could not be established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotLanded {
    pub error: AdapterError,
    pub attempts: u32,
    /// An attempt timed out or the last probe failed, so the mutation may
    /// still land.
    pub uncertain: bool,
}

/// Run `call` under `policy`, probing with `probe` between attempts.
///
/// When `probe_first` is set the chain is probed before the first attempt,
/// for transfers resumed after a mutation was already submitted.
pub async fn submit_with_retry<C, CF, P, PF>(
    policy: &RetryPolicy,
    operation: &'static str,
    request_id: &RequestId,
    probe_first: bool,
    call: C,
    probe: P,
) -> Result<Landed, NotLanded>
where
    C: Fn() -> CF,
    CF: Future<Output = AdapterResult<TxRef>>,
    P: Fn() -> PF,
    PF: Future<Output = AdapterResult<Option<TxRef>>>,
{
    let timeout = policy.call_timeout();
    let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);

    if probe_first {
        match bounded(timeout, timeout_ms, probe()).await {
            Ok(Some(tx)) => {
                tracing::info!(request_id = %request_id, operation, tx = %tx, "adopted prior transaction");
                return Ok(Landed {
                    tx,
                    attempts: 0,
                    adopted: true,
                });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(request_id = %request_id, operation, error = %e, "probe failed before submission");
            }
        }
    }

    let mut attempt = 0;
    // A timed-out call can still confirm after an empty lookup.
    let mut timed_out = false;
    loop {
        attempt += 1;
        let error = match bounded(timeout, timeout_ms, call()).await {
            Ok(tx) => {
                tracing::debug!(request_id = %request_id, operation, attempt, tx = %tx, "mutation confirmed");
                return Ok(Landed {
                    tx,
                    attempts: attempt,
                    adopted: false,
                });
            }
            Err(e) => e,
        };
        timed_out |= matches!(error, AdapterError::Timeout(_));

        if !error.is_retryable() {
            // Adapters answer a landed request id with its transaction, so an
            // explicit refusal means nothing landed, unless an earlier call
            // is still in flight.
            tracing::warn!(request_id = %request_id, operation, attempt, error = %error, "permanent adapter failure");
            return Err(NotLanded {
                error,
                attempts: attempt,
                uncertain: timed_out,
            });
        }

        tracing::warn!(request_id = %request_id, operation, attempt, error = %error, "retryable adapter failure");

        let probe_failed = match bounded(timeout, timeout_ms, probe()).await {
            Ok(Some(tx)) => {
                tracing::info!(request_id = %request_id, operation, tx = %tx, "adopted transaction found by probe");
                return Ok(Landed {
                    tx,
                    attempts: attempt,
                    adopted: true,
                });
            }
            Ok(None) => false,
            Err(probe_error) => {
                tracing::warn!(request_id = %request_id, operation, error = %probe_error, "probe failed");
                true
            }
        };

        if attempt >= policy.max_attempts {
            let uncertain = probe_failed || timed_out;
            tracing::error!(request_id = %request_id, operation, attempts = attempt, uncertain, "retry budget exhausted");
            return Err(NotLanded {
                error,
                attempts: attempt,
                uncertain,
            });
        }
        tokio::time::sleep(policy.backoff_after(attempt)).await;
    }
}

async fn bounded<T>(
    timeout: std::time::Duration,
    timeout_ms: u64,
    fut: impl Future<Output = AdapterResult<T>>,
) -> AdapterResult<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(AdapterError::Timeout(timeout_ms)),
    }
}
