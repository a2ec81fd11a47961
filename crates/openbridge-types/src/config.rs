//! Configuration types for an OpenBridge node.
//!
//! Loaded once at startup and immutable thereafter. [`BridgeConfig::validate`]
//! rejects anything the orchestrator cannot run with; a failed validation
//! aborts startup with [`BridgeError::FatalConfig`].

use std::{collections::HashSet, path::Path, time::Duration};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, BridgeError, Direction, Result, RiskWeights, Route, constants, scaled_weights};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Bridge-controlled account holding locked funds on the source ledger.
    pub custody_account: AccountId,
    pub risk: RiskConfig,
    pub routes: Vec<Route>,
    pub monitor: MonitorConfig,
    pub retry: RetryPolicy,
    pub limits: TransferLimits,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            custody_account: AccountId::new(""),
            risk: RiskConfig::default(),
            routes: Route::default_table(),
            monitor: MonitorConfig::default(),
            retry: RetryPolicy::default(),
            limits: TransferLimits::default(),
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BridgeError::FatalConfig(format!("unparseable configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::FatalConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Check every section.
    ///
    /// # Errors
    /// Returns [`BridgeError::FatalConfig`] naming the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.custody_account.is_empty() {
            return Err(fatal("custody_account is not configured"));
        }
        self.risk.validate()?;
        validate_routes(&self.routes)?;
        self.monitor.validate()?;
        self.retry.validate()?;
        self.limits.validate()
    }
}

fn fatal(reason: impl Into<String>) -> BridgeError {
    BridgeError::FatalConfig(reason.into())
}

fn validate_routes(routes: &[Route]) -> Result<()> {
    if routes.is_empty() {
        return Err(fatal("route table is empty"));
    }
    let mut names = HashSet::new();
    for route in routes {
        if route.name.trim().is_empty() {
            return Err(fatal("route with empty name"));
        }
        if !names.insert(route.name.as_str()) {
            return Err(fatal(format!("duplicate route '{}'", route.name)));
        }
        if route.min_fee_rate < Decimal::ZERO || route.max_fee_rate > Decimal::ONE {
            return Err(fatal(format!(
                "route '{}': fee rates must lie in [0, 1]",
                route.name
            )));
        }
        if route.min_fee_rate > route.max_fee_rate {
            return Err(fatal(format!(
                "route '{}': min_fee_rate {} exceeds max_fee_rate {}",
                route.name, route.min_fee_rate, route.max_fee_rate
            )));
        }
        let reverse = route.reverse_selection_weight.unwrap_or(Decimal::ZERO);
        if route.selection_weight < Decimal::ZERO || reverse < Decimal::ZERO {
            return Err(fatal(format!(
                "route '{}': selection weights must not be negative",
                route.name
            )));
        }
    }
    scaled_weights(routes, Direction::SourceToDest)?;
    scaled_weights(routes, Direction::DestToSource)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Risk
// ---------------------------------------------------------------------------

/// Risk gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Minimum score for acceptance.
    pub threshold: Decimal,
    pub weights: RiskWeights,
    /// Amount at which the amount factor bottoms out at zero.
    pub amount_ceiling: Decimal,
    /// Completed transfers at which the history factor saturates at one.
    pub history_saturation: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            threshold: constants::DEFAULT_RISK_THRESHOLD,
            weights: RiskWeights::default(),
            amount_ceiling: Decimal::new(constants::DEFAULT_AMOUNT_CEILING, 0),
            history_saturation: constants::DEFAULT_HISTORY_SATURATION,
        }
    }
}

impl RiskConfig {
    fn validate(&self) -> Result<()> {
        if self.threshold < Decimal::ZERO || self.threshold > Decimal::ONE {
            return Err(fatal(format!(
                "risk threshold {} outside [0, 1]",
                self.threshold
            )));
        }
        let w = &self.weights;
        if w.amount < Decimal::ZERO || w.network_load < Decimal::ZERO || w.history < Decimal::ZERO
        {
            return Err(fatal("risk weights must not be negative"));
        }
        if w.total().is_zero() {
            return Err(fatal("risk weights must not all be zero"));
        }
        if self.amount_ceiling <= Decimal::ZERO {
            return Err(fatal("risk amount_ceiling must be positive"));
        }
        if self.history_saturation == 0 {
            return Err(fatal("risk history_saturation must be positive"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// Balance monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_secs: u64,
    /// Largest `|observed - expected|` that does not raise an alert.
    pub drift_tolerance: Decimal,
    /// Custody balance on the source ledger before the first transfer.
    pub opening_source_balance: Decimal,
    /// Bridged supply on the destination ledger before the first transfer.
    pub opening_dest_supply: Decimal,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: constants::DEFAULT_MONITOR_INTERVAL_SECS,
            drift_tolerance: Decimal::ZERO,
            opening_source_balance: Decimal::ZERO,
            opening_dest_supply: Decimal::ZERO,
        }
    }
}

impl MonitorConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(fatal("monitor poll_interval_secs must be positive"));
        }
        if self.drift_tolerance < Decimal::ZERO {
            return Err(fatal("monitor drift_tolerance must not be negative"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// Bounded exponential backoff for retryable adapter failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per adapter call, the first one included.
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub max_backoff_ms: u64,
    /// Local wait for one adapter call before it counts as a timeout.
    pub call_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: constants::DEFAULT_MAX_ATTEMPTS,
            backoff_base_ms: constants::DEFAULT_BACKOFF_BASE_MS,
            max_backoff_ms: constants::DEFAULT_MAX_BACKOFF_MS,
            call_timeout_ms: constants::DEFAULT_CALL_TIMEOUT_MS,
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based):
    /// `base * 2^(attempt - 1)`, capped at `max_backoff_ms`.
    #[must_use]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let delay = self
            .backoff_base_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_backoff_ms);
        Duration::from_millis(delay)
    }

    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(fatal("retry max_attempts must be at least 1"));
        }
        if self.call_timeout_ms == 0 {
            return Err(fatal("retry call_timeout_ms must be positive"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Request-level limits enforced during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferLimits {
    /// Largest amount accepted in a single request.
    pub max_amount: Option<Decimal>,
}

impl TransferLimits {
    fn validate(&self) -> Result<()> {
        if let Some(max) = self.max_amount {
            if max <= Decimal::ZERO {
                return Err(fatal("limits max_amount must be positive"));
            }
        }
        Ok(())
    }
}
