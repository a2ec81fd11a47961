//! System-wide constants for the OpenBridge orchestrator.

use rust_decimal::Decimal;

/// Maximum decimal places accepted for transfer amounts and fees.
pub const AMOUNT_PRECISION: u32 = 8;

/// Decimal places of a risk score.
pub const SCORE_PRECISION: u32 = 8;

/// Maximum length of a client-supplied request id.
pub const MAX_REQUEST_ID_LEN: usize = 128;

/// Default acceptance threshold of the risk gate (0.7).
pub const DEFAULT_RISK_THRESHOLD: Decimal = Decimal::from_parts(7, 0, 0, false, 1);

/// Transfers at or above this amount get the worst amount factor.
pub const DEFAULT_AMOUNT_CEILING: i64 = 100_000;

/// Completed transfers after which account history stops improving the score.
pub const DEFAULT_HISTORY_SATURATION: u32 = 10;

/// Number of grid steps used when drawing a fee rate inside a route's bounds.
pub const FEE_RATE_STEPS: u32 = 10_000;

/// Scale applied to selection weights before weighted sampling.
pub const WEIGHT_SCALE: i64 = 1_000_000;

/// Default balance monitor poll interval (5 minutes).
pub const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 300;

/// Balance snapshots retained by the monitor.
pub const MONITOR_HISTORY_LEN: usize = 1_024;

/// Default retry budget per adapter call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default base delay of the exponential backoff.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 200;

/// Upper bound on a single backoff delay.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;

/// Default local wait for a single adapter call.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 10_000;

/// Capacity of the broadcast event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 1_024;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "OpenBridge";
