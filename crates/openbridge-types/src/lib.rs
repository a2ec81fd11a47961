//! # openbridge-types
//!
//! Shared types, errors, and configuration for the **OpenBridge** cross-chain
//! transfer orchestrator.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`RequestId`], [`AccountId`], [`TxRef`], [`LedgerId`]
//! - **Transfer model**: [`TransferRequest`], [`Direction`], [`TransferStatus`], [`TransferRecord`]
//! - **Risk model**: [`RiskContext`], [`RiskWeights`], [`RiskFeatures`], [`RiskAssessment`]
//! - **Route model**: [`Route`], [`RouteSelection`]
//! - **Ledger model**: [`AccountState`], [`BalanceSnapshot`], [`SignedTransfer`]
//! - **Events**: [`BridgeEvent`]
//! - **Configuration**: [`BridgeConfig`], [`RiskConfig`], [`MonitorConfig`], [`RetryPolicy`]
//! - **Errors**: [`BridgeError`] with `OB_ERR_` prefix codes, [`AdapterError`]
//! - **Constants**: system-wide limits and defaults

pub mod balance;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod risk;
pub mod route;
pub mod signed_transfer;
pub mod transfer;

// Re-export all primary types at crate root for ergonomic imports:
//   use openbridge_types::{TransferRecord, Direction, RequestId, ...};

pub use balance::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use risk::*;
pub use route::*;
pub use signed_transfer::*;
pub use transfer::*;

// Constants are accessed via `openbridge_types::constants::FOO`
// (not re-exported to avoid name collisions).
