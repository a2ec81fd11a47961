//! # openbridge-gate
//!
//! **Admission plane**: everything a transfer must pass before any chain
//! mutation is attempted.
//!
//! ## Architecture
//!
//! 1. **RiskGate**: scores the transfer and accepts or rejects it
//! 2. **AuditLog**: append-only record of every risk decision
//! 3. **RouteOptimizer**: picks a route and fixes the fee and net amount
//!
//! ## Admission Flow
//!
//! ```text
//! TransferRequest → RiskGate.evaluate() → AuditLog.append()
//!     → RouteOptimizer.select() → RouteSelection → orchestrator
//! ```
//!
//! A rejected transfer never reaches the route optimizer.

pub mod audit_log;
pub mod risk_gate;
pub mod route_optimizer;

pub use audit_log::AuditLog;
pub use risk_gate::RiskGate;
pub use route_optimizer::RouteOptimizer;
