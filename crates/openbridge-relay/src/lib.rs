//! # openbridge-relay
//!
//! **Execution plane**: drives admitted transfers across both ledgers and
//! audits the result.
//!
//! ## Architecture
//!
//! The [`TransferOrchestrator`] receives a [`openbridge_types::TransferRequest`] and:
//! 1. Validates it and creates the record (idempotent per request id)
//! 2. Runs admission through the risk gate and route optimizer
//! 3. Executes the first-side mutation (source lock or destination burn)
//! 4. Executes the second side (destination mint, or waits for the
//!    custodial release on the source ledger)
//! 5. Persists every transition by compare-and-swap and publishes events
//!
//! The [`BalanceMonitor`] runs beside it on its own interval, reading the
//! record store and both ledgers, never writing either.
//!
//! ## Transfer Flow
//!
//! ```text
//! SOURCE_TO_DEST:  lock(initiator → custody, net) ──▶ mint(initiator, net)
//! DEST_TO_SOURCE:  burn(initiator, amount) ──▶ awaiting release ──▶ release(custody → initiator, net)
//! ```
//!
//! A failure before the first side lands fails the transfer. A failure
//! after it halts the transfer for manual reconciliation.

pub mod events;
pub mod locks;
pub mod monitor;
pub mod orchestrator;
pub mod ports;
pub mod reconcile;
pub mod retry;
pub mod signer;
pub mod simulated;
pub mod store;

pub use events::{BroadcastSink, EventSink, FanoutSink, MemorySink, TracingSink};
pub use locks::KeyedLocks;
pub use monitor::{BalanceMonitor, DriftReport};
pub use orchestrator::{Collaborators, TransferOrchestrator};
pub use ports::{AdapterResult, BridgeAdapter, LedgerAdapter};
pub use reconcile::ExpectedBalances;
pub use retry::{Landed, NotLanded, submit_with_retry};
pub use signer::{Keyring, TransferSigner};
pub use simulated::{FaultPlan, SimulatedBridge, SimulatedLedger};
pub use store::{InsertOutcome, JsonFileRecordStore, MemoryRecordStore, RecordStore, Versioned};
