//! # openbridge-cli
//!
//! The `openbridge` operator tool. Runs the orchestrator against simulated
//! ledgers whose state, together with the transfer records and the risk
//! audit journal, lives in a local state directory (`.openbridge/` by
//! default), so transfers can be driven and inspected across invocations.
//!
//! ## Subcommands
//!
//! - `openbridge submit`: Submit a transfer and drive it as far as possible.
//! - `openbridge status`: Show one transfer, optionally resuming it.
//! - `openbridge list`: List transfers (all, halted, or awaiting release).
//! - `openbridge cancel`: Cancel a transfer that has not touched a ledger.
//! - `openbridge release`: Custodial release for a `DEST_TO_SOURCE` transfer.
//! - `openbridge fund`: Credit an account on a simulated ledger.
//! - `openbridge monitor`: Reconcile observed against expected balances.
//!
//! Accounts are named by label; each label maps to a deterministic
//! development key, and `custody` is the bridge's custody account.
//!
//! ## Exit Codes
//!
//! | code | meaning |
//! |------|---------|
//! | 0 | completed / clean |
//! | 1 | rejected by the risk gate |
//! | 2 | error, failed, halted, cancelled, or drift |
//! | 3 | pending external confirmation |

pub mod monitor;
pub mod transfer;
pub mod workspace;

use openbridge_types::TransferStatus;

pub const EXIT_OK: u8 = 0;
pub const EXIT_REJECTED: u8 = 1;
pub const EXIT_FAILED: u8 = 2;
pub const EXIT_PENDING: u8 = 3;

/// Process exit code for a transfer in `status`.
#[must_use]
pub fn exit_code(status: TransferStatus) -> u8 {
    match status {
        TransferStatus::Completed => EXIT_OK,
        TransferStatus::Rejected => EXIT_REJECTED,
        TransferStatus::Failed | TransferStatus::Halted | TransferStatus::Cancelled => EXIT_FAILED,
        TransferStatus::Created
        | TransferStatus::RiskAssessed
        | TransferStatus::RouteSelected
        | TransferStatus::SourceSideDone
        | TransferStatus::DestSideDone => EXIT_PENDING,
    }
}
