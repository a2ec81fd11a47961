//! Ledger balance types.
//!
//! [`AccountState`] is what a ledger adapter reports for one account;
//! [`BalanceSnapshot`] is what the balance monitor records when it observes
//! a ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, LedgerId};

/// Sequence number and balance of a source-ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub account: AccountId,
    /// Sequence number of the last accepted transaction. The next
    /// submission must carry `sequence + 1`.
    pub sequence: u64,
    pub balance: Decimal,
}

impl AccountState {
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        self.sequence + 1
    }
}

/// A point-in-time observation of a ledger. Read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub ledger: LedgerId,
    pub account: AccountId,
    pub amount: Decimal,
    pub observed_at: DateTime<Utc>,
}
