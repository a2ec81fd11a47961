//! Expected bridge balances.
//!
//! Invariant checked by the balance monitor on every tick:
//! ```text
//! custody(source)  == opening_source + Σ net(S→D completed) − Σ net(D→S completed)
//! supply(dest)     == opening_supply + Σ net(S→D completed) − Σ amount(D→S completed)
//! ```
//!
//! Only `Completed` records count. A transfer halfway through moves one side
//! without the other and shows up as drift until it completes or an operator
//! reconciles it.

use openbridge_types::{BridgeError, Direction, LedgerId, Result, TransferRecord, TransferStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Balances implied by the opening state and the completed transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExpectedBalances {
    /// Custody account balance on the source ledger.
    pub source_custody: Decimal,
    /// Outstanding bridged supply on the destination ledger.
    pub dest_supply: Decimal,
    /// Completed records folded in.
    pub completed: usize,
}

impl ExpectedBalances {
    #[must_use]
    pub fn opening(source_custody: Decimal, dest_supply: Decimal) -> Self {
        Self {
            source_custody,
            dest_supply,
            completed: 0,
        }
    }

    /// Fold every completed record into the opening balances.
    #[must_use]
    pub fn from_records<'a>(
        opening_source: Decimal,
        opening_dest: Decimal,
        records: impl IntoIterator<Item = &'a TransferRecord>,
    ) -> Self {
        let mut expected = Self::opening(opening_source, opening_dest);
        for record in records {
            expected.apply(record);
        }
        expected
    }

    /// Fold one record in. Anything but `Completed` is ignored.
    pub fn apply(&mut self, record: &TransferRecord) {
        if record.status != TransferStatus::Completed {
            return;
        }
        let Some(net) = record.net_amount() else {
            return;
        };
        match record.request.direction {
            Direction::SourceToDest => {
                self.source_custody += net;
                self.dest_supply += net;
            }
            Direction::DestToSource => {
                self.source_custody -= net;
                self.dest_supply -= record.request.amount;
            }
        }
        self.completed += 1;
    }

    #[must_use]
    pub fn for_ledger(&self, ledger: LedgerId) -> Decimal {
        match ledger {
            LedgerId::Source => self.source_custody,
            LedgerId::Destination => self.dest_supply,
        }
    }

    /// `observed − expected` on `ledger`.
    #[must_use]
    pub fn drift(&self, ledger: LedgerId, observed: Decimal) -> Decimal {
        observed - self.for_ledger(ledger)
    }

    /// Check an observation against the expectation.
    ///
    /// # Errors
    /// Returns [`BridgeError::Consistency`] if `|drift|` exceeds `tolerance`.
    pub fn verify(
        &self,
        ledger: LedgerId,
        observed: Decimal,
        tolerance: Decimal,
    ) -> Result<Decimal> {
        let drift = self.drift(ledger, observed);
        if drift.abs() > tolerance {
            return Err(BridgeError::Consistency {
                ledger,
                reason: format!(
                    "observed {observed} != expected {} (drift {drift}, tolerance {tolerance}, \
                     completed transfers={})",
                    self.for_ledger(ledger),
                    self.completed
                ),
            });
        }
        Ok(drift)
    }
}
