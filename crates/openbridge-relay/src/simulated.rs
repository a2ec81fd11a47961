//! In-process simulated ledgers.
//!
//! [`SimulatedLedger`] and [`SimulatedBridge`] implement the adapter ports
//! with the same contracts a real chain client must honour: signatures and
//! sequence numbers are verified, every mutation is idempotent per request
//! id, and lookups find what landed. Faults can be injected to exercise
//! retry, timeout and halt paths. State is serde-serializable so the CLI can
//! persist it between invocations.

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU32, Ordering},
};

use async_trait::async_trait;
use openbridge_types::{
    AccountId, AccountState, AdapterError, LedgerId, RequestId, SignedTransfer, TxRef,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ports::{AdapterResult, BridgeAdapter, LedgerAdapter};

// ---------------------------------------------------------------------------
// Fault injection
// ---------------------------------------------------------------------------

/// Faults to inject into the next calls of a simulated ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultPlan {
    /// Next N mutations fail with a network error before applying.
    pub network_failures: u32,
    /// Next N mutations apply, then report a network error.
    pub lost_responses: u32,
    /// Next N source submissions are refused with a sequence conflict.
    pub sequence_conflicts: u32,
    /// Every call, reads included, fails with a network error.
    pub unreachable: bool,
}

impl FaultPlan {
    fn check_reachable(&self) -> AdapterResult<()> {
        if self.unreachable {
            return Err(AdapterError::Network("ledger unreachable".into()));
        }
        Ok(())
    }

    fn before_mutation(&mut self) -> AdapterResult<()> {
        self.check_reachable()?;
        if self.network_failures > 0 {
            self.network_failures -= 1;
            return Err(AdapterError::Network("injected network failure".into()));
        }
        Ok(())
    }

    fn after_mutation(&mut self) -> AdapterResult<()> {
        if self.lost_responses > 0 {
            self.lost_responses -= 1;
            return Err(AdapterError::Network("response lost".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Source ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimAccount {
    pub sequence: u64,
    pub balance: Decimal,
}

/// A transfer that landed on the simulated source ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTransfer {
    pub tx: TxRef,
    pub source: AccountId,
    pub destination: AccountId,
    pub amount: Decimal,
    pub sequence: u64,
}

/// Persistable state of a [`SimulatedLedger`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLedgerState {
    pub accounts: BTreeMap<AccountId, SimAccount>,
    pub transfers: BTreeMap<RequestId, SourceTransfer>,
    pub network_load: Decimal,
}

/// Simulated source chain.
#[derive(Default)]
pub struct SimulatedLedger {
    state: Mutex<SourceLedgerState>,
    faults: Mutex<FaultPlan>,
    submissions: AtomicU32,
}

impl SimulatedLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_state(state: SourceLedgerState) -> Self {
        Self {
            state: Mutex::new(state),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn state(&self) -> SourceLedgerState {
        self.state.lock().clone()
    }

    /// Credit `account` out of thin air, creating it if needed.
    pub fn fund(&self, account: &AccountId, amount: Decimal) {
        let mut state = self.state.lock();
        state.accounts.entry(account.clone()).or_default().balance += amount;
    }

    pub fn set_network_load(&self, load: Decimal) {
        self.state.lock().network_load = load;
    }

    pub fn inject(&self, plan: FaultPlan) {
        *self.faults.lock() = plan;
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.faults.lock().unreachable = unreachable;
    }

    /// `submit_signed_transfer` calls received, replays and failures included.
    #[must_use]
    pub fn submission_count(&self) -> u32 {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Transfers that actually moved funds.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.state.lock().transfers.len()
    }

    #[must_use]
    pub fn transfer(&self, request_id: &RequestId) -> Option<SourceTransfer> {
        self.state.lock().transfers.get(request_id).cloned()
    }

    #[must_use]
    pub fn balance_of(&self, account: &AccountId) -> Decimal {
        self.state
            .lock()
            .accounts
            .get(account)
            .map_or(Decimal::ZERO, |a| a.balance)
    }

    #[must_use]
    pub fn sequence_of(&self, account: &AccountId) -> u64 {
        self.state
            .lock()
            .accounts
            .get(account)
            .map_or(0, |a| a.sequence)
    }

    fn apply(state: &mut SourceLedgerState, transfer: &SignedTransfer) -> AdapterResult<TxRef> {
        if transfer.amount <= Decimal::ZERO {
            return Err(AdapterError::InvalidAmount(transfer.amount.to_string()));
        }
        let source = state
            .accounts
            .get_mut(&transfer.source)
            .ok_or_else(|| AdapterError::AccountNotFound(transfer.source.to_string()))?;
        let expected = source.sequence + 1;
        if transfer.sequence != expected {
            return Err(AdapterError::SequenceConflict {
                expected,
                submitted: transfer.sequence,
            });
        }
        if source.balance < transfer.amount {
            return Err(AdapterError::InsufficientFunds {
                needed: transfer.amount,
                available: source.balance,
            });
        }
        source.balance -= transfer.amount;
        source.sequence = transfer.sequence;
        state
            .accounts
            .entry(transfer.destination.clone())
            .or_default()
            .balance += transfer.amount;

        let tx = TxRef::derive(LedgerId::Source, "transfer", &transfer.request_id);
        state.transfers.insert(
            transfer.request_id.clone(),
            SourceTransfer {
                tx: tx.clone(),
                source: transfer.source.clone(),
                destination: transfer.destination.clone(),
                amount: transfer.amount,
                sequence: transfer.sequence,
            },
        );
        Ok(tx)
    }
}

#[async_trait]
impl LedgerAdapter for SimulatedLedger {
    async fn load_account(&self, account: &AccountId) -> AdapterResult<AccountState> {
        self.faults.lock().check_reachable()?;
        let state = self.state.lock();
        let sim = state
            .accounts
            .get(account)
            .ok_or_else(|| AdapterError::AccountNotFound(account.to_string()))?;
        Ok(AccountState {
            account: account.clone(),
            sequence: sim.sequence,
            balance: sim.balance,
        })
    }

    async fn submit_signed_transfer(&self, transfer: &SignedTransfer) -> AdapterResult<TxRef> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        let mut faults = self.faults.lock();
        faults.before_mutation()?;

        let mut state = self.state.lock();
        if let Some(existing) = state.transfers.get(&transfer.request_id) {
            return Ok(existing.tx.clone());
        }
        if !transfer.verify() {
            return Err(AdapterError::SignatureInvalid);
        }
        if faults.sequence_conflicts > 0 {
            faults.sequence_conflicts -= 1;
            return Err(AdapterError::SequenceConflict {
                expected: transfer.sequence + 1,
                submitted: transfer.sequence,
            });
        }
        let tx = Self::apply(&mut state, transfer)?;
        faults.after_mutation()?;
        Ok(tx)
    }

    async fn lookup_transfer(&self, request_id: &RequestId) -> AdapterResult<Option<TxRef>> {
        self.faults.lock().check_reachable()?;
        Ok(self
            .state
            .lock()
            .transfers
            .get(request_id)
            .map(|t| t.tx.clone()))
    }

    async fn network_load(&self) -> AdapterResult<Decimal> {
        self.faults.lock().check_reachable()?;
        Ok(self.state.lock().network_load)
    }

    async fn balance(&self, account: &AccountId) -> AdapterResult<Decimal> {
        self.faults.lock().check_reachable()?;
        Ok(self.balance_of(account))
    }
}

// ---------------------------------------------------------------------------
// Destination ledger
// ---------------------------------------------------------------------------

/// A mint or burn that landed on the simulated destination ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeOp {
    pub tx: TxRef,
    pub account: AccountId,
    pub amount: Decimal,
}

/// Persistable state of a [`SimulatedBridge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestLedgerState {
    pub balances: BTreeMap<AccountId, Decimal>,
    pub supply: Decimal,
    pub mints: BTreeMap<RequestId, BridgeOp>,
    pub burns: BTreeMap<RequestId, BridgeOp>,
}

/// Simulated destination ledger holding the bridged asset.
#[derive(Default)]
pub struct SimulatedBridge {
    state: Mutex<DestLedgerState>,
    faults: Mutex<FaultPlan>,
    mutations: AtomicU32,
}

impl SimulatedBridge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_state(state: DestLedgerState) -> Self {
        Self {
            state: Mutex::new(state),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn state(&self) -> DestLedgerState {
        self.state.lock().clone()
    }

    /// Issue bridged balance outside any transfer (genesis allocation).
    pub fn credit(&self, account: &AccountId, amount: Decimal) {
        let mut state = self.state.lock();
        *state.balances.entry(account.clone()).or_default() += amount;
        state.supply += amount;
    }

    /// Shift the reported supply without touching balances, as an external
    /// mint or a faulty contract would.
    pub fn adjust_supply(&self, delta: Decimal) {
        self.state.lock().supply += delta;
    }

    pub fn inject(&self, plan: FaultPlan) {
        *self.faults.lock() = plan;
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.faults.lock().unreachable = unreachable;
    }

    /// `mint` and `burn` calls received, replays and failures included.
    #[must_use]
    pub fn mutation_count(&self) -> u32 {
        self.mutations.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn mint_of(&self, request_id: &RequestId) -> Option<BridgeOp> {
        self.state.lock().mints.get(request_id).cloned()
    }

    #[must_use]
    pub fn burn_of(&self, request_id: &RequestId) -> Option<BridgeOp> {
        self.state.lock().burns.get(request_id).cloned()
    }

    #[must_use]
    pub fn balance_of(&self, account: &AccountId) -> Decimal {
        self.state
            .lock()
            .balances
            .get(account)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    #[must_use]
    pub fn supply(&self) -> Decimal {
        self.state.lock().supply
    }
}

#[async_trait]
impl BridgeAdapter for SimulatedBridge {
    async fn mint(
        &self,
        account: &AccountId,
        amount: Decimal,
        request_id: &RequestId,
    ) -> AdapterResult<TxRef> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut faults = self.faults.lock();
        faults.before_mutation()?;

        let mut state = self.state.lock();
        if let Some(existing) = state.mints.get(request_id) {
            return Ok(existing.tx.clone());
        }
        if amount <= Decimal::ZERO {
            return Err(AdapterError::InvalidAmount(amount.to_string()));
        }
        *state.balances.entry(account.clone()).or_default() += amount;
        state.supply += amount;
        let tx = TxRef::derive(LedgerId::Destination, "mint", request_id);
        state.mints.insert(
            request_id.clone(),
            BridgeOp {
                tx: tx.clone(),
                account: account.clone(),
                amount,
            },
        );
        faults.after_mutation()?;
        Ok(tx)
    }

    async fn burn(
        &self,
        account: &AccountId,
        amount: Decimal,
        request_id: &RequestId,
    ) -> AdapterResult<TxRef> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut faults = self.faults.lock();
        faults.before_mutation()?;

        let mut state = self.state.lock();
        if let Some(existing) = state.burns.get(request_id) {
            return Ok(existing.tx.clone());
        }
        if amount <= Decimal::ZERO {
            return Err(AdapterError::InvalidAmount(amount.to_string()));
        }
        let available = state.balances.get(account).copied().unwrap_or(Decimal::ZERO);
        if available < amount {
            return Err(AdapterError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        *state.balances.entry(account.clone()).or_default() -= amount;
        state.supply -= amount;
        let tx = TxRef::derive(LedgerId::Destination, "burn", request_id);
        state.burns.insert(
            request_id.clone(),
            BridgeOp {
                tx: tx.clone(),
                account: account.clone(),
                amount,
            },
        );
        faults.after_mutation()?;
        Ok(tx)
    }

    async fn lookup_mint(&self, request_id: &RequestId) -> AdapterResult<Option<TxRef>> {
        self.faults.lock().check_reachable()?;
        Ok(self.state.lock().mints.get(request_id).map(|m| m.tx.clone()))
    }

    async fn lookup_burn(&self, request_id: &RequestId) -> AdapterResult<Option<TxRef>> {
        self.faults.lock().check_reachable()?;
        Ok(self.state.lock().burns.get(request_id).map(|b| b.tx.clone()))
    }

    async fn outstanding_supply(&self) -> AdapterResult<Decimal> {
        self.faults.lock().check_reachable()?;
        Ok(self.state.lock().supply)
    }

    async fn balance(&self, account: &AccountId) -> AdapterResult<Decimal> {
        self.faults.lock().check_reachable()?;
        Ok(self.balance_of(account))
    }
}
