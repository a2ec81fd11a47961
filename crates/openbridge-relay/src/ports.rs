//! Outbound ports to the two ledgers.
//!
//! The orchestrator and the balance monitor only ever talk to chains through
//! these traits. Every mutation is keyed by the transfer's [`RequestId`] and
//! must be idempotent per id: submitting the same request twice returns the
//! first transaction instead of moving funds again.

use async_trait::async_trait;
use openbridge_types::{AccountId, AccountState, AdapterError, RequestId, SignedTransfer, TxRef};
use rust_decimal::Decimal;

/// Result of an adapter call.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Source chain client.
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    /// Current sequence number and balance of `account`.
    async fn load_account(&self, account: &AccountId) -> AdapterResult<AccountState>;

    /// Submit a signed transfer. Idempotent per `transfer.request_id`.
    async fn submit_signed_transfer(&self, transfer: &SignedTransfer) -> AdapterResult<TxRef>;

    /// The transaction previously submitted for `request_id`, if it landed.
    async fn lookup_transfer(&self, request_id: &RequestId) -> AdapterResult<Option<TxRef>>;

    /// Congestion of the source network in `[0, 1]`.
    async fn network_load(&self) -> AdapterResult<Decimal>;

    /// Balance of `account`.
    async fn balance(&self, account: &AccountId) -> AdapterResult<Decimal>;
}

/// Destination ledger client for the bridged asset.
#[async_trait]
pub trait BridgeAdapter: Send + Sync {
    /// Mint `amount` to `account`. Idempotent per `request_id`.
    async fn mint(
        &self,
        account: &AccountId,
        amount: Decimal,
        request_id: &RequestId,
    ) -> AdapterResult<TxRef>;

    /// Burn `amount` from `account`. Idempotent per `request_id`.
    async fn burn(
        &self,
        account: &AccountId,
        amount: Decimal,
        request_id: &RequestId,
    ) -> AdapterResult<TxRef>;

    async fn lookup_mint(&self, request_id: &RequestId) -> AdapterResult<Option<TxRef>>;

    async fn lookup_burn(&self, request_id: &RequestId) -> AdapterResult<Option<TxRef>>;

    /// Total bridged supply currently outstanding.
    async fn outstanding_supply(&self) -> AdapterResult<Decimal>;

    /// Bridged-asset balance of `account`.
    async fn balance(&self, account: &AccountId) -> AdapterResult<Decimal>;
}
