//! Signing of source-ledger transfers.

use std::collections::HashMap;

use ed25519_dalek::SigningKey;
use openbridge_types::{AccountId, RequestId, SignedTransfer};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

/// Holds the keys the orchestrator may sign with.
pub trait TransferSigner: Send + Sync {
    fn can_sign(&self, account: &AccountId) -> bool;

    /// Sign a transfer out of `source`, or `None` without a key for it.
    fn sign(
        &self,
        request_id: &RequestId,
        source: &AccountId,
        destination: &AccountId,
        amount: Decimal,
        sequence: u64,
    ) -> Option<SignedTransfer>;
}

/// In-process ed25519 keyring.
#[derive(Default)]
pub struct Keyring {
    keys: HashMap<AccountId, SigningKey>,
}

impl Keyring {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key and return the account it controls.
    pub fn insert(&mut self, key: SigningKey) -> AccountId {
        let account = AccountId::from_verifying_key(&key.verifying_key());
        self.keys.insert(account.clone(), key);
        account
    }

    #[must_use]
    pub fn with_key(mut self, key: SigningKey) -> Self {
        self.insert(key);
        self
    }

    /// Deterministic key derived from a label. Development and simulation
    /// only: anyone who knows the label knows the key.
    #[must_use]
    pub fn dev_key(label: &str) -> SigningKey {
        let seed: [u8; 32] = Sha256::new()
            .chain_update(b"openbridge:dev-key:v1:")
            .chain_update(label.as_bytes())
            .finalize()
            .into();
        SigningKey::from_bytes(&seed)
    }

    /// Account controlled by [`Keyring::dev_key`] for `label`.
    #[must_use]
    pub fn dev_account(label: &str) -> AccountId {
        AccountId::from_verifying_key(&Self::dev_key(label).verifying_key())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl TransferSigner for Keyring {
    fn can_sign(&self, account: &AccountId) -> bool {
        self.keys.contains_key(account)
    }

    fn sign(
        &self,
        request_id: &RequestId,
        source: &AccountId,
        destination: &AccountId,
        amount: Decimal,
        sequence: u64,
    ) -> Option<SignedTransfer> {
        let key = self.keys.get(source)?;
        Some(SignedTransfer::sign(
            key,
            request_id.clone(),
            destination.clone(),
            amount,
            sequence,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_keys_are_deterministic_per_label() {
        assert_eq!(Keyring::dev_account("alice"), Keyring::dev_account("alice"));
        assert_ne!(Keyring::dev_account("alice"), Keyring::dev_account("bob"));
    }

    #[test]
    fn signs_only_for_known_accounts() {
        let mut keyring = Keyring::new();
        let alice = keyring.insert(Keyring::dev_key("alice"));
        let bob = Keyring::dev_account("bob");
        let id = RequestId::parse("sig-1").unwrap();

        assert!(keyring.can_sign(&alice));
        assert!(!keyring.can_sign(&bob));

        let signed = keyring
            .sign(&id, &alice, &bob, Decimal::new(5, 0), 1)
            .unwrap();
        assert_eq!(signed.source, alice);
        assert!(signed.verify());
        assert!(keyring.sign(&id, &bob, &alice, Decimal::ONE, 1).is_none());
    }
}
