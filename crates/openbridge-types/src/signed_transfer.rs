//! # SignedTransfer: the source-ledger mutation primitive
//!
//! Every lock (and custodial release) on the source ledger is an ed25519
//! signed transfer bound to a request id and an account sequence number.
//!
//! ## Security Properties
//!
//! - **Key-bound**: signed by the key behind the `source` account id
//! - **Sequence-bound**: carries `sequence = last + 1`, so a ledger applies
//!   mutations of one account in a single total order
//! - **Request-bound**: the request id is part of the payload, so a ledger
//!   can answer replays with the original transaction reference

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, RequestId};

/// A transfer on the source ledger, signed by the source account's key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransfer {
    pub request_id: RequestId,
    pub source: AccountId,
    pub destination: AccountId,
    pub amount: Decimal,
    pub sequence: u64,
    /// Ed25519 signature over [`SignedTransfer::signing_payload`].
    pub signature: Vec<u8>,
}

impl SignedTransfer {
    /// Build and sign a transfer. The `source` account is derived from `key`.
    #[must_use]
    pub fn sign(
        key: &SigningKey,
        request_id: RequestId,
        destination: AccountId,
        amount: Decimal,
        sequence: u64,
    ) -> Self {
        let mut transfer = Self {
            request_id,
            source: AccountId::from_verifying_key(&key.verifying_key()),
            destination,
            amount,
            sequence,
            signature: Vec::new(),
        };
        transfer.signature = key.sign(&transfer.signing_payload()).to_bytes().to_vec();
        transfer
    }

    /// Canonical signing payload.
    ///
    /// Format: `"openbridge:transfer:v1:" || request_id || 0x00 || source || 0x00 || destination || 0x00 || amount || sequence`
    #[must_use]
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(256);
        payload.extend_from_slice(b"openbridge:transfer:v1:");
        payload.extend_from_slice(self.request_id.as_str().as_bytes());
        payload.push(0);
        payload.extend_from_slice(self.source.as_str().as_bytes());
        payload.push(0);
        payload.extend_from_slice(self.destination.as_str().as_bytes());
        payload.push(0);
        payload.extend_from_slice(self.amount.normalize().to_string().as_bytes());
        payload.extend_from_slice(&self.sequence.to_le_bytes());
        payload
    }

    /// Check the signature against the key encoded in `source`.
    #[must_use]
    pub fn verify(&self) -> bool {
        let Some(key) = self.source.verifying_key() else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&self.signature) else {
            return false;
        };
        key.verify(&self.signing_payload(), &signature).is_ok()
    }
}

/// Dummy transfer for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl SignedTransfer {
    /// A correctly signed transfer from a random key.
    pub fn dummy(amount: Decimal, sequence: u64) -> Self {
        let key = SigningKey::from_bytes(&rand::random::<[u8; 32]>());
        Self::sign(
            &key,
            RequestId::new(),
            AccountId::new("dummy-destination"),
            amount,
            sequence,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_transfer_verifies() {
        let transfer = SignedTransfer::dummy(Decimal::new(990, 0), 1);
        assert!(transfer.verify());
    }

    #[test]
    fn tampered_amount_fails_verification() {
        let mut transfer = SignedTransfer::dummy(Decimal::new(990, 0), 1);
        transfer.amount = Decimal::new(9900, 0);
        assert!(!transfer.verify());
    }

    #[test]
    fn tampered_sequence_fails_verification() {
        let mut transfer = SignedTransfer::dummy(Decimal::new(5, 0), 7);
        transfer.sequence = 8;
        assert!(!transfer.verify());
    }

    #[test]
    fn foreign_source_fails_verification() {
        let mut transfer = SignedTransfer::dummy(Decimal::ONE, 1);
        let other = SignedTransfer::dummy(Decimal::ONE, 1);
        transfer.source = other.source;
        assert!(!transfer.verify());
    }

    #[test]
    fn garbage_signature_fails_verification() {
        let mut transfer = SignedTransfer::dummy(Decimal::ONE, 1);
        transfer.signature = vec![0u8; 10];
        assert!(!transfer.verify());
    }

    #[test]
    fn signing_payload_is_scale_insensitive() {
        let mut a = SignedTransfer::dummy(Decimal::new(100, 0), 1);
        let sig = a.signing_payload();
        a.amount = Decimal::new(10000, 2);
        assert_eq!(sig, a.signing_payload());
        assert!(a.verify());
    }

    #[test]
    fn serde_roundtrip_keeps_signature_valid() {
        let transfer = SignedTransfer::dummy(Decimal::new(12345, 2), 3);
        let json = serde_json::to_string(&transfer).unwrap();
        let back: SignedTransfer = serde_json::from_str(&json).unwrap();
        assert_eq!(transfer, back);
        assert!(back.verify());
    }
}
