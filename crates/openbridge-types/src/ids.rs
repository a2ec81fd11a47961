//! Identifiers used throughout OpenBridge.
//!
//! Request ids are client-supplied strings (generated as UUIDv7 when the
//! client has none) and double as the idempotency key for every adapter
//! call. Account ids are hex-encoded ed25519 public keys.

use std::fmt;

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{BridgeError, constants};

// ---------------------------------------------------------------------------
// RequestId
// ---------------------------------------------------------------------------

/// Idempotency key of a transfer. One request id maps to at most one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh time-ordered id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Accept a client-supplied id.
    ///
    /// Ids are restricted to `[A-Za-z0-9._-]` so they can key file-backed
    /// stores and journals without escaping.
    pub fn parse(raw: &str) -> Result<Self, BridgeError> {
        let invalid = |reason: &str| BridgeError::Validation {
            request_id: raw.to_string(),
            reason: reason.to_string(),
        };
        if raw.is_empty() {
            return Err(invalid("request id must not be empty"));
        }
        if raw.len() > constants::MAX_REQUEST_ID_LEN {
            return Err(invalid("request id too long"));
        }
        if raw.starts_with('.') {
            return Err(invalid("request id must not start with '.'"));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(invalid("request id contains unsupported characters"));
        }
        Ok(Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// An account on either ledger: the hex encoding of its ed25519 public key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self(hex::encode(key.as_bytes()))
    }

    /// Decode the account back into the public key that controls it.
    ///
    /// Returns `None` when the account is not a valid ed25519 public key.
    #[must_use]
    pub fn verifying_key(&self) -> Option<VerifyingKey> {
        let bytes: [u8; 32] = hex::decode(&self.0).ok()?.try_into().ok()?;
        VerifyingKey::from_bytes(&bytes).ok()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// First 8 hex characters, for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// TxRef
// ---------------------------------------------------------------------------

/// Reference to a confirmed transaction on one of the ledgers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(String);

impl TxRef {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Deterministic reference for a ledger operation.
    ///
    /// Every replay of the same `(ledger, operation, request_id)` yields the
    /// same reference, which is what makes adapter calls idempotent.
    #[must_use]
    pub fn derive(ledger: LedgerId, operation: &str, request_id: &RequestId) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"openbridge:tx:v1:");
        hasher.update(ledger.to_string().as_bytes());
        hasher.update(b":");
        hasher.update(operation.as_bytes());
        hasher.update(b":");
        hasher.update(request_id.as_str().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// LedgerId
// ---------------------------------------------------------------------------

/// Which of the two ledgers an observation or transaction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerId {
    Source,
    Destination,
}

impl fmt::Display for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "SOURCE"),
            Self::Destination => write!(f, "DESTINATION"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_request_ids_are_unique_and_ordered() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn parse_accepts_client_ids() {
        let id = RequestId::parse("transfer-2024_01.a").unwrap();
        assert_eq!(id.as_str(), "transfer-2024_01.a");
    }

    #[test]
    fn parse_rejects_bad_ids() {
        assert!(RequestId::parse("").is_err());
        assert!(RequestId::parse("../etc/passwd").is_err());
        assert!(RequestId::parse("has space").is_err());
        assert!(RequestId::parse(&"x".repeat(200)).is_err());
    }

    #[test]
    fn account_roundtrips_through_verifying_key() {
        let key = ed25519_dalek::SigningKey::from_bytes(&[7u8; 32]);
        let account = AccountId::from_verifying_key(&key.verifying_key());
        assert_eq!(account.as_str().len(), 64);
        assert_eq!(account.verifying_key(), Some(key.verifying_key()));
        assert_eq!(account.short().len(), 8);
    }

    #[test]
    fn non_key_account_has_no_verifying_key() {
        assert!(AccountId::new("alice").verifying_key().is_none());
    }

    #[test]
    fn tx_ref_is_deterministic_per_ledger_and_operation() {
        let id = RequestId::parse("req-1").unwrap();
        let a = TxRef::derive(LedgerId::Destination, "mint", &id);
        let b = TxRef::derive(LedgerId::Destination, "mint", &id);
        let c = TxRef::derive(LedgerId::Destination, "burn", &id);
        let d = TxRef::derive(LedgerId::Source, "mint", &id);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn serde_is_transparent() {
        let id = RequestId::parse("abc").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        let back: RequestId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(back, id);
    }
}
