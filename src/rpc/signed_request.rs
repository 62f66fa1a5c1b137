//! Signed request envelopes.
//!
//! Every state-changing call arrives as a `SignedRequest`: an ed25519
//! signature by the caller over the request type, nonce, timestamp, public
//! key and payload. A request that verifies yields a `Capability` whose
//! identity is the signer's public key.

use crate::address::{self, Address};
use crate::capability::Capability;
use crate::market::MarketId;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Default request expiry window (5 minutes)
pub const TX_EXPIRY_SECS: u64 = 300;

/// Allowed clock skew for timestamps ahead of the server
pub const MAX_CLOCK_SKEW_SECS: u64 = 60;

/// Request type identifiers, the first byte of the signed digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RequestType {
    InitializeMarket = 1,
    Split = 2,
    Merge = 3,
    SetWinningSide = 4,
    ClaimRewards = 5,
}

impl RequestType {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/// Payload variants with typed fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestPayload {
    InitializeMarket {
        market_id: MarketId,
        collateral_asset: Address,
    },
    Split {
        market_id: MarketId,
        amount: u64,
    },
    Merge {
        market_id: MarketId,
        amount: u64,
    },
    SetWinningSide {
        market_id: MarketId,
        /// Parsed only after the signature checks out; an unknown value is
        /// an `InvalidOutcome` rejection, not a malformed request
        outcome: String,
    },
    ClaimRewards {
        market_id: MarketId,
    },
}

impl RequestPayload {
    pub fn request_type(&self) -> RequestType {
        match self {
            RequestPayload::InitializeMarket { .. } => RequestType::InitializeMarket,
            RequestPayload::Split { .. } => RequestType::Split,
            RequestPayload::Merge { .. } => RequestType::Merge,
            RequestPayload::SetWinningSide { .. } => RequestType::SetWinningSide,
            RequestPayload::ClaimRewards { .. } => RequestType::ClaimRewards,
        }
    }

    /// Canonical bytes for signing
    pub fn to_bytes(&self) -> Result<Vec<u8>, RequestError> {
        serde_json::to_vec(self).map_err(|e| RequestError::Serialization(e.to_string()))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("invalid public key: {0}")]
    InvalidPubkey(String),

    #[error("invalid signature encoding: {0}")]
    InvalidSignature(String),

    #[error("signature does not match request")]
    SignatureMismatch,

    #[error("request expired: signed at {timestamp}, now {now}")]
    Expired { timestamp: u64, now: u64 },

    #[error("request timestamp {timestamp} is ahead of server time {now}")]
    FromFuture { timestamp: u64, now: u64 },

    #[error("nonce {nonce} already used by {signer} (last {last})")]
    NonceReused { signer: Address, nonce: u64, last: u64 },

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A signed request envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedRequest {
    /// Signer's ed25519 public key (64 hex chars)
    pub signer_pubkey: String,
    /// Must be greater than the signer's last accepted nonce
    pub nonce: u64,
    /// Unix timestamp when the request was signed
    pub timestamp: u64,
    pub payload: RequestPayload,
    /// ed25519 signature (128 hex chars)
    pub signature: String,
}

impl SignedRequest {
    /// Build and sign a request
    pub fn sign(
        signing_key: &SigningKey,
        nonce: u64,
        timestamp: u64,
        payload: RequestPayload,
    ) -> Result<Self, RequestError> {
        let mut request = SignedRequest {
            signer_pubkey: hex::encode(signing_key.verifying_key().as_bytes()),
            nonce,
            timestamp,
            payload,
            signature: String::new(),
        };
        let digest = request.signing_digest()?;
        request.signature = hex::encode(signing_key.sign(&digest).to_bytes());
        Ok(request)
    }

    /// SHA256(type || nonce || timestamp || signer_pubkey || payload_json)
    pub fn signing_digest(&self) -> Result<Vec<u8>, RequestError> {
        let pubkey = self.signer_key_bytes()?;

        let mut hasher = Sha256::new();
        hasher.update([self.payload.request_type().as_u8()]);
        hasher.update(self.nonce.to_be_bytes());
        hasher.update(self.timestamp.to_be_bytes());
        hasher.update(pubkey);
        hasher.update(self.payload.to_bytes()?);
        Ok(hasher.finalize().to_vec())
    }

    fn signer_key_bytes(&self) -> Result<[u8; 32], RequestError> {
        address::decode_fixed::<32>(&self.signer_pubkey).map_err(|e| RequestError::InvalidPubkey(e.to_string()))
    }

    /// Check the timestamp window and the signature. Nonces are checked by
    /// the caller, which owns the per-signer state.
    pub fn verify(&self, now: u64, expiry_secs: u64) -> Result<Capability, RequestError> {
        if self.timestamp > now.saturating_add(MAX_CLOCK_SKEW_SECS) {
            return Err(RequestError::FromFuture { timestamp: self.timestamp, now });
        }
        if now > self.timestamp.saturating_add(expiry_secs) {
            return Err(RequestError::Expired { timestamp: self.timestamp, now });
        }

        let pubkey = self.signer_key_bytes()?;
        let verifying_key = VerifyingKey::from_bytes(&pubkey).map_err(|e| RequestError::InvalidPubkey(e.to_string()))?;

        let sig_bytes = address::decode_fixed::<64>(&self.signature)
            .map_err(|e| RequestError::InvalidSignature(e.to_string()))?;
        let signature = Signature::from_bytes(&sig_bytes);

        let digest = self.signing_digest()?;
        verifying_key
            .verify(&digest, &signature)
            .map_err(|_| RequestError::SignatureMismatch)?;

        Ok(Capability::new(Address(pubkey)))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn key(n: u8) -> SigningKey {
        SigningKey::from_bytes(&[n; 32])
    }

    fn split(amount: u64) -> RequestPayload {
        RequestPayload::Split { market_id: MarketId([1; 16]), amount }
    }

    #[test]
    fn test_request_type_values() {
        assert_eq!(RequestType::InitializeMarket.as_u8(), 1);
        assert_eq!(RequestType::ClaimRewards.as_u8(), 5);
        assert_eq!(split(1).request_type(), RequestType::Split);
    }

    #[test]
    fn test_signed_request_verifies() {
        let k = key(7);
        let req = SignedRequest::sign(&k, 1, NOW, split(100)).unwrap();
        let cap = req.verify(NOW + 10, TX_EXPIRY_SECS).unwrap();
        assert_eq!(cap.identity(), Address(k.verifying_key().to_bytes()));
    }

    #[test]
    fn test_tampered_payload_fails() {
        let mut req = SignedRequest::sign(&key(7), 1, NOW, split(100)).unwrap();
        req.payload = split(1_000_000);
        assert_eq!(req.verify(NOW, TX_EXPIRY_SECS).unwrap_err(), RequestError::SignatureMismatch);
    }

    #[test]
    fn test_tampered_nonce_fails() {
        let mut req = SignedRequest::sign(&key(7), 1, NOW, split(100)).unwrap();
        req.nonce = 2;
        assert_eq!(req.verify(NOW, TX_EXPIRY_SECS).unwrap_err(), RequestError::SignatureMismatch);
    }

    #[test]
    fn test_wrong_signer_fails() {
        let mut req = SignedRequest::sign(&key(7), 1, NOW, split(100)).unwrap();
        req.signer_pubkey = hex::encode(key(8).verifying_key().as_bytes());
        assert_eq!(req.verify(NOW, TX_EXPIRY_SECS).unwrap_err(), RequestError::SignatureMismatch);
    }

    #[test]
    fn test_expiry_window() {
        let req = SignedRequest::sign(&key(7), 1, NOW, split(100)).unwrap();
        assert!(req.verify(NOW + TX_EXPIRY_SECS, TX_EXPIRY_SECS).is_ok());
        assert!(matches!(
            req.verify(NOW + TX_EXPIRY_SECS + 1, TX_EXPIRY_SECS),
            Err(RequestError::Expired { .. })
        ));
        assert!(matches!(
            req.verify(NOW - MAX_CLOCK_SKEW_SECS - 1, TX_EXPIRY_SECS),
            Err(RequestError::FromFuture { .. })
        ));
    }

    #[test]
    fn test_malformed_encodings() {
        let mut req = SignedRequest::sign(&key(7), 1, NOW, split(100)).unwrap();
        req.signature = "abcd".into();
        assert!(matches!(req.verify(NOW, TX_EXPIRY_SECS), Err(RequestError::InvalidSignature(_))));

        req.signer_pubkey = "zz".into();
        assert!(matches!(req.verify(NOW, TX_EXPIRY_SECS), Err(RequestError::InvalidPubkey(_))));
    }

    #[test]
    fn test_payload_wire_format() {
        let json = serde_json::to_value(RequestPayload::SetWinningSide {
            market_id: MarketId([0xAB; 16]),
            outcome: "outcome_b".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "set_winning_side");
        assert_eq!(json["market_id"], "ab".repeat(16));
        assert_eq!(json["outcome"], "outcome_b");
    }
}
