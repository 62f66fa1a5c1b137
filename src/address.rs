// ============================================================================
// Addresses - Outcome Settlement Engine
// ============================================================================
//
// Every account the engine touches has a 32-byte address. Accounts that
// belong to a market (the market record, both outcome issuers, the
// collateral vault) are never chosen by a caller: they are derived from
// the market id so anyone can recompute them without a lookup.
//
//   market       = derive(["market", market_id])
//   outcome A    = derive(["outcome_a", market])
//   outcome B    = derive(["outcome_b", market])
//   vault        = derive(["vault", market, collateral_asset])
//   user account = derive(["token_account", owner, asset])
//
// ============================================================================

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// SEEDS
// ============================================================================

pub const MARKET_SEED: &[u8] = b"market";
pub const OUTCOME_A_SEED: &[u8] = b"outcome_a";
pub const OUTCOME_B_SEED: &[u8] = b"outcome_b";
pub const VAULT_SEED: &[u8] = b"vault";
pub const TOKEN_ACCOUNT_SEED: &[u8] = b"token_account";
pub const COLLATERAL_SEED: &[u8] = b"collateral";

/// Domain separator so derived addresses can never equal a raw SHA-256 of
/// user supplied bytes.
const DERIVE_DOMAIN: &[u8] = b"outcome-settlement/derive/v1";

// ============================================================================
// ADDRESS
// ============================================================================

/// A 32-byte account address (also the raw ed25519 public key of a signer)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short form for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.short())
    }
}

/// Error parsing an address or market id from hex
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseIdError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Decode a hex string into a fixed-size array
pub(crate) fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], ParseIdError> {
    let bytes = hex::decode(s.trim()).map_err(|e| ParseIdError::InvalidHex(e.to_string()))?;
    let actual = bytes.len();
    bytes
        .try_into()
        .map_err(|_| ParseIdError::InvalidLength { expected: N, actual })
}

impl FromStr for Address {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<32>(s).map(Address)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// DERIVATION
// ============================================================================

/// Derive an address from an ordered list of seeds.
///
/// Each seed is length-prefixed before hashing, so `["ab", "c"]` and
/// `["a", "bc"]` never collide. Pure: same seeds, same address.
pub fn derive(seeds: &[&[u8]]) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(DERIVE_DOMAIN);
    for seed in seeds {
        hasher.update((seed.len() as u32).to_be_bytes());
        hasher.update(seed);
    }
    Address(hasher.finalize().into())
}

/// Token account holding `asset` on behalf of `owner`
pub fn token_account(owner: &Address, asset: &Address) -> Address {
    derive(&[TOKEN_ACCOUNT_SEED, owner.as_bytes(), asset.as_bytes()])
}

/// Address of a named collateral asset (e.g. "USDC")
pub fn collateral_asset(symbol: &str) -> Address {
    derive(&[COLLATERAL_SEED, symbol.as_bytes()])
}
