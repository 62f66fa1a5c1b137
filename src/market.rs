// ============================================================================
// Market Record - Outcome Settlement Engine
// ============================================================================
//
// One record per market. The record never holds balances: those live in
// the token ledger. It holds identity, the derived account addresses and
// the one-way settlement status.
//
// ============================================================================

use crate::address::{
    self, derive, Address, ParseIdError, MARKET_SEED, OUTCOME_A_SEED, OUTCOME_B_SEED, VAULT_SEED,
};
use crate::error::EngineError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// MARKET ID
// ============================================================================

/// Externally supplied 16-byte market identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarketId(pub [u8; 16]);

impl MarketId {
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Address of the market itself. Owns the vault and is the mint
    /// authority of both outcome issuers.
    pub fn market_address(&self) -> Address {
        derive(&[MARKET_SEED, &self.0])
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarketId({})", self.to_hex())
    }
}

impl FromStr for MarketId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        address::decode_fixed::<16>(s).map(MarketId)
    }
}

impl Serialize for MarketId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for MarketId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// OUTCOME
// ============================================================================

/// One of the two sides of a binary market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    OutcomeA,
    OutcomeB,
}

impl Outcome {
    pub const ALL: [Outcome; 2] = [Outcome::OutcomeA, Outcome::OutcomeB];

    fn seed(&self) -> &'static [u8] {
        match self {
            Outcome::OutcomeA => OUTCOME_A_SEED,
            Outcome::OutcomeB => OUTCOME_B_SEED,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::OutcomeA => write!(f, "A"),
            Outcome::OutcomeB => write!(f, "B"),
        }
    }
}

/// Accepts `outcome_a`/`a`/`A` and `outcome_b`/`b`/`B`. Anything else,
/// including a "neither" outcome, is `InvalidOutcome`.
impl FromStr for Outcome {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outcome_a" | "a" => Ok(Outcome::OutcomeA),
            "outcome_b" | "b" => Ok(Outcome::OutcomeB),
            _ => Err(EngineError::InvalidOutcome(s.to_string())),
        }
    }
}

// ============================================================================
// MARKET
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub market_id: MarketId,
    pub market_address: Address,
    pub authority: Address,
    pub outcome_a_issuer: Address,
    pub outcome_b_issuer: Address,
    pub collateral_asset: Address,
    pub collateral_vault: Address,
    /// Precision shared by the collateral and both outcome tokens
    pub decimals: u8,
    pub is_settled: bool,
    pub winning_outcome: Option<Outcome>,
    pub created_at: u64,
    pub settled_at: Option<u64>,
}

impl Market {
    /// Build a fresh, unsettled record with every account derived from the id
    pub fn new(market_id: MarketId, authority: Address, collateral_asset: Address, decimals: u8) -> Self {
        let market_address = market_id.market_address();
        Self {
            market_id,
            market_address,
            authority,
            outcome_a_issuer: derive(&[Outcome::OutcomeA.seed(), market_address.as_bytes()]),
            outcome_b_issuer: derive(&[Outcome::OutcomeB.seed(), market_address.as_bytes()]),
            collateral_asset,
            collateral_vault: derive(&[VAULT_SEED, market_address.as_bytes(), collateral_asset.as_bytes()]),
            decimals,
            is_settled: false,
            winning_outcome: None,
            created_at: now(),
            settled_at: None,
        }
    }

    pub fn issuer(&self, outcome: Outcome) -> Address {
        match outcome {
            Outcome::OutcomeA => self.outcome_a_issuer,
            Outcome::OutcomeB => self.outcome_b_issuer,
        }
    }

    pub fn view(&self) -> MarketView {
        MarketView::from(self)
    }
}

// ============================================================================
// READ MODEL
// ============================================================================

/// What `GetMarket` returns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketView {
    pub market_id: MarketId,
    pub authority: Address,
    pub outcome_a_issuer: Address,
    pub outcome_b_issuer: Address,
    pub collateral_asset: Address,
    pub vault_address: Address,
    pub is_settled: bool,
    pub winning_outcome: Option<Outcome>,
}

impl From<&Market> for MarketView {
    fn from(m: &Market) -> Self {
        Self {
            market_id: m.market_id,
            authority: m.authority,
            outcome_a_issuer: m.outcome_a_issuer,
            outcome_b_issuer: m.outcome_b_issuer,
            collateral_asset: m.collateral_asset,
            vault_address: m.collateral_vault,
            is_settled: m.is_settled,
            winning_outcome: m.winning_outcome,
        }
    }
}

pub(crate) fn now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
