// ============================================================================
// Market Registry - Outcome Settlement Engine
// ============================================================================
//
// Durable storage of market records plus the three record-level rules:
//
//   create        fails with AlreadyExists if the id is taken
//   load          fails with MarketNotFound if absent
//   mark_settled  fails with AlreadySettled; otherwise one-way
//
// Storage itself is behind `MarketStore` so the engine can run on any
// backing map. Records are never removed.
//
// ============================================================================

use crate::address::Address;
use crate::error::EngineError;
use crate::market::{now, Market, MarketId, Outcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// STORE
// ============================================================================

/// Raw record storage. Has no opinion on the rules above.
pub trait MarketStore {
    fn get(&self, id: &MarketId) -> Option<&Market>;

    fn put(&mut self, market: Market);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ids(&self) -> Vec<MarketId>;

    fn contains(&self, id: &MarketId) -> bool {
        self.get(id).is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryRegistry {
    markets: BTreeMap<MarketId, Market>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MarketStore for InMemoryRegistry {
    fn get(&self, id: &MarketId) -> Option<&Market> {
        self.markets.get(id)
    }

    fn put(&mut self, market: Market) {
        self.markets.insert(market.market_id, market);
    }

    fn len(&self) -> usize {
        self.markets.len()
    }

    fn ids(&self) -> Vec<MarketId> {
        self.markets.keys().copied().collect()
    }
}

// ============================================================================
// REGISTRY RULES
// ============================================================================

/// Build the record for a new market without storing it.
///
/// The engine stores it only after the matching ledger batch committed.
pub fn prepare_create<S: MarketStore + ?Sized>(
    store: &S,
    market_id: MarketId,
    authority: Address,
    collateral_asset: Address,
    decimals: u8,
) -> Result<Market, EngineError> {
    if store.contains(&market_id) {
        return Err(EngineError::AlreadyExists(market_id));
    }
    Ok(Market::new(market_id, authority, collateral_asset, decimals))
}

/// Create and store a market record
pub fn create<S: MarketStore + ?Sized>(
    store: &mut S,
    market_id: MarketId,
    authority: Address,
    collateral_asset: Address,
    decimals: u8,
) -> Result<Market, EngineError> {
    let market = prepare_create(store, market_id, authority, collateral_asset, decimals)?;
    store.put(market.clone());
    Ok(market)
}

pub fn load<S: MarketStore + ?Sized>(store: &S, market_id: &MarketId) -> Result<Market, EngineError> {
    store.get(market_id).cloned().ok_or(EngineError::MarketNotFound(*market_id))
}

/// The settled form of `market`, or `AlreadySettled`
pub fn settled(market: &Market, winning_outcome: Outcome) -> Result<Market, EngineError> {
    if market.is_settled {
        return Err(EngineError::AlreadySettled(market.market_id));
    }
    let mut next = market.clone();
    next.is_settled = true;
    next.winning_outcome = Some(winning_outcome);
    next.settled_at = Some(now());
    Ok(next)
}

/// Record the winner. One-way: a settled market can never be settled again.
pub fn mark_settled<S: MarketStore + ?Sized>(
    store: &mut S,
    market_id: &MarketId,
    winning_outcome: Outcome,
) -> Result<Market, EngineError> {
    let market = load(store, market_id)?;
    let next = settled(&market, winning_outcome)?;
    store.put(next.clone());
    Ok(next)
}
