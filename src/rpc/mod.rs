// ============================================================================
// RPC - signed request decoding and dispatch
// ============================================================================

pub mod nonces;
pub mod signed_request;

pub use nonces::NonceTracker;
pub use signed_request::{RequestError, RequestPayload, RequestType, SignedRequest, TX_EXPIRY_SECS};

use crate::capability::Capability;
use crate::engine::{JournalEntry, SettlementEngine};
use crate::error::EngineError;
use crate::ledger::TokenLedger;
use crate::market::Outcome;
use crate::registry::MarketStore;

/// Run a verified payload against the engine
pub fn dispatch<L: TokenLedger, R: MarketStore>(
    engine: &mut SettlementEngine<L, R>,
    payload: &RequestPayload,
    caller: &Capability,
) -> Result<JournalEntry, EngineError> {
    match payload {
        RequestPayload::InitializeMarket { market_id, collateral_asset } => {
            engine.initialize_market(*market_id, *collateral_asset, caller)
        }
        RequestPayload::Split { market_id, amount } => engine.split(market_id, *amount, caller),
        RequestPayload::Merge { market_id, amount } => engine.merge(market_id, *amount, caller),
        RequestPayload::SetWinningSide { market_id, outcome } => {
            let outcome: Outcome = outcome.parse()?;
            engine.set_winning_side(market_id, outcome, caller)
        }
        RequestPayload::ClaimRewards { market_id } => engine.claim_rewards(market_id, caller),
    }
}
