// ============================================================================
// InitializeMarket
// ============================================================================
//
// Creates the market record, both outcome issuers (zero supply, the market
// address as mint authority, collateral decimals) and the empty vault.
//
// ============================================================================

use super::{JournalEntry, MarketSnapshot, SettlementEngine, TransitionKind};
use crate::address::Address;
use crate::capability::Capability;
use crate::error::EngineError;
use crate::ledger::{LedgerBatch, TokenLedger};
use crate::market::{Market, MarketId};
use crate::registry::{self, MarketStore};

impl<L: TokenLedger, R: MarketStore> SettlementEngine<L, R> {
    /// Create a market whose authority is the caller
    pub fn initialize_market(
        &mut self,
        market_id: MarketId,
        collateral_asset: Address,
        authority: &Capability,
    ) -> Result<JournalEntry, EngineError> {
        let result = self.try_initialize(market_id, collateral_asset, authority);
        if result.is_ok() {
            self.stats.markets_created += 1;
        }
        self.finish("initialize_market", result)
    }

    fn try_initialize(
        &mut self,
        market_id: MarketId,
        collateral_asset: Address,
        authority: &Capability,
    ) -> Result<JournalEntry, EngineError> {
        let collateral = self
            .ledger
            .asset(&collateral_asset)
            .ok_or(EngineError::UnknownCollateral(collateral_asset))?;

        let market = registry::prepare_create(
            &self.registry,
            market_id,
            authority.identity(),
            collateral_asset,
            collateral.decimals,
        )?;

        let batch = stage(&market);

        // Issuers and vault don't exist yet, so this reads all zeros
        let expected = MarketSnapshot::read(&self.ledger, &market);
        expected.check()?;

        self.commit(batch, Some(market), &expected)?;

        Ok(JournalEntry::new(TransitionKind::InitializeMarket, market_id, authority.identity(), 0, None))
    }
}

fn stage(market: &Market) -> LedgerBatch {
    let mut batch = LedgerBatch::new();
    batch
        .create_asset(market.outcome_a_issuer, market.decimals, market.market_address)
        .create_asset(market.outcome_b_issuer, market.decimals, market.market_address)
        .open_account(market.collateral_vault, market.collateral_asset, market.market_address);
    batch
}
