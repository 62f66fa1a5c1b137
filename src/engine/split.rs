// ============================================================================
// Split - Outcome Settlement Engine
// ============================================================================
//
// Core mechanic:
//   1 collateral -> 1 A + 1 B
//
// The collateral moves from the user into the market vault and both outcome
// issuers mint the same amount to the user. Supplies stay equal to each
// other and to the vault.
//
// ============================================================================

use super::{Delta, JournalEntry, SettlementEngine, TransitionKind};
use crate::address::token_account;
use crate::capability::Capability;
use crate::error::EngineError;
use crate::ledger::{LedgerBatch, TokenLedger};
use crate::market::MarketId;
use crate::registry::MarketStore;

impl<L: TokenLedger, R: MarketStore> SettlementEngine<L, R> {
    /// Lock `amount` collateral and receive `amount` of each outcome token
    pub fn split(&mut self, market_id: &MarketId, amount: u64, user: &Capability) -> Result<JournalEntry, EngineError> {
        let result = self.try_split(market_id, amount, user);
        if result.is_ok() {
            self.stats.total_split = self.stats.total_split.saturating_add(amount);
        }
        self.finish("split", result)
    }

    fn try_split(&mut self, market_id: &MarketId, amount: u64, user: &Capability) -> Result<JournalEntry, EngineError> {
        if amount == 0 {
            return Err(EngineError::InvalidAmount("split amount must be greater than zero".into()));
        }

        let (market, current) = self.load_checked(market_id)?;
        if market.is_settled {
            return Err(EngineError::MarketSettled(*market_id));
        }

        let owner = user.identity();
        let user_collateral = token_account(&owner, &market.collateral_asset);
        let available = self.ledger.balance(&user_collateral);
        if available < amount {
            return Err(EngineError::InsufficientCollateral { available, requested: amount });
        }

        // A user's outcome balance never exceeds supply, so checking the
        // supplies covers their accounts too
        let expected = current
            .project(Delta::Add(amount), Delta::Add(amount), Delta::Add(amount))
            .ok_or_else(|| EngineError::InvalidAmount(format!("split of {} overflows market totals", amount)))?;
        expected.check()?;

        let user_a = token_account(&owner, &market.outcome_a_issuer);
        let user_b = token_account(&owner, &market.outcome_b_issuer);

        let mut batch = LedgerBatch::new();
        batch
            .open_account_if_missing(&self.ledger, user_a, market.outcome_a_issuer, owner)
            .open_account_if_missing(&self.ledger, user_b, market.outcome_b_issuer, owner)
            .transfer(user_collateral, market.collateral_vault, amount, market.decimals, owner)
            .mint_to(market.outcome_a_issuer, user_a, amount, market.market_address)
            .mint_to(market.outcome_b_issuer, user_b, amount, market.market_address);

        self.commit(batch, None, &expected)?;

        Ok(JournalEntry::new(TransitionKind::Split, *market_id, owner, amount, None))
    }
}
