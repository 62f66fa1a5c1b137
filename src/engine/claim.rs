// ============================================================================
// ClaimRewards - Outcome Settlement Engine
// ============================================================================
//
// After settlement:
//   1 winning token -> 1 collateral
//
// The caller's whole winning balance is burned and the same amount of
// collateral leaves the vault. Losing tokens are left where they are; they
// can no longer be merged and redeem for nothing.
//
// ============================================================================

use super::{Delta, JournalEntry, SettlementEngine, TransitionKind};
use crate::address::token_account;
use crate::capability::Capability;
use crate::error::EngineError;
use crate::ledger::{LedgerBatch, TokenLedger};
use crate::market::{MarketId, Outcome};
use crate::registry::MarketStore;

impl<L: TokenLedger, R: MarketStore> SettlementEngine<L, R> {
    /// Redeem the caller's winning tokens 1:1 for collateral
    pub fn claim_rewards(&mut self, market_id: &MarketId, user: &Capability) -> Result<JournalEntry, EngineError> {
        let result = self.try_claim(market_id, user);
        if let Ok(entry) = &result {
            self.stats.total_claimed = self.stats.total_claimed.saturating_add(entry.amount);
        }
        self.finish("claim_rewards", result)
    }

    fn try_claim(&mut self, market_id: &MarketId, user: &Capability) -> Result<JournalEntry, EngineError> {
        let (market, current) = self.load_checked(market_id)?;
        if !market.is_settled {
            return Err(EngineError::MarketNotSettled(*market_id));
        }
        let winner = market.winning_outcome.ok_or_else(|| {
            EngineError::InvariantViolation(format!("market {} settled without a winning outcome", market_id))
        })?;

        let owner = user.identity();
        let winning_issuer = market.issuer(winner);
        let user_winning = token_account(&owner, &winning_issuer);
        let amount = self.ledger.balance(&user_winning);
        if amount == 0 {
            return Err(EngineError::ZeroBalance(owner));
        }

        if current.vault_balance < amount {
            return Err(EngineError::VaultUnderfunded { available: current.vault_balance, required: amount });
        }

        let (a, b) = match winner {
            Outcome::OutcomeA => (Delta::Sub(amount), Delta::Keep),
            Outcome::OutcomeB => (Delta::Keep, Delta::Sub(amount)),
        };
        let expected = current
            .project(Delta::Sub(amount), a, b)
            .ok_or(EngineError::Overflow("claim_rewards"))?;
        expected.check()?;

        let user_collateral = token_account(&owner, &market.collateral_asset);

        let mut batch = LedgerBatch::new();
        batch
            .open_account_if_missing(&self.ledger, user_collateral, market.collateral_asset, owner)
            .burn(user_winning, amount, owner)
            .transfer(market.collateral_vault, user_collateral, amount, market.decimals, market.market_address);

        self.commit(batch, None, &expected)?;

        Ok(JournalEntry::new(TransitionKind::ClaimRewards, *market_id, owner, amount, Some(winner)))
    }
}
