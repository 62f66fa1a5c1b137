// ============================================================================
// Merge - Outcome Settlement Engine
// ============================================================================
//
// Inverse of split:
//   1 A + 1 B -> 1 collateral
//
// Only before settlement. Once a winner is known, losing tokens are worth
// nothing and winning tokens redeem through claim_rewards.
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
    /// Burn `amount` of each outcome token and get `amount` collateral back
    pub fn merge(&mut self, market_id: &MarketId, amount: u64, user: &Capability) -> Result<JournalEntry, EngineError> {
        let result = self.try_merge(market_id, amount, user);
        if result.is_ok() {
            self.stats.total_merged = self.stats.total_merged.saturating_add(amount);
        }
        self.finish("merge", result)
    }

    fn try_merge(&mut self, market_id: &MarketId, amount: u64, user: &Capability) -> Result<JournalEntry, EngineError> {
        if amount == 0 {
            return Err(EngineError::InvalidAmount("merge amount must be greater than zero".into()));
        }

        let (market, current) = self.load_checked(market_id)?;
        if market.is_settled {
            return Err(EngineError::MarketSettled(*market_id));
        }

        let owner = user.identity();
        for outcome in Outcome::ALL {
            let available = self.ledger.balance(&token_account(&owner, &market.issuer(outcome)));
            if available < amount {
                return Err(EngineError::InsufficientOutcomeBalance { outcome, available, requested: amount });
            }
        }

        let expected = current
            .project(Delta::Sub(amount), Delta::Sub(amount), Delta::Sub(amount))
            .ok_or(EngineError::VaultUnderfunded { available: current.vault_balance, required: amount })?;
        expected.check()?;

        let user_collateral = token_account(&owner, &market.collateral_asset);

        let mut batch = LedgerBatch::new();
        batch
            .open_account_if_missing(&self.ledger, user_collateral, market.collateral_asset, owner)
            .burn(token_account(&owner, &market.outcome_a_issuer), amount, owner)
            .burn(token_account(&owner, &market.outcome_b_issuer), amount, owner)
            .transfer(market.collateral_vault, user_collateral, amount, market.decimals, market.market_address);

        self.commit(batch, None, &expected)?;

        Ok(JournalEntry::new(TransitionKind::Merge, *market_id, owner, amount, None))
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::address::Address;

    #[test]
    fn test_merge_returns_collateral() {
        let mut engine = engine_with_market(1_000);
        engine.split(&market_id(1), 500, &user(1)).unwrap();
        engine.merge(&market_id(1), 200, &user(1)).unwrap();

        let p = engine.position(&market_id(1), &Address([1; 32])).unwrap();
        assert_eq!((p.collateral, p.outcome_a, p.outcome_b), (700, 300, 300));

        let s = engine.snapshot(&market_id(1)).unwrap();
        assert_eq!((s.vault_balance, s.outcome_a_supply, s.outcome_b_supply), (300, 300, 300));
    }

    #[test]
    fn test_split_then_merge_restores_balances() {
        let mut engine = engine_with_market(1_000);
        let before = engine.position(&market_id(1), &Address([1; 32])).unwrap();

        engine.split(&market_id(1), 321, &user(1)).unwrap();
        engine.merge(&market_id(1), 321, &user(1)).unwrap();

        assert_eq!(engine.position(&market_id(1), &Address([1; 32])).unwrap(), before);
        let s = engine.snapshot(&market_id(1)).unwrap();
        assert_eq!((s.vault_balance, s.outcome_a_supply, s.outcome_b_supply), (0, 0, 0));
    }

    #[test]
    fn test_merge_needs_both_sides() {
        let mut engine = engine_with_market(1_000);
        engine.split(&market_id(1), 100, &user(1)).unwrap();

        let err = engine.merge(&market_id(1), 101, &user(1)).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientOutcomeBalance { outcome: Outcome::OutcomeA, available: 100, requested: 101 }
        );

        // Someone else's tokens don't count
        let err = engine.merge(&market_id(1), 1, &user(2)).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientOutcomeBalance { available: 0, .. }));
    }

    #[test]
    fn test_merge_zero_rejected() {
        let mut engine = engine_with_market(1_000);
        assert!(matches!(engine.merge(&market_id(1), 0, &user(1)), Err(EngineError::InvalidAmount(_))));
    }

    #[test]
    fn test_merge_after_settlement_rejected() {
        let mut engine = engine_with_market(1_000);
        engine.split(&market_id(1), 100, &user(1)).unwrap();
        engine.set_winning_side(&market_id(1), Outcome::OutcomeB, &user(100)).unwrap();

        assert_eq!(
            engine.merge(&market_id(1), 50, &user(1)),
            Err(EngineError::MarketSettled(market_id(1)))
        );
        let p = engine.position(&market_id(1), &Address([1; 32])).unwrap();
        assert_eq!((p.outcome_a, p.outcome_b), (100, 100));
    }
}
