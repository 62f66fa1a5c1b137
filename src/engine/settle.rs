//! SetWinningSide.
//!
//! Records the winner and revokes the mint authority of both outcome
//! issuers in one batch. No balances move. Settlement is permanent.

use super::{JournalEntry, SettlementEngine, TransitionKind};
use crate::capability::Capability;
use crate::error::EngineError;
use crate::ledger::{LedgerBatch, TokenLedger};
use crate::market::{MarketId, Outcome};
use crate::registry::{self, MarketStore};

impl<L: TokenLedger, R: MarketStore> SettlementEngine<L, R> {
    pub fn set_winning_side(
        &mut self,
        market_id: &MarketId,
        outcome: Outcome,
        authority: &Capability,
    ) -> Result<JournalEntry, EngineError> {
        let result = self.try_settle(market_id, outcome, authority);
        if result.is_ok() {
            self.stats.markets_settled += 1;
        }
        self.finish("set_winning_side", result)
    }

    fn try_settle(
        &mut self,
        market_id: &MarketId,
        outcome: Outcome,
        authority: &Capability,
    ) -> Result<JournalEntry, EngineError> {
        let (market, current) = self.load_checked(market_id)?;
        if !authority.is(&market.authority) {
            return Err(EngineError::Unauthorized(authority.identity()));
        }
        let next = registry::settled(&market, outcome)?;

        let mut expected = current;
        expected.is_settled = true;
        expected.winning_outcome = Some(outcome);
        expected.check()?;

        let mut batch = LedgerBatch::new();
        batch
            .revoke_mint_authority(market.outcome_a_issuer, market.market_address)
            .revoke_mint_authority(market.outcome_b_issuer, market.market_address);

        self.commit(batch, Some(next), &expected)?;

        Ok(JournalEntry::new(TransitionKind::SetWinningSide, *market_id, authority.identity(), 0, Some(outcome)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::address::Address;

    #[test]
    fn test_settle_records_winner() {
        let mut engine = engine_with_market(1_000);
        engine.split(&market_id(1), 100, &user(1)).unwrap();
        let entry = engine.set_winning_side(&market_id(1), Outcome::OutcomeB, &user(100)).unwrap();
        assert_eq!(entry.outcome, Some(Outcome::OutcomeB));

        let view = engine.get_market(&market_id(1)).unwrap();
        assert!(view.is_settled);
        assert_eq!(view.winning_outcome, Some(Outcome::OutcomeB));

        // No balances moved
        let s = engine.snapshot(&market_id(1)).unwrap();
        assert_eq!((s.vault_balance, s.outcome_a_supply, s.outcome_b_supply), (100, 100, 100));
    }

    #[test]
    fn test_settle_revokes_mint_authority() {
        let mut engine = engine_with_market(1_000);
        engine.set_winning_side(&market_id(1), Outcome::OutcomeA, &user(100)).unwrap();
        let view = engine.get_market(&market_id(1)).unwrap();

        assert_eq!(engine.ledger().asset(&view.outcome_a_issuer).unwrap().mint_authority, None);
        assert_eq!(engine.ledger().asset(&view.outcome_b_issuer).unwrap().mint_authority, None);
    }

    #[test]
    fn test_only_authority_can_settle() {
        let mut engine = engine_with_market(1_000);
        let err = engine.set_winning_side(&market_id(1), Outcome::OutcomeA, &user(1)).unwrap_err();
        assert_eq!(err, EngineError::Unauthorized(Address([1; 32])));
        assert!(!engine.get_market(&market_id(1)).unwrap().is_settled);
    }

    #[test]
    fn test_settlement_is_irreversible() {
        let mut engine = engine_with_market(1_000);
        engine.set_winning_side(&market_id(1), Outcome::OutcomeA, &user(100)).unwrap();

        for outcome in Outcome::ALL {
            assert_eq!(
                engine.set_winning_side(&market_id(1), outcome, &user(100)),
                Err(EngineError::AlreadySettled(market_id(1)))
            );
        }
        assert_eq!(engine.get_market(&market_id(1)).unwrap().winning_outcome, Some(Outcome::OutcomeA));
        assert_eq!(engine.stats().markets_settled, 1);
    }

    #[test]
    fn test_settle_missing_market() {
        let mut engine = engine_with_market(1_000);
        assert_eq!(
            engine.set_winning_side(&market_id(3), Outcome::OutcomeA, &user(100)),
            Err(EngineError::MarketNotFound(market_id(3)))
        );
    }
}
