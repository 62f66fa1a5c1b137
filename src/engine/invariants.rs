// ============================================================================
// Conservation Invariants
// ============================================================================
//
// Before settlement:
//   outcome_a_supply == outcome_b_supply == vault_balance
//
// After settlement (1:1 redemption):
//   vault_balance    == winning_supply
//
// A vault short of what it owes is `VaultUnderfunded`; any other mismatch,
// including collateral no token backs, is `InvariantViolation`.
//
// Every transition checks the current snapshot on entry, projects the
// snapshot its batch will produce and checks that too, all before the batch
// is handed to the ledger.
//
// ============================================================================

use crate::error::EngineError;
use crate::ledger::TokenLedger;
use crate::market::{Market, MarketId, Outcome};
use serde::{Deserialize, Serialize};

/// Vault and supply figures for one market at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub market_id: MarketId,
    pub vault_balance: u64,
    pub outcome_a_supply: u64,
    pub outcome_b_supply: u64,
    pub is_settled: bool,
    pub winning_outcome: Option<Outcome>,
}

/// A change to one of the three tracked quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delta {
    Keep,
    Add(u64),
    Sub(u64),
}

impl Delta {
    fn on(self, value: u64) -> Option<u64> {
        match self {
            Delta::Keep => Some(value),
            Delta::Add(n) => value.checked_add(n),
            Delta::Sub(n) => value.checked_sub(n),
        }
    }
}

impl MarketSnapshot {
    pub fn read<L: TokenLedger + ?Sized>(ledger: &L, market: &Market) -> Self {
        Self {
            market_id: market.market_id,
            vault_balance: ledger.balance(&market.collateral_vault),
            outcome_a_supply: ledger.supply(&market.outcome_a_issuer),
            outcome_b_supply: ledger.supply(&market.outcome_b_issuer),
            is_settled: market.is_settled,
            winning_outcome: market.winning_outcome,
        }
    }

    pub fn supply(&self, outcome: Outcome) -> u64 {
        match outcome {
            Outcome::OutcomeA => self.outcome_a_supply,
            Outcome::OutcomeB => self.outcome_b_supply,
        }
    }

    /// Snapshot after applying the deltas. `None` on overflow/underflow.
    pub fn project(&self, vault: Delta, a: Delta, b: Delta) -> Option<Self> {
        Some(Self {
            vault_balance: vault.on(self.vault_balance)?,
            outcome_a_supply: a.on(self.outcome_a_supply)?,
            outcome_b_supply: b.on(self.outcome_b_supply)?,
            ..*self
        })
    }

    pub fn check(&self) -> Result<(), EngineError> {
        let owed = if self.is_settled {
            let winner = self.winning_outcome.ok_or_else(|| {
                EngineError::InvariantViolation(format!("market {}: settled without a winning outcome", self.market_id))
            })?;
            self.supply(winner)
        } else {
            if self.outcome_a_supply != self.outcome_b_supply {
                return Err(EngineError::InvariantViolation(format!(
                    "market {}: outcome supplies diverged before settlement (A={}, B={})",
                    self.market_id, self.outcome_a_supply, self.outcome_b_supply
                )));
            }
            self.outcome_a_supply
        };

        if self.vault_balance < owed {
            return Err(EngineError::VaultUnderfunded {
                available: self.vault_balance,
                required: owed,
            });
        }
        if self.vault_balance > owed {
            return Err(EngineError::InvariantViolation(format!(
                "market {}: vault holds {} but outstanding tokens claim {}",
                self.market_id, self.vault_balance, owed
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(vault: u64, a: u64, b: u64) -> MarketSnapshot {
        MarketSnapshot {
            market_id: MarketId([0; 16]),
            vault_balance: vault,
            outcome_a_supply: a,
            outcome_b_supply: b,
            is_settled: false,
            winning_outcome: None,
        }
    }

    #[test]
    fn test_balanced_market_passes() {
        assert!(snap(100, 100, 100).check().is_ok());
        assert!(snap(0, 0, 0).check().is_ok());
    }

    #[test]
    fn test_diverged_supply_fails() {
        assert!(matches!(snap(100, 100, 90).check(), Err(EngineError::InvariantViolation(_))));
    }

    #[test]
    fn test_underfunded_vault_fails() {
        assert_eq!(
            snap(90, 100, 100).check(),
            Err(EngineError::VaultUnderfunded { available: 90, required: 100 })
        );
    }

    #[test]
    fn test_settled_market_only_owes_winners() {
        let mut s = snap(30, 50, 30);
        s.is_settled = true;
        s.winning_outcome = Some(Outcome::OutcomeB);
        assert!(s.check().is_ok());

        s.winning_outcome = Some(Outcome::OutcomeA);
        assert!(s.check().is_err());
    }

    #[test]
    fn test_unbacked_vault_collateral_fails() {
        assert!(matches!(snap(150, 100, 100).check(), Err(EngineError::InvariantViolation(_))));

        let mut s = snap(40, 50, 30);
        s.is_settled = true;
        s.winning_outcome = Some(Outcome::OutcomeB);
        assert!(matches!(s.check(), Err(EngineError::InvariantViolation(_))));
    }

    #[test]
    fn test_project_detects_overflow_and_underflow() {
        let s = snap(10, 10, 10);
        assert!(s.project(Delta::Add(u64::MAX), Delta::Keep, Delta::Keep).is_none());
        assert!(s.project(Delta::Sub(11), Delta::Keep, Delta::Keep).is_none());

        let p = s.project(Delta::Add(5), Delta::Add(5), Delta::Add(5)).unwrap();
        assert_eq!((p.vault_balance, p.outcome_a_supply, p.outcome_b_supply), (15, 15, 15));
    }
}
