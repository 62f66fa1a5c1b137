// ============================================================================
// Settlement Engine - Outcome Settlement Engine
// ============================================================================
//
// The market state machine. Five transitions, each atomic:
//
//   initialize_market   record + two outcome issuers + empty vault
//   split               1 collateral  -> 1 A + 1 B
//   merge               1 A + 1 B     -> 1 collateral
//   set_winning_side    one-way settlement, mint authority revoked
//   claim_rewards       1 winning token -> 1 collateral
//
// Every transition follows the same shape:
//
//   1. load + validate against the registry and current balances
//   2. check the conservation invariant on the current snapshot
//   3. stage all ledger ops in one `LedgerBatch`
//   4. project the post-batch snapshot and check the invariant on it
//   5. commit the batch (all-or-nothing), then write the registry
//
// Nothing is written before step 5, so any rejection leaves both the
// ledger and the registry exactly as they were.
//
// ============================================================================

pub mod claim;
pub mod initialize;
pub mod invariants;
pub mod journal;
pub mod merge;
pub mod settle;
pub mod split;

pub use invariants::{Delta, MarketSnapshot};
pub use journal::{Journal, JournalEntry, TransitionKind};

use crate::address::{token_account, Address};
use crate::error::EngineError;
use crate::ledger::{InMemoryLedger, LedgerBatch, TokenLedger};
use crate::market::{Market, MarketId, MarketView};
use crate::registry::{self, InMemoryRegistry, MarketStore};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Engine shared between request handlers. Holding the lock is what makes
/// a transition exclusive.
pub type SharedEngine<L = InMemoryLedger, R = InMemoryRegistry> = Arc<Mutex<SettlementEngine<L, R>>>;

// ============================================================================
// STATS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub markets_created: u64,
    pub markets_settled: u64,
    pub total_split: u64,
    pub total_merged: u64,
    pub total_claimed: u64,
    pub rejected: u64,
    pub integrity_faults: u64,
}

/// Collateral, A and B balances of one owner in one market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub owner: Address,
    pub collateral: u64,
    pub outcome_a: u64,
    pub outcome_b: u64,
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct SettlementEngine<L = InMemoryLedger, R = InMemoryRegistry> {
    ledger: L,
    registry: R,
    journal: Journal,
    stats: EngineStats,
}

impl<L: TokenLedger, R: MarketStore> SettlementEngine<L, R> {
    pub fn new(ledger: L, registry: R) -> Self {
        Self::from_parts(ledger, registry, Journal::new(), EngineStats::default())
    }

    /// Rebuild an engine from previously saved parts
    pub fn from_parts(ledger: L, registry: R, journal: Journal, stats: EngineStats) -> Self {
        Self { ledger, registry, journal, stats }
    }

    pub fn shared(self) -> SharedEngine<L, R> {
        Arc::new(Mutex::new(self))
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn journal_entries(&self) -> &Journal {
        &self.journal
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// GetMarket
    pub fn get_market(&self, market_id: &MarketId) -> Result<MarketView, EngineError> {
        registry::load(&self.registry, market_id).map(|m| m.view())
    }

    pub fn snapshot(&self, market_id: &MarketId) -> Result<MarketSnapshot, EngineError> {
        let market = registry::load(&self.registry, market_id)?;
        Ok(MarketSnapshot::read(&self.ledger, &market))
    }

    pub fn position(&self, market_id: &MarketId, owner: &Address) -> Result<Position, EngineError> {
        let market = registry::load(&self.registry, market_id)?;
        Ok(Position {
            owner: *owner,
            collateral: self.ledger.balance(&token_account(owner, &market.collateral_asset)),
            outcome_a: self.ledger.balance(&token_account(owner, &market.outcome_a_issuer)),
            outcome_b: self.ledger.balance(&token_account(owner, &market.outcome_b_issuer)),
        })
    }

    pub fn journal(&self, market_id: &MarketId) -> Result<Vec<JournalEntry>, EngineError> {
        registry::load(&self.registry, market_id)?;
        Ok(self.journal.for_market(market_id))
    }

    pub fn market_ids(&self) -> Vec<MarketId> {
        self.registry.ids()
    }

    // ------------------------------------------------------------------------
    // Shared transition steps
    // ------------------------------------------------------------------------

    /// Load a market and check the invariant on its current state
    fn load_checked(&self, market_id: &MarketId) -> Result<(Market, MarketSnapshot), EngineError> {
        let market = registry::load(&self.registry, market_id)?;
        let snapshot = MarketSnapshot::read(&self.ledger, &market);
        snapshot.check()?;
        Ok((market, snapshot))
    }

    /// Commit a validated batch and, if given, the new market record.
    ///
    /// `expected` is the projected post-commit snapshot. A mismatch after
    /// commit means the ledger applied something other than what it was
    /// given. It cannot be rolled back; it is logged and returned as an
    /// `InvariantViolation`, which `finish` counts as an integrity fault.
    fn commit(&mut self, batch: LedgerBatch, record: Option<Market>, expected: &MarketSnapshot) -> Result<(), EngineError> {
        let ops = batch.commit(&mut self.ledger)?;
        debug!(ops, market = %expected.market_id, "ledger batch committed");

        let market = match record {
            Some(m) => {
                self.registry.put(m.clone());
                m
            }
            None => registry::load(&self.registry, &expected.market_id)?,
        };

        let actual = MarketSnapshot::read(&self.ledger, &market);
        if actual != *expected {
            error!(
                market = %market.market_id,
                ?expected,
                ?actual,
                "🚨 post-commit snapshot differs from projection"
            );
            return Err(EngineError::InvariantViolation(format!(
                "market {}: ledger state after commit differs from projection",
                market.market_id
            )));
        }
        Ok(())
    }

    /// Journal a success or count and log a rejection
    fn finish(&mut self, op: &'static str, result: Result<JournalEntry, EngineError>) -> Result<JournalEntry, EngineError> {
        match &result {
            Ok(entry) => {
                info!(
                    op,
                    id = %entry.id,
                    market = %entry.market_id,
                    actor = %entry.actor.short(),
                    amount = entry.amount,
                    "✅ transition committed"
                );
                self.journal.record(entry.clone());
            }
            Err(e) if e.is_fatal() => {
                self.stats.rejected += 1;
                self.stats.integrity_faults += 1;
                error!(op, error = %e, "🚨 integrity fault, transition refused");
            }
            Err(e) => {
                self.stats.rejected += 1;
                warn!(op, error = %e, "transition rejected");
            }
        }
        result
    }
}

impl Default for SettlementEngine {
    fn default() -> Self {
        Self::new(InMemoryLedger::new(), InMemoryRegistry::new())
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::error::LedgerError;
    use crate::ledger::{AssetInfo, LedgerOp, TokenAccount};

    /// Ledger that mints twice what it is asked to
    struct DoubleMintLedger(InMemoryLedger);

    impl TokenLedger for DoubleMintLedger {
        fn asset(&self, asset: &Address) -> Option<AssetInfo> {
            self.0.asset(asset)
        }

        fn account(&self, account: &Address) -> Option<TokenAccount> {
            self.0.account(account)
        }

        fn apply(&mut self, ops: &[LedgerOp]) -> Result<(), LedgerError> {
            let ops: Vec<LedgerOp> = ops
                .iter()
                .map(|op| match op {
                    LedgerOp::MintTo { asset, account, amount, authority } => LedgerOp::MintTo {
                        asset: *asset,
                        account: *account,
                        amount: amount * 2,
                        authority: *authority,
                    },
                    other => other.clone(),
                })
                .collect();
            self.0.apply(&ops)
        }
    }

    #[test]
    fn test_reads_on_missing_market() {
        let engine = SettlementEngine::default();
        let id = market_id(9);
        assert_eq!(engine.get_market(&id), Err(EngineError::MarketNotFound(id)));
        assert_eq!(engine.snapshot(&id), Err(EngineError::MarketNotFound(id)));
        assert!(engine.journal(&id).is_err());
    }

    #[test]
    fn test_position_of_unknown_owner_is_zero() {
        let engine = engine_with_market(1_000);
        let p = engine.position(&market_id(1), &Address([42; 32])).unwrap();
        assert_eq!((p.collateral, p.outcome_a, p.outcome_b), (0, 0, 0));
    }

    #[test]
    fn test_rejections_are_counted_not_journaled() {
        let mut engine = engine_with_market(1_000);
        let before = engine.journal_entries().len();

        assert!(engine.split(&market_id(1), 0, &user(1)).is_err());
        assert!(engine.claim_rewards(&market_id(1), &user(1)).is_err());

        assert_eq!(engine.journal_entries().len(), before);
        assert_eq!(engine.stats().rejected, 2);
        assert_eq!(engine.stats().integrity_faults, 0);
    }

    #[test]
    fn test_post_commit_mismatch_reaches_caller() {
        let ledger = DoubleMintLedger(funded_ledger(&[Address([1; 32])], 1_000));
        let mut engine = SettlementEngine::new(ledger, InMemoryRegistry::new());
        engine.initialize_market(market_id(1), usdc(), &user(100)).unwrap();

        let err = engine.split(&market_id(1), 100, &user(1)).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));
        assert_eq!(engine.stats().integrity_faults, 1);
        assert_eq!(engine.stats().total_split, 0);
        assert_eq!(engine.journal_entries().len(), 1);
    }
}
