//! Record of committed transitions.
//!
//! Only successful transitions are journaled; a rejected transition leaves
//! no entry, same as it leaves no ledger or registry change.

use crate::address::Address;
use crate::market::{now, MarketId, Outcome};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    InitializeMarket,
    Split,
    Merge,
    SetWinningSide,
    ClaimRewards,
}

impl TransitionKind {
    fn id_prefix(&self) -> &'static str {
        match self {
            TransitionKind::InitializeMarket => "init",
            TransitionKind::Split => "split",
            TransitionKind::Merge => "merge",
            TransitionKind::SetWinningSide => "settle",
            TransitionKind::ClaimRewards => "claim",
        }
    }
}

/// One committed transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub kind: TransitionKind,
    pub market_id: MarketId,
    /// Authority for init/settle, the user otherwise
    pub actor: Address,
    /// Collateral units moved (0 for init and settle)
    pub amount: u64,
    /// Winning side for settle, redeemed side for claim
    pub outcome: Option<Outcome>,
    pub timestamp: u64,
}

impl JournalEntry {
    pub fn new(kind: TransitionKind, market_id: MarketId, actor: Address, amount: u64, outcome: Option<Outcome>) -> Self {
        let id = format!("{}_{}", kind.id_prefix(), &Uuid::new_v4().simple().to_string()[..12]);
        Self {
            id,
            kind,
            market_id,
            actor,
            amount,
            outcome,
            timestamp: now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries for one market, oldest first
    pub fn for_market(&self, market_id: &MarketId) -> Vec<JournalEntry> {
        self.entries.iter().filter(|e| e.market_id == *market_id).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_ids_are_prefixed_and_unique() {
        let m = MarketId([1; 16]);
        let a = JournalEntry::new(TransitionKind::Split, m, Address::default(), 5, None);
        let b = JournalEntry::new(TransitionKind::Split, m, Address::default(), 5, None);
        assert!(a.id.starts_with("split_"));
        assert_eq!(a.id.len(), "split_".len() + 12);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_filters() {
        let m1 = MarketId([1; 16]);
        let m2 = MarketId([2; 16]);
        let alice = Address([1; 32]);
        let bob = Address([2; 32]);

        let mut j = Journal::new();
        j.record(JournalEntry::new(TransitionKind::Split, m1, alice, 10, None));
        j.record(JournalEntry::new(TransitionKind::Split, m2, bob, 20, None));
        j.record(JournalEntry::new(TransitionKind::Merge, m1, alice, 5, None));

        let m1_entries = j.for_market(&m1);
        assert_eq!(m1_entries.len(), 2);
        assert_eq!(m1_entries[1].kind, TransitionKind::Merge);
        assert_eq!(j.for_market(&m2)[0].actor, bob);
        assert_eq!(j.len(), 3);
    }
}
