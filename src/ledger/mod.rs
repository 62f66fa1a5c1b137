// ============================================================================
// Token Ledger - Outcome Settlement Engine
// ============================================================================
//
// The ledger issues, burns and transfers fungible tokens. The engine never
// edits balances itself: it describes what should happen as a list of
// `LedgerOp`s and hands the whole list to `TokenLedger::apply`, which either
// applies every op or none of them.
//
// Ownership rules enforced by the ledger:
//   - MintTo needs the asset's mint authority
//   - Burn and Transfer need the owner of the source account
//   - Transfer needs matching assets and the asset's decimals
//
// ============================================================================

pub mod batch;
pub mod memory;

pub use batch::LedgerBatch;
pub use memory::InMemoryLedger;

use crate::address::Address;
use crate::error::LedgerError;
use serde::{Deserialize, Serialize};

// ============================================================================
// TYPES
// ============================================================================

/// An issued fungible asset (collateral or an outcome token)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub decimals: u8,
    pub supply: u64,
    /// `None` once revoked; nothing can be minted after that
    pub mint_authority: Option<Address>,
}

/// A balance of one asset held for one owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    pub asset: Address,
    pub owner: Address,
    pub amount: u64,
}

/// A single ledger mutation. Only meaningful as part of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LedgerOp {
    CreateAsset {
        asset: Address,
        decimals: u8,
        mint_authority: Option<Address>,
    },
    OpenAccount {
        account: Address,
        asset: Address,
        owner: Address,
    },
    MintTo {
        asset: Address,
        account: Address,
        amount: u64,
        authority: Address,
    },
    Burn {
        account: Address,
        amount: u64,
        authority: Address,
    },
    Transfer {
        from: Address,
        to: Address,
        amount: u64,
        decimals: u8,
        authority: Address,
    },
    RevokeMintAuthority {
        asset: Address,
        authority: Address,
    },
}

// ============================================================================
// LEDGER CAPABILITY
// ============================================================================

/// The token ledger as seen by the engine
pub trait TokenLedger {
    fn asset(&self, asset: &Address) -> Option<AssetInfo>;

    fn account(&self, account: &Address) -> Option<TokenAccount>;

    /// Apply every op in order, or none of them.
    fn apply(&mut self, ops: &[LedgerOp]) -> Result<(), LedgerError>;

    /// Balance of a token account (0 if it does not exist)
    fn balance(&self, account: &Address) -> u64 {
        self.account(account).map(|a| a.amount).unwrap_or(0)
    }

    /// Total supply of an asset (0 if it does not exist)
    fn supply(&self, asset: &Address) -> u64 {
        self.asset(asset).map(|a| a.supply).unwrap_or(0)
    }
}
