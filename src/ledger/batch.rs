//! Staged ledger mutations.
//!
//! A transition collects its ops in a `LedgerBatch` and commits them in one
//! `TokenLedger::apply` call. Nothing reaches the ledger before `commit`.

use super::{LedgerOp, TokenLedger};
use crate::address::Address;
use crate::error::LedgerError;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LedgerBatch {
    ops: Vec<LedgerOp>,
}

impl LedgerBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn create_asset(&mut self, asset: Address, decimals: u8, mint_authority: Address) -> &mut Self {
        self.ops.push(LedgerOp::CreateAsset { asset, decimals, mint_authority: Some(mint_authority) });
        self
    }

    pub fn open_account(&mut self, account: Address, asset: Address, owner: Address) -> &mut Self {
        self.ops.push(LedgerOp::OpenAccount { account, asset, owner });
        self
    }

    /// Open `account` unless the ledger (or this batch) already has it
    pub fn open_account_if_missing<L: TokenLedger + ?Sized>(
        &mut self,
        ledger: &L,
        account: Address,
        asset: Address,
        owner: Address,
    ) -> &mut Self {
        let staged = self
            .ops
            .iter()
            .any(|op| matches!(op, LedgerOp::OpenAccount { account: a, .. } if *a == account));
        if !staged && ledger.account(&account).is_none() {
            self.open_account(account, asset, owner);
        }
        self
    }

    pub fn mint_to(&mut self, asset: Address, account: Address, amount: u64, authority: Address) -> &mut Self {
        self.ops.push(LedgerOp::MintTo { asset, account, amount, authority });
        self
    }

    pub fn burn(&mut self, account: Address, amount: u64, authority: Address) -> &mut Self {
        self.ops.push(LedgerOp::Burn { account, amount, authority });
        self
    }

    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: u64,
        decimals: u8,
        authority: Address,
    ) -> &mut Self {
        self.ops.push(LedgerOp::Transfer { from, to, amount, decimals, authority });
        self
    }

    pub fn revoke_mint_authority(&mut self, asset: Address, authority: Address) -> &mut Self {
        self.ops.push(LedgerOp::RevokeMintAuthority { asset, authority });
        self
    }

    /// Hand every staged op to the ledger at once
    pub fn commit<L: TokenLedger + ?Sized>(self, ledger: &mut L) -> Result<usize, LedgerError> {
        let count = self.ops.len();
        if count > 0 {
            ledger.apply(&self.ops)?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{collateral_asset, token_account};
    use crate::ledger::InMemoryLedger;

    #[test]
    fn test_open_if_missing_is_idempotent_within_batch() {
        let ledger = InMemoryLedger::new();
        let owner = Address([1; 32]);
        let usdc = collateral_asset("USDC");
        let acct = token_account(&owner, &usdc);

        let mut batch = LedgerBatch::new();
        batch.create_asset(usdc, 6, owner);
        batch.open_account_if_missing(&ledger, acct, usdc, owner);
        batch.open_account_if_missing(&ledger, acct, usdc, owner);

        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_commit_applies_all_ops() {
        let mut ledger = InMemoryLedger::new();
        let owner = Address([1; 32]);
        let usdc = collateral_asset("USDC");
        let acct = token_account(&owner, &usdc);

        let mut batch = LedgerBatch::new();
        batch
            .create_asset(usdc, 6, owner)
            .open_account(acct, usdc, owner)
            .mint_to(usdc, acct, 500, owner);

        assert_eq!(batch.commit(&mut ledger), Ok(3));
        assert_eq!(ledger.balance(&acct), 500);
    }

    #[test]
    fn test_empty_commit_does_not_touch_ledger() {
        let mut ledger = InMemoryLedger::new();
        assert_eq!(LedgerBatch::new().commit(&mut ledger), Ok(0));
        assert_eq!(ledger.batches_applied, 0);
    }
}
