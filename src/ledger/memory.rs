// ============================================================================
// In-Memory Ledger
// ============================================================================
//
// A complete `TokenLedger` kept in two maps. `apply` runs the batch against
// a scratch overlay (copies of only the entries the batch touches) and
// writes the overlay back only if every op succeeded.
//
// ============================================================================

use super::{AssetInfo, LedgerOp, TokenAccount, TokenLedger};
use crate::address::Address;
use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryLedger {
    assets: HashMap<Address, AssetInfo>,
    accounts: HashMap<Address, TokenAccount>,
    /// Number of batches committed
    pub batches_applied: u64,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the batch against an overlay without touching `self`
    fn stage(&self, ops: &[LedgerOp]) -> Result<Overlay, LedgerError> {
        let mut overlay = Staging {
            base: self,
            assets: HashMap::new(),
            accounts: HashMap::new(),
        };
        for op in ops {
            overlay.run(op)?;
        }
        Ok(overlay.into_parts())
    }
}

impl TokenLedger for InMemoryLedger {
    fn asset(&self, asset: &Address) -> Option<AssetInfo> {
        self.assets.get(asset).copied()
    }

    fn account(&self, account: &Address) -> Option<TokenAccount> {
        self.accounts.get(account).copied()
    }

    fn apply(&mut self, ops: &[LedgerOp]) -> Result<(), LedgerError> {
        let (assets, accounts) = self.stage(ops)?;
        self.assets.extend(assets);
        self.accounts.extend(accounts);
        self.batches_applied += 1;
        Ok(())
    }
}

// ============================================================================
// OVERLAY
// ============================================================================

/// Owned copies of every entry a batch touched
type Overlay = (HashMap<Address, AssetInfo>, HashMap<Address, TokenAccount>);

struct Staging<'a> {
    base: &'a InMemoryLedger,
    assets: HashMap<Address, AssetInfo>,
    accounts: HashMap<Address, TokenAccount>,
}

impl<'a> Staging<'a> {
    fn into_parts(self) -> Overlay {
        (self.assets, self.accounts)
    }

    fn asset_exists(&self, id: &Address) -> bool {
        self.assets.contains_key(id) || self.base.assets.contains_key(id)
    }

    fn account_exists(&self, id: &Address) -> bool {
        self.accounts.contains_key(id) || self.base.accounts.contains_key(id)
    }

    fn asset_mut(&mut self, id: &Address) -> Result<&mut AssetInfo, LedgerError> {
        match self.assets.entry(*id) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let info = self.base.assets.get(id).copied().ok_or(LedgerError::AssetNotFound(*id))?;
                Ok(e.insert(info))
            }
        }
    }

    fn account_mut(&mut self, id: &Address) -> Result<&mut TokenAccount, LedgerError> {
        match self.accounts.entry(*id) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let acct = self.base.accounts.get(id).copied().ok_or(LedgerError::AccountNotFound(*id))?;
                Ok(e.insert(acct))
            }
        }
    }

    fn run(&mut self, op: &LedgerOp) -> Result<(), LedgerError> {
        match *op {
            LedgerOp::CreateAsset { asset, decimals, mint_authority } => {
                if self.asset_exists(&asset) {
                    return Err(LedgerError::AssetExists(asset));
                }
                self.assets.insert(asset, AssetInfo { decimals, supply: 0, mint_authority });
            }

            LedgerOp::OpenAccount { account, asset, owner } => {
                if self.account_exists(&account) {
                    return Err(LedgerError::AccountExists(account));
                }
                self.asset_mut(&asset)?;
                self.accounts.insert(account, TokenAccount { asset, owner, amount: 0 });
            }

            LedgerOp::MintTo { asset, account, amount, authority } => {
                let info = self.asset_mut(&asset)?;
                match info.mint_authority {
                    None => return Err(LedgerError::MintAuthorityRevoked(asset)),
                    Some(a) if a != authority => {
                        return Err(LedgerError::Unauthorized { signer: authority, target: asset })
                    }
                    Some(_) => {}
                }
                info.supply = info.supply.checked_add(amount).ok_or(LedgerError::Overflow)?;

                let acct = self.account_mut(&account)?;
                if acct.asset != asset {
                    return Err(LedgerError::AssetMismatch { account, expected: asset, actual: acct.asset });
                }
                acct.amount = acct.amount.checked_add(amount).ok_or(LedgerError::Overflow)?;
            }

            LedgerOp::Burn { account, amount, authority } => {
                let acct = self.account_mut(&account)?;
                if acct.owner != authority {
                    return Err(LedgerError::Unauthorized { signer: authority, target: account });
                }
                if acct.amount < amount {
                    return Err(LedgerError::InsufficientFunds {
                        account,
                        available: acct.amount,
                        requested: amount,
                    });
                }
                acct.amount -= amount;
                let asset = acct.asset;

                let info = self.asset_mut(&asset)?;
                info.supply = info.supply.checked_sub(amount).ok_or(LedgerError::Overflow)?;
            }

            LedgerOp::Transfer { from, to, amount, decimals, authority } => {
                let src = self.account_mut(&from)?;
                if src.owner != authority {
                    return Err(LedgerError::Unauthorized { signer: authority, target: from });
                }
                if src.amount < amount {
                    return Err(LedgerError::InsufficientFunds {
                        account: from,
                        available: src.amount,
                        requested: amount,
                    });
                }
                let asset = src.asset;

                let expected = self.asset_mut(&asset)?.decimals;
                if expected != decimals {
                    return Err(LedgerError::DecimalsMismatch { expected, actual: decimals });
                }

                let dst = self.account_mut(&to)?;
                if dst.asset != asset {
                    return Err(LedgerError::AssetMismatch { account: to, expected: asset, actual: dst.asset });
                }
                if from != to {
                    dst.amount = dst.amount.checked_add(amount).ok_or(LedgerError::Overflow)?;
                    // dst and src are distinct entries; re-borrow the source
                    self.account_mut(&from)?.amount -= amount;
                }
            }

            LedgerOp::RevokeMintAuthority { asset, authority } => {
                let info = self.asset_mut(&asset)?;
                match info.mint_authority {
                    None => return Err(LedgerError::MintAuthorityRevoked(asset)),
                    Some(a) if a != authority => {
                        return Err(LedgerError::Unauthorized { signer: authority, target: asset })
                    }
                    Some(_) => info.mint_authority = None,
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{collateral_asset, token_account};

    fn addr(n: u8) -> Address {
        Address([n; 32])
    }

    fn funded_ledger(owner: Address, amount: u64) -> (InMemoryLedger, Address, Address) {
        let mut ledger = InMemoryLedger::new();
        let usdc = collateral_asset("USDC");
        let treasury = addr(200);
        let acct = token_account(&owner, &usdc);
        ledger
            .apply(&[
                LedgerOp::CreateAsset { asset: usdc, decimals: 6, mint_authority: Some(treasury) },
                LedgerOp::OpenAccount { account: acct, asset: usdc, owner },
                LedgerOp::MintTo { asset: usdc, account: acct, amount, authority: treasury },
            ])
            .unwrap();
        (ledger, usdc, acct)
    }

    #[test]
    fn test_mint_updates_balance_and_supply() {
        let alice = addr(1);
        let (ledger, usdc, acct) = funded_ledger(alice, 1_000);

        assert_eq!(ledger.balance(&acct), 1_000);
        assert_eq!(ledger.supply(&usdc), 1_000);
        assert_eq!(ledger.batches_applied, 1);
    }

    #[test]
    fn test_failed_batch_leaves_no_trace() {
        let alice = addr(1);
        let bob = addr(2);
        let (mut ledger, usdc, alice_acct) = funded_ledger(alice, 1_000);
        let bob_acct = token_account(&bob, &usdc);

        // Second transfer overdraws, so the first must not stick either
        let result = ledger.apply(&[
            LedgerOp::OpenAccount { account: bob_acct, asset: usdc, owner: bob },
            LedgerOp::Transfer { from: alice_acct, to: bob_acct, amount: 600, decimals: 6, authority: alice },
            LedgerOp::Transfer { from: alice_acct, to: bob_acct, amount: 600, decimals: 6, authority: alice },
        ]);

        assert!(matches!(result, Err(LedgerError::InsufficientFunds { available: 400, requested: 600, .. })));
        assert_eq!(ledger.balance(&alice_acct), 1_000);
        assert!(ledger.account(&bob_acct).is_none());
        assert_eq!(ledger.batches_applied, 1);
    }

    #[test]
    fn test_transfer_requires_owner() {
        let alice = addr(1);
        let mallory = addr(3);
        let (mut ledger, usdc, alice_acct) = funded_ledger(alice, 100);
        let m_acct = token_account(&mallory, &usdc);

        let result = ledger.apply(&[
            LedgerOp::OpenAccount { account: m_acct, asset: usdc, owner: mallory },
            LedgerOp::Transfer { from: alice_acct, to: m_acct, amount: 50, decimals: 6, authority: mallory },
        ]);
        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
        assert_eq!(ledger.balance(&alice_acct), 100);
    }

    #[test]
    fn test_transfer_checks_decimals() {
        let alice = addr(1);
        let (mut ledger, _usdc, alice_acct) = funded_ledger(alice, 100);

        let result = ledger.apply(&[LedgerOp::Transfer {
            from: alice_acct,
            to: alice_acct,
            amount: 1,
            decimals: 9,
            authority: alice,
        }]);
        assert_eq!(result, Err(LedgerError::DecimalsMismatch { expected: 6, actual: 9 }));
    }

    #[test]
    fn test_revoked_mint_authority_blocks_mint() {
        let alice = addr(1);
        let (mut ledger, usdc, acct) = funded_ledger(alice, 10);
        let treasury = addr(200);

        ledger.apply(&[LedgerOp::RevokeMintAuthority { asset: usdc, authority: treasury }]).unwrap();
        let result = ledger.apply(&[LedgerOp::MintTo { asset: usdc, account: acct, amount: 1, authority: treasury }]);

        assert_eq!(result, Err(LedgerError::MintAuthorityRevoked(usdc)));
        assert_eq!(ledger.supply(&usdc), 10);
    }

    #[test]
    fn test_burn_reduces_supply() {
        let alice = addr(1);
        let (mut ledger, usdc, acct) = funded_ledger(alice, 10);

        ledger.apply(&[LedgerOp::Burn { account: acct, amount: 4, authority: alice }]).unwrap();
        assert_eq!(ledger.balance(&acct), 6);
        assert_eq!(ledger.supply(&usdc), 6);
    }

    #[test]
    fn test_mint_overflow_is_rejected() {
        let alice = addr(1);
        let (mut ledger, usdc, acct) = funded_ledger(alice, u64::MAX);
        let treasury = addr(200);

        let result = ledger.apply(&[LedgerOp::MintTo { asset: usdc, account: acct, amount: 1, authority: treasury }]);
        assert_eq!(result, Err(LedgerError::Overflow));
        assert_eq!(ledger.balance(&acct), u64::MAX);
    }

    #[test]
    fn test_duplicate_asset_and_account_rejected() {
        let alice = addr(1);
        let (mut ledger, usdc, acct) = funded_ledger(alice, 1);

        assert_eq!(
            ledger.apply(&[LedgerOp::CreateAsset { asset: usdc, decimals: 6, mint_authority: None }]),
            Err(LedgerError::AssetExists(usdc))
        );
        assert_eq!(
            ledger.apply(&[LedgerOp::OpenAccount { account: acct, asset: usdc, owner: alice }]),
            Err(LedgerError::AccountExists(acct))
        );
    }
}
