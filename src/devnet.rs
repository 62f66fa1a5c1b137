// ============================================================================
// Development Accounts - Outcome Settlement Engine
// ============================================================================
//
// Deterministic ed25519 accounts for local development and tests, plus the
// genesis ledger that funds them with collateral.
//
//   key      = SHA256(DEVNET_SEED || name)
//   address  = ed25519 public key bytes
//
// NEVER use these keys outside a development setup.
//
// ============================================================================

use crate::address::{collateral_asset, derive, token_account, Address, COLLATERAL_SEED};
use crate::capability::Capability;
use crate::error::LedgerError;
use crate::ledger::{InMemoryLedger, LedgerBatch};
use crate::rpc::{RequestError, RequestPayload, SignedRequest};
use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Master seed for the development keys
pub const DEVNET_SEED: &[u8; 32] = b"OUTCOME_SETTLEMENT_DEVNET_SEED01";

/// ORACLE is the usual market authority
pub const DEVNET_ACCOUNT_NAMES: [&str; 3] = ["ALICE", "BOB", "ORACLE"];

/// Symbol of the genesis collateral asset
pub const COLLATERAL_SYMBOL: &str = "USDC";

/// A development account with a deterministic keypair
#[derive(Clone)]
pub struct DevAccount {
    pub name: String,
    pub signing_key: SigningKey,
    pub verifying_key: VerifyingKey,
    pub address: Address,
}

impl DevAccount {
    pub fn from_seed(seed: &[u8; 32], name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(name.as_bytes());
        let derived: [u8; 32] = hasher.finalize().into();

        let signing_key = SigningKey::from_bytes(&derived);
        let verifying_key = signing_key.verifying_key();

        DevAccount {
            name: name.to_string(),
            address: Address(verifying_key.to_bytes()),
            signing_key,
            verifying_key,
        }
    }

    pub fn capability(&self) -> Capability {
        Capability::new(self.address)
    }

    /// Sign a request as this account
    pub fn sign_request(&self, nonce: u64, timestamp: u64, payload: RequestPayload) -> Result<SignedRequest, RequestError> {
        SignedRequest::sign(&self.signing_key, nonce, timestamp, payload)
    }
}

impl std::fmt::Debug for DevAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevAccount")
            .field("name", &self.name)
            .field("address", &self.address)
            .finish()
    }
}

/// Public view of a development account (for API responses)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevAccountInfo {
    pub name: String,
    pub address: Address,
    pub public_key_hex: String,
}

impl From<&DevAccount> for DevAccountInfo {
    fn from(account: &DevAccount) -> Self {
        DevAccountInfo {
            name: account.name.clone(),
            address: account.address,
            public_key_hex: hex::encode(account.verifying_key.as_bytes()),
        }
    }
}

// ============================================================================
// DEVNET
// ============================================================================

pub struct Devnet {
    accounts: Vec<DevAccount>,
}

impl Devnet {
    pub fn new() -> Self {
        Self::from_seed(DEVNET_SEED)
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let accounts = DEVNET_ACCOUNT_NAMES.iter().map(|name| DevAccount::from_seed(seed, name)).collect();
        Devnet { accounts }
    }

    pub fn account(&self, name: &str) -> Option<&DevAccount> {
        self.accounts.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub fn accounts(&self) -> &[DevAccount] {
        &self.accounts
    }

    pub fn infos(&self) -> Vec<DevAccountInfo> {
        self.accounts.iter().map(DevAccountInfo::from).collect()
    }

    /// Genesis collateral asset id
    pub fn collateral(&self) -> Address {
        collateral_asset(COLLATERAL_SYMBOL)
    }

    /// Mint authority of the genesis collateral
    pub fn treasury(&self) -> Address {
        derive(&[COLLATERAL_SEED, b"treasury", COLLATERAL_SYMBOL.as_bytes()])
    }

    /// Ledger holding the collateral asset, with every account funded
    pub fn genesis_ledger(&self, decimals: u8, balance: u64) -> Result<InMemoryLedger, LedgerError> {
        let mut ledger = InMemoryLedger::new();
        let usdc = self.collateral();
        let treasury = self.treasury();

        let mut batch = LedgerBatch::new();
        batch.create_asset(usdc, decimals, treasury);
        for account in &self.accounts {
            let acct = token_account(&account.address, &usdc);
            batch.open_account(acct, usdc, account.address);
            if balance > 0 {
                batch.mint_to(usdc, acct, balance, treasury);
            }
        }
        batch.commit(&mut ledger)?;
        Ok(ledger)
    }
}

impl Default for Devnet {
    fn default() -> Self {
        Self::new()
    }
}
