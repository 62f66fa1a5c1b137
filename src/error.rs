//! Error types for the ledger and the settlement engine.

use crate::address::Address;
use crate::market::{MarketId, Outcome};
use thiserror::Error;

/// How a failure should be treated by a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request was invalid for the current state. Not retried, no mutation.
    Precondition,
    /// Caller lacks funds or tokens. Correctable by the caller.
    Insufficient,
    /// An invariant was (or would have been) broken. Never expected.
    Integrity,
}

/// Rejections from the token ledger. A rejected batch leaves the ledger
/// untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("asset not found: {0}")]
    AssetNotFound(Address),

    #[error("asset already exists: {0}")]
    AssetExists(Address),

    #[error("token account not found: {0}")]
    AccountNotFound(Address),

    #[error("token account already exists: {0}")]
    AccountExists(Address),

    #[error("account {account} holds asset {actual}, expected {expected}")]
    AssetMismatch { account: Address, expected: Address, actual: Address },

    #[error("insufficient funds in {account}: have {available}, need {requested}")]
    InsufficientFunds { account: Address, available: u64, requested: u64 },

    #[error("{signer} is not authorized for {target}")]
    Unauthorized { signer: Address, target: Address },

    #[error("mint authority of {0} has been revoked")]
    MintAuthorityRevoked(Address),

    #[error("decimals mismatch: asset has {expected}, transfer specified {actual}")]
    DecimalsMismatch { expected: u8, actual: u8 },

    #[error("arithmetic overflow")]
    Overflow,
}

/// Every way a transition can fail. No variant is ever returned after a
/// partial commit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("market already exists: {0}")]
    AlreadyExists(MarketId),

    #[error("market not found: {0}")]
    MarketNotFound(MarketId),

    #[error("market already settled: {0}")]
    AlreadySettled(MarketId),

    #[error("market is settled, split and merge are closed: {0}")]
    MarketSettled(MarketId),

    #[error("market not settled: {0}")]
    MarketNotSettled(MarketId),

    #[error("{0} is not the market authority")]
    Unauthorized(Address),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid outcome: {0}")]
    InvalidOutcome(String),

    #[error("nothing to claim for {0}")]
    ZeroBalance(Address),

    #[error("collateral asset not registered in ledger: {0}")]
    UnknownCollateral(Address),

    #[error("insufficient collateral: have {available}, need {requested}")]
    InsufficientCollateral { available: u64, requested: u64 },

    #[error("insufficient outcome {outcome} balance: have {available}, need {requested}")]
    InsufficientOutcomeBalance { outcome: Outcome, available: u64, requested: u64 },

    #[error("vault underfunded: holds {available}, owes {required}")]
    VaultUnderfunded { available: u64, required: u64 },

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("ledger rejected batch: {0}")]
    Ledger(#[from] LedgerError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InsufficientCollateral { .. } | EngineError::InsufficientOutcomeBalance { .. } => {
                ErrorKind::Insufficient
            }
            // The engine validates every batch before handing it over, so a
            // ledger rejection means engine and ledger disagree about state.
            EngineError::VaultUnderfunded { .. }
            | EngineError::Overflow(_)
            | EngineError::InvariantViolation(_)
            | EngineError::Ledger(_) => ErrorKind::Integrity,
            _ => ErrorKind::Precondition,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Integrity
    }
}
