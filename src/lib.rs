/// Binary Outcome Settlement Engine
/// Exports all modules for use as a library crate

pub mod address;
pub mod app_state;
pub mod capability;
pub mod config;
pub mod devnet;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod market;
pub mod registry;
pub mod routes;
pub mod rpc;

// Core model
pub use address::{collateral_asset, derive, token_account, Address, ParseIdError};
pub use capability::Capability;
pub use error::{EngineError, ErrorKind, LedgerError};
pub use market::{Market, MarketId, MarketView, Outcome};

// Engine, ledger and registry
pub use engine::{
    EngineStats, Journal, JournalEntry, MarketSnapshot, Position, SettlementEngine, SharedEngine, TransitionKind,
};
pub use ledger::{AssetInfo, InMemoryLedger, LedgerBatch, LedgerOp, TokenAccount, TokenLedger};
pub use registry::{InMemoryRegistry, MarketStore};

// Service
pub use app_state::{AppState, SharedState, StateError, SubmitError};
pub use config::{Config, ConfigError};
pub use devnet::{DevAccount, DevAccountInfo, Devnet};
pub use routes::router;
pub use rpc::{NonceTracker, RequestError, RequestPayload, RequestType, SignedRequest, TX_EXPIRY_SECS};
