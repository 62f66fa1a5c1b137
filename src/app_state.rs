// Application state management

use crate::config::Config;
use crate::devnet::Devnet;
use crate::engine::{EngineStats, Journal, JournalEntry, SettlementEngine};
use crate::error::{EngineError, LedgerError};
use crate::ledger::InMemoryLedger;
use crate::market::now;
use crate::registry::InMemoryRegistry;
use crate::rpc::{self, NonceTracker, RequestError, SignedRequest};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{info, warn};

pub type SharedState = Arc<Mutex<AppState>>;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("state file i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("state file format: {0}")]
    Json(#[from] serde_json::Error),

    #[error("genesis failed: {0}")]
    Genesis(#[from] LedgerError),
}

/// Why a submitted request was not committed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub struct AppState {
    pub engine: SettlementEngine,
    pub nonces: NonceTracker,
    pub devnet: Option<Devnet>,
    pub config: Config,
}

impl AppState {
    /// Restore from `config.state_path` if it exists, otherwise genesis
    pub fn new(config: Config) -> Result<Self, StateError> {
        match Self::load_from_disk(&config)? {
            Some(state) => Ok(state),
            None => Self::genesis(config),
        }
    }

    /// Fresh state: empty registry, collateral asset created, development
    /// accounts funded if enabled
    pub fn genesis(config: Config) -> Result<Self, StateError> {
        let devnet = Devnet::new();
        let balance = if config.devnet_accounts { config.devnet_balance } else { 0 };
        let ledger = devnet.genesis_ledger(config.collateral_decimals, balance)?;

        info!(
            collateral = %devnet.collateral().short(),
            decimals = config.collateral_decimals,
            funded = config.devnet_accounts,
            "🌱 genesis ledger created"
        );

        Ok(Self {
            engine: SettlementEngine::new(ledger, InMemoryRegistry::new()),
            nonces: NonceTracker::new(),
            devnet: config.devnet_accounts.then_some(devnet),
            config,
        })
    }

    pub fn shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }

    /// Verify, consume the nonce, then run the payload. The nonce is spent
    /// once the signature checks out, even if the engine rejects the call.
    pub fn submit(&mut self, request: &SignedRequest, now: u64) -> Result<JournalEntry, SubmitError> {
        let caller = request.verify(now, self.config.tx_expiry_secs)?;
        self.nonces.consume(caller.identity(), request.nonce)?;
        Ok(rpc::dispatch(&mut self.engine, &request.payload, &caller)?)
    }

    /// Write registry, ledger, journal and nonces as pretty JSON.
    ///
    /// Goes through a temp file and a rename, so the state file is always
    /// either the previous snapshot or the new one.
    pub fn save_to_disk(&self) -> Result<(), StateError> {
        #[derive(Serialize)]
        struct PersistedState<'a> {
            saved_at: u64,
            ledger: &'a InMemoryLedger,
            registry: &'a InMemoryRegistry,
            journal: &'a Journal,
            stats: &'a EngineStats,
            nonces: &'a NonceTracker,
        }

        let state = PersistedState {
            saved_at: now(),
            ledger: self.engine.ledger(),
            registry: self.engine.registry(),
            journal: self.engine.journal_entries(),
            stats: self.engine.stats(),
            nonces: &self.nonces,
        };

        let path = &self.config.state_path;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&state)?;

        let temp_path = path.with_extension("json.tmp");
        let cleanup_and_err = |e: std::io::Error| {
            let _ = fs::remove_file(&temp_path);
            e
        };
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(json.as_bytes()).map_err(cleanup_and_err)?;
        file.sync_all().map_err(cleanup_and_err)?;
        fs::rename(&temp_path, path).map_err(cleanup_and_err)?;

        info!(path = %path.display(), markets = self.engine.market_ids().len(), "💾 state saved to disk");
        Ok(())
    }

    /// `Ok(None)` when there is no state file yet
    pub fn load_from_disk(config: &Config) -> Result<Option<Self>, StateError> {
        #[derive(Deserialize)]
        struct PersistedState {
            ledger: InMemoryLedger,
            registry: InMemoryRegistry,
            journal: Journal,
            stats: EngineStats,
            nonces: NonceTracker,
        }

        let path: &Path = &config.state_path;
        if !path.exists() {
            warn!(path = %path.display(), "no state file found, starting from genesis");
            return Ok(None);
        }

        let json = fs::read_to_string(path)?;
        let state: PersistedState = serde_json::from_str(&json)?;

        let engine = SettlementEngine::from_parts(state.ledger, state.registry, state.journal, state.stats);
        info!(
            path = %path.display(),
            markets = engine.market_ids().len(),
            journal = engine.journal_entries().len(),
            "📂 state restored from disk"
        );

        Ok(Some(Self {
            engine,
            nonces: state.nonces,
            devnet: config.devnet_accounts.then(Devnet::new),
            config: config.clone(),
        }))
    }
}
