//! Service configuration, read from the environment (and `.env`).

use crate::rpc::TX_EXPIRY_SECS;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid { key: &'static str, value: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: String,
    pub state_path: PathBuf,
    pub log_level: String,
    pub collateral_decimals: u8,
    /// Create and fund ALICE, BOB and ORACLE on a fresh start
    pub devnet_accounts: bool,
    pub devnet_balance: u64,
    pub tx_expiry_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:1234".into(),
            state_path: PathBuf::from("data/settlement_state.json"),
            log_level: "info".into(),
            collateral_decimals: 6,
            devnet_accounts: true,
            devnet_balance: 1_000_000_000,
            tx_expiry_secs: TX_EXPIRY_SECS,
        }
    }
}

impl Config {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Missing keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(v) = lookup("BIND_ADDR") {
            config.bind_addr = v;
        }
        if let Some(v) = lookup("STATE_PATH") {
            config.state_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("COLLATERAL_DECIMALS") {
            config.collateral_decimals = parse("COLLATERAL_DECIMALS", &v)?;
        }
        if let Some(v) = lookup("DEVNET_ACCOUNTS") {
            config.devnet_accounts = parse_flag("DEVNET_ACCOUNTS", &v)?;
        }
        if let Some(v) = lookup("DEVNET_BALANCE") {
            config.devnet_balance = parse("DEVNET_BALANCE", &v)?;
        }
        if let Some(v) = lookup("TX_EXPIRY_SECS") {
            config.tx_expiry_secs = parse("TX_EXPIRY_SECS", &v)?;
        }

        Ok(config)
    }

    /// Install the global tracing subscriber. `RUST_LOG` wins over
    /// `LOG_LEVEL`.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));
        fmt().with_env_filter(filter).init();
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "expected true or false".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.tx_expiry_secs, 300);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("COLLATERAL_DECIMALS", "9"),
            ("DEVNET_ACCOUNTS", "off"),
            ("DEVNET_BALANCE", "42"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.collateral_decimals, 9);
        assert!(!config.devnet_accounts);
        assert_eq!(config.devnet_balance, 42);
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_lookup(lookup(&[("COLLATERAL_DECIMALS", "300")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "COLLATERAL_DECIMALS", .. }));

        let err = Config::from_lookup(lookup(&[("DEVNET_ACCOUNTS", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DEVNET_ACCOUNTS", .. }));
    }
}
