//! Environment configuration with validation
//!
//! Every variable is optional; defaults reproduce the reference deployment
//! (5 unanimous signers, 7 day cooldown, 5% fee).

use std::env;
use std::path::PathBuf;

use crate::accounts::{Address, DevAccounts, DEFAULT_SIGNER_NAMES};
use crate::ledger::{units, Amount};
use crate::market_resolve::{BPS_DENOMINATOR, DEFAULT_FEE_RATE_BPS};
use crate::quorum::DEFAULT_COOLDOWN_SECS;
use crate::rpc::TX_EXPIRY_SECS;

pub const DEFAULT_PORT: u16 = 1234;
pub const DEFAULT_STATE_PATH: &str = "data/state.json";
pub const DEFAULT_FAUCET_UNITS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("unknown signer {0:?}: expected a dev account name or an address")]
    UnknownSigner(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::InvalidValue { .. } => "InvalidConfigValue",
            ConfigError::UnknownSigner(_) => "UnknownSigner",
            ConfigError::Invalid(_) => "InvalidConfig",
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub fee_rate_bps: u32,
    /// Quorum wallet signers, resolved to addresses
    pub signers: Vec<Address>,
    /// `None` → unanimous
    pub threshold: Option<usize>,
    pub cooldown_secs: u64,
    pub tx_expiry_secs: u64,
    /// Dev faucet amount per request; 0 disables the faucet
    pub faucet_amount: Amount,
    pub state_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let accounts = DevAccounts::new();
        Self {
            port: DEFAULT_PORT,
            fee_rate_bps: DEFAULT_FEE_RATE_BPS,
            signers: DEFAULT_SIGNER_NAMES
                .iter()
                .filter_map(|name| accounts.resolve(name))
                .collect(),
            threshold: None,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            tx_expiry_secs: TX_EXPIRY_SECS,
            faucet_amount: units(DEFAULT_FAUCET_UNITS),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
        }
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let accounts = DevAccounts::new();

        let signers = match lookup("QM_SIGNERS") {
            None => defaults.signers,
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|id| accounts.resolve(id).ok_or_else(|| ConfigError::UnknownSigner(id.to_string())))
                .collect::<Result<Vec<_>, _>>()?,
        };
        let threshold = match lookup("QM_THRESHOLD") {
            None => None,
            Some(value) => Some(
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue { var: "QM_THRESHOLD", value })?,
            ),
        };
        let faucet_units: u64 = parse("QM_FAUCET_AMOUNT", lookup("QM_FAUCET_AMOUNT"), DEFAULT_FAUCET_UNITS)?;

        let config = AppConfig {
            port: parse("QM_PORT", lookup("QM_PORT"), defaults.port)?,
            fee_rate_bps: parse("QM_FEE_RATE_BPS", lookup("QM_FEE_RATE_BPS"), defaults.fee_rate_bps)?,
            signers,
            threshold,
            cooldown_secs: parse("QM_COOLDOWN_SECS", lookup("QM_COOLDOWN_SECS"), defaults.cooldown_secs)?,
            tx_expiry_secs: parse("QM_TX_EXPIRY_SECS", lookup("QM_TX_EXPIRY_SECS"), defaults.tx_expiry_secs)?,
            faucet_amount: faucet_units
                .checked_mul(units(1))
                .ok_or_else(|| ConfigError::Invalid("QM_FAUCET_AMOUNT overflows".into()))?,
            state_path: lookup("QM_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_path),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fee_rate_bps > BPS_DENOMINATOR {
            return Err(ConfigError::Invalid(format!(
                "fee rate {} bps exceeds {}",
                self.fee_rate_bps, BPS_DENOMINATOR
            )));
        }
        if self.signers.is_empty() {
            return Err(ConfigError::Invalid("at least one signer is required".into()));
        }
        if let Some(threshold) = self.threshold {
            if threshold == 0 || threshold > self.signers.len() {
                return Err(ConfigError::Invalid(format!(
                    "threshold {} outside 1..={}",
                    threshold,
                    self.signers.len()
                )));
            }
        }
        if self.tx_expiry_secs == 0 {
            return Err(ConfigError::Invalid("QM_TX_EXPIRY_SECS must be positive".into()));
        }
        Ok(())
    }
}
