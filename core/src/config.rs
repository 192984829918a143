//! TOML Configuration File Support
//!
//! Centralized configuration for tools built on the SDK, loaded from a
//! TOML file at `~/.config/flowpay/flowpay.toml`.
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. Environment variables (`FLOWPAY_*`)
//! 2. TOML configuration file
//! 3. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! manager = "0x0000000000000000000000000000000000001001"
//! warning_level = "2 days"
//! critical_level = "12:00:00"
//!
//! [min_claim]
//! USDC = "1000000"
//! ```
//!
//! Duration fields accept integer seconds, `"HH:MM:SS"`, or
//! `"<n> <unit>"` with any unit the rate parser knows.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;
use crate::time_unit::TimeUnit;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A duration field did not match any accepted form.
    #[error("invalid duration {0:?}: expected seconds, \"HH:MM:SS\", or \"<n> <unit>\"")]
    InvalidDuration(String),

    /// An address field failed to parse.
    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    /// A token amount failed to parse.
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),
}

/// A duration as it appears in TOML or an environment variable: integer
/// seconds or one of the accepted string forms.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationField {
    /// Plain seconds.
    Seconds(u64),
    /// `"HH:MM:SS"` or `"<n> <unit>"` or a stringified integer.
    Text(String),
}

/// Parse a duration field into a [`Duration`].
pub fn parse_duration(field: &DurationField) -> Result<Duration, ConfigError> {
    let text = match field {
        DurationField::Seconds(seconds) => return Ok(Duration::from_secs(*seconds)),
        DurationField::Text(text) => text.trim(),
    };

    let invalid = || ConfigError::InvalidDuration(text.to_string());

    if text.matches(':').count() == 2 {
        let mut parts = text.splitn(3, ':');
        let hours: u64 = parts.next().unwrap_or("").parse().map_err(|_| invalid())?;
        let minutes: u64 = parts.next().unwrap_or("").parse().map_err(|_| invalid())?;
        let seconds: u64 = parts.next().unwrap_or("").parse().map_err(|_| invalid())?;
        return Ok(Duration::from_secs(hours * 3600 + minutes * 60 + seconds));
    }

    if let Some((count, unit)) = text.split_once(char::is_whitespace) {
        let count: u64 = count.trim().parse().map_err(|_| invalid())?;
        let unit: TimeUnit = unit.parse().map_err(|_| invalid())?;
        return Ok(Duration::from_secs(count * unit.total_seconds()));
    }

    text.parse()
        .map(Duration::from_secs)
        .map_err(|_| invalid())
}

/// Raw TOML configuration structure.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowpayToml {
    /// Stream manager contract address.
    pub manager: Option<String>,
    /// Threshold below which a stream's status turns to warning.
    pub warning_level: Option<DurationField>,
    /// Threshold below which a stream's status turns to critical.
    pub critical_level: Option<DurationField>,
    /// Minimum claim amount per token symbol, in base units as decimal
    /// strings.
    pub min_claim: HashMap<String, String>,
}

/// Resolved configuration.
#[derive(Clone, Debug)]
pub struct FlowpayConfig {
    /// Stream manager contract address, if configured.
    pub manager: Option<Address>,
    /// Threshold below which a stream's status turns to warning.
    pub warning_level: Duration,
    /// Threshold below which a stream's status turns to critical.
    pub critical_level: Duration,
    /// Minimum claim amount per token symbol, in base units.
    pub min_claim: HashMap<String, u128>,
}

impl Default for FlowpayConfig {
    fn default() -> Self {
        Self {
            manager: None,
            warning_level: Duration::from_secs(2 * 24 * 3600),
            critical_level: Duration::from_secs(12 * 3600),
            min_claim: HashMap::new(),
        }
    }
}

impl FlowpayConfig {
    /// Minimum claim amount configured for a token symbol; zero when
    /// unconfigured.
    #[must_use]
    pub fn min_claim_for(&self, symbol: &str) -> u128 {
        self.min_claim.get(symbol).copied().unwrap_or(0)
    }

    fn apply_toml(&mut self, raw: &FlowpayToml) -> Result<(), ConfigError> {
        if let Some(manager) = &raw.manager {
            self.manager = Some(
                manager
                    .parse()
                    .map_err(|_| ConfigError::InvalidAddress(manager.clone()))?,
            );
        }
        if let Some(level) = &raw.warning_level {
            self.warning_level = parse_duration(level)?;
        }
        if let Some(level) = &raw.critical_level {
            self.critical_level = parse_duration(level)?;
        }
        for (symbol, amount) in &raw.min_claim {
            let parsed: u128 = amount
                .parse()
                .map_err(|_| ConfigError::InvalidAmount(amount.clone()))?;
            self.min_claim.insert(symbol.clone(), parsed);
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(manager) = std::env::var("FLOWPAY_MANAGER_ADDRESS") {
            self.manager = Some(
                manager
                    .parse()
                    .map_err(|_| ConfigError::InvalidAddress(manager.clone()))?,
            );
        }
        if let Ok(level) = std::env::var("FLOWPAY_WARNING_LEVEL") {
            self.warning_level = parse_duration(&DurationField::Text(level))?;
        }
        if let Ok(level) = std::env::var("FLOWPAY_CRITICAL_LEVEL") {
            self.critical_level = parse_duration(&DurationField::Text(level))?;
        }
        Ok(())
    }
}

/// Default configuration file location:
/// `$XDG_CONFIG_HOME/flowpay/flowpay.toml`.
#[must_use]
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flowpay")
        .join("flowpay.toml")
}

/// Load configuration from a specific file, then apply environment
/// overrides.
pub fn load_config_from_path(path: &Path) -> Result<FlowpayConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: FlowpayToml = toml::from_str(&contents)?;

    let mut config = FlowpayConfig::default();
    config.apply_toml(&raw)?;
    config.apply_env()?;
    Ok(config)
}

/// Load configuration from the default location, falling back to defaults
/// when no file exists. Environment overrides always apply.
pub fn load_config() -> Result<FlowpayConfig, ConfigError> {
    let path = default_config_path();
    if path.exists() {
        load_config_from_path(&path)
    } else {
        let mut config = FlowpayConfig::default();
        config.apply_env()?;
        Ok(config)
    }
}
