//! Configuration management for eosrelay

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{RelayError, Result};
use crate::ledger::name;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sponsor: SponsorConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

/// The fixed identity that pays for new-account creation and initial funding.
#[derive(Debug, Clone, Deserialize)]
pub struct SponsorConfig {
    #[serde(default = "default_creator")]
    pub creator: String,
    #[serde(default = "default_ram_bytes")]
    pub ram_bytes: u32,
    #[serde(default = "default_welcome_memo")]
    pub welcome_memo: String,
    /// Accounts created with a caller-supplied public key are funded
    /// externally by default; enable this to include the welcome transfer
    /// on that branch as well.
    #[serde(default)]
    pub fund_supplied_key_accounts: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_max_actions")]
    pub max_actions: usize,
    #[serde(default = "default_expire_secs")]
    pub expire_secs: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
        }
    }
}

impl Default for SponsorConfig {
    fn default() -> Self {
        SponsorConfig {
            creator: default_creator(),
            ram_bytes: default_ram_bytes(),
            welcome_memo: default_welcome_memo(),
            fund_supplied_key_accounts: false,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            max_actions: default_max_actions(),
            expire_secs: default_expire_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            sponsor: SponsorConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_creator() -> String {
    "cptblackbill".to_string()
}

fn default_ram_bytes() -> u32 {
    3692
}

fn default_welcome_memo() -> String {
    "Welcome to Cpt.BlackBill.".to_string()
}

fn default_max_actions() -> usize {
    4
}

fn default_expire_secs() -> u32 {
    60
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Load configuration from the given path (or `config.toml` in the working
/// directory). A missing file yields the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or_else(|| Path::new("config.toml"));
    let config_str = fs::read_to_string(path).unwrap_or_default();
    let config: Config = if config_str.is_empty() {
        Config::default()
    } else {
        toml::from_str(&config_str)
            .map_err(|e| RelayError::ConfigError(format!("{}: {}", path.display(), e)))?
    };

    // Validate critical values
    name::name_to_u64(&config.sponsor.creator).map_err(|e| {
        RelayError::ConfigError(format!("sponsor.creator is not a valid account: {}", e))
    })?;

    if config.relay.max_actions == 0 {
        return Err(RelayError::ConfigError(
            "relay.max_actions must be at least 1".to_string(),
        ));
    }

    if config.relay.expire_secs == 0 {
        return Err(RelayError::ConfigError(
            "relay.expire_secs must be at least 1".to_string(),
        ));
    }

    Ok(config)
}
