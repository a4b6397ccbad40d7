//! Wallet configuration, parsed from TOML file + environment variable overrides.
//!
//! Priority: environment variables > config file > defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tonwallet_core::WalletVersion;
use tonwallet_ledger::{default_endpoint, Network};
use tonwallet_session::SessionConfig;

/// File name of the locally pending transaction log inside the data directory
pub const PENDING_FILE: &str = "pending.json";

/// Top-level wallet configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    #[serde(default)]
    pub wallet: WalletSection,

    /// Ledger API settings
    #[serde(default)]
    pub ledger: LedgerSection,

    /// Transaction bookkeeping service
    #[serde(default)]
    pub bookkeeping: BookkeepingSection,

    /// Environment overrides that did not parse, reported by `validate`
    #[serde(skip)]
    rejected_env: Vec<String>,
}

/// General wallet settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSection {
    /// Data directory (encrypted phrase, pending records)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "mainnet" or "testnet"
    #[serde(default = "default_network")]
    pub network: String,

    /// 0 (basechain) or -1 (masterchain)
    #[serde(default)]
    pub workchain: i8,

    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for WalletSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            network: default_network(),
            workchain: 0,
            version: default_version(),
        }
    }
}

/// Ledger API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSection {
    /// toncenter-compatible v2 endpoint; the network's public one when unset
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// Bookkeeping service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookkeepingSection {
    #[serde(default = "default_bookkeeping_url")]
    pub url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for BookkeepingSection {
    fn default() -> Self {
        Self {
            url: default_bookkeeping_url(),
            timeout_secs: default_timeout(),
        }
    }
}

// ============================================================================
// Defaults
// ============================================================================

fn default_data_dir() -> PathBuf {
    PathBuf::from("./tonwallet-data")
}

fn default_log_level() -> String {
    "info".into()
}

fn default_network() -> String {
    "mainnet".into()
}

fn default_version() -> String {
    "v3r2".into()
}

fn default_timeout() -> u64 {
    10
}

fn default_bookkeeping_url() -> String {
    "http://127.0.0.1:8080/transactions".into()
}

// ============================================================================
// Loading & environment override
// ============================================================================

impl WalletConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: WalletConfig =
            toml::from_str(&contents).with_context(|| "Failed to parse TOML config")?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `TONWALLET_DATA_DIR`
    /// - `TONWALLET_LOG_LEVEL`
    /// - `TONWALLET_NETWORK`
    /// - `TONWALLET_WORKCHAIN`
    /// - `TONWALLET_LEDGER_URL`
    /// - `TONWALLET_API_KEY`
    /// - `TONWALLET_BOOKKEEPING_URL`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TONWALLET_DATA_DIR") {
            self.wallet.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("TONWALLET_LOG_LEVEL") {
            self.wallet.log_level = v;
        }
        if let Ok(v) = std::env::var("TONWALLET_NETWORK") {
            self.wallet.network = v;
        }
        if let Ok(v) = std::env::var("TONWALLET_WORKCHAIN") {
            match v.parse() {
                Ok(wc) => self.wallet.workchain = wc,
                Err(_) => self.rejected_env.push(format!("TONWALLET_WORKCHAIN={}", v)),
            }
        }
        if let Ok(v) = std::env::var("TONWALLET_LEDGER_URL") {
            self.ledger.endpoint = Some(v);
        }
        if let Ok(v) = std::env::var("TONWALLET_API_KEY") {
            self.ledger.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("TONWALLET_BOOKKEEPING_URL") {
            self.bookkeeping.url = v;
        }
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.rejected_env.is_empty(),
            "invalid environment override: {}",
            self.rejected_env.join(", ")
        );
        self.network()?;
        self.version()?;

        anyhow::ensure!(
            matches!(self.wallet.workchain, 0 | -1),
            "wallet.workchain must be 0 or -1, got {}",
            self.wallet.workchain
        );

        if let Some(endpoint) = &self.ledger.endpoint {
            anyhow::ensure!(!endpoint.trim().is_empty(), "ledger.endpoint must not be empty");
        }
        anyhow::ensure!(self.ledger.timeout_secs > 0, "ledger.timeout_secs must be > 0");

        anyhow::ensure!(
            !self.bookkeeping.url.trim().is_empty(),
            "bookkeeping.url must not be empty"
        );
        anyhow::ensure!(
            self.bookkeeping.timeout_secs > 0,
            "bookkeeping.timeout_secs must be > 0"
        );

        Ok(())
    }

    pub fn network(&self) -> Result<Network> {
        self.wallet.network.parse().map_err(anyhow::Error::msg)
    }

    pub fn version(&self) -> Result<WalletVersion> {
        self.wallet.version.parse().map_err(anyhow::Error::msg)
    }

    /// Configured ledger endpoint, or the public one for the network
    pub fn ledger_endpoint(&self) -> Result<String> {
        Ok(match &self.ledger.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => default_endpoint(self.network()?).to_string(),
        })
    }

    pub fn pending_log_path(&self) -> PathBuf {
        self.wallet.data_dir.join(PENDING_FILE)
    }

    pub fn session_config(&self) -> Result<SessionConfig> {
        Ok(SessionConfig {
            version: self.version()?,
            workchain: self.wallet.workchain,
            network: self.network()?,
            pending_log_path: Some(self.pending_log_path()),
            ..SessionConfig::default()
        })
    }
}
