// Persistent settings
// Loaded from ~/.config/walletsync/config.toml
//
// Secrets never live here; see credentials.rs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// USDC on Base.
pub const DEFAULT_TOKEN_ADDRESS: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
pub const DEFAULT_RPC_URL: &str = "https://mainnet.base.org";
pub const DEFAULT_LEDGER_API_URL: &str = "https://api.ynab.com/v1";
pub const DEFAULT_ACCOUNT_NAME: &str = "Base USDC Hot Storage";
pub const DEFAULT_REGISTRY_FILE: &str = "transaction_hash.ignorelist.toml";
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("cannot write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("invalid settings in {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("cannot serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Wallet whose transfers are reconciled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,

    /// ERC-20 contract of the reconciled token
    pub token_address: String,

    /// JSON-RPC endpoint used for token metadata
    pub rpc_url: String,

    /// Base URL of the ledger API
    pub ledger_api_url: String,

    /// Ledger account holding the token
    pub account_name: String,

    /// Fixed budget id; prompts when unset and several budgets exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_id: Option<String>,

    /// Skip/processed registry file, relative to the working directory
    pub registry_path: PathBuf,

    pub lookback_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wallet_address: None,
            token_address: DEFAULT_TOKEN_ADDRESS.to_string(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            ledger_api_url: DEFAULT_LEDGER_API_URL.to_string(),
            account_name: DEFAULT_ACCOUNT_NAME.to_string(),
            budget_id: None,
            registry_path: PathBuf::from(DEFAULT_REGISTRY_FILE),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("walletsync");
        config_dir.join("config.toml")
    }

    /// Load settings from the default location, falling back to defaults
    /// when the file does not exist
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write { path: path.to_path_buf(), source };

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, self.to_toml()?).map_err(write_err)
    }
}
