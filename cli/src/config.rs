use anyhow::{bail, Context, Result};
use dirs::home_dir;
use pocketbook_wallet::DEFAULT_ROOT_DIR_NAME;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file in the user's home directory
pub const CONFIG_FILE_NAME: &str = ".pocketbookrc";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint of a ledger node
    pub rpc_url: String,

    /// Block explorer page for a transaction, without the trailing digest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

impl NetworkConfig {
    fn new(rpc_url: &str, explorer_url: Option<&str>) -> Self {
        Self {
            rpc_url: rpc_url.to_string(),
            explorer_url: explorer_url.map(str::to_string),
        }
    }

    /// Explorer link for a submitted transaction, if the network has one
    pub fn explorer_link(&self, tx_digest: &str) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{}/0x{}", base.trim_end_matches('/'), tx_digest))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Network used when `--network` is not given
    pub default_network: String,

    /// Directory holding the key store and address book (default ~/.pocketbook)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_store_root: Option<PathBuf>,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Seconds to wait for a submitted transaction to be executed
    pub confirmation_timeout: u64,

    /// Output format (table, json)
    pub output_format: OutputFormat,

    pub networks: BTreeMap<String, NetworkConfig>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => bail!("Invalid output format '{}'. Must be: table or json", s),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut networks = BTreeMap::new();
        networks.insert(
            "mainnet".to_string(),
            NetworkConfig::new(
                "https://rpc-mainnet.fetch.ai",
                Some("https://explore.fetch.ai/transactions"),
            ),
        );
        networks.insert(
            "testnet".to_string(),
            NetworkConfig::new(
                "https://rpc-testnet.fetch.ai",
                Some("https://explore-testnet.fetch.ai/transactions"),
            ),
        );
        networks.insert(
            "local".to_string(),
            NetworkConfig::new("http://127.0.0.1:8000", None),
        );

        Self {
            default_network: "mainnet".to_string(),
            key_store_root: None,
            timeout: 30,
            confirmation_timeout: 120,
            output_format: OutputFormat::Table,
            networks,
        }
    }
}

impl Config {
    /// Load configuration from ~/.pocketbookrc, writing the defaults if absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = home_dir().context("Failed to get home directory")?;
        Ok(home.join(CONFIG_FILE_NAME))
    }

    /// Key store root: the configured override, or ~/.pocketbook
    pub fn store_root(&self) -> Result<PathBuf> {
        match &self.key_store_root {
            Some(root) => Ok(root.clone()),
            None => {
                let home = home_dir().context("Failed to get home directory")?;
                Ok(home.join(DEFAULT_ROOT_DIR_NAME))
            }
        }
    }

    pub fn network(&self, name: &str) -> Option<&NetworkConfig> {
        self.networks.get(name)
    }

    /// Update a single setting from its textual form. `networks.<name>` sets
    /// the RPC url of a network, adding it when new.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let key = key.to_lowercase();
        match key.as_str() {
            "network" | "default_network" => {
                if !self.networks.contains_key(value) {
                    bail!(
                        "Unknown network '{}'. Configured networks: {}",
                        value,
                        self.network_names().join(", ")
                    );
                }
                self.default_network = value.to_string();
            }
            "root" | "key_store_root" => {
                self.key_store_root = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            "timeout" => {
                self.timeout = value
                    .parse()
                    .with_context(|| format!("Invalid timeout value '{}'. Must be a number.", value))?;
            }
            "confirmation_timeout" => {
                self.confirmation_timeout = value.parse().with_context(|| {
                    format!("Invalid confirmation timeout '{}'. Must be a number.", value)
                })?;
            }
            "format" | "output" | "output_format" => {
                self.output_format = value.parse()?;
            }
            _ => match key.strip_prefix("networks.") {
                Some(name) if !name.is_empty() => {
                    self.networks
                        .entry(name.to_string())
                        .and_modify(|n| n.rpc_url = value.to_string())
                        .or_insert_with(|| NetworkConfig::new(value, None));
                }
                _ => bail!(
                    "Unknown configuration key: {}. Valid keys: default_network, key_store_root, \
                     timeout, confirmation_timeout, output_format, networks.<name>",
                    key
                ),
            },
        }
        Ok(())
    }

    pub fn network_names(&self) -> Vec<String> {
        self.networks.keys().cloned().collect()
    }
}
