//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `BASEPULSE_*` environment overrides.

use crate::preferences::DataSource;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Base mainnet
pub const BASE_MAINNET: u64 = 8453;
/// Base Sepolia testnet
pub const BASE_SEPOLIA: u64 = 84532;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub data_source: DataSourceConfig,

    #[serde(default)]
    pub subgraph: SubgraphConfig,

    #[serde(default)]
    pub contract: ContractConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub price: PriceConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Active chain
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

fn default_chain_id() -> u64 {
    BASE_SEPOLIA
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
        }
    }
}

/// Default read path before the user picks one
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataSourceConfig {
    #[serde(default)]
    pub default: DataSource,
}

/// Subgraph endpoint for one chain
#[derive(Debug, Clone, Deserialize)]
pub struct SubgraphEndpoint {
    pub chain_id: u64,
    pub url: String,
}

/// Subgraph access configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SubgraphConfig {
    #[serde(default = "default_subgraph_endpoints")]
    pub endpoints: Vec<SubgraphEndpoint>,

    /// Network used when the active chain has no endpoint
    #[serde(default = "default_chain_id")]
    pub default_chain_id: u64,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_subgraph_endpoints() -> Vec<SubgraphEndpoint> {
    vec![
        SubgraphEndpoint {
            chain_id: BASE_MAINNET,
            url: "https://api.studio.thegraph.com/query/basepulse/basepulse-base/version/latest"
                .to_string(),
        },
        SubgraphEndpoint {
            chain_id: BASE_SEPOLIA,
            url: "https://api.studio.thegraph.com/query/basepulse/basepulse-base-sepolia/version/latest"
                .to_string(),
        },
    ]
}

fn default_page_size() -> usize {
    20
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for SubgraphConfig {
    fn default() -> Self {
        Self {
            endpoints: default_subgraph_endpoints(),
            default_chain_id: default_chain_id(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Polls contract deployment on one chain
#[derive(Debug, Clone, Deserialize)]
pub struct ContractDeployment {
    pub chain_id: u64,
    pub rpc_url: String,
    /// Polls contract address; contract reads fail until set
    pub address: Option<String>,
}

/// Contract access configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    #[serde(default = "default_deployments")]
    pub deployments: Vec<ContractDeployment>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_deployments() -> Vec<ContractDeployment> {
    vec![
        ContractDeployment {
            chain_id: BASE_MAINNET,
            rpc_url: "https://mainnet.base.org".to_string(),
            address: None,
        },
        ContractDeployment {
            chain_id: BASE_SEPOLIA,
            rpc_url: "https://sepolia.base.org".to_string(),
            address: None,
        },
    ]
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            deployments: default_deployments(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ContractConfig {
    pub fn deployment(&self, chain_id: u64) -> Option<&ContractDeployment> {
        self.deployments.iter().find(|d| d.chain_id == chain_id)
    }
}

/// REST backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_backend_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_max_retries() -> u32 {
    3
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

/// ETH/USD price feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PriceConfig {
    #[serde(default = "default_price_url")]
    pub url: String,

    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Used when the feed fails and nothing is cached
    #[serde(default = "default_fallback_price")]
    pub fallback_usd: f64,
}

fn default_price_url() -> String {
    "https://api.coingecko.com/api/v3/simple/price?ids=ethereum&vs_currencies=usd".to_string()
}

fn default_refresh_interval() -> u64 {
    60
}

fn default_fallback_price() -> f64 {
    crate::price::FALLBACK_ETH_USD
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            url: default_price_url(),
            refresh_interval_secs: default_refresh_interval(),
            fallback_usd: default_fallback_price(),
        }
    }
}

/// Local storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("basepulse").to_string_lossy().to_string())
        .unwrap_or_else(|| "./basepulse_data".to_string())
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    /// Path of the key-value store file
    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("store.json")
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("basepulse").join("config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Subgraph URL for `chain_id`, if configured
    pub fn subgraph_url(&self, chain_id: u64) -> Option<&str> {
        self.subgraph
            .endpoints
            .iter()
            .find(|e| e.chain_id == chain_id)
            .map(|e| e.url.as_str())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(chain_id) = std::env::var("BASEPULSE_CHAIN_ID") {
            match chain_id.parse() {
                Ok(id) => self.network.chain_id = id,
                Err(_) => tracing::warn!(value = %chain_id, "Ignoring invalid BASEPULSE_CHAIN_ID"),
            }
        }

        if let Ok(source) = std::env::var("BASEPULSE_DATA_SOURCE") {
            match source.parse() {
                Ok(s) => self.data_source.default = s,
                Err(e) => tracing::warn!(error = %e, "Ignoring invalid BASEPULSE_DATA_SOURCE"),
            }
        }

        // Endpoint overrides apply to the active chain
        let chain_id = self.network.chain_id;
        if let Ok(url) = std::env::var("BASEPULSE_SUBGRAPH_URL") {
            self.subgraph.endpoints.retain(|e| e.chain_id != chain_id);
            self.subgraph.endpoints.push(SubgraphEndpoint { chain_id, url });
        }

        let rpc_url = std::env::var("BASEPULSE_RPC_URL").ok();
        let address = std::env::var("BASEPULSE_CONTRACT_ADDRESS").ok();
        if rpc_url.is_some() || address.is_some() {
            match self
                .contract
                .deployments
                .iter_mut()
                .find(|d| d.chain_id == chain_id)
            {
                Some(deployment) => {
                    if let Some(url) = rpc_url {
                        deployment.rpc_url = url;
                    }
                    if address.is_some() {
                        deployment.address = address;
                    }
                }
                None => {
                    if let Some(url) = rpc_url {
                        self.contract.deployments.push(ContractDeployment {
                            chain_id,
                            rpc_url: url,
                            address,
                        });
                    }
                }
            }
        }

        if let Ok(url) = std::env::var("BASEPULSE_API_URL") {
            self.backend.base_url = url;
        }

        if let Ok(data_dir) = std::env::var("BASEPULSE_DATA_DIR") {
            self.storage.data_dir = data_dir;
        }

        if let Ok(level) = std::env::var("BASEPULSE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("BASEPULSE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            data_source: DataSourceConfig::default(),
            subgraph: SubgraphConfig::default(),
            contract: ContractConfig::default(),
            backend: BackendConfig::default(),
            price: PriceConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# BasePulse Configuration
#
# Environment variables override these settings:
# - BASEPULSE_CHAIN_ID
# - BASEPULSE_DATA_SOURCE        (subgraph | contract)
# - BASEPULSE_SUBGRAPH_URL       (endpoint for the active chain)
# - BASEPULSE_RPC_URL            (JSON-RPC for the active chain)
# - BASEPULSE_CONTRACT_ADDRESS   (polls contract on the active chain)
# - BASEPULSE_API_URL
# - BASEPULSE_DATA_DIR
# - BASEPULSE_LOG_LEVEL
# - BASEPULSE_LOG_FORMAT

[network]
# 8453 = Base, 84532 = Base Sepolia
chain_id = 84532

[data_source]
# Read path used until the user picks one: subgraph or contract
default = "subgraph"

[subgraph]
# Network used when the active chain has no endpoint
default_chain_id = 84532

# Items per page for poll listings
page_size = 20

request_timeout_secs = 30

[[subgraph.endpoints]]
chain_id = 8453
url = "https://api.studio.thegraph.com/query/basepulse/basepulse-base/version/latest"

[[subgraph.endpoints]]
chain_id = 84532
url = "https://api.studio.thegraph.com/query/basepulse/basepulse-base-sepolia/version/latest"

[contract]
request_timeout_secs = 30

[[contract.deployments]]
chain_id = 8453
rpc_url = "https://mainnet.base.org"
# address = "0x..."

[[contract.deployments]]
chain_id = 84532
rpc_url = "https://sepolia.base.org"
# address = "0x..."

[backend]
# BasePulse REST API
base_url = "http://localhost:3001"
request_timeout_secs = 30
max_retries = 3

[price]
# ETH/USD spot price endpoint
url = "https://api.coingecko.com/api/v3/simple/price?ids=ethereum&vs_currencies=usd"

# How often the cached price is refreshed (seconds)
refresh_interval_secs = 60

# Price used when the feed fails and nothing is cached
fallback_usd = 3000.0

[storage]
# Directory for the local key-value store (default: platform data dir)
# data_dir = "/var/lib/basepulse"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
