use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::domain::{default_tokens, parse_address, TokenConfig};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub subgraph: SubgraphConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP port for the admin API
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint used for balance reads
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Multicall3 deployment (same address on every major chain)
    #[serde(default = "default_multicall_address")]
    pub multicall_address: String,
    /// Wallets per aggregate3 submission
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_tokens")]
    pub tokens: Vec<TokenConfig>,
}

fn default_rpc_url() -> String {
    "https://arb1.arbitrum.io/rpc".to_string()
}

fn default_multicall_address() -> String {
    "0xcA11bde05977b3631167028862bE2a173976CA11".to_string()
}

fn default_chunk_size() -> usize {
    500
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            multicall_address: default_multicall_address(),
            chunk_size: default_chunk_size(),
            tokens: default_tokens(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubgraphConfig {
    pub mainnet_url: String,
    pub testnet_url: String,
    /// Trade ids per GraphQL request
    #[serde(default = "default_subgraph_chunk_size")]
    pub chunk_size: usize,
}

fn default_subgraph_chunk_size() -> usize {
    100
}

impl Default for SubgraphConfig {
    fn default() -> Self {
        Self {
            mainnet_url: "https://api.subgraph.ormilabs.com/api/public/67a599d5-c8d2-4cc4-9c4d-2975a97bc5d8/subgraphs/ost-prod/live/gn".to_string(),
            testnet_url: "https://api.subgraph.ormilabs.com/api/public/67a599d5-c8d2-4cc4-9c4d-2975a97bc5d8/subgraphs/ost-sep/live/gn".to_string(),
            chunk_size: default_subgraph_chunk_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    /// Length of the trailing window used by the daily series
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// Audit log rows shown as recent activity
    #[serde(default = "default_recent_activity_limit")]
    pub recent_activity_limit: i64,
}

/// Ten years of daily buckets
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// Largest `first` a Graph node accepts on one query
pub const MAX_SUBGRAPH_CHUNK_SIZE: usize = 1000;

fn default_window_days() -> u32 {
    30
}

fn default_recent_activity_limit() -> i64 {
    20
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            recent_activity_limit: default_recent_activity_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("database.max_connections", 5)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Environment-specific overrides (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("AGENTDASH_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // AGENTDASH_DATABASE__URL, AGENTDASH_CHAIN__RPC_URL, ...
            .add_source(
                Environment::with_prefix("AGENTDASH")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.chain.chunk_size == 0 {
            errors.push("chain.chunk_size must be positive".to_string());
        }
        if self.subgraph.chunk_size == 0 {
            errors.push("subgraph.chunk_size must be positive".to_string());
        }
        if self.analytics.window_days == 0 || self.analytics.window_days > MAX_WINDOW_DAYS {
            errors.push(format!(
                "analytics.window_days must be between 1 and {MAX_WINDOW_DAYS}"
            ));
        }
        if self.subgraph.chunk_size > MAX_SUBGRAPH_CHUNK_SIZE {
            errors.push(format!(
                "subgraph.chunk_size must be at most {MAX_SUBGRAPH_CHUNK_SIZE}"
            ));
        }

        for (name, value) in [
            ("chain.rpc_url", &self.chain.rpc_url),
            ("subgraph.mainnet_url", &self.subgraph.mainnet_url),
            ("subgraph.testnet_url", &self.subgraph.testnet_url),
        ] {
            if let Err(e) = url::Url::parse(value) {
                errors.push(format!("{name} is not a valid URL: {e}"));
            }
        }

        if let Err(e) = parse_address(&self.chain.multicall_address) {
            errors.push(format!("chain.multicall_address: {e}"));
        }
        for token in &self.chain.tokens {
            if let Err(e) = parse_address(&token.address) {
                errors.push(format!("token {}: {e}", token.symbol));
            }
            // U256 holds at most 78 decimal digits
            if token.decimals > 77 {
                errors.push(format!("token {}: decimals must be <= 77", token.symbol));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/agentdash".to_string(),
                max_connections: 5,
            },
            chain: ChainConfig::default(),
            subgraph: SubgraphConfig::default(),
            analytics: AnalyticsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_defaults_validate() {
        assert!(sample().validate().is_ok());
        assert_eq!(sample().chain.tokens.len(), 4);
        assert_eq!(sample().chain.chunk_size, 500);
    }

    #[test]
    fn test_validate_collects_every_error() {
        let mut cfg = sample();
        cfg.chain.chunk_size = 0;
        cfg.chain.rpc_url = "not a url".to_string();
        cfg.chain.tokens.push(TokenConfig::new("BAD", "0x1234", 6));

        let errors = cfg.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("chunk_size")));
        assert!(errors.iter().any(|e| e.contains("rpc_url")));
        assert!(errors.iter().any(|e| e.contains("BAD")));
    }

    #[test]
    fn test_window_days_is_bounded() {
        let mut cfg = sample();
        cfg.analytics.window_days = MAX_WINDOW_DAYS;
        assert!(cfg.validate().is_ok());

        cfg.analytics.window_days = u32::MAX;
        let errors = cfg.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("window_days"));
    }

    #[test]
    fn test_subgraph_chunk_size_fits_one_page() {
        let mut cfg = sample();
        cfg.subgraph.chunk_size = MAX_SUBGRAPH_CHUNK_SIZE;
        assert!(cfg.validate().is_ok());

        cfg.subgraph.chunk_size = MAX_SUBGRAPH_CHUNK_SIZE + 1;
        let errors = cfg.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("subgraph.chunk_size")));
    }
}
