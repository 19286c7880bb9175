use serde::{Deserialize, Serialize};
use std::net::{Ipv6Addr, SocketAddr};
use std::path::PathBuf;

use super::dns64::Dns64Config;
use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::server::ServerConfig;
use super::upstream::UpstreamConfig;

const LOCAL_CONFIG_PATH: &str = "nat64dns.toml";
const SYSTEM_CONFIG_PATH: &str = "/etc/nat64dns/config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Listen addresses and admission control
    #[serde(default)]
    pub server: ServerConfig,

    /// Prefix source and synthesis settings
    #[serde(default)]
    pub dns64: Dns64Config,

    /// Upstream resolvers and the outbound transaction pool
    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. nat64dns.toml in current directory
    /// 3. /etc/nat64dns/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if let Some(path) = Self::get_config_path() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if !overrides.bind_addresses.is_empty() {
            self.server.bind_addresses = overrides.bind_addresses;
        }
        if !overrides.upstream_servers.is_empty() {
            self.upstream.servers = overrides.upstream_servers;
        }
        if let Some(path) = overrides.prefix_file_path {
            self.dns64.prefix_file_path = path;
        }
        if let Some(root) = overrides.allowed_root {
            self.dns64.allowed_root = root;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind_addresses.is_empty() {
            return Err(ConfigError::Validation(
                "No bind addresses configured".to_string(),
            ));
        }
        for addr in &self.server.bind_addresses {
            addr.parse::<SocketAddr>().map_err(|e| {
                ConfigError::Validation(format!("Invalid bind address '{}': {}", addr, e))
            })?;
        }

        if self.upstream.servers.is_empty() {
            return Err(ConfigError::Validation(
                "No upstream servers configured".to_string(),
            ));
        }
        for server in &self.upstream.servers {
            server.parse::<SocketAddr>().map_err(|e| {
                ConfigError::Validation(format!("Invalid upstream server '{}': {}", server, e))
            })?;
        }

        if self.upstream.socket_pool_size == 0 {
            return Err(ConfigError::Validation(
                "socket_pool_size must be at least 1".to_string(),
            ));
        }
        if self.server.request_concurrency_limit == 0 {
            return Err(ConfigError::Validation(
                "request_concurrency_limit must be at least 1".to_string(),
            ));
        }
        if self.upstream.query_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "query_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.dns64.cache_ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "cache_ttl_secs must be greater than 0".to_string(),
            ));
        }
        if self.dns64.refresh_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "refresh_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.dns64.max_file_bytes == 0 {
            return Err(ConfigError::Validation(
                "max_file_bytes must be greater than 0".to_string(),
            ));
        }
        if self.dns64.synthetic_suffix.trim_matches('.').is_empty() {
            return Err(ConfigError::Validation(
                "synthetic_suffix cannot be empty".to_string(),
            ));
        }
        self.dns64
            .synthetic_base
            .parse::<Ipv6Addr>()
            .map_err(|e| {
                ConfigError::Validation(format!(
                    "Invalid synthetic_base '{}': {}",
                    self.dns64.synthetic_base, e
                ))
            })?;

        Ok(())
    }

    pub fn get_config_path() -> Option<String> {
        if std::path::Path::new(LOCAL_CONFIG_PATH).exists() {
            Some(LOCAL_CONFIG_PATH.to_string())
        } else if std::path::Path::new(SYSTEM_CONFIG_PATH).exists() {
            Some(SYSTEM_CONFIG_PATH.to_string())
        } else {
            None
        }
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub bind_addresses: Vec<String>,
    pub upstream_servers: Vec<String>,
    pub prefix_file_path: Option<PathBuf>,
    pub allowed_root: Option<PathBuf>,
    pub log_level: Option<String>,
}
