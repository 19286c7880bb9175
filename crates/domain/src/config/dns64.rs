use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Dns64Config {
    /// File holding the NAT64 prefix (tayga configuration by default).
    #[serde(default = "default_prefix_file_path")]
    pub prefix_file_path: PathBuf,

    /// Directory the canonical prefix path must stay inside.
    #[serde(default = "default_allowed_root")]
    pub allowed_root: PathBuf,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Delay before a failed refresh is attempted again.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_refresh_timeout_ms")]
    pub refresh_timeout_ms: u64,

    /// Upper bound on bytes read from the prefix file per refresh.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Cap on the TTL of synthesized DNS64 answers.
    #[serde(default = "default_answer_ttl")]
    pub answer_ttl: u32,

    #[serde(default = "default_synthetic_suffix")]
    pub synthetic_suffix: String,

    #[serde(default = "default_synthetic_base")]
    pub synthetic_base: String,

    #[serde(default = "default_synthetic_ttl")]
    pub synthetic_ttl: u32,
}

impl Dns64Config {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms).min(self.cache_ttl())
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }
}

impl Default for Dns64Config {
    fn default() -> Self {
        Self {
            prefix_file_path: default_prefix_file_path(),
            allowed_root: default_allowed_root(),
            cache_ttl_secs: default_cache_ttl_secs(),
            retry_backoff_ms: default_retry_backoff_ms(),
            refresh_timeout_ms: default_refresh_timeout_ms(),
            max_file_bytes: default_max_file_bytes(),
            answer_ttl: default_answer_ttl(),
            synthetic_suffix: default_synthetic_suffix(),
            synthetic_base: default_synthetic_base(),
            synthetic_ttl: default_synthetic_ttl(),
        }
    }
}

fn default_prefix_file_path() -> PathBuf {
    PathBuf::from("/etc/tayga/default.conf")
}

fn default_allowed_root() -> PathBuf {
    PathBuf::from("/etc/tayga")
}

fn default_cache_ttl_secs() -> u64 {
    30
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_refresh_timeout_ms() -> u64 {
    1000
}

fn default_max_file_bytes() -> u64 {
    64 * 1024
}

fn default_answer_ttl() -> u32 {
    60
}

fn default_synthetic_suffix() -> String {
    "nat64".to_string()
}

fn default_synthetic_base() -> String {
    "64:ff9b:1::".to_string()
}

fn default_synthetic_ttl() -> u32 {
    300
}
