use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Ordered list; the retry goes to the next entry.
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,

    /// Maximum concurrent outbound transactions.
    #[serde(default = "default_socket_pool_size")]
    pub socket_pool_size: usize,

    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    #[serde(default)]
    pub saturation: SaturationPolicy,

    #[serde(default = "default_max_idle_per_server")]
    pub max_idle_per_server: usize,
}

/// Behaviour of a query that finds every transaction slot taken.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SaturationPolicy {
    /// Wait for a slot until the request deadline.
    #[default]
    Wait,

    /// Fail with `PoolSaturated` right away.
    Reject,
}

impl UpstreamConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            socket_pool_size: default_socket_pool_size(),
            query_timeout_ms: default_query_timeout_ms(),
            saturation: SaturationPolicy::default(),
            max_idle_per_server: default_max_idle_per_server(),
        }
    }
}

fn default_servers() -> Vec<String> {
    vec!["127.0.0.53:53".to_string()]
}

fn default_socket_pool_size() -> usize {
    64
}

fn default_query_timeout_ms() -> u64 {
    2000
}

fn default_max_idle_per_server() -> usize {
    16
}
