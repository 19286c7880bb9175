use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addresses")]
    pub bind_addresses: Vec<String>,

    /// Maximum inbound requests handled concurrently.
    #[serde(default = "default_request_concurrency_limit")]
    pub request_concurrency_limit: usize,

    #[serde(default)]
    pub admission: AdmissionPolicy,

    /// Added on top of two upstream timeouts to form the per-request deadline.
    #[serde(default = "default_request_grace_ms")]
    pub request_grace_ms: u64,
}

/// What happens to a datagram that arrives while every request slot is busy.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionPolicy {
    /// Stop reading the socket until a slot frees up.
    #[default]
    Queue,

    /// Answer SERVFAIL immediately.
    Reject,
}

impl AdmissionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queue => "queue",
            Self::Reject => "reject",
        }
    }
}

impl ServerConfig {
    pub fn request_grace(&self) -> Duration {
        Duration::from_millis(self.request_grace_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addresses: default_bind_addresses(),
            request_concurrency_limit: default_request_concurrency_limit(),
            admission: AdmissionPolicy::default(),
            request_grace_ms: default_request_grace_ms(),
        }
    }
}

fn default_bind_addresses() -> Vec<String> {
    vec!["[::]:53".to_string()]
}

fn default_request_concurrency_limit() -> usize {
    1024
}

fn default_request_grace_ms() -> u64 {
    500
}
