use async_trait::async_trait;
use nat64dns_domain::{DomainError, Nat64Prefix};
use std::sync::Arc;

/// Snapshot handed to one request.
#[derive(Debug, Clone)]
pub struct PrefixLookup {
    pub prefix: Arc<Nat64Prefix>,
    /// Set when the last refresh failed and `prefix` is the stale value.
    pub degraded: Option<DomainError>,
}

impl PrefixLookup {
    pub fn fresh(prefix: Arc<Nat64Prefix>) -> Self {
        Self {
            prefix,
            degraded: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

#[async_trait]
pub trait PrefixProvider: Send + Sync {
    /// Current prefix. Fails with `PrefixUnavailable` only when no value was
    /// ever loaded.
    async fn get_prefix(&self) -> Result<PrefixLookup, DomainError>;
}
