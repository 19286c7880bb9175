use async_trait::async_trait;
use nat64dns_domain::{DomainError, Nat64Prefix};

/// Backing store the prefix cache refreshes from.
#[async_trait]
pub trait PrefixSource: Send + Sync {
    async fn load(&self) -> Result<Nat64Prefix, DomainError>;

    /// Human-readable location, used in log fields.
    fn describe(&self) -> String;
}
