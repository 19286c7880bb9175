use async_trait::async_trait;
use nat64dns_domain::{DomainError, UpstreamAnswer};
use std::time::Instant;

#[async_trait]
pub trait UpstreamResolver: Send + Sync {
    /// Resolves the A records of `name`, giving up at `deadline`.
    async fn query_a(&self, name: &str, deadline: Instant) -> Result<UpstreamAnswer, DomainError>;
}
