use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Malformed DNS message: {0}")]
    MalformedMessage(String),

    #[error("Malformed synthetic name '{name}': {reason}")]
    SyntheticMalformed { name: String, reason: String },

    #[error("NAT64 prefix unavailable: {0}")]
    PrefixUnavailable(String),

    #[error("Invalid NAT64 prefix: {0}")]
    InvalidPrefix(String),

    #[error("Failed to read prefix file {path}: {reason}")]
    PrefixFileRead { path: String, reason: String },

    #[error("No valid prefix line found in {0}")]
    NoPrefixFound(String),

    #[error("Prefix path {path} resolves outside allowed root {root}")]
    PathTraversalRejected { path: String, root: String },

    #[error("Prefix refresh timed out")]
    PrefixRefreshTimeout,

    #[error("Prefix /{length} leaves fewer than 32 bits for an IPv4 address")]
    SynthesisRange { length: u8 },

    #[error("Upstream query to {server} timed out")]
    UpstreamTimeout { server: String },

    #[error("Upstream transport error with {server}: {reason}")]
    UpstreamTransport { server: String, reason: String },

    #[error("Upstream {server} answered {rcode}")]
    UpstreamRejected { server: String, rcode: String },

    #[error("Upstream transaction pool saturated")]
    PoolSaturated,

    #[error("Request deadline exceeded")]
    RequestTimeout,

    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),
}

impl DomainError {
    /// Errors that allow one more upstream attempt with a fresh transaction.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::UpstreamTimeout { .. } | DomainError::UpstreamTransport { .. }
        )
    }
}
