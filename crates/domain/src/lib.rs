//! nat64dns domain layer: prefixes, synthesis and the synthetic-name scheme.
pub mod config;
pub mod dns_record;
pub mod dns_request;
pub mod errors;
pub mod nat64_prefix;
pub mod synthesis;
pub mod synthetic_name;

pub use config::{CliOverrides, Config, ConfigError};
pub use dns_record::RecordType;
pub use dns_request::{InboundRequest, UpstreamAnswer, UpstreamQuery};
pub use errors::DomainError;
pub use nat64_prefix::Nat64Prefix;
pub use synthesis::synthesize;
pub use synthetic_name::{
    SyntheticDecision, SyntheticNameToken, SyntheticNamespace, MAX_CUSTOMER_ID,
};
