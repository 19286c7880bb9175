mod prefix_provider;
mod prefix_source;
mod upstream_resolver;

pub use prefix_provider::{PrefixLookup, PrefixProvider};
pub use prefix_source::PrefixSource;
pub use upstream_resolver::UpstreamResolver;
