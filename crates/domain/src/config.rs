pub mod dns64;
pub mod errors;
pub mod logging;
pub mod root;
pub mod server;
pub mod upstream;

pub use dns64::Dns64Config;
pub use errors::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use root::{CliOverrides, Config};
pub use server::{AdmissionPolicy, ServerConfig};
pub use upstream::{SaturationPolicy, UpstreamConfig};
