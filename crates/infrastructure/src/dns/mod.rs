pub mod dispatcher;
pub mod forwarding;
pub mod raw_query;
pub mod server;
pub mod transport;
pub mod wire_response;

pub use dispatcher::RequestDispatcher;
pub use forwarding::UpstreamForwarder;
pub use server::UdpDnsServer;
pub use transport::{PoolStats, UdpSocketPool};
