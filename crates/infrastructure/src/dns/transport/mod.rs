pub mod udp_pool;

pub use udp_pool::{PoolStats, PooledUdpSocket, UdpSocketPool};
