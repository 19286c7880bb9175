use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// One inbound datagram, alive until its response is emitted or abandoned.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub client: SocketAddr,
    pub raw: Arc<[u8]>,
    pub received_at: Instant,
}

impl InboundRequest {
    pub fn new(client: SocketAddr, raw: &[u8]) -> Self {
        Self {
            client,
            raw: Arc::from(raw),
            received_at: Instant::now(),
        }
    }
}

/// One outbound A query attempt.
#[derive(Debug, Clone)]
pub struct UpstreamQuery {
    pub transaction_id: u16,
    pub target_name: Arc<str>,
    pub deadline: Instant,
}

impl UpstreamQuery {
    pub fn new(transaction_id: u16, target_name: impl Into<Arc<str>>, deadline: Instant) -> Self {
        Self {
            transaction_id,
            target_name: target_name.into(),
            deadline,
        }
    }
}

/// A-record answer from an upstream resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamAnswer {
    pub addresses: Vec<std::net::Ipv4Addr>,
    pub min_ttl: Option<u32>,
    pub nxdomain: bool,
}
