use dashmap::DashMap;
use nat64dns_domain::config::{SaturationPolicy, UpstreamConfig};
use nat64dns_domain::DomainError;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::UdpSocket;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

/// Bounded pool of outbound UDP transaction slots.
///
/// A slot is a semaphore permit plus a socket connected to one upstream, so
/// the kernel filters datagrams from any other source. Idle sockets are kept
/// per upstream and handed out again; a socket whose transaction timed out is
/// discarded instead.
pub struct UdpSocketPool {
    /// Idle sockets per upstream server
    idle: DashMap<SocketAddr, Vec<UdpSocket>>,

    max_idle_per_server: usize,

    /// One permit per concurrent outbound transaction
    semaphore: Arc<Semaphore>,

    capacity: usize,

    saturation: SaturationPolicy,

    total_created: AtomicU64,
    total_reused: AtomicU64,
    total_saturated: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl UdpSocketPool {
    pub fn new(capacity: usize, max_idle_per_server: usize, saturation: SaturationPolicy) -> Self {
        info!(
            capacity,
            max_idle_per_server,
            saturation = ?saturation,
            "Initializing upstream socket pool"
        );

        Self {
            idle: DashMap::new(),
            max_idle_per_server,
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            saturation,
            total_created: AtomicU64::new(0),
            total_reused: AtomicU64::new(0),
            total_saturated: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(
            config.socket_pool_size,
            config.max_idle_per_server,
            config.saturation,
        )
    }

    /// Takes a transaction slot for `server`.
    ///
    /// Under [`SaturationPolicy::Wait`] this waits for a free slot until
    /// `deadline`; under [`SaturationPolicy::Reject`] it fails at once.
    pub async fn acquire(
        &self,
        server: SocketAddr,
        deadline: Instant,
    ) -> Result<PooledUdpSocket<'_>, DomainError> {
        let permit = match self.saturation {
            SaturationPolicy::Reject => self
                .semaphore
                .clone()
                .try_acquire_owned()
                .map_err(|_| self.saturated(server))?,
            SaturationPolicy::Wait => {
                let wait = self.semaphore.clone().acquire_owned();
                match tokio::time::timeout_at(tokio::time::Instant::from_std(deadline), wait).await
                {
                    Ok(Ok(permit)) => permit,
                    Ok(Err(_)) | Err(_) => return Err(self.saturated(server)),
                }
            }
        };

        let socket = match self.take_idle(server) {
            Some(socket) => {
                self.total_reused.fetch_add(1, Ordering::Relaxed);
                debug!(server = %server, "Reusing upstream socket");
                socket
            }
            None => {
                let socket = create_socket(server).map_err(|e| DomainError::UpstreamTransport {
                    server: server.to_string(),
                    reason: format!("socket setup failed: {}", e),
                })?;
                self.total_created.fetch_add(1, Ordering::Relaxed);
                debug!(server = %server, "Created upstream socket");
                socket
            }
        };

        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::AcqRel);

        Ok(PooledUdpSocket {
            socket: Some(socket),
            server,
            pool: self,
            reusable: true,
            _permit: permit,
        })
    }

    fn saturated(&self, server: SocketAddr) -> DomainError {
        self.total_saturated.fetch_add(1, Ordering::Relaxed);
        warn!(
            server = %server,
            capacity = self.capacity,
            "Upstream socket pool saturated"
        );
        DomainError::PoolSaturated
    }

    fn take_idle(&self, server: SocketAddr) -> Option<UdpSocket> {
        self.idle.get_mut(&server).and_then(|mut entry| entry.pop())
    }

    fn release(&self, server: SocketAddr, socket: UdpSocket) {
        let mut entry = self.idle.entry(server).or_default();
        if entry.len() < self.max_idle_per_server {
            entry.push(socket);
        } else {
            debug!(server = %server, "Idle list full, dropping socket");
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            total_created: self.total_created.load(Ordering::Relaxed),
            total_reused: self.total_reused.load(Ordering::Relaxed),
            total_saturated: self.total_saturated.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Acquire),
            peak_in_flight: self.peak_in_flight.load(Ordering::Acquire),
            idle: self.idle.iter().map(|e| e.len()).sum(),
        }
    }
}

fn create_socket(server: SocketAddr) -> Result<UdpSocket, std::io::Error> {
    use socket2::{Domain, Protocol, Socket, Type};

    let (domain, bind_addr) = if server.is_ipv4() {
        (
            Domain::IPV4,
            SocketAddr::from((std::net::Ipv4Addr::UNSPECIFIED, 0)),
        )
    } else {
        (
            Domain::IPV6,
            SocketAddr::from((std::net::Ipv6Addr::UNSPECIFIED, 0)),
        )
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_recv_buffer_size(64 * 1024)?;
    socket.bind(&bind_addr.into())?;
    socket.connect(&server.into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

/// One outbound transaction slot. Dropping it frees the slot and, unless
/// [`discard`](Self::discard) was called, returns the socket to the pool.
pub struct PooledUdpSocket<'a> {
    socket: Option<UdpSocket>,
    server: SocketAddr,
    pool: &'a UdpSocketPool,
    reusable: bool,
    _permit: OwnedSemaphorePermit,
}

impl<'a> PooledUdpSocket<'a> {
    pub fn socket(&self) -> Option<&UdpSocket> {
        self.socket.as_ref()
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    /// Closes the socket on release instead of keeping it. Used after a
    /// timeout, when a late answer could still arrive on it.
    pub fn discard(&mut self) {
        self.reusable = false;
    }
}

impl<'a> Drop for PooledUdpSocket<'a> {
    fn drop(&mut self) {
        self.pool.in_flight.fetch_sub(1, Ordering::AcqRel);
        if let Some(socket) = self.socket.take() {
            if self.reusable {
                self.pool.release(self.server, socket);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PoolStats {
    pub total_created: u64,
    pub total_reused: u64,
    /// Acquisitions that ended in `PoolSaturated`
    pub total_saturated: u64,
    pub in_flight: usize,
    pub peak_in_flight: usize,
    pub idle: usize,
}

impl PoolStats {
    pub fn reuse_rate(&self) -> f64 {
        let total = self.total_created + self.total_reused;
        if total == 0 {
            0.0
        } else {
            self.total_reused as f64 / total as f64
        }
    }
}
