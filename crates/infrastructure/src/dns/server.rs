use super::dispatcher::RequestDispatcher;
use super::raw_query::RawHeader;
use super::wire_response::build_raw_error;
use hickory_proto::op::ResponseCode;
use nat64dns_domain::config::AdmissionPolicy;
use nat64dns_domain::InboundRequest;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const RECV_BUFFER_SIZE: usize = 4096;

/// Receive loop for one listening socket. Every datagram becomes its own
/// task, gated by a request limiter that may be shared between listeners.
pub struct UdpDnsServer {
    socket: Arc<UdpSocket>,
    dispatcher: Arc<RequestDispatcher>,
    limiter: Arc<Semaphore>,
    admission: AdmissionPolicy,
}

impl UdpDnsServer {
    pub fn new(
        socket: Arc<UdpSocket>,
        dispatcher: Arc<RequestDispatcher>,
        limiter: Arc<Semaphore>,
        admission: AdmissionPolicy,
    ) -> Self {
        Self {
            socket,
            dispatcher,
            limiter,
            admission,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serves until `shutdown` is cancelled. Requests still in flight at that
    /// point are aborted.
    pub async fn run(self, shutdown: CancellationToken) {
        let local = self.socket.local_addr().ok();
        info!(
            bind_address = ?local,
            admission = self.admission.as_str(),
            "UDP listener ready"
        );

        let mut tasks: JoinSet<()> = JoinSet::new();
        let mut recv_buf = vec![0u8; RECV_BUFFER_SIZE];

        loop {
            while tasks.try_join_next().is_some() {}

            let queued_permit = match self.admission {
                AdmissionPolicy::Queue => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        permit = self.limiter.clone().acquire_owned() => match permit {
                            Ok(permit) => Some(permit),
                            Err(_) => break,
                        },
                    }
                }
                AdmissionPolicy::Reject => None,
            };

            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = self.socket.recv_from(&mut recv_buf) => received,
            };

            let (len, client) = match received {
                Ok(received) => received,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    // ICMP errors from earlier sends surface here on some platforms.
                    debug!(error = %e, "UDP recv error");
                    continue;
                }
            };

            let request = InboundRequest::new(client, &recv_buf[..len]);

            let permit = match queued_permit {
                Some(permit) => permit,
                None => match self.try_admit() {
                    Some(permit) => permit,
                    None => {
                        self.reject(&request).await;
                        continue;
                    }
                },
            };

            let dispatcher = Arc::clone(&self.dispatcher);
            let socket = Arc::clone(&self.socket);
            tasks.spawn(async move {
                let _permit = permit;
                if let Some(response) = dispatcher.handle(&request).await {
                    if let Err(e) = socket.send_to(&response, request.client).await {
                        warn!(client = %request.client, error = %e, "Failed to send response");
                    }
                }
            });
        }

        let in_flight = tasks.len();
        tasks.shutdown().await;
        info!(bind_address = ?local, aborted = in_flight, "UDP listener stopped");
    }

    fn try_admit(&self) -> Option<OwnedSemaphorePermit> {
        self.limiter.clone().try_acquire_owned().ok()
    }

    async fn reject(&self, request: &InboundRequest) {
        if RawHeader::peek(&request.raw).map_or(true, |header| header.is_response) {
            return;
        }
        warn!(client = %request.client, "Request limit reached, answering SERVFAIL");
        if let Some(response) = build_raw_error(&request.raw, ResponseCode::ServFail) {
            if let Err(e) = self.socket.send_to(&response, request.client).await {
                error!(client = %request.client, error = %e, "Failed to send rejection");
            }
        }
    }
}
