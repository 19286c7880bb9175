use super::message_builder::MessageBuilder;
use super::response_parser::ResponseParser;
use crate::dns::transport::UdpSocketPool;
use async_trait::async_trait;
use hickory_proto::rr::Name;
use nat64dns_application::ports::UpstreamResolver;
use nat64dns_domain::{DomainError, UpstreamAnswer, UpstreamQuery};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Maximum UDP DNS response size read from an upstream
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

/// Sends A queries to the configured upstream resolvers through the shared
/// socket pool. A timeout or transport error gets one more attempt, with a
/// fresh transaction ID, against the next server in the list.
///
/// The caller's deadline covers both attempts: the first one ends early
/// enough to leave a full `query_timeout` for the retry.
pub struct UpstreamForwarder {
    servers: Vec<SocketAddr>,
    pool: Arc<UdpSocketPool>,
    query_timeout: Duration,
}

impl UpstreamForwarder {
    pub fn new(
        servers: Vec<SocketAddr>,
        pool: Arc<UdpSocketPool>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            servers,
            pool,
            query_timeout,
        }
    }

    pub fn pool(&self) -> &Arc<UdpSocketPool> {
        &self.pool
    }

    fn server_for_attempt(&self, attempt: usize) -> Option<SocketAddr> {
        if self.servers.is_empty() {
            return None;
        }
        Some(self.servers[attempt % self.servers.len()])
    }

    /// Deadline of the first attempt under an overall `deadline`.
    fn first_attempt_deadline(&self, now: Instant, deadline: Instant) -> Instant {
        let own = (now + self.query_timeout).min(deadline);
        match deadline.checked_sub(self.query_timeout) {
            Some(split) if split > now => own.min(split),
            _ => own,
        }
    }

    async fn attempt(
        &self,
        server: SocketAddr,
        name: &Name,
        attempt_deadline: Instant,
    ) -> Result<UpstreamAnswer, DomainError> {
        let server_label = server.to_string();
        let mut conn = self.pool.acquire(server, attempt_deadline).await?;

        let query = UpstreamQuery::new(fastrand::u16(..), name.to_ascii(), attempt_deadline);
        let request_bytes = MessageBuilder::build_a_query(query.transaction_id, name)?;

        let socket = conn.socket().ok_or_else(|| DomainError::UpstreamTransport {
            server: server_label.clone(),
            reason: "socket already released".to_string(),
        })?;

        if let Err(e) = socket.send(&request_bytes).await {
            conn.discard();
            return Err(DomainError::UpstreamTransport {
                server: server_label,
                reason: e.to_string(),
            });
        }

        debug!(
            server = %server,
            domain = %query.target_name,
            id = query.transaction_id,
            "Upstream query sent"
        );

        let mut recv_buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
        let attempt_deadline = tokio::time::Instant::from_std(query.deadline);

        loop {
            let received =
                tokio::time::timeout_at(attempt_deadline, socket.recv(&mut recv_buf)).await;

            let len = match received {
                Ok(Ok(len)) => len,
                Ok(Err(e)) => {
                    conn.discard();
                    return Err(DomainError::UpstreamTransport {
                        server: server_label,
                        reason: e.to_string(),
                    });
                }
                Err(_) => {
                    conn.discard();
                    return Err(DomainError::UpstreamTimeout {
                        server: server_label,
                    });
                }
            };

            let message = match ResponseParser::parse(&recv_buf[..len]) {
                Ok(message) => message,
                Err(e) => {
                    debug!(server = %server, error = %e, "Discarding unparseable datagram");
                    continue;
                }
            };

            if !ResponseParser::correlates(&message, query.transaction_id, name) {
                debug!(
                    server = %server,
                    expected_id = query.transaction_id,
                    received_id = message.id(),
                    "Discarding uncorrelated response"
                );
                continue;
            }

            return ResponseParser::into_answer(&message, &server_label);
        }
    }
}

#[async_trait]
impl UpstreamResolver for UpstreamForwarder {
    async fn query_a(&self, name: &str, deadline: Instant) -> Result<UpstreamAnswer, DomainError> {
        let qname = MessageBuilder::parse_name(name)?;
        let primary = self
            .server_for_attempt(0)
            .ok_or_else(|| DomainError::UpstreamTransport {
                server: "-".to_string(),
                reason: "no upstream servers configured".to_string(),
            })?;

        let first_deadline = self.first_attempt_deadline(Instant::now(), deadline);
        match self.attempt(primary, &qname, first_deadline).await {
            Err(e) if e.is_retryable() && Instant::now() < deadline => {
                let secondary = self.server_for_attempt(1).unwrap_or(primary);
                warn!(
                    domain = %name,
                    server = %primary,
                    retry_server = %secondary,
                    error = %e,
                    "Upstream attempt failed, retrying"
                );
                let retry_deadline = (Instant::now() + self.query_timeout).min(deadline);
                self.attempt(secondary, &qname, retry_deadline).await
            }
            outcome => outcome,
        }
    }
}
