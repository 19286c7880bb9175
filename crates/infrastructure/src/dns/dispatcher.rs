use super::raw_query::RawHeader;
use super::wire_response::{build_raw_error, build_response};
use hickory_proto::op::{Message, ResponseCode};
use nat64dns_application::use_cases::{Resolution, ResolveAaaaUseCase};
use nat64dns_domain::{DomainError, InboundRequest, RecordType};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

const OPCODE_QUERY: u8 = 0;

/// Turns one inbound datagram into at most one response datagram.
///
/// Upstream work must finish within `upstream_budget` of receipt; the whole
/// request, including the prefix lookup, gets `request_grace` on top.
pub struct RequestDispatcher {
    use_case: Arc<ResolveAaaaUseCase>,
    upstream_budget: Duration,
    request_grace: Duration,
}

impl RequestDispatcher {
    pub fn new(
        use_case: Arc<ResolveAaaaUseCase>,
        upstream_budget: Duration,
        request_grace: Duration,
    ) -> Self {
        Self {
            use_case,
            upstream_budget,
            request_grace,
        }
    }

    pub fn upstream_budget(&self) -> Duration {
        self.upstream_budget
    }

    pub fn request_timeout(&self) -> Duration {
        self.upstream_budget + self.request_grace
    }

    /// Returns `None` only for datagrams that must not be answered: too short
    /// to carry an ID, or responses rather than queries.
    pub async fn handle(&self, request: &InboundRequest) -> Option<Vec<u8>> {
        let raw = &request.raw[..];

        let header = match RawHeader::peek(raw) {
            Some(header) => header,
            None => {
                debug!(
                    client = %request.client,
                    len = raw.len(),
                    "Dropping unattributable datagram"
                );
                return None;
            }
        };

        if header.is_response {
            debug!(client = %request.client, id = header.id, "Dropping response datagram");
            return None;
        }

        if header.opcode != OPCODE_QUERY {
            debug!(client = %request.client, opcode = header.opcode, "Unsupported opcode");
            return build_raw_error(raw, ResponseCode::NotImp);
        }

        let message = match Message::from_vec(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    client = %request.client,
                    id = header.id,
                    error = %e,
                    "Malformed DNS message"
                );
                return build_raw_error(raw, ResponseCode::ServFail);
            }
        };

        let response = self.respond(request, &message).await;
        match response {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                error!(client = %request.client, error = %e, "Failed to encode response");
                build_raw_error(raw, ResponseCode::ServFail)
            }
        }
    }

    async fn respond(
        &self,
        request: &InboundRequest,
        message: &Message,
    ) -> Result<Vec<u8>, DomainError> {
        let query = match message.queries() {
            [query] => query,
            queries => {
                debug!(
                    client = %request.client,
                    count = queries.len(),
                    "Question count is not 1"
                );
                return build_response(message, ResponseCode::ServFail, &[], 0);
            }
        };

        // Punycode stays encoded; upstream queries are built from ASCII.
        let name = query.name().to_ascii();
        let domain = name.trim_end_matches('.');
        let record_type = RecordType::from(u16::from(query.query_type()));
        let upstream_deadline = request.received_at + self.upstream_budget;
        let deadline = request.received_at + self.request_timeout();

        debug!(
            client = %request.client,
            domain = %domain,
            record_type = %record_type,
            "DNS query received"
        );

        let outcome = tokio::time::timeout_at(
            tokio::time::Instant::from_std(deadline),
            self.use_case.execute(domain, record_type, upstream_deadline),
        )
        .await
        .unwrap_or(Err(DomainError::RequestTimeout));

        match outcome {
            Ok(Resolution::Answer {
                addresses,
                ttl,
                source,
            }) => {
                debug!(
                    domain = %domain,
                    source = source.as_str(),
                    answers = addresses.len(),
                    "Answering"
                );
                build_response(message, ResponseCode::NoError, &addresses, ttl)
            }
            Ok(Resolution::NoData) => build_response(message, ResponseCode::NoError, &[], 0),
            Ok(Resolution::NxDomain) => build_response(message, ResponseCode::NXDomain, &[], 0),
            Err(e) => {
                log_failure(request, domain, &e);
                build_response(message, ResponseCode::ServFail, &[], 0)
            }
        }
    }
}

fn log_failure(request: &InboundRequest, domain: &str, e: &DomainError) {
    match e {
        DomainError::SyntheticMalformed { .. } => {
            debug!(client = %request.client, domain = %domain, error = %e, "Rejected synthetic name")
        }
        DomainError::PoolSaturated | DomainError::RequestTimeout => {
            warn!(client = %request.client, domain = %domain, error = %e, "Query failed")
        }
        _ => error!(client = %request.client, domain = %domain, error = %e, "Query failed"),
    }
}
