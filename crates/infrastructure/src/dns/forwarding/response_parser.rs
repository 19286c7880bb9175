use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::{Name, RData, RecordType};
use nat64dns_domain::{DomainError, UpstreamAnswer};
use tracing::debug;

pub struct ResponseParser;

impl ResponseParser {
    pub fn parse(response_bytes: &[u8]) -> Result<Message, DomainError> {
        Message::from_vec(response_bytes).map_err(|e| {
            DomainError::MalformedMessage(format!("Failed to parse DNS response: {}", e))
        })
    }

    /// True when `message` answers the outstanding A query `id` for `name`.
    pub fn correlates(message: &Message, id: u16, name: &Name) -> bool {
        if message.id() != id || message.message_type() != MessageType::Response {
            return false;
        }
        match message.queries() {
            [query] => query.query_type() == RecordType::A && query.name() == name,
            _ => false,
        }
    }

    /// Extracts the A records of a correlated response.
    ///
    /// Every A record in the answer section is collected, so a CNAME chain
    /// resolved by the upstream yields its final addresses.
    pub fn into_answer(message: &Message, server: &str) -> Result<UpstreamAnswer, DomainError> {
        match message.response_code() {
            ResponseCode::NoError => {}
            ResponseCode::NXDomain => {
                return Ok(UpstreamAnswer {
                    nxdomain: true,
                    ..UpstreamAnswer::default()
                })
            }
            rcode => {
                return Err(DomainError::UpstreamRejected {
                    server: server.to_string(),
                    rcode: rcode.to_string(),
                })
            }
        }

        let mut answer = UpstreamAnswer::default();
        for record in message.answers() {
            let ttl = record.ttl();
            answer.min_ttl = Some(answer.min_ttl.map_or(ttl, |current| current.min(ttl)));

            if let Some(RData::A(a)) = record.data() {
                answer.addresses.push(a.0);
            }
        }

        debug!(
            server = %server,
            addresses = answer.addresses.len(),
            min_ttl = ?answer.min_ttl,
            "Upstream response parsed"
        );

        Ok(answer)
    }
}
