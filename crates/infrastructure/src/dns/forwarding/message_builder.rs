//! Upstream query construction with `hickory-proto`.

use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};
use nat64dns_domain::DomainError;

pub struct MessageBuilder;

impl MessageBuilder {
    /// Parses `domain` into a fully qualified name.
    pub fn parse_name(domain: &str) -> Result<Name, DomainError> {
        let trimmed = domain.trim_end_matches('.');
        Name::from_ascii(format!("{}.", trimmed)).map_err(|e| {
            DomainError::InvalidDomainName(format!("Invalid domain '{}': {}", domain, e))
        })
    }

    /// Serializes a recursive A query for `name` with transaction `id`.
    pub fn build_a_query(id: u16, name: &Name) -> Result<Vec<u8>, DomainError> {
        let mut message = Message::new();
        message
            .set_id(id)
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(true)
            .add_query(Query::query(name.clone(), RecordType::A));

        message.to_vec().map_err(|e| {
            DomainError::InvalidDomainName(format!("Failed to serialize DNS message: {}", e))
        })
    }
}
