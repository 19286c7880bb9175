use super::raw_query::{question_end, RawHeader};
use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::AAAA;
use hickory_proto::rr::{RData, Record};
use nat64dns_domain::DomainError;
use std::net::Ipv6Addr;

/// Builds a response to a parsed `request`: ID, opcode, RD and the question
/// are echoed, RA is set, and one AAAA record is added per address.
pub fn build_response(
    request: &Message,
    rcode: ResponseCode,
    addresses: &[Ipv6Addr],
    ttl: u32,
) -> Result<Vec<u8>, DomainError> {
    let mut response = Message::new();
    response
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_recursion_desired(request.recursion_desired())
        .set_recursion_available(true)
        .set_response_code(rcode)
        .add_queries(request.queries().to_vec());

    if let Some(query) = request.queries().first() {
        for address in addresses {
            response.add_answer(Record::from_rdata(
                query.name().clone(),
                ttl,
                RData::AAAA(AAAA(*address)),
            ));
        }
    }

    response.to_vec().map_err(|e| {
        DomainError::MalformedMessage(format!("Failed to serialize DNS response: {}", e))
    })
}

/// Builds an error response straight from raw bytes, for datagrams that
/// could not be parsed. The question is echoed only when it can be walked.
///
/// Returns `None` when the datagram is too short to carry an ID.
pub fn build_raw_error(raw: &[u8], rcode: ResponseCode) -> Option<Vec<u8>> {
    let header = RawHeader::peek(raw)?;
    let question = question_end(raw).map(|end| &raw[12..end]);

    let mut buf = Vec::with_capacity(12 + question.map_or(0, <[u8]>::len));
    buf.extend_from_slice(&header.id.to_be_bytes());
    buf.push(0x80 | (header.opcode << 3) | u8::from(header.recursion_desired));
    buf.push(0x80 | (u16::from(rcode) as u8 & 0x0F));
    buf.extend_from_slice(&[0x00, u8::from(question.is_some())]);
    buf.extend_from_slice(&[0x00; 6]);
    if let Some(question) = question {
        buf.extend_from_slice(question);
    }
    Some(buf)
}
