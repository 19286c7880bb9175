#![allow(dead_code)]
mod dns_server_mock;
mod prefix_sources;

pub use dns_server_mock::{MockBehavior, MockDnsServer};
pub use prefix_sources::CountingPrefixSource;

use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};

/// Wire-format client query.
pub fn query_bytes(id: u16, name: &str, record_type: RecordType) -> Vec<u8> {
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(Query::query(Name::from_ascii(name).unwrap(), record_type));
    message.to_vec().unwrap()
}
