//! Minimal header inspection for datagrams `hickory-proto` may not parse.

/// Header fields readable from a possibly truncated datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawHeader {
    pub id: u16,
    pub is_response: bool,
    pub opcode: u8,
    pub recursion_desired: bool,
}

impl RawHeader {
    /// Returns `None` when the datagram is too short to carry an ID.
    pub fn peek(buf: &[u8]) -> Option<Self> {
        if buf.len() < 2 {
            return None;
        }
        let id = u16::from_be_bytes([buf[0], buf[1]]);
        let flags = buf.get(2).copied().unwrap_or(0);

        Some(Self {
            id,
            is_response: flags & 0x80 != 0,
            opcode: (flags >> 3) & 0x0F,
            recursion_desired: flags & 0x01 != 0,
        })
    }
}

/// Byte offset where the single question of `buf` ends, if it can be walked
/// without compression pointers.
pub fn question_end(buf: &[u8]) -> Option<usize> {
    if buf.len() < 12 {
        return None;
    }
    let qdcount = u16::from_be_bytes([buf[4], buf[5]]);
    if qdcount != 1 {
        return None;
    }

    let mut pos = 12;
    let mut name_len = 0usize;
    loop {
        let label_len = *buf.get(pos)? as usize;
        if label_len == 0 {
            pos += 1;
            break;
        }
        if label_len & 0xC0 != 0 {
            return None;
        }
        name_len += label_len + 1;
        if name_len > 255 {
            return None;
        }
        pos += 1 + label_len;
    }

    let end = pos + 4;
    if end > buf.len() {
        return None;
    }
    Some(end)
}
