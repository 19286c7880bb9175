//! Custom synthetic-name scheme.
//!
//! Names under the configured suffix zone carry a customer identifier, an
//! optional site identifier and an IPv4 address:
//!
//! ```text
//! 192-0-2-1.t00002a.nat64         customer 0x2a, no site
//! 192-0-2-1.t00002a.07.nat64      customer 0x2a, site 0x07
//! 192-0-2-1.07.t00002a.nat64      same, site label first
//! ```

use crate::dns_record::RecordType;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

pub const MAX_CUSTOMER_ID: u32 = 0x00FF_FFFF;

const CUSTOMER_MARKER: char = 't';
const LOW_56_BITS: u128 = (1u128 << 56) - 1;
const LOW_64_BITS: u128 = (1u128 << 64) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyntheticNameToken {
    pub customer_id: u32,
    pub site_id: Option<u8>,
    pub ipv4: Ipv4Addr,
}

impl SyntheticNameToken {
    pub fn new(customer_id: u32, site_id: Option<u8>, ipv4: Ipv4Addr) -> Option<Self> {
        if customer_id > MAX_CUSTOMER_ID {
            return None;
        }
        Some(Self {
            customer_id,
            site_id,
            ipv4,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntheticDecision {
    Match(SyntheticNameToken),
    Malformed(String),
    NotSynthetic,
}

/// The synthetic namespace: a suffix zone plus the base prefix the decoded
/// tuples are mapped into.
#[derive(Debug, Clone)]
pub struct SyntheticNamespace {
    suffix: String,
    base: Ipv6Addr,
}

impl SyntheticNamespace {
    pub fn new(suffix: &str, base: Ipv6Addr) -> Self {
        Self {
            suffix: suffix.trim_matches('.').to_ascii_lowercase(),
            base: Ipv6Addr::from(u128::from(base) & !LOW_56_BITS),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn classify(&self, name: &str, record_type: RecordType) -> SyntheticDecision {
        if record_type != RecordType::AAAA {
            return SyntheticDecision::NotSynthetic;
        }

        let name = name.trim_end_matches('.').to_ascii_lowercase();
        // The zone apex itself carries no token.
        let content = match name
            .strip_suffix(self.suffix.as_str())
            .and_then(|rest| rest.strip_suffix('.'))
        {
            Some(content) => content,
            None => return SyntheticDecision::NotSynthetic,
        };

        match decode_labels(content) {
            Ok(token) => SyntheticDecision::Match(token),
            Err(reason) => SyntheticDecision::Malformed(reason),
        }
    }

    /// Canonical name for `token`; `classify` on the result yields `token`.
    pub fn encode(&self, token: &SyntheticNameToken) -> String {
        let [a, b, c, d] = token.ipv4.octets();
        match token.site_id {
            Some(site) => format!(
                "{}-{}-{}-{}.t{:06x}.{:02x}.{}",
                a, b, c, d, token.customer_id, site, self.suffix
            ),
            None => format!(
                "{}-{}-{}-{}.t{:06x}.{}",
                a, b, c, d, token.customer_id, self.suffix
            ),
        }
    }

    /// `base | customer << 40 | site << 32 | ipv4`
    pub fn address(&self, token: &SyntheticNameToken) -> Ipv6Addr {
        let suffix = (u128::from(token.customer_id) << 40)
            | (u128::from(token.site_id.unwrap_or(0)) << 32)
            | u128::from(u32::from(token.ipv4));
        Ipv6Addr::from(u128::from(self.base) | suffix)
    }
}

impl fmt::Display for SyntheticNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let block = Ipv6Addr::from(u128::from(self.base) & !LOW_64_BITS);
        write!(f, "*.{} -> {}/64", self.suffix, block)
    }
}

fn decode_labels(content: &str) -> Result<SyntheticNameToken, String> {
    let labels: Vec<&str> = if content.is_empty() {
        Vec::new()
    } else {
        content.split('.').collect()
    };

    let (ipv4_label, customer_label, site_label) = match labels.as_slice() {
        [ipv4, customer] => (*ipv4, *customer, None),
        [ipv4, first, second] => {
            if first.starts_with(CUSTOMER_MARKER) {
                (*ipv4, *first, Some(*second))
            } else {
                (*ipv4, *second, Some(*first))
            }
        }
        _ => {
            return Err(format!(
                "expected 2 or 3 labels before the suffix, found {}",
                labels.len()
            ))
        }
    };

    let customer_id = parse_customer(customer_label)?;
    let site_id = site_label.map(parse_site).transpose()?;
    let ipv4 = parse_dashed_ipv4(ipv4_label)?;

    Ok(SyntheticNameToken {
        customer_id,
        site_id,
        ipv4,
    })
}

fn parse_hex(label: &str) -> Option<u32> {
    if label.is_empty() || !label.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(label, 16).ok()
}

fn parse_customer(label: &str) -> Result<u32, String> {
    let digits = label.strip_prefix(CUSTOMER_MARKER).unwrap_or(label);
    let value =
        parse_hex(digits).ok_or_else(|| format!("customer '{}' is not hexadecimal", label))?;
    if value > MAX_CUSTOMER_ID {
        return Err(format!("customer '{}' exceeds 24 bits", label));
    }
    Ok(value)
}

fn parse_site(label: &str) -> Result<u8, String> {
    let value = parse_hex(label).ok_or_else(|| format!("site '{}' is not hexadecimal", label))?;
    u8::try_from(value).map_err(|_| format!("site '{}' exceeds 8 bits", label))
}

fn parse_dashed_ipv4(label: &str) -> Result<Ipv4Addr, String> {
    if label.contains('.') {
        return Err(format!("'{}' is not a dashed IPv4 address", label));
    }
    label
        .replace('-', ".")
        .parse::<Ipv4Addr>()
        .map_err(|_| format!("'{}' is not a valid IPv4 address", label))
}
