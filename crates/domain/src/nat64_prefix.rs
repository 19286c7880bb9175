use crate::errors::DomainError;
use chrono::{DateTime, Utc};
use ipnetwork::Ipv6Network;
use std::fmt;
use std::net::Ipv6Addr;

/// A NAT64 prefix snapshot. Host bits are always zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nat64Prefix {
    network: Ipv6Addr,
    length: u8,
    fetched_at: DateTime<Utc>,
}

impl Nat64Prefix {
    pub fn new(address: Ipv6Addr, length: u8) -> Result<Self, DomainError> {
        Self::with_fetched_at(address, length, Utc::now())
    }

    pub fn with_fetched_at(
        address: Ipv6Addr,
        length: u8,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if length > 128 {
            return Err(DomainError::InvalidPrefix(format!(
                "mask /{} outside [0,128]",
                length
            )));
        }
        let network = Ipv6Addr::from(u128::from(address) & network_mask(length));
        Ok(Self {
            network,
            length,
            fetched_at,
        })
    }

    pub fn network(&self) -> Ipv6Addr {
        self.network
    }

    pub fn length(&self) -> u8 {
        self.length
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Well-known prefix `64:ff9b::/96` (RFC 6052).
    pub fn well_known() -> Self {
        Self {
            network: Ipv6Addr::new(0x64, 0xff9b, 0, 0, 0, 0, 0, 0),
            length: 96,
            fetched_at: Utc::now(),
        }
    }

    /// Parses one line of a prefix file.
    ///
    /// Returns `Ok(None)` for blank lines and full-line comments. A leading
    /// `prefix` keyword (tayga syntax) is accepted, and anything after the
    /// `<address>/<mask>` token is treated as a comment.
    pub fn parse_line(line: &str) -> Result<Option<Self>, DomainError> {
        let line = match line.split_once('#') {
            Some((content, _)) => content,
            None => line,
        };
        let mut tokens = line.split_whitespace();
        let token = match tokens.next() {
            Some("prefix") => tokens
                .next()
                .ok_or_else(|| DomainError::InvalidPrefix("'prefix' without value".into()))?,
            Some(token) => token,
            None => return Ok(None),
        };
        token.parse().map(Some)
    }
}

impl std::str::FromStr for Nat64Prefix {
    type Err = DomainError;

    /// Strict `<ipv6-address>/<mask>` parsing. A missing mask is an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (address, mask) = s
            .split_once('/')
            .ok_or_else(|| DomainError::InvalidPrefix(format!("'{}' has no mask", s)))?;

        if address.is_empty() || !address.contains(':') {
            return Err(DomainError::InvalidPrefix(format!(
                "'{}' is not an IPv6 address",
                address
            )));
        }
        if mask.is_empty() || !mask.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::InvalidPrefix(format!(
                "'{}' is not a valid mask",
                mask
            )));
        }
        let length: u16 = mask
            .parse()
            .map_err(|_| DomainError::InvalidPrefix(format!("mask '{}' out of range", mask)))?;
        if length > 128 {
            return Err(DomainError::InvalidPrefix(format!(
                "mask /{} outside [0,128]",
                length
            )));
        }

        let network: Ipv6Network = s
            .parse()
            .map_err(|e| DomainError::InvalidPrefix(format!("'{}': {}", s, e)))?;

        Self::new(network.ip(), network.prefix())
    }
}

impl fmt::Display for Nat64Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.length)
    }
}

/// Mask with the top `length` bits set.
pub(crate) fn network_mask(length: u8) -> u128 {
    match length {
        0 => 0,
        l if l >= 128 => u128::MAX,
        l => u128::MAX << (128 - u32::from(l)),
    }
}
