//! DNS64 address synthesis.
//!
//! The IPv4 address occupies bits `[len, len + 32)` of the result, counted
//! from the most significant bit. Bits above come from the prefix network,
//! bits below are zero. For `/96` this is the familiar `64:ff9b::a.b.c.d`.

use crate::errors::DomainError;
use crate::nat64_prefix::{network_mask, Nat64Prefix};
use std::net::{Ipv4Addr, Ipv6Addr};

pub fn synthesize(prefix: &Nat64Prefix, ipv4: Ipv4Addr) -> Result<Ipv6Addr, DomainError> {
    let length = prefix.length();
    if u32::from(length) + 32 > 128 {
        return Err(DomainError::SynthesisRange { length });
    }

    let base = u128::from(prefix.network()) & network_mask(length);
    let shift = 128 - 32 - u32::from(length);
    let embedded = u128::from(u32::from(ipv4)) << shift;

    Ok(Ipv6Addr::from(base | embedded))
}

/// Inverse of [`synthesize`]: recovers the IPv4 address if `address` lies
/// inside `prefix`.
pub fn extract_ipv4(prefix: &Nat64Prefix, address: Ipv6Addr) -> Option<Ipv4Addr> {
    let length = prefix.length();
    if u32::from(length) + 32 > 128 {
        return None;
    }
    let mask = network_mask(length);
    let value = u128::from(address);
    if value & mask != u128::from(prefix.network()) {
        return None;
    }
    let shift = 128 - 32 - u32::from(length);
    Some(Ipv4Addr::from((value >> shift) as u32))
}
