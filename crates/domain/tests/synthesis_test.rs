use nat64dns_domain::synthesis::extract_ipv4;
use nat64dns_domain::{synthesize, DomainError, Nat64Prefix};
use std::net::{Ipv4Addr, Ipv6Addr};

fn prefix(s: &str) -> Nat64Prefix {
    s.parse().unwrap()
}

#[test]
fn test_well_known_prefix_embeds_in_low_32_bits() {
    let addr = synthesize(&prefix("64:ff9b::/96"), Ipv4Addr::new(192, 0, 2, 33)).unwrap();
    assert_eq!(addr, "64:ff9b::c000:221".parse::<Ipv6Addr>().unwrap());
}

#[test]
fn test_prefix_64_places_ipv4_after_network() {
    let addr = synthesize(
        &prefix("2001:db8:122:344::/64"),
        Ipv4Addr::new(192, 0, 2, 33),
    )
    .unwrap();
    assert_eq!(addr, "2001:db8:122:344:c000:221::".parse::<Ipv6Addr>().unwrap());
}

#[test]
fn test_prefix_32_places_ipv4_in_second_word_pair() {
    let addr = synthesize(&prefix("2001:db8::/32"), Ipv4Addr::new(192, 0, 2, 33)).unwrap();
    assert_eq!(addr, "2001:db8:c000:221::".parse::<Ipv6Addr>().unwrap());
}

#[test]
fn test_embedded_ipv4_is_recoverable_for_every_length() {
    let ipv4 = Ipv4Addr::new(203, 0, 113, 250);
    for length in 0u8..=96 {
        let p = Nat64Prefix::new("2001:db8:aaaa:bbbb:cccc:dddd::".parse().unwrap(), length)
            .unwrap();
        let addr = synthesize(&p, ipv4).unwrap();

        let shift = 96 - u32::from(length);
        let recovered = ((u128::from(addr) >> shift) & 0xFFFF_FFFF) as u32;
        assert_eq!(Ipv4Addr::from(recovered), ipv4, "length /{}", length);

        let low_mask = if shift == 0 { 0 } else { (1u128 << shift) - 1 };
        assert_eq!(u128::from(addr) & low_mask, 0, "length /{}", length);

        assert_eq!(extract_ipv4(&p, addr), Some(ipv4), "length /{}", length);
    }
}

#[test]
fn test_network_bits_are_preserved() {
    let p = prefix("2001:db8:ffff::/48");
    let addr = synthesize(&p, Ipv4Addr::new(255, 255, 255, 255)).unwrap();
    assert_eq!(u128::from(addr) >> 80, u128::from(p.network()) >> 80);
}

#[test]
fn test_prefix_longer_than_96_is_rejected() {
    let result = synthesize(&prefix("2001:db8::/104"), Ipv4Addr::new(10, 0, 0, 1));
    assert_eq!(result, Err(DomainError::SynthesisRange { length: 104 }));
}
