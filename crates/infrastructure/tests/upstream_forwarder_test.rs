mod helpers;

use helpers::{MockBehavior, MockDnsServer};
use nat64dns_application::ports::UpstreamResolver;
use nat64dns_domain::config::SaturationPolicy;
use nat64dns_domain::DomainError;
use nat64dns_infrastructure::dns::{UdpSocketPool, UpstreamForwarder};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

const QUERY_TIMEOUT: Duration = Duration::from_millis(200);

fn forwarder(
    servers: Vec<SocketAddr>,
    capacity: usize,
    saturation: SaturationPolicy,
) -> UpstreamForwarder {
    let pool = Arc::new(UdpSocketPool::new(capacity, 8, saturation));
    UpstreamForwarder::new(servers, pool, QUERY_TIMEOUT)
}

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(2)
}

#[tokio::test]
async fn test_collects_a_records_and_min_ttl() {
    let server = MockDnsServer::start(MockBehavior::Answer {
        addresses: vec![Ipv4Addr::new(192, 0, 2, 1), Ipv4Addr::new(192, 0, 2, 2)],
        ttl: 120,
    })
    .await
    .unwrap();
    let forwarder = forwarder(vec![server.addr()], 4, SaturationPolicy::Wait);

    let answer = forwarder.query_a("example.com", deadline()).await.unwrap();

    assert_eq!(
        answer.addresses,
        vec![Ipv4Addr::new(192, 0, 2, 1), Ipv4Addr::new(192, 0, 2, 2)]
    );
    assert_eq!(answer.min_ttl, Some(120));
    assert!(!answer.nxdomain);
    assert_eq!(server.query_count(), 1);
}

#[tokio::test]
async fn test_nxdomain_is_reported() {
    let server = MockDnsServer::start(MockBehavior::NxDomain).await.unwrap();
    let forwarder = forwarder(vec![server.addr()], 4, SaturationPolicy::Wait);

    let answer = forwarder.query_a("missing.example", deadline()).await.unwrap();
    assert!(answer.nxdomain);
    assert!(answer.addresses.is_empty());
}

#[tokio::test]
async fn test_refused_is_rejected_without_retry() {
    let server = MockDnsServer::start(MockBehavior::Refused).await.unwrap();
    let forwarder = forwarder(vec![server.addr()], 4, SaturationPolicy::Wait);

    let result = forwarder.query_a("example.com", deadline()).await;
    assert!(matches!(result, Err(DomainError::UpstreamRejected { .. })));
    assert_eq!(server.query_count(), 1);
}

#[tokio::test]
async fn test_silent_upstream_gets_exactly_one_retry() {
    let server = MockDnsServer::start(MockBehavior::Silent).await.unwrap();
    let forwarder = forwarder(vec![server.addr()], 4, SaturationPolicy::Wait);

    let start = Instant::now();
    let result = forwarder.query_a("example.com", deadline()).await;
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(DomainError::UpstreamTimeout { .. })));
    assert!(elapsed >= QUERY_TIMEOUT * 2);
    assert!(elapsed < QUERY_TIMEOUT * 2 + Duration::from_millis(150));

    tokio::time::sleep(Duration::from_millis(20)).await;
    let ids = server.seen_ids();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1], "retry must use a fresh transaction ID");
}

#[tokio::test]
async fn test_retry_goes_to_next_server() {
    let silent = MockDnsServer::start(MockBehavior::Silent).await.unwrap();
    let answering = MockDnsServer::start(MockBehavior::Answer {
        addresses: vec![Ipv4Addr::new(198, 51, 100, 7)],
        ttl: 30,
    })
    .await
    .unwrap();
    let forwarder = forwarder(
        vec![silent.addr(), answering.addr()],
        4,
        SaturationPolicy::Wait,
    );

    let answer = forwarder.query_a("example.com", deadline()).await.unwrap();

    assert_eq!(answer.addresses, vec![Ipv4Addr::new(198, 51, 100, 7)]);
    assert_eq!(silent.query_count(), 1);
    assert_eq!(answering.query_count(), 1);
}

#[tokio::test]
async fn test_mismatched_id_is_discarded() {
    let server = MockDnsServer::start(MockBehavior::WrongIdFirst {
        addresses: vec![Ipv4Addr::new(203, 0, 113, 5)],
        ttl: 60,
    })
    .await
    .unwrap();
    let forwarder = forwarder(vec![server.addr()], 4, SaturationPolicy::Wait);

    let answer = forwarder.query_a("example.com", deadline()).await.unwrap();

    assert_eq!(answer.addresses, vec![Ipv4Addr::new(203, 0, 113, 5)]);
    assert_eq!(server.query_count(), 1);
}

#[tokio::test]
async fn test_timed_out_socket_is_not_reused() {
    let server = MockDnsServer::start(MockBehavior::Silent).await.unwrap();
    let forwarder = forwarder(vec![server.addr()], 4, SaturationPolicy::Wait);

    let _ = forwarder.query_a("example.com", deadline()).await;

    let stats = forwarder.pool().stats();
    assert_eq!(stats.total_created, 2);
    assert_eq!(stats.total_reused, 0);
    assert_eq!(stats.idle, 0);
    assert_eq!(stats.in_flight, 0);
}

#[tokio::test]
async fn test_reject_policy_fails_fast_when_saturated() {
    let server = MockDnsServer::start(MockBehavior::Delayed {
        delay: Duration::from_millis(100),
        addresses: vec![Ipv4Addr::new(192, 0, 2, 1)],
    })
    .await
    .unwrap();
    let forwarder = Arc::new(forwarder(vec![server.addr()], 1, SaturationPolicy::Reject));

    let first = {
        let forwarder = Arc::clone(&forwarder);
        tokio::spawn(async move { forwarder.query_a("one.example", deadline()).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let second = forwarder.query_a("two.example", deadline()).await;
    assert_eq!(second, Err(DomainError::PoolSaturated));
    assert!(first.await.unwrap().is_ok());
    assert_eq!(forwarder.pool().stats().total_saturated, 1);
}

#[tokio::test]
async fn test_wait_policy_gives_up_at_deadline() {
    let server = MockDnsServer::start(MockBehavior::Silent).await.unwrap();
    let forwarder = Arc::new(forwarder(vec![server.addr()], 1, SaturationPolicy::Wait));

    let holder = {
        let forwarder = Arc::clone(&forwarder);
        tokio::spawn(async move { forwarder.query_a("one.example", deadline()).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let short = Instant::now() + Duration::from_millis(50);
    let result = forwarder.query_a("two.example", short).await;
    assert_eq!(result, Err(DomainError::PoolSaturated));

    let _ = holder.await;
}
