#![allow(dead_code)]

use async_trait::async_trait;
use nat64dns_application::ports::{PrefixLookup, PrefixProvider, UpstreamResolver};
use nat64dns_domain::{DomainError, Nat64Prefix, UpstreamAnswer};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct MockPrefixProvider {
    result: Arc<Mutex<Result<PrefixLookup, DomainError>>>,
    calls: Arc<AtomicUsize>,
}

impl MockPrefixProvider {
    pub fn with_prefix(prefix: &str) -> Self {
        let prefix: Nat64Prefix = prefix.parse().unwrap();
        Self {
            result: Arc::new(Mutex::new(Ok(PrefixLookup::fresh(Arc::new(prefix))))),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            result: Arc::new(Mutex::new(Err(DomainError::PrefixUnavailable(
                "no prefix loaded".to_string(),
            )))),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_degraded(&self, error: DomainError) {
        let mut result = self.result.lock().unwrap();
        if let Ok(lookup) = result.as_mut() {
            lookup.degraded = Some(error);
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrefixProvider for MockPrefixProvider {
    async fn get_prefix(&self) -> Result<PrefixLookup, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.lock().unwrap().clone()
    }
}

#[derive(Clone, Default)]
pub struct MockUpstreamResolver {
    answers: Arc<Mutex<HashMap<String, Result<UpstreamAnswer, DomainError>>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    calls: Arc<AtomicUsize>,
}

impl MockUpstreamResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_addresses(&self, name: &str, addresses: &[Ipv4Addr], ttl: u32) {
        self.answers.lock().unwrap().insert(
            name.to_string(),
            Ok(UpstreamAnswer {
                addresses: addresses.to_vec(),
                min_ttl: Some(ttl),
                nxdomain: false,
            }),
        );
    }

    pub fn set_nxdomain(&self, name: &str) {
        self.answers.lock().unwrap().insert(
            name.to_string(),
            Ok(UpstreamAnswer {
                nxdomain: true,
                ..UpstreamAnswer::default()
            }),
        );
    }

    pub fn set_error(&self, name: &str, error: DomainError) {
        self.answers
            .lock()
            .unwrap()
            .insert(name.to_string(), Err(error));
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamResolver for MockUpstreamResolver {
    async fn query_a(&self, name: &str, _deadline: Instant) -> Result<UpstreamAnswer, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.answers
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| Ok(UpstreamAnswer::default()))
    }
}
