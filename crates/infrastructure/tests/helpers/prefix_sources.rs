#![allow(dead_code)]
use async_trait::async_trait;
use nat64dns_application::ports::PrefixSource;
use nat64dns_domain::{DomainError, Nat64Prefix};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory prefix source that counts reads.
#[derive(Clone)]
pub struct CountingPrefixSource {
    result: Arc<Mutex<Result<Nat64Prefix, DomainError>>>,
    delay: Arc<Mutex<Duration>>,
    reads: Arc<AtomicUsize>,
}

impl CountingPrefixSource {
    pub fn new(prefix: &str) -> Self {
        Self {
            result: Arc::new(Mutex::new(Ok(prefix.parse().unwrap()))),
            delay: Arc::new(Mutex::new(Duration::ZERO)),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(error: DomainError) -> Self {
        let source = Self::new("64:ff9b::/96");
        source.set_error(error);
        source
    }

    pub fn set_prefix(&self, prefix: &str) {
        *self.result.lock().unwrap() = Ok(prefix.parse().unwrap());
    }

    pub fn set_error(&self, error: DomainError) {
        *self.result.lock().unwrap() = Err(error);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrefixSource for CountingPrefixSource {
    async fn load(&self) -> Result<Nat64Prefix, DomainError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.result.lock().unwrap().clone()
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
