use arc_swap::ArcSwap;
use async_trait::async_trait;
use nat64dns_application::ports::{PrefixLookup, PrefixProvider, PrefixSource};
use nat64dns_domain::config::Dns64Config;
use nat64dns_domain::{DomainError, Nat64Prefix};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

struct PrefixState {
    prefix: Option<Arc<Nat64Prefix>>,
    expires_at: Instant,
    last_error: Option<DomainError>,
    /// Bumped by every refresh, successful or not.
    generation: u64,
}

/// Single-flight, read-mostly cache of the NAT64 prefix.
///
/// Readers load the current state without locking. Once it expires, one
/// caller takes the refresh lock and reads the source; callers that queued
/// behind it see the bumped generation and reuse the outcome.
pub struct PrefixCache {
    source: Arc<dyn PrefixSource>,
    state: ArcSwap<PrefixState>,
    refresh_lock: Mutex<()>,
    ttl: Duration,
    retry_backoff: Duration,
    refresh_timeout: Duration,
    refreshes: AtomicU64,
}

impl PrefixCache {
    pub fn new(
        source: Arc<dyn PrefixSource>,
        ttl: Duration,
        retry_backoff: Duration,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            source,
            state: ArcSwap::from_pointee(PrefixState {
                prefix: None,
                expires_at: Instant::now(),
                last_error: None,
                generation: 0,
            }),
            refresh_lock: Mutex::new(()),
            ttl,
            retry_backoff: retry_backoff.min(ttl),
            refresh_timeout,
            refreshes: AtomicU64::new(0),
        }
    }

    pub fn from_config(source: Arc<dyn PrefixSource>, config: &Dns64Config) -> Self {
        Self::new(
            source,
            config.cache_ttl(),
            config.retry_backoff(),
            config.refresh_timeout(),
        )
    }

    /// Loads the prefix once, ignoring the TTL. Returns the refresh error
    /// itself so startup can tell a traversal attempt from a missing file.
    pub async fn prime(&self) -> Result<Arc<Nat64Prefix>, DomainError> {
        let seen = self.state.load().generation;
        let state = self.refresh(seen).await;
        match (&state.last_error, &state.prefix) {
            (Some(err), _) => Err(err.clone()),
            (None, Some(prefix)) => Ok(Arc::clone(prefix)),
            (None, None) => Err(DomainError::PrefixUnavailable(
                "prefix not loaded".to_string(),
            )),
        }
    }

    pub fn current(&self) -> Option<Arc<Nat64Prefix>> {
        self.state.load().prefix.clone()
    }

    /// Number of times the source has been read.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    async fn refresh(&self, seen_generation: u64) -> Arc<PrefixState> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.state.load_full();
        if current.generation != seen_generation {
            return current;
        }

        self.refreshes.fetch_add(1, Ordering::Relaxed);
        let outcome = tokio::time::timeout(self.refresh_timeout, self.source.load())
            .await
            .unwrap_or(Err(DomainError::PrefixRefreshTimeout));

        let now = Instant::now();
        let next = match outcome {
            Ok(prefix) => {
                let changed = current.prefix.as_ref().map_or(true, |old| {
                    old.network() != prefix.network() || old.length() != prefix.length()
                });
                if changed {
                    info!(
                        source = %self.source.describe(),
                        prefix = %prefix,
                        "NAT64 prefix loaded"
                    );
                } else {
                    debug!(prefix = %prefix, "NAT64 prefix unchanged");
                }
                PrefixState {
                    prefix: Some(Arc::new(prefix)),
                    expires_at: now + self.ttl,
                    last_error: None,
                    generation: current.generation + 1,
                }
            }
            Err(e) => {
                match &current.prefix {
                    Some(stale) => warn!(
                        source = %self.source.describe(),
                        error = %e,
                        stale_prefix = %stale,
                        "Prefix refresh failed, serving stale value"
                    ),
                    None => warn!(
                        source = %self.source.describe(),
                        error = %e,
                        "Prefix refresh failed, no prefix available"
                    ),
                }
                PrefixState {
                    prefix: current.prefix.clone(),
                    expires_at: now + self.retry_backoff,
                    last_error: Some(e),
                    generation: current.generation + 1,
                }
            }
        };

        let next = Arc::new(next);
        self.state.store(Arc::clone(&next));
        next
    }

    fn lookup(state: &PrefixState) -> Result<PrefixLookup, DomainError> {
        match &state.prefix {
            Some(prefix) => Ok(PrefixLookup {
                prefix: Arc::clone(prefix),
                degraded: state.last_error.clone(),
            }),
            None => Err(DomainError::PrefixUnavailable(
                state
                    .last_error
                    .as_ref()
                    .map_or_else(|| "prefix not loaded".to_string(), |e| e.to_string()),
            )),
        }
    }
}

#[async_trait]
impl PrefixProvider for PrefixCache {
    async fn get_prefix(&self) -> Result<PrefixLookup, DomainError> {
        let state = self.state.load_full();
        if Instant::now() < state.expires_at {
            return Self::lookup(&state);
        }

        let state = self.refresh(state.generation).await;
        Self::lookup(&state)
    }
}
