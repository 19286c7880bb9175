use anyhow::Context;
use nat64dns_application::use_cases::ResolveAaaaUseCase;
use nat64dns_domain::{Config, DomainError, SyntheticNamespace};
use nat64dns_infrastructure::dns::{RequestDispatcher, UdpSocketPool, UpstreamForwarder};
use nat64dns_infrastructure::prefix::{FilePrefixSource, PrefixCache};
use std::net::{Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Everything the UDP listeners share.
pub struct DnsServices {
    pub prefixes: Arc<PrefixCache>,
    pub pool: Arc<UdpSocketPool>,
    pub dispatcher: Arc<RequestDispatcher>,
    /// Request slots, shared across all listeners.
    pub limiter: Arc<Semaphore>,
}

impl DnsServices {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        info!("Initializing DNS64 services");

        let source = Arc::new(FilePrefixSource::from_config(&config.dns64));
        let prefixes = Arc::new(PrefixCache::from_config(source, &config.dns64));

        let pool = Arc::new(UdpSocketPool::from_config(&config.upstream));
        let servers = Self::parse_upstreams(config)?;
        let forwarder = Arc::new(UpstreamForwarder::new(
            servers,
            Arc::clone(&pool),
            config.upstream.query_timeout(),
        ));

        let base: Ipv6Addr = config
            .dns64
            .synthetic_base
            .parse()
            .with_context(|| format!("Invalid synthetic_base '{}'", config.dns64.synthetic_base))?;
        let namespace = SyntheticNamespace::new(&config.dns64.synthetic_suffix, base);

        let use_case = Arc::new(
            ResolveAaaaUseCase::new(namespace, prefixes.clone(), forwarder)
                .with_ttls(config.dns64.synthetic_ttl, config.dns64.answer_ttl),
        );

        let dispatcher = Arc::new(RequestDispatcher::new(
            use_case,
            Self::upstream_budget(config),
            config.server.request_grace(),
        ));
        let request_timeout = dispatcher.request_timeout();
        let limiter = Arc::new(Semaphore::new(config.server.request_concurrency_limit));

        info!(
            suffix = %config.dns64.synthetic_suffix,
            base = %base,
            upstreams = config.upstream.servers.len(),
            request_timeout_ms = request_timeout.as_millis() as u64,
            concurrency_limit = config.server.request_concurrency_limit,
            "DNS64 services ready"
        );

        Ok(Self {
            prefixes,
            pool,
            dispatcher,
            limiter,
        })
    }

    /// Room for two upstream attempts, counted from receipt.
    fn upstream_budget(config: &Config) -> Duration {
        config.upstream.query_timeout() * 2
    }

    fn parse_upstreams(config: &Config) -> anyhow::Result<Vec<SocketAddr>> {
        config
            .upstream
            .servers
            .iter()
            .map(|server| {
                server
                    .parse::<SocketAddr>()
                    .with_context(|| format!("Invalid upstream server '{}'", server))
            })
            .collect()
    }

    /// Loads the prefix before the listeners start. Only a path escaping the
    /// allowed root stops startup; any other failure leaves DNS64 answering
    /// SERVFAIL until the file becomes readable.
    pub async fn prime_prefix(&self) -> anyhow::Result<()> {
        match self.prefixes.prime().await {
            Ok(prefix) => {
                info!(prefix = %prefix, "NAT64 prefix loaded");
                Ok(())
            }
            Err(e @ DomainError::PathTraversalRejected { .. }) => {
                Err(anyhow::anyhow!("Refusing prefix file: {}", e))
            }
            Err(e) => {
                warn!(error = %e, "NAT64 prefix unavailable at startup, DNS64 answers will fail until it loads");
                Ok(())
            }
        }
    }
}
