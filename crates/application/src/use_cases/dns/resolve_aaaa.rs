use crate::ports::{PrefixProvider, UpstreamResolver};
use nat64dns_domain::{
    synthesize, DomainError, RecordType, SyntheticDecision, SyntheticNamespace,
};
use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    /// Decoded from the synthetic namespace, no upstream involved.
    Synthetic,
    /// Upstream A records embedded into the NAT64 prefix.
    Dns64,
}

impl AnswerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synthetic => "synthetic",
            Self::Dns64 => "dns64",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Answer {
        addresses: Vec<Ipv6Addr>,
        ttl: u32,
        source: AnswerSource,
    },
    NoData,
    NxDomain,
}

pub struct ResolveAaaaUseCase {
    namespace: SyntheticNamespace,
    prefixes: Arc<dyn PrefixProvider>,
    upstream: Arc<dyn UpstreamResolver>,
    synthetic_ttl: u32,
    answer_ttl: u32,
}

impl ResolveAaaaUseCase {
    pub fn new(
        namespace: SyntheticNamespace,
        prefixes: Arc<dyn PrefixProvider>,
        upstream: Arc<dyn UpstreamResolver>,
    ) -> Self {
        Self {
            namespace,
            prefixes,
            upstream,
            synthetic_ttl: 300,
            answer_ttl: 60,
        }
    }

    pub fn with_ttls(mut self, synthetic_ttl: u32, answer_ttl: u32) -> Self {
        self.synthetic_ttl = synthetic_ttl;
        self.answer_ttl = answer_ttl;
        self
    }

    pub fn namespace(&self) -> &SyntheticNamespace {
        &self.namespace
    }

    pub async fn execute(
        &self,
        name: &str,
        record_type: RecordType,
        deadline: Instant,
    ) -> Result<Resolution, DomainError> {
        if record_type != RecordType::AAAA {
            return Ok(Resolution::NoData);
        }

        match self.namespace.classify(name, record_type) {
            SyntheticDecision::Match(token) => {
                let address = self.namespace.address(&token);
                debug!(
                    domain = %name,
                    customer = token.customer_id,
                    site = ?token.site_id,
                    ipv4 = %token.ipv4,
                    address = %address,
                    "Synthetic name decoded"
                );
                Ok(Resolution::Answer {
                    addresses: vec![address],
                    ttl: self.synthetic_ttl,
                    source: AnswerSource::Synthetic,
                })
            }
            SyntheticDecision::Malformed(reason) => Err(DomainError::SyntheticMalformed {
                name: name.to_string(),
                reason,
            }),
            SyntheticDecision::NotSynthetic => self.resolve_dns64(name, deadline).await,
        }
    }

    async fn resolve_dns64(
        &self,
        name: &str,
        deadline: Instant,
    ) -> Result<Resolution, DomainError> {
        // The prefix does not depend on the upstream answer.
        let (prefix, answer) = tokio::join!(
            self.prefixes.get_prefix(),
            self.upstream.query_a(name, deadline)
        );

        let answer = answer?;
        if answer.nxdomain {
            return Ok(Resolution::NxDomain);
        }
        if answer.addresses.is_empty() {
            return Ok(Resolution::NoData);
        }

        let lookup = prefix?;
        if let Some(err) = &lookup.degraded {
            warn!(
                domain = %name,
                prefix = %lookup.prefix,
                error = %err,
                "Synthesizing with stale NAT64 prefix"
            );
        }

        let addresses = answer
            .addresses
            .iter()
            .map(|ipv4| synthesize(&lookup.prefix, *ipv4))
            .collect::<Result<Vec<_>, _>>()?;

        let ttl = answer
            .min_ttl
            .map_or(self.answer_ttl, |ttl| ttl.min(self.answer_ttl));

        debug!(
            domain = %name,
            prefix = %lookup.prefix,
            count = addresses.len(),
            ttl = ttl,
            "DNS64 answer synthesized"
        );

        Ok(Resolution::Answer {
            addresses,
            ttl,
            source: AnswerSource::Dns64,
        })
    }
}
