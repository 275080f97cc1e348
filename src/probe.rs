//! Confirmation of candidates against live infrastructure.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::{redirect::Policy, Client};
use tokio::time::{timeout, Instant};
use tracing::debug;
use trust_dns_resolver::TokioAsyncResolver;

use crate::constants::{DNS_TIMEOUT, MIN_NAMESERVER_BUDGET, USER_AGENT};
use crate::dns::{self, Resolution};
use crate::errors::{Result, ScanError};
use crate::fingerprint::{fetch_fingerprint, is_missing_bucket, HttpFingerprint};
use crate::takeover::{Candidate, ProbeStrategy};

/// Read-only network primitives. Implementations must be safe to call
/// concurrently; every call is idempotent.
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    async fn fetch(&self, domain: &str, use_https: bool) -> Result<HttpFingerprint>;

    /// A/AAAA resolution of `name`, following CNAME chains.
    async fn resolve(&self, name: &str) -> Result<Resolution>;

    /// NS set of `name` as seen by the recursive resolver.
    async fn resolve_nameservers(&self, name: &str) -> Result<Resolution>;

    async fn query_authoritative(&self, nameserver: &str, name: &str) -> Result<bool>;
}

pub struct LiveProbe {
    client: Client,
    resolver: TokioAsyncResolver,
    timeout_secs: u64,
}

impl LiveProbe {
    pub fn new(nameserver: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .redirect(Policy::limited(2))
            .danger_accept_invalid_certs(false)
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ScanError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            resolver: dns::create_secure_resolver(nameserver)?,
            timeout_secs,
        })
    }
}

#[async_trait]
impl NetworkProbe for LiveProbe {
    async fn fetch(&self, domain: &str, use_https: bool) -> Result<HttpFingerprint> {
        fetch_fingerprint(&self.client, domain, use_https, self.timeout_secs).await
    }

    async fn resolve(&self, name: &str) -> Result<Resolution> {
        dns::resolve_addresses(&self.resolver, name).await
    }

    async fn resolve_nameservers(&self, name: &str) -> Result<Resolution> {
        dns::resolve_nameservers(&self.resolver, name).await
    }

    async fn query_authoritative(&self, nameserver: &str, name: &str) -> Result<bool> {
        dns::query_authoritative(&self.resolver, nameserver, name).await
    }
}

/// Time one nameserver gets to resolve and answer, leaving headroom inside
/// what is left of the probe deadline.
fn nameserver_budget(name: &str, remaining: Duration) -> Result<Duration> {
    let budget = (remaining * 4 / 5).min(DNS_TIMEOUT);
    if budget < MIN_NAMESERVER_BUDGET {
        return Err(ScanError::probe(
            name,
            format!("only {:?} left to query nameservers", remaining),
        ));
    }
    Ok(budget)
}

/// Queries every nameserver at once. Dangling only if none of them answers
/// within `budget`; the first answer settles it the other way.
async fn delegation_dangles(
    probe: &dyn NetworkProbe,
    name: &str,
    nameservers: &[String],
    budget: Duration,
) -> Result<bool> {
    if nameservers.is_empty() {
        return Ok(false);
    }

    let mut queries: FuturesUnordered<_> = nameservers
        .iter()
        .map(move |ns| async move {
            let res = timeout(budget, probe.query_authoritative(ns, name)).await;
            (ns, res)
        })
        .collect();

    let mut failure = None;
    while let Some((ns, res)) = queries.next().await {
        match res {
            Ok(Ok(true)) => {
                debug!("{} answers for {}", ns, name);
                return Ok(false);
            }
            Ok(Ok(false)) => debug!("{} does not answer for {}", ns, name),
            Ok(Err(e)) => {
                debug!("{} could not be queried for {}: {}", ns, name, e);
                failure.get_or_insert(e);
            }
            Err(_) => debug!("{} silent for {} after {:?}", ns, name, budget),
        }
    }

    // a lookup failure on our side proves nothing about the delegation
    match failure {
        Some(e) => Err(e),
        None => Ok(true),
    }
}

async fn run_strategy(
    probe: &dyn NetworkProbe,
    candidate: &Candidate,
    deadline: Duration,
) -> Result<bool> {
    let started = Instant::now();
    let domain = candidate.domain.as_str();

    match candidate.spec().probe {
        ProbeStrategy::StorageFingerprint { use_https } => {
            let fingerprint = probe.fetch(domain, use_https).await?;
            Ok(is_missing_bucket(&fingerprint))
        }
        ProbeStrategy::CnameLiveness => Ok(probe.resolve(domain).await?.is_gone()),
        ProbeStrategy::Delegation => {
            let budget = nameserver_budget(domain, deadline)?;
            delegation_dangles(probe, domain, &candidate.nameservers(), budget).await
        }
        ProbeStrategy::Registrar => match probe.resolve_nameservers(domain).await? {
            // lame delegation: the registrar points at servers that refuse the zone
            Resolution::ServFail => Ok(true),
            Resolution::Answer(nameservers) => {
                let remaining = deadline.saturating_sub(started.elapsed());
                let budget = nameserver_budget(domain, remaining)?;
                delegation_dangles(probe, domain, &nameservers, budget).await
            }
            Resolution::NxDomain | Resolution::NoData => Ok(false),
        },
    }
}

/// Runs the category's probe under a deadline. Errors and timeouts mean
/// "not confirmed" and never abort the scan.
pub async fn confirm(probe: &dyn NetworkProbe, candidate: &Candidate, deadline: Duration) -> bool {
    match timeout(deadline, run_strategy(probe, candidate, deadline)).await {
        Ok(Ok(confirmed)) => confirmed,
        Ok(Err(e)) => {
            debug!("[{}] probe error for {}: {}", candidate.category, candidate.domain, e);
            false
        }
        Err(_) => {
            debug!(
                "[{}] probe for {} timed out after {:?}",
                candidate.category, candidate.domain, deadline
            );
            false
        }
    }
}
