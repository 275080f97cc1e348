use std::net::{IpAddr, SocketAddr};

use tokio::time::timeout;
use tracing::debug;
use trust_dns_resolver::config::*;
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::proto::op::ResponseCode;
use trust_dns_resolver::proto::rr::RecordType;
use trust_dns_resolver::TokioAsyncResolver;

use crate::constants::DNS_TIMEOUT;
use crate::errors::{Result, ScanError};

/// Outcome of a recursive lookup that reached an answer or a DNS-level error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Answer(Vec<String>),
    NxDomain,
    NoData,
    ServFail,
}

impl Resolution {
    /// The name no longer points at anything.
    pub fn is_gone(&self) -> bool {
        matches!(self, Resolution::NxDomain | Resolution::NoData)
    }
}

pub fn create_secure_resolver(nameserver: &str) -> Result<TokioAsyncResolver> {
    let socket_addr: SocketAddr = nameserver
        .parse()
        .map_err(|e| ScanError::Config(format!("invalid nameserver {}: {}", nameserver, e)))?;

    let mut config = ResolverConfig::new();
    config.add_name_server(NameServerConfig {
        socket_addr,
        protocol: Protocol::Udp,
        tls_dns_name: None,
        trust_negative_responses: false,
        bind_addr: None,
    });

    let mut opts = ResolverOpts::default();
    opts.timeout = DNS_TIMEOUT;

    Ok(TokioAsyncResolver::tokio(config, opts))
}

/// Resolver that talks to exactly one nameserver, without retries.
fn direct_resolver(ip: IpAddr) -> TokioAsyncResolver {
    let mut config = ResolverConfig::new();
    config.add_name_server(NameServerConfig {
        socket_addr: SocketAddr::new(ip, 53),
        protocol: Protocol::Udp,
        tls_dns_name: None,
        trust_negative_responses: true,
        bind_addr: None,
    });

    let mut opts = ResolverOpts::default();
    opts.timeout = DNS_TIMEOUT;
    opts.attempts = 1;
    opts.cache_size = 0;

    TokioAsyncResolver::tokio(config, opts)
}

fn classify_error(name: &str, err: ResolveError) -> Result<Resolution> {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => Ok(match *response_code {
            ResponseCode::NXDomain => Resolution::NxDomain,
            ResponseCode::ServFail | ResponseCode::Refused => Resolution::ServFail,
            _ => Resolution::NoData,
        }),
        _ => Err(ScanError::probe(name, err.to_string())),
    }
}

pub async fn resolve_addresses(resolver: &TokioAsyncResolver, name: &str) -> Result<Resolution> {
    match timeout(DNS_TIMEOUT, resolver.lookup_ip(name)).await {
        Ok(Ok(lookup)) => {
            let ips: Vec<String> = lookup.iter().map(|ip| ip.to_string()).collect();
            if ips.is_empty() {
                Ok(Resolution::NoData)
            } else {
                Ok(Resolution::Answer(ips))
            }
        }
        Ok(Err(e)) => classify_error(name, e),
        Err(_) => Err(ScanError::probe(name, "DNS lookup timed out")),
    }
}

pub async fn resolve_nameservers(
    resolver: &TokioAsyncResolver,
    name: &str,
) -> Result<Resolution> {
    match timeout(DNS_TIMEOUT, resolver.ns_lookup(name)).await {
        Ok(Ok(lookup)) => {
            let servers: Vec<String> = lookup
                .iter()
                .map(|ns| ns.to_string().trim_end_matches('.').to_string())
                .collect();
            if servers.is_empty() {
                Ok(Resolution::NoData)
            } else {
                Ok(Resolution::Answer(servers))
            }
        }
        Ok(Err(e)) => classify_error(name, e),
        Err(_) => Err(ScanError::probe(name, "NS lookup timed out")),
    }
}

/// Asks `nameserver` directly for the SOA of `name`. A positive answer or an
/// authoritative NXDOMAIN/NODATA counts as a response; REFUSED, SERVFAIL and
/// silence do not.
pub async fn query_authoritative(
    resolver: &TokioAsyncResolver,
    nameserver: &str,
    name: &str,
) -> Result<bool> {
    let ip = match nameserver.parse::<IpAddr>() {
        Ok(ip) => ip,
        Err(_) => match resolve_addresses(resolver, nameserver).await? {
            Resolution::Answer(ips) => match ips.iter().find_map(|ip| ip.parse::<IpAddr>().ok()) {
                Some(ip) => ip,
                None => return Ok(false),
            },
            // the nameserver host itself is gone
            other => {
                debug!("Nameserver {} does not resolve: {:?}", nameserver, other);
                return Ok(false);
            }
        },
    };

    let direct = direct_resolver(ip);
    match timeout(DNS_TIMEOUT, direct.lookup(name, RecordType::SOA)).await {
        Ok(Ok(_)) => Ok(true),
        Ok(Err(e)) => match e.kind() {
            ResolveErrorKind::NoRecordsFound { response_code, .. } => Ok(matches!(
                *response_code,
                ResponseCode::NoError | ResponseCode::NXDomain
            )),
            _ => {
                debug!("{} did not answer for {}: {}", nameserver, name, e);
                Ok(false)
            }
        },
        Err(_) => {
            debug!("{} timed out for {}", nameserver, name);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gone_resolutions() {
        assert!(Resolution::NxDomain.is_gone());
        assert!(Resolution::NoData.is_gone());
        assert!(!Resolution::ServFail.is_gone());
        assert!(!Resolution::Answer(vec!["192.0.2.1".into()]).is_gone());
    }

    #[test]
    fn test_invalid_nameserver_is_config_error() {
        assert!(matches!(
            create_secure_resolver("not-an-address"),
            Err(ScanError::Config(_))
        ));
    }
}
