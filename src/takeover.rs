//! Takeover signatures: which records are candidates, how each category is
//! confirmed and what an attacker would have to claim.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::{AZURE_CNAME_PATTERNS, S3_WEBSITE_REGEX};
use crate::inventory::InventorySource;
use crate::model::{normalize_domain, Account, HostedZone, RecordSet, RecordTarget, RecordType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VulnerabilityCategory {
    CloudfrontS3Alias,
    ElasticBeanstalkAlias,
    S3Alias,
    AzureCname,
    CloudfrontS3Cname,
    ElasticBeanstalkCname,
    GoogleStorageCname,
    S3Cname,
    DanglingNsDelegation,
    DanglingRegisteredDomain,
}

impl fmt::Display for VulnerabilityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a candidate is confirmed against live infrastructure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStrategy {
    /// GET the domain and look for a missing-bucket error page.
    StorageFingerprint { use_https: bool },
    CnameLiveness,
    Delegation,
    Registrar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintKind {
    /// Origin of the CloudFront distribution, looked up in the inventory.
    CloudfrontOrigin,
    /// The CNAME value or alias target itself.
    RecordTarget,
    /// `<domain>.s3-website<sep><region>` rebuilt from the alias target.
    S3WebsiteEndpoint,
    None,
}

pub type Matcher = fn(&RecordSet, &HostedZone) -> bool;

#[derive(Debug, Clone, Copy)]
pub struct CategorySpec {
    pub category: VulnerabilityCategory,
    /// `None` for categories that are not derived from zone records.
    pub matcher: Option<Matcher>,
    pub probe: ProbeStrategy,
    pub hint: HintKind,
    pub resource_type: &'static str,
    pub vulnerability_type: &'static str,
}

/// Zone classifiers run in this order; it is also the candidate order.
pub const REGISTRY: &[CategorySpec] = &[
    CategorySpec {
        category: VulnerabilityCategory::CloudfrontS3Alias,
        matcher: Some(cloudfront_s3_alias),
        probe: ProbeStrategy::StorageFingerprint { use_https: true },
        hint: HintKind::CloudfrontOrigin,
        resource_type: "CloudFront S3",
        vulnerability_type: "Alias",
    },
    CategorySpec {
        category: VulnerabilityCategory::ElasticBeanstalkAlias,
        matcher: Some(elastic_beanstalk_alias),
        probe: ProbeStrategy::CnameLiveness,
        hint: HintKind::RecordTarget,
        resource_type: "Elastic Beanstalk",
        vulnerability_type: "Alias",
    },
    CategorySpec {
        category: VulnerabilityCategory::S3Alias,
        matcher: Some(s3_alias),
        probe: ProbeStrategy::StorageFingerprint { use_https: false },
        hint: HintKind::S3WebsiteEndpoint,
        resource_type: "S3",
        vulnerability_type: "Alias",
    },
    CategorySpec {
        category: VulnerabilityCategory::AzureCname,
        matcher: Some(azure_cname),
        probe: ProbeStrategy::CnameLiveness,
        hint: HintKind::None,
        resource_type: "Azure",
        vulnerability_type: "CNAME",
    },
    CategorySpec {
        category: VulnerabilityCategory::CloudfrontS3Cname,
        matcher: Some(cloudfront_s3_cname),
        probe: ProbeStrategy::StorageFingerprint { use_https: true },
        hint: HintKind::CloudfrontOrigin,
        resource_type: "CloudFront S3",
        vulnerability_type: "CNAME",
    },
    CategorySpec {
        category: VulnerabilityCategory::ElasticBeanstalkCname,
        matcher: Some(elastic_beanstalk_cname),
        probe: ProbeStrategy::CnameLiveness,
        hint: HintKind::RecordTarget,
        resource_type: "Elastic Beanstalk",
        vulnerability_type: "CNAME",
    },
    CategorySpec {
        category: VulnerabilityCategory::GoogleStorageCname,
        matcher: Some(google_storage_cname),
        probe: ProbeStrategy::StorageFingerprint { use_https: false },
        hint: HintKind::RecordTarget,
        resource_type: "Google cloud storage",
        vulnerability_type: "CNAME",
    },
    CategorySpec {
        category: VulnerabilityCategory::S3Cname,
        matcher: Some(s3_cname),
        probe: ProbeStrategy::StorageFingerprint { use_https: false },
        hint: HintKind::RecordTarget,
        resource_type: "S3",
        vulnerability_type: "CNAME",
    },
    CategorySpec {
        category: VulnerabilityCategory::DanglingNsDelegation,
        matcher: Some(ns_subdomain),
        probe: ProbeStrategy::Delegation,
        hint: HintKind::None,
        resource_type: "hosted zone",
        vulnerability_type: "NS",
    },
    CategorySpec {
        category: VulnerabilityCategory::DanglingRegisteredDomain,
        matcher: None,
        probe: ProbeStrategy::Registrar,
        hint: HintKind::None,
        resource_type: "hosted zone",
        vulnerability_type: "registered domain",
    },
];

impl VulnerabilityCategory {
    pub fn spec(self) -> &'static CategorySpec {
        REGISTRY
            .iter()
            .find(|spec| spec.category == self)
            .unwrap_or_else(|| unreachable!("every category has a registry entry"))
    }
}

fn alias_contains(record: &RecordSet, needle: &str) -> bool {
    record
        .alias_target()
        .is_some_and(|target| target.contains(needle))
}

fn cname_value(record: &RecordSet) -> Option<&str> {
    if record.record_type == RecordType::Cname {
        record.first_value()
    } else {
        None
    }
}

fn cloudfront_s3_alias(record: &RecordSet, _zone: &HostedZone) -> bool {
    alias_contains(record, "cloudfront.net") && record.record_type != RecordType::Aaaa
}

fn elastic_beanstalk_alias(record: &RecordSet, _zone: &HostedZone) -> bool {
    alias_contains(record, "elasticbeanstalk.com")
}

fn s3_alias(record: &RecordSet, _zone: &HostedZone) -> bool {
    alias_contains(record, "amazonaws.com") && alias_contains(record, "s3-website")
}

fn azure_cname(record: &RecordSet, _zone: &HostedZone) -> bool {
    cname_value(record).is_some_and(|value| {
        AZURE_CNAME_PATTERNS
            .iter()
            .any(|pattern| value.contains(pattern))
    })
}

fn cloudfront_s3_cname(record: &RecordSet, _zone: &HostedZone) -> bool {
    cname_value(record).is_some_and(|value| value.contains("cloudfront.net"))
}

fn elastic_beanstalk_cname(record: &RecordSet, _zone: &HostedZone) -> bool {
    cname_value(record).is_some_and(|value| value.contains("elasticbeanstalk.com"))
}

fn google_storage_cname(record: &RecordSet, _zone: &HostedZone) -> bool {
    cname_value(record).is_some_and(|value| value.contains("c.storage.googleapis.com"))
}

fn s3_cname(record: &RecordSet, _zone: &HostedZone) -> bool {
    cname_value(record)
        .is_some_and(|value| value.contains("amazonaws.com") && value.contains(".s3-website."))
}

/// Delegations only: the zone's own apex NS set is never a candidate.
fn ns_subdomain(record: &RecordSet, zone: &HostedZone) -> bool {
    record.record_type == RecordType::Ns
        && normalize_domain(&record.name) != normalize_domain(&zone.name)
}

/// A record matched by a classifier (or a registered domain), not yet probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub domain: String,
    pub account: Account,
    pub category: VulnerabilityCategory,
    pub target: RecordTarget,
}

impl Candidate {
    pub fn registered_domain(account: &Account, domain: &str) -> Self {
        Self {
            domain: normalize_domain(domain),
            account: account.clone(),
            category: VulnerabilityCategory::DanglingRegisteredDomain,
            target: RecordTarget::Values { values: Vec::new() },
        }
    }

    /// Alias DNS name, or the first resource record value.
    pub fn raw_target(&self) -> Option<&str> {
        match &self.target {
            RecordTarget::Alias { dns_name } => Some(dns_name),
            RecordTarget::Values { values } => values.first().map(String::as_str),
        }
    }

    pub fn nameservers(&self) -> Vec<String> {
        match &self.target {
            RecordTarget::Values { values } => {
                values.iter().map(|ns| normalize_domain(ns)).collect()
            }
            RecordTarget::Alias { .. } => Vec::new(),
        }
    }

    pub fn spec(&self) -> &'static CategorySpec {
        self.category.spec()
    }
}

/// Runs every zone classifier over one zone's record sets.
pub fn classify(account: &Account, zone: &HostedZone, records: &[RecordSet]) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for spec in REGISTRY {
        let Some(matcher) = spec.matcher else {
            continue;
        };

        for record in records.iter().filter(|record| matcher(record, zone)) {
            debug!(
                "[{}] {} matched in zone {}",
                spec.category, record.name, zone.name
            );
            candidates.push(Candidate {
                domain: normalize_domain(&record.name),
                account: account.clone(),
                category: spec.category,
                target: record.target.clone(),
            });
        }
    }

    candidates
}

/// `app.example.com` + `s3-website-us-east-1.amazonaws.com.`
/// => `app.example.com.s3-website-us-east-1.amazonaws.com`
pub fn s3_website_endpoint(domain: &str, alias_target: &str) -> Option<String> {
    let caps = S3_WEBSITE_REGEX.captures(alias_target)?;
    Some(format!(
        "{}.s3-website{}{}",
        normalize_domain(domain),
        &caps[1],
        &caps[2]
    ))
}

/// Resolves the takeover hint for a confirmed candidate. Inventory failures
/// while looking up a CloudFront origin drop the hint rather than the finding.
pub async fn build_hint(
    inventory: &dyn InventorySource,
    account: &Account,
    candidate: &Candidate,
) -> Option<String> {
    let target = candidate.raw_target();

    match candidate.spec().hint {
        HintKind::None => None,
        HintKind::RecordTarget => target.map(|t| t.trim_end_matches('.').to_string()),
        HintKind::S3WebsiteEndpoint => {
            target.and_then(|t| s3_website_endpoint(&candidate.domain, t))
        }
        HintKind::CloudfrontOrigin => {
            let target = target?;
            match inventory.resolve_alias_origin(account, target).await {
                Ok(origin) => origin,
                Err(e) => {
                    warn!(
                        "Could not resolve CloudFront origin for {} ({}): {}",
                        candidate.domain, target, e
                    );
                    None
                }
            }
        }
    }
}
