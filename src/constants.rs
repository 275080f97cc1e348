use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

pub const DNS_TIMEOUT: Duration = Duration::from_secs(5);

/// Below this, a nameserver that has not answered yet cannot be called silent.
pub const MIN_NAMESERVER_BUDGET: Duration = Duration::from_secs(1);

pub const DEFAULT_CONCURRENCY: usize = 20;

pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_NAMESERVER: &str = "8.8.8.8:53";

pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

pub const NOTIFICATION_SUBJECT: &str = "New domains vulnerable to takeover";

/// Account name whose zones live in Cloudflare rather than Route 53.
pub const CLOUDFLARE_ACCOUNT: &str = "Cloudflare";

pub const AZURE_CNAME_PATTERNS: &[&str] = &[
    "azure",
    ".cloudapp.net",
    "core.windows.net",
    "trafficmanager.net",
];

/// Error bodies returned when a bucket behind a hostname is gone. S3 and
/// the GCS XML API share the same error code and message.
pub const MISSING_BUCKET_SIGNATURES: &[&str] =
    &["NoSuchBucket", "The specified bucket does not exist"];

/// Captures the separator and the region/suffix after `s3-website` in an
/// S3 website endpoint such as `s3-website-us-east-1.amazonaws.com.`
pub static S3_WEBSITE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"s3-website([.-])([a-z0-9-]+\.amazonaws\.com(?:\.cn)?)\.?$").unwrap()
});
