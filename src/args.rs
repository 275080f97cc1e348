use std::path::PathBuf;

use clap::Parser;

use crate::constants::{DEFAULT_CONCURRENCY, DEFAULT_NAMESERVER, DEFAULT_PROBE_TIMEOUT_SECS};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Cloud account id to scan
    #[arg(long, env = "DANGLESCAN_ACCOUNT_ID")]
    pub account_id: String,

    /// Cloud account name ("Cloudflare" for Cloudflare-hosted zones)
    #[arg(long, env = "DANGLESCAN_ACCOUNT_NAME")]
    pub account_name: String,

    /// JSON inventory of hosted zones, record sets and registered domains
    #[arg(short, long, env = "DANGLESCAN_INVENTORY")]
    pub inventory: PathBuf,

    /// JSON file remembering domains already reported as vulnerable
    #[arg(short, long, env = "DANGLESCAN_STORE", default_value = "findings.json")]
    pub store: PathBuf,

    /// Directory for JSON/CSV reports of new findings
    #[arg(short, long, env = "DANGLESCAN_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Maximum number of concurrent probes
    #[arg(short, long, env = "DANGLESCAN_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Per-probe timeout in seconds
    #[arg(short, long, env = "DANGLESCAN_TIMEOUT", default_value_t = DEFAULT_PROBE_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Upstream DNS resolver
    #[arg(long, env = "DANGLESCAN_NAMESERVER", default_value = DEFAULT_NAMESERVER)]
    pub nameserver: String,

    /// Webhook receiving notifications; logged only when unset
    #[arg(long, env = "DANGLESCAN_WEBHOOK")]
    pub webhook: Option<String>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,
}
