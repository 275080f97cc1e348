pub mod args;
pub mod cloud;
pub mod constants;
pub mod dedup;
pub mod dns;
pub mod errors;
pub mod fingerprint;
pub mod inventory;
pub mod model;
pub mod notify;
pub mod probe;
pub mod reporting;
pub mod scanner;
pub mod store;
pub mod takeover;

pub use args::Args;
pub use errors::{Result, ScanError};
pub use model::Account;
pub use reporting::{Finding, ScanReport};
pub use scanner::{ScanConfig, Scanner};

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::info;

use inventory::JsonInventory;
use notify::{LogNotifier, Notifier, WebhookNotifier};
use probe::LiveProbe;
use reporting::write_outputs;
use store::JsonFileStore;

pub async fn run(args: Args) -> Result<ScanReport> {
    let config = ScanConfig::from(&args);

    info!("[*] Starting takeover scan for {}", args.account_name);
    info!("[*] Configuration:");
    info!("    - Account: {} ({})", args.account_name, args.account_id);
    info!("    - Inventory: {}", args.inventory.display());
    info!("    - Store: {}", args.store.display());
    info!("    - Concurrency: {}", config.concurrency);
    info!("    - Timeout: {:?}", config.probe_timeout);
    info!("    - Nameserver: {}", args.nameserver);

    let inventory = Arc::new(JsonInventory::load(&args.inventory)?);
    let store = Arc::new(JsonFileStore::open(&args.store)?);
    let probe = Arc::new(LiveProbe::new(&args.nameserver, args.timeout)?);

    let notifier: Arc<dyn Notifier> = match &args.webhook {
        Some(url) => {
            let client = Client::builder()
                .timeout(Duration::from_secs(args.timeout))
                .build()
                .map_err(|e| ScanError::Config(format!("failed to build HTTP client: {}", e)))?;
            Arc::new(WebhookNotifier::new(client, url.clone()))
        }
        None => Arc::new(LogNotifier),
    };

    let scanner = Scanner::new(inventory, probe, store, notifier, config);
    let account = Account::new(args.account_id.clone(), args.account_name.clone());
    let report = scanner.scan(&account).await?;

    if let Some(output_dir) = &args.output {
        for file in write_outputs(&report, output_dir, &account.name)? {
            info!("[+] Wrote {}", file.display());
        }
    }

    info!(
        "[*] Scan complete - {} new vulnerable domains in {}",
        report.len(),
        account.name
    );
    Ok(report)
}
