use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::args::Args;
use crate::constants::{DEFAULT_CONCURRENCY, DEFAULT_PROBE_TIMEOUT_SECS, NOTIFICATION_SUBJECT};
use crate::dedup::{Deduplicator, Outcome, ScanContext};
use crate::errors::Result;
use crate::inventory::InventorySource;
use crate::model::Account;
use crate::notify::Notifier;
use crate::probe::{confirm, NetworkProbe};
use crate::reporting::ScanReport;
use crate::store::FindingStore;
use crate::takeover::{build_hint, classify, Candidate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Probes in flight at once.
    pub concurrency: usize,
    pub probe_timeout: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
        }
    }
}

impl From<&Args> for ScanConfig {
    fn from(args: &Args) -> Self {
        Self {
            concurrency: args.concurrency.max(1),
            probe_timeout: Duration::from_secs(args.timeout.max(1)),
        }
    }
}

pub struct Scanner {
    inventory: Arc<dyn InventorySource>,
    probe: Arc<dyn NetworkProbe>,
    notifier: Arc<dyn Notifier>,
    dedup: Deduplicator,
    config: ScanConfig,
}

impl Scanner {
    pub fn new(
        inventory: Arc<dyn InventorySource>,
        probe: Arc<dyn NetworkProbe>,
        store: Arc<dyn FindingStore>,
        notifier: Arc<dyn Notifier>,
        config: ScanConfig,
    ) -> Self {
        Self {
            inventory,
            probe,
            notifier,
            dedup: Deduplicator::new(store),
            config,
        }
    }

    /// One full scan of `account`: hosted zones, then registered domains,
    /// then the report. Only inventory failures and malformed records abort.
    pub async fn scan(&self, account: &Account) -> Result<ScanReport> {
        info!("Input: {} ({})", account.name, account.id);
        let mut ctx = ScanContext::new();

        self.scan_zones(&mut ctx, account).await?;
        self.scan_registered_domains(&mut ctx, account).await?;

        let report = ctx.into_report();
        info!("{}", report.to_audit_json()?);

        if !report.is_empty() {
            if let Err(e) = self.notifier.publish(&report, NOTIFICATION_SUBJECT).await {
                error!("Failed to publish {} new findings: {}", report.len(), e);
            }
        }

        Ok(report)
    }

    async fn scan_zones(&self, ctx: &mut ScanContext, account: &Account) -> Result<()> {
        let zones = self.inventory.list_hosted_zones(account).await?;

        for zone in &zones {
            info!(
                "Searching for vulnerable domain records in hosted zone {}",
                zone.name
            );
            let records = self
                .inventory
                .list_resource_record_sets(account, &zone.id)
                .await?;
            for record in &records {
                record.validate()?;
            }

            let candidates = classify(account, zone, &records);
            self.process_candidates(ctx, account, candidates).await;
        }

        if zones.is_empty() {
            info!("No hosted zones found in {} account", account.name);
        }
        Ok(())
    }

    async fn scan_registered_domains(&self, ctx: &mut ScanContext, account: &Account) -> Result<()> {
        info!("Searching for registered domains in {} account", account.name);
        let domains = self.inventory.list_registered_domains(account).await?;

        let candidates = domains
            .iter()
            .map(|domain| Candidate::registered_domain(account, &domain.name))
            .collect();
        self.process_candidates(ctx, account, candidates).await;

        if domains.is_empty() {
            info!("No registered domains found in {} account", account.name);
        }
        Ok(())
    }

    async fn process_candidates(
        &self,
        ctx: &mut ScanContext,
        account: &Account,
        candidates: Vec<Candidate>,
    ) {
        let confirmed = self.probe_all(&candidates).await;

        for (candidate, is_vulnerable) in candidates.iter().zip(confirmed) {
            if !is_vulnerable {
                continue;
            }
            let takeover = build_hint(self.inventory.as_ref(), account, candidate).await;
            let outcome = self.dedup.process(ctx, candidate, takeover).await;
            if outcome == Outcome::New {
                info!(
                    "[{}] {} in {} added to report",
                    candidate.category, candidate.domain, account.name
                );
            }
        }
    }

    /// Probes every candidate with bounded parallelism. The result at index
    /// `i` belongs to `candidates[i]`.
    async fn probe_all(&self, candidates: &[Candidate]) -> Vec<bool> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = FuturesUnordered::new();

        for (idx, candidate) in candidates.iter().enumerate() {
            let probe = Arc::clone(&self.probe);
            let semaphore = Arc::clone(&semaphore);
            let candidate = candidate.clone();
            let deadline = self.config.probe_timeout;

            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                info!("checking if {} is vulnerable to takeover", candidate.domain);
                Some((idx, confirm(probe.as_ref(), &candidate, deadline).await))
            }));
        }

        let mut confirmed = vec![false; candidates.len()];
        while let Some(res) = tasks.next().await {
            match res {
                Ok(Some((idx, result))) => confirmed[idx] = result,
                Ok(None) => warn!("Probe skipped: semaphore closed"),
                Err(e) => warn!("Probe task failed: {:?}", e),
            }
        }

        confirmed
    }
}
