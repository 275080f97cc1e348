//! Turns probe-confirmed candidates into report entries, once per domain.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::reporting::{Finding, ScanReport};
use crate::store::FindingStore;
use crate::takeover::Candidate;

/// Run state owned by the orchestrator for exactly one scan.
#[derive(Debug, Default)]
pub struct ScanContext {
    pub report: ScanReport,
    reported: HashSet<String>,
}

impl ScanContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reported_this_run(&self, domain: &str) -> bool {
        self.reported.contains(domain)
    }

    pub fn into_report(self) -> ScanReport {
        self.report
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    New,
    StillVulnerable,
    AlreadyReportedThisRun,
}

pub struct Deduplicator {
    store: Arc<dyn FindingStore>,
    // serialises check-then-insert across concurrent scans sharing a store
    guard: Mutex<()>,
}

impl Deduplicator {
    pub fn new(store: Arc<dyn FindingStore>) -> Self {
        Self {
            store,
            guard: Mutex::new(()),
        }
    }

    pub async fn process(
        &self,
        ctx: &mut ScanContext,
        candidate: &Candidate,
        takeover: Option<String>,
    ) -> Outcome {
        let domain = candidate.domain.as_str();
        let account = &candidate.account;

        if ctx.reported_this_run(domain) {
            debug!("{} already reported in this run", domain);
            return Outcome::AlreadyReportedThisRun;
        }

        let _guard = self.guard.lock().await;

        match self.store.get_unfixed_found_at(domain).await {
            Ok(Some(found_at)) => {
                info!(
                    "{} in {} is still vulnerable (first found {})",
                    domain, account.name, found_at
                );
                return Outcome::StillVulnerable;
            }
            Ok(None) => {}
            Err(e) => {
                // an extra alert beats a silently dropped one
                warn!("Finding store lookup failed, treating {} as new: {}", domain, e);
            }
        }

        info!("New vulnerability {} in {}", domain, account.name);
        let spec = candidate.spec();

        // store before report: a crash in between costs a duplicate alert,
        // never a lost record
        if let Err(e) = self
            .store
            .record_found(domain, &account.name, spec.vulnerability_type, spec.resource_type)
            .await
        {
            error!("Failed to record {} in finding store: {}", domain, e);
        }

        ctx.report.push(Finding {
            account: account.name.clone(),
            cloud: account.cloud,
            domain: domain.to_string(),
            resource_type: spec.resource_type.to_string(),
            vulnerability_type: spec.vulnerability_type.to_string(),
            takeover,
        });
        ctx.reported.insert(domain.to_string());

        Outcome::New
    }
}
