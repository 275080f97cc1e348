//! In-memory stand-ins for the inventory, network, and notifier.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use danglescan::dns::Resolution;
use danglescan::errors::{Result, ScanError};
use danglescan::fingerprint::HttpFingerprint;
use danglescan::inventory::InventorySource;
use danglescan::model::{Account, HostedZone, RecordSet, RegisteredDomain};
use danglescan::notify::Notifier;
use danglescan::probe::NetworkProbe;
use danglescan::store::MemoryStore;
use danglescan::{ScanConfig, ScanReport, Scanner};

pub const MISSING_BUCKET: &str =
    "<Error><Code>NoSuchBucket</Code><Message>The specified bucket does not exist</Message></Error>";

#[derive(Default)]
pub struct FakeInventory {
    pub zones: Vec<(HostedZone, Vec<RecordSet>)>,
    pub registered: Vec<String>,
    pub origins: HashMap<String, String>,
    pub fail_listing: bool,
    pub fail_origin_lookup: bool,
}

impl FakeInventory {
    pub fn with_zone(name: &str, records: Vec<RecordSet>) -> Self {
        let zone = HostedZone {
            id: format!("Z-{}", name),
            name: name.to_string(),
        };
        Self {
            zones: vec![(zone, records)],
            ..Default::default()
        }
    }
}

#[async_trait]
impl InventorySource for FakeInventory {
    async fn list_hosted_zones(&self, account: &Account) -> Result<Vec<HostedZone>> {
        if self.fail_listing {
            return Err(ScanError::inventory(
                "list_hosted_zones",
                format!("AccessDenied for {}", account.id),
            ));
        }
        Ok(self.zones.iter().map(|(z, _)| z.clone()).collect())
    }

    async fn list_resource_record_sets(
        &self,
        _account: &Account,
        zone_id: &str,
    ) -> Result<Vec<RecordSet>> {
        self.zones
            .iter()
            .find(|(z, _)| z.id == zone_id)
            .map(|(_, records)| records.clone())
            .ok_or_else(|| ScanError::inventory("list_resource_record_sets", zone_id))
    }

    async fn list_registered_domains(&self, _account: &Account) -> Result<Vec<RegisteredDomain>> {
        Ok(self
            .registered
            .iter()
            .map(|name| RegisteredDomain { name: name.clone() })
            .collect())
    }

    async fn resolve_alias_origin(
        &self,
        _account: &Account,
        alias_target: &str,
    ) -> Result<Option<String>> {
        if self.fail_origin_lookup {
            return Err(ScanError::inventory(
                "get_distribution",
                format!("throttled looking up {}", alias_target),
            ));
        }
        Ok(self.origins.get(alias_target).cloned())
    }
}

/// Unknown names fail with a probe error, like an unreachable host.
#[derive(Default)]
pub struct FakeProbe {
    pub pages: HashMap<(String, bool), HttpFingerprint>,
    pub resolutions: HashMap<String, Resolution>,
    pub nameservers: HashMap<String, Resolution>,
    pub answering: HashSet<String>,
    /// Nameservers not in `answering` hang this long before giving up.
    pub silence: Option<Duration>,
    pub fetches: Mutex<Vec<(String, bool)>>,
}

impl FakeProbe {
    pub fn page(mut self, domain: &str, https: bool, status: u16, body: &str) -> Self {
        self.pages
            .insert((domain.to_string(), https), HttpFingerprint::new(status, body));
        self
    }

    pub fn resolution(mut self, name: &str, resolution: Resolution) -> Self {
        self.resolutions.insert(name.to_string(), resolution);
        self
    }

    pub fn nameservers(mut self, name: &str, resolution: Resolution) -> Self {
        self.nameservers.insert(name.to_string(), resolution);
        self
    }

    pub fn answering(mut self, nameserver: &str) -> Self {
        self.answering.insert(nameserver.to_string());
        self
    }

    pub fn silent_for(mut self, delay: Duration) -> Self {
        self.silence = Some(delay);
        self
    }
}

#[async_trait]
impl NetworkProbe for FakeProbe {
    async fn fetch(&self, domain: &str, use_https: bool) -> Result<HttpFingerprint> {
        self.fetches
            .lock()
            .unwrap()
            .push((domain.to_string(), use_https));
        self.pages
            .get(&(domain.to_string(), use_https))
            .cloned()
            .ok_or_else(|| ScanError::probe(domain, "connection refused"))
    }

    async fn resolve(&self, name: &str) -> Result<Resolution> {
        self.resolutions
            .get(name)
            .cloned()
            .ok_or_else(|| ScanError::probe(name, "timed out"))
    }

    async fn resolve_nameservers(&self, name: &str) -> Result<Resolution> {
        self.nameservers
            .get(name)
            .cloned()
            .ok_or_else(|| ScanError::probe(name, "timed out"))
    }

    async fn query_authoritative(&self, nameserver: &str, _name: &str) -> Result<bool> {
        if self.answering.contains(nameserver) {
            return Ok(true);
        }
        if let Some(delay) = self.silence {
            tokio::time::sleep(delay).await;
        }
        Ok(false)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub published: Mutex<Vec<(ScanReport, String)>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn calls(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, report: &ScanReport, subject: &str) -> Result<()> {
        self.published
            .lock()
            .unwrap()
            .push((report.clone(), subject.to_string()));
        if self.fail {
            return Err(ScanError::Notify("topic not found".to_string()));
        }
        Ok(())
    }
}

pub struct Harness {
    pub scanner: Scanner,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub probe: Arc<FakeProbe>,
}

pub fn harness(inventory: FakeInventory, probe: FakeProbe) -> Harness {
    harness_with(inventory, probe, RecordingNotifier::default())
}

pub fn harness_with(
    inventory: FakeInventory,
    probe: FakeProbe,
    notifier: RecordingNotifier,
) -> Harness {
    harness_configured(inventory, probe, notifier, ScanConfig::default())
}

pub fn harness_configured(
    inventory: FakeInventory,
    probe: FakeProbe,
    notifier: RecordingNotifier,
    config: ScanConfig,
) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(notifier);
    let probe = Arc::new(probe);
    let scanner = Scanner::new(
        Arc::new(inventory),
        probe.clone(),
        store.clone(),
        notifier.clone(),
        config,
    );
    Harness {
        scanner,
        store,
        notifier,
        probe,
    }
}

pub fn account() -> Account {
    Account::new("111111111111", "prod")
}
