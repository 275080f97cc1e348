//! Durable record of domains already reported as vulnerable.
//!
//! Keyed by domain only. A domain that is recorded and not yet marked fixed
//! is never reported again, whichever category matched it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::{Result, ScanError};

#[async_trait]
pub trait FindingStore: Send + Sync {
    /// When the domain was first found, if it is still unfixed.
    async fn get_unfixed_found_at(&self, domain: &str) -> Result<Option<DateTime<Utc>>>;

    async fn record_found(
        &self,
        domain: &str,
        account: &str,
        vulnerability_type: &str,
        resource_type: &str,
    ) -> Result<()>;

    /// Used by the remediation process; returns false if nothing was open.
    async fn mark_fixed(&self, domain: &str) -> Result<bool>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFinding {
    pub domain: String,
    pub account: String,
    pub vulnerability_type: String,
    pub resource_type: String,
    pub first_seen_at: DateTime<Utc>,
    pub last_unfixed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_at: Option<DateTime<Utc>>,
}

impl StoredFinding {
    fn is_open(&self) -> bool {
        self.fixed_at.is_none()
    }
}

type Records = BTreeMap<String, StoredFinding>;

fn unfixed_found_at(records: &Records, domain: &str) -> Option<DateTime<Utc>> {
    records
        .get(domain)
        .filter(|r| r.is_open())
        .map(|r| r.first_seen_at)
}

fn upsert(
    records: &mut Records,
    domain: &str,
    account: &str,
    vulnerability_type: &str,
    resource_type: &str,
) {
    let now = Utc::now();
    match records.get_mut(domain) {
        Some(existing) if existing.is_open() => existing.last_unfixed_at = now,
        _ => {
            records.insert(
                domain.to_string(),
                StoredFinding {
                    domain: domain.to_string(),
                    account: account.to_string(),
                    vulnerability_type: vulnerability_type.to_string(),
                    resource_type: resource_type.to_string(),
                    first_seen_at: now,
                    last_unfixed_at: now,
                    fixed_at: None,
                },
            );
        }
    }
}

fn close(records: &mut Records, domain: &str) -> bool {
    match records.get_mut(domain) {
        Some(existing) if existing.is_open() => {
            existing.fixed_at = Some(Utc::now());
            true
        }
        _ => false,
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn get(&self, domain: &str) -> Option<StoredFinding> {
        self.records.lock().await.get(domain).cloned()
    }
}

#[async_trait]
impl FindingStore for MemoryStore {
    async fn get_unfixed_found_at(&self, domain: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(unfixed_found_at(&*self.records.lock().await, domain))
    }

    async fn record_found(
        &self,
        domain: &str,
        account: &str,
        vulnerability_type: &str,
        resource_type: &str,
    ) -> Result<()> {
        let mut records = self.records.lock().await;
        upsert(&mut records, domain, account, vulnerability_type, resource_type);
        Ok(())
    }

    async fn mark_fixed(&self, domain: &str) -> Result<bool> {
        Ok(close(&mut *self.records.lock().await, domain))
    }
}

/// JSON file rewritten atomically (temp file + rename) on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: Mutex<Records>,
}

impl JsonFileStore {
    pub fn open(path: &Path) -> Result<Self> {
        let records = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            if raw.trim().is_empty() {
                Records::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            Records::new()
        };
        debug!(
            "Opened finding store {} with {} records",
            path.display(),
            records.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            records: Mutex::new(records),
        })
    }

    async fn persist(&self, records: &Records, domain: &str) -> Result<()> {
        let body = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| ScanError::store(domain, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| ScanError::store(domain, e))
    }
}

#[async_trait]
impl FindingStore for JsonFileStore {
    async fn get_unfixed_found_at(&self, domain: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(unfixed_found_at(&*self.records.lock().await, domain))
    }

    async fn record_found(
        &self,
        domain: &str,
        account: &str,
        vulnerability_type: &str,
        resource_type: &str,
    ) -> Result<()> {
        let mut records = self.records.lock().await;
        upsert(&mut records, domain, account, vulnerability_type, resource_type);
        self.persist(&records, domain).await
    }

    async fn mark_fixed(&self, domain: &str) -> Result<bool> {
        let mut records = self.records.lock().await;
        let closed = close(&mut records, domain);
        if closed {
            self.persist(&records, domain).await?;
        }
        Ok(closed)
    }
}
