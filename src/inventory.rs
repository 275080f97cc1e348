use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::errors::{Result, ScanError};
use crate::model::{normalize_domain, Account, HostedZone, RecordSet, RegisteredDomain};

/// Where accounts, zones, record sets and registered domains come from.
/// Any error here aborts the scan: an empty listing and a failed listing
/// must never look alike.
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn list_hosted_zones(&self, account: &Account) -> Result<Vec<HostedZone>>;

    async fn list_resource_record_sets(
        &self,
        account: &Account,
        zone_id: &str,
    ) -> Result<Vec<RecordSet>>;

    async fn list_registered_domains(&self, account: &Account) -> Result<Vec<RegisteredDomain>>;

    /// Origin domain configured on the CloudFront distribution behind
    /// `alias_target`, if the account owns one.
    async fn resolve_alias_origin(
        &self,
        account: &Account,
        alias_target: &str,
    ) -> Result<Option<String>>;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneInventory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub records: Vec<RecordSet>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInventory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub zones: Vec<ZoneInventory>,
    #[serde(default)]
    pub registered_domains: Vec<String>,
    /// CloudFront domain name => origin domain name.
    #[serde(default)]
    pub distributions: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryDocument {
    #[serde(default)]
    pub accounts: Vec<AccountInventory>,
}

/// Inventory exported to a JSON document, one entry per account.
#[derive(Debug, Clone, Default)]
pub struct JsonInventory {
    document: InventoryDocument,
}

impl JsonInventory {
    pub fn new(document: InventoryDocument) -> Self {
        Self { document }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ScanError::inventory(format!("read {}", path.display()), e)
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let document: InventoryDocument = serde_json::from_str(raw)
            .map_err(|e| ScanError::inventory("parse inventory", e))?;
        debug!("Loaded inventory with {} accounts", document.accounts.len());
        Ok(Self::new(document))
    }

    fn account(&self, account: &Account) -> Result<&AccountInventory> {
        self.document
            .accounts
            .iter()
            .find(|a| a.id == account.id && a.name == account.name)
            .ok_or_else(|| {
                ScanError::inventory(
                    "lookup account",
                    format!("no inventory for {} ({})", account.name, account.id),
                )
            })
    }
}

#[async_trait]
impl InventorySource for JsonInventory {
    async fn list_hosted_zones(&self, account: &Account) -> Result<Vec<HostedZone>> {
        Ok(self
            .account(account)?
            .zones
            .iter()
            .map(|z| HostedZone {
                id: z.id.clone(),
                name: z.name.clone(),
            })
            .collect())
    }

    async fn list_resource_record_sets(
        &self,
        account: &Account,
        zone_id: &str,
    ) -> Result<Vec<RecordSet>> {
        self.account(account)?
            .zones
            .iter()
            .find(|z| z.id == zone_id)
            .map(|z| z.records.clone())
            .ok_or_else(|| {
                ScanError::inventory(
                    "list_resource_record_sets",
                    format!("unknown hosted zone {} in {}", zone_id, account.name),
                )
            })
    }

    async fn list_registered_domains(&self, account: &Account) -> Result<Vec<RegisteredDomain>> {
        Ok(self
            .account(account)?
            .registered_domains
            .iter()
            .map(|name| RegisteredDomain { name: name.clone() })
            .collect())
    }

    async fn resolve_alias_origin(
        &self,
        account: &Account,
        alias_target: &str,
    ) -> Result<Option<String>> {
        let wanted = normalize_domain(alias_target);
        Ok(self
            .account(account)?
            .distributions
            .iter()
            .find(|(domain, _)| normalize_domain(domain) == wanted)
            .map(|(_, origin)| origin.clone()))
    }
}
