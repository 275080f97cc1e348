use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::errors::{Result, ScanError};
use crate::reporting::ScanReport;

/// Outbound alert channel. Only called with a non-empty report; retries, if
/// any, are the implementation's business.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, report: &ScanReport, subject: &str) -> Result<()>;
}

/// Writes the alert to the log. Used when no webhook is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, report: &ScanReport, subject: &str) -> Result<()> {
        info!(findings = report.len(), "{}\n{}", subject, report.to_audit_json()?);
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    subject: &'a str,
    message: String,
}

/// POSTs `{subject, message}` to an HTTP endpoint (chat webhook, SNS HTTP
/// bridge, ...). `message` is the audit JSON of the report.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn publish(&self, report: &ScanReport, subject: &str) -> Result<()> {
        let payload = WebhookPayload {
            subject,
            message: report.to_audit_json()?,
        };

        let resp = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ScanError::Notify(format!("POST {} failed: {}", self.url, e)))?;

        if !resp.status().is_success() {
            return Err(ScanError::Notify(format!(
                "POST {} returned {}",
                self.url,
                resp.status()
            )));
        }

        info!("Published {} findings to {}", report.len(), self.url);
        Ok(())
    }
}
