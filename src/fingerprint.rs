use reqwest::Client;
use tokio::time::{timeout, Duration};

use crate::constants::MISSING_BUCKET_SIGNATURES;
use crate::errors::{Result, ScanError};

/// Status and body of one GET against a candidate domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFingerprint {
    pub status: u16,
    pub body: String,
}

impl HttpFingerprint {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

pub async fn fetch_fingerprint(
    client: &Client,
    domain: &str,
    use_https: bool,
    timeout_secs: u64,
) -> Result<HttpFingerprint> {
    let scheme = if use_https { "https" } else { "http" };
    let url = format!("{}://{}", scheme, domain.trim_end_matches('.'));

    let resp = timeout(Duration::from_secs(timeout_secs), client.get(&url).send())
        .await
        .map_err(|_| ScanError::probe(&url, "request timed out"))?
        .map_err(|e| ScanError::probe(&url, e))?;

    let status = resp.status().as_u16();
    let body = timeout(Duration::from_secs(timeout_secs), resp.text())
        .await
        .map_err(|_| ScanError::probe(&url, "body read timed out"))?
        .map_err(|e| ScanError::probe(&url, e))?;

    Ok(HttpFingerprint { status, body })
}

/// True when the response is a storage "bucket does not exist" error.
pub fn is_missing_bucket(fingerprint: &HttpFingerprint) -> bool {
    (400..500).contains(&fingerprint.status)
        && MISSING_BUCKET_SIGNATURES
            .iter()
            .any(|signature| fingerprint.body.contains(signature))
}
