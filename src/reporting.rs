use std::path::{Path, PathBuf};

use chrono::Local;
use csv::Writer;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::cloud::Cloud;
use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Finding {
    pub account: String,
    pub cloud: Cloud,
    pub domain: String,
    pub resource_type: String,
    pub vulnerability_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub takeover: Option<String>,
}

/// Newly confirmed findings of one run, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    #[serde(rename = "New")]
    pub new: Vec<Finding>,
}

impl ScanReport {
    pub fn push(&mut self, finding: Finding) {
        self.new.push(finding);
    }

    pub fn is_empty(&self) -> bool {
        self.new.is_empty()
    }

    pub fn len(&self) -> usize {
        self.new.len()
    }

    pub fn findings(&self) -> &[Finding] {
        &self.new
    }

    /// Pretty JSON with keys sorted, for the audit log and notifications.
    pub fn to_audit_json(&self) -> Result<String> {
        // serde_json::Value objects are BTreeMap backed, so keys come out sorted
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

/// Writes `<account>_<timestamp>_report.json` and `..._report.csv` into
/// `output_dir` and returns both paths.
pub fn write_outputs(
    report: &ScanReport,
    output_dir: &Path,
    account_name: &str,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let stem = format!("{}_{}", account_name, timestamp);

    let json_file = output_dir.join(format!("{}_report.json", stem));
    std::fs::write(&json_file, report.to_audit_json()?)?;

    let csv_file = output_dir.join(format!("{}_report.csv", stem));
    let mut wtr = Writer::from_path(&csv_file)?;
    wtr.write_record([
        "domain",
        "account",
        "cloud",
        "resource_type",
        "vulnerability_type",
        "takeover",
    ])?;

    for finding in report.findings().iter().sorted_by(|a, b| a.domain.cmp(&b.domain)) {
        wtr.write_record([
            finding.domain.as_str(),
            finding.account.as_str(),
            finding.cloud.as_str(),
            finding.resource_type.as_str(),
            finding.vulnerability_type.as_str(),
            finding.takeover.as_deref().unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;

    Ok(vec![json_file, csv_file])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn s3_finding() -> Finding {
        Finding {
            account: "prod".into(),
            cloud: Cloud::Aws,
            domain: "app.example.com".into(),
            resource_type: "S3".into(),
            vulnerability_type: "CNAME".into(),
            takeover: Some("x.s3-website.us-east-1.amazonaws.com".into()),
        }
    }

    fn ns_finding() -> Finding {
        Finding {
            account: "Cloudflare".into(),
            cloud: Cloud::Cloudflare,
            domain: "sub.example.com".into(),
            resource_type: "hosted zone".into(),
            vulnerability_type: "NS".into(),
            takeover: None,
        }
    }

    #[test]
    fn test_report_payload_shape() {
        let mut report = ScanReport::default();
        report.push(s3_finding());
        report.push(ns_finding());

        let value = serde_json::to_value(&report).unwrap();
        let new = value["New"].as_array().unwrap();
        assert_eq!(new.len(), 2);
        assert_eq!(new[0]["Domain"], "app.example.com");
        assert_eq!(new[0]["Cloud"], "AWS");
        assert_eq!(new[0]["ResourceType"], "S3");
        assert_eq!(new[0]["VulnerabilityType"], "CNAME");
        assert_eq!(new[0]["Takeover"], "x.s3-website.us-east-1.amazonaws.com");
        assert!(new[1].get("Takeover").is_none());
        assert_eq!(new[1]["Cloud"], "Cloudflare");
    }

    #[test]
    fn test_audit_json_is_sorted_and_stable() {
        let mut report = ScanReport::default();
        report.push(s3_finding());
        let json = report.to_audit_json().unwrap();

        let keys = ["Account", "Cloud", "Domain", "ResourceType", "Takeover", "VulnerabilityType"];
        let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(json, report.to_audit_json().unwrap());
    }

    #[test]
    fn test_empty_report_serializes() {
        let json = ScanReport::default().to_audit_json().unwrap();
        assert_eq!(json, "{\n  \"New\": []\n}");
    }

    #[test]
    fn test_write_outputs() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut report = ScanReport::default();
        report.push(ns_finding());
        report.push(s3_finding());

        let files = write_outputs(&report, dir.path(), "prod").unwrap();
        assert_eq!(files.len(), 2);

        let parsed: ScanReport =
            serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
        assert_eq!(parsed, report);

        let csv = std::fs::read_to_string(&files[1]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("app.example.com,"));
        assert!(lines[2].starts_with("sub.example.com,"));
    }
}
