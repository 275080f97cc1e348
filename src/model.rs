//! Inventory types supplied fresh on every run.

use serde::{Deserialize, Serialize};

use crate::cloud::Cloud;
use crate::errors::{Result, ScanError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub cloud: Cloud,
}

impl Account {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            cloud: Cloud::for_account_name(&name),
            name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedZone {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Ns,
    Alias,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordTarget {
    Alias {
        #[serde(rename = "aliasTarget")]
        dns_name: String,
    },
    Values { values: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    #[serde(flatten)]
    pub target: RecordTarget,
}

impl RecordSet {
    pub fn cname(name: &str, value: &str) -> Self {
        Self::with_values(name, RecordType::Cname, &[value])
    }

    pub fn ns(name: &str, nameservers: &[&str]) -> Self {
        Self::with_values(name, RecordType::Ns, nameservers)
    }

    pub fn with_values(name: &str, record_type: RecordType, values: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            record_type,
            target: RecordTarget::Values {
                values: values.iter().map(|v| v.to_string()).collect(),
            },
        }
    }

    pub fn alias(name: &str, record_type: RecordType, dns_name: &str) -> Self {
        Self {
            name: name.to_string(),
            record_type,
            target: RecordTarget::Alias {
                dns_name: dns_name.to_string(),
            },
        }
    }

    pub fn alias_target(&self) -> Option<&str> {
        match &self.target {
            RecordTarget::Alias { dns_name } => Some(dns_name),
            RecordTarget::Values { .. } => None,
        }
    }

    pub fn values(&self) -> &[String] {
        match &self.target {
            RecordTarget::Values { values } => values,
            RecordTarget::Alias { .. } => &[],
        }
    }

    /// The value a CNAME classifier inspects: the first resource record.
    pub fn first_value(&self) -> Option<&str> {
        self.values().first().map(String::as_str)
    }

    pub fn is_alias(&self) -> bool {
        self.alias_target().is_some()
    }

    /// CNAME and NS records without resource records cannot be classified.
    pub fn validate(&self) -> Result<()> {
        let needs_values = matches!(self.record_type, RecordType::Cname | RecordType::Ns);
        if needs_values && !self.is_alias() && self.values().is_empty() {
            return Err(ScanError::MalformedRecord {
                name: self.name.clone(),
                reason: "record has no resource record values".to_string(),
            });
        }
        if self.name.trim().is_empty() {
            return Err(ScanError::MalformedRecord {
                name: self.name.clone(),
                reason: "record has an empty name".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredDomain {
    pub name: String,
}

/// Lowercases, drops the trailing root dot and decodes the Route 53 `\052`
/// escape for wildcard labels.
pub fn normalize_domain(name: &str) -> String {
    name.trim()
        .trim_end_matches('.')
        .replace("\\052", "*")
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_set_json_shapes() {
        let alias: RecordSet = serde_json::from_str(
            r#"{"name":"www.example.com.","type":"A","aliasTarget":"d111.cloudfront.net."}"#,
        )
        .unwrap();
        assert_eq!(alias.record_type, RecordType::A);
        assert_eq!(alias.alias_target(), Some("d111.cloudfront.net."));

        let cname: RecordSet = serde_json::from_str(
            r#"{"name":"app.example.com.","type":"CNAME","values":["x.azurewebsites.net"]}"#,
        )
        .unwrap();
        assert_eq!(cname.record_type, RecordType::Cname);
        assert_eq!(cname.first_value(), Some("x.azurewebsites.net"));

        let mx: RecordSet =
            serde_json::from_str(r#"{"name":"example.com.","type":"MX","values":["10 mx"]}"#)
                .unwrap();
        assert_eq!(mx.record_type, RecordType::Other);
    }

    #[test]
    fn test_validate_rejects_empty_cname() {
        let record = RecordSet::with_values("app.example.com", RecordType::Cname, &[]);
        assert!(matches!(
            record.validate(),
            Err(ScanError::MalformedRecord { .. })
        ));
        assert!(RecordSet::cname("app.example.com", "x.example.net")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("App.Example.COM."), "app.example.com");
        assert_eq!(normalize_domain("\\052.example.com."), "*.example.com");
    }

    #[test]
    fn test_account_cloud_is_derived() {
        assert_eq!(Account::new("1", "Cloudflare").cloud, Cloud::Cloudflare);
        assert_eq!(Account::new("2", "payments").cloud, Cloud::Aws);
    }
}
