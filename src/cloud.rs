use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::CLOUDFLARE_ACCOUNT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cloud {
    #[serde(rename = "AWS")]
    Aws,
    Cloudflare,
}

impl Cloud {
    /// Cloudflare zones are inventoried under a single pseudo-account of that
    /// name. Everything else is Route 53.
    pub fn for_account_name(name: &str) -> Self {
        if name == CLOUDFLARE_ACCOUNT {
            Cloud::Cloudflare
        } else {
            Cloud::Aws
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Cloud::Aws => "AWS",
            Cloud::Cloudflare => "Cloudflare",
        }
    }
}

impl fmt::Display for Cloud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_from_account_name() {
        assert_eq!(Cloud::for_account_name("Cloudflare"), Cloud::Cloudflare);
        assert_eq!(Cloud::for_account_name("prod-web"), Cloud::Aws);
        // exact match only
        assert_eq!(Cloud::for_account_name("cloudflare"), Cloud::Aws);
    }

    #[test]
    fn test_cloud_serializes_as_display_name() {
        assert_eq!(serde_json::to_string(&Cloud::Aws).unwrap(), "\"AWS\"");
        assert_eq!(
            serde_json::to_string(&Cloud::Cloudflare).unwrap(),
            "\"Cloudflare\""
        );
    }
}
