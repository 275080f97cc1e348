use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Error, Debug)]
pub enum ScanError {
    /// Listing zones, records or domains failed. Aborts the run.
    #[error("Inventory error during {operation}: {reason}")]
    Inventory { operation: String, reason: String },

    /// A probe could not complete. Treated as "not confirmed".
    #[error("Probe failed for {target}: {reason}")]
    Probe { target: String, reason: String },

    #[error("Finding store error for {domain}: {reason}")]
    Store { domain: String, reason: String },

    #[error("Notifier error: {0}")]
    Notify(String),

    #[error("Malformed record set {name}: {reason}")]
    MalformedRecord { name: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ScanError {
    pub fn inventory(operation: impl Into<String>, reason: impl ToString) -> Self {
        ScanError::Inventory {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    pub fn probe(target: impl Into<String>, reason: impl ToString) -> Self {
        ScanError::Probe {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    pub fn store(domain: impl Into<String>, reason: impl ToString) -> Self {
        ScanError::Store {
            domain: domain.into(),
            reason: reason.to_string(),
        }
    }
}
