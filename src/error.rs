//! Domain error taxonomy
//!
//! Library functions return `eyre::Result`. The failures a caller may want to
//! branch on are raised as `GumdropError` values inside the report, so they
//! can be recovered with `report.downcast_ref::<GumdropError>()`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GumdropError {
    /// A cartridge file or keystore entry does not exist
    #[error("{what} not found: {}", path.display())]
    NotFound { what: &'static str, path: PathBuf },

    /// A signature was present but did not match the recomputed payload
    #[error("Signature verification failed: {reason}")]
    VerificationFailure { reason: String },

    /// Key deletion attempted without explicit confirmation
    #[error("Refusing to delete key {key_id} without confirmation")]
    DestructiveOperation { key_id: String },

    /// Key material or key id could not be used
    #[error("Invalid key: {reason}")]
    InvalidKey { reason: String },

    /// Keystore entries are never overwritten
    #[error("Key already exists: {key_id}")]
    KeyExists { key_id: String },

    #[error("Unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

impl GumdropError {
    /// Check whether an eyre report carries a `NotFound` error
    pub fn is_not_found(report: &eyre::Report) -> bool {
        matches!(report.downcast_ref::<GumdropError>(), Some(GumdropError::NotFound { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_downcast() {
        let report: eyre::Report = GumdropError::NotFound {
            what: "Cartridge",
            path: PathBuf::from("/tmp/missing.gdp"),
        }
        .into();

        assert!(GumdropError::is_not_found(&report));
        assert!(report.to_string().contains("/tmp/missing.gdp"));
    }

    #[test]
    fn test_other_errors_are_not_not_found() {
        let report: eyre::Report = GumdropError::DestructiveOperation {
            key_id: "abc".to_string(),
        }
        .into();
        assert!(!GumdropError::is_not_found(&report));

        let plain = eyre::eyre!("something else");
        assert!(!GumdropError::is_not_found(&plain));
    }
}
