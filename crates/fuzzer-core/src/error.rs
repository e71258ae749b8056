//! Campaign error taxonomy.
//!
//! | Kind | Raised by | Effect |
//! |------|-----------|--------|
//! | `input_error` | request validation | rejected before any external call |
//! | `oracle_error` | inference / synthesis | surfaced verbatim, never retried |
//! | `config_error` | scratch files, config documents | nothing is launched |
//! | `cancelled` | cancellation during synthesis | nothing is launched |
//!
//! Engine timeouts and launch failures are not errors here: they are
//! [`RunOutcome`](invariant_fuzzer_types::RunOutcome) variants, isolated per
//! invariant and folded into the campaign report.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use invariant_fuzzer_transport::OracleError;
use invariant_fuzzer_types::{InputError, InvalidConfigValue};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    InvalidValue(#[from] InvalidConfigValue),
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode config document: {0}")]
    Encode(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum CampaignError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error("harness synthesis for invariant #{index} failed: {source}")]
    Synthesis {
        index: usize,
        #[source]
        source: OracleError,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("campaign cancelled before harness synthesis finished")]
    Cancelled,
}

impl CampaignError {
    pub fn kind(&self) -> &'static str {
        match self {
            CampaignError::Input(_) => "input_error",
            CampaignError::Oracle(_) | CampaignError::Synthesis { .. } => "oracle_error",
            CampaignError::Config(_) => "config_error",
            CampaignError::Cancelled => "cancelled",
        }
    }

    fn oracle_error(&self) -> Option<&OracleError> {
        match self {
            CampaignError::Oracle(e) | CampaignError::Synthesis { source: e, .. } => Some(e),
            _ => None,
        }
    }

    /// Structured failure object for callers that report rather than propagate.
    pub fn to_failure(&self) -> CampaignFailure {
        CampaignFailure {
            success: false,
            kind: self.kind().to_string(),
            error: self.to_string(),
            upstream_status: self.oracle_error().and_then(OracleError::status),
            index: match self {
                CampaignError::Synthesis { index, .. } => Some(*index),
                CampaignError::Input(InputError::EmptyInvariant { position }) => Some(*position),
                _ => None,
            },
        }
    }
}

/// Failure as returned to the caller: never a bare transport error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignFailure {
    pub success: bool,
    pub kind: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    /// Invariant the failure is attributed to, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_status_carried_into_failure() {
        let err = CampaignError::Synthesis {
            index: 2,
            source: OracleError::Status {
                status: 429,
                body: "rate limited".into(),
            },
        };
        let failure = err.to_failure();
        assert!(!failure.success);
        assert_eq!(failure.kind, "oracle_error");
        assert_eq!(failure.upstream_status, Some(429));
        assert_eq!(failure.index, Some(2));
        assert!(failure.error.contains("rate limited"));
    }

    #[test]
    fn test_input_error_kind() {
        let failure = CampaignError::from(InputError::EmptySource).to_failure();
        assert_eq!(failure.kind, "input_error");
        assert_eq!(failure.error, "no contract source provided");
        assert_eq!(failure.upstream_status, None);
    }

    #[test]
    fn test_cancelled_kind() {
        let failure = CampaignError::Cancelled.to_failure();
        assert_eq!(failure.kind, "cancelled");
        assert_eq!(failure.index, None);
    }
}
