//! Engine run parameters.
//!
//! [`CampaignConfig`] serializes to the engine's YAML config document using
//! the engine's own key names (`testLimit`, `seqLen`, `cryticArgs`, ...).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct InvalidConfigValue {
    pub field: &'static str,
    pub reason: String,
}

/// Parameters for one engine run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CampaignConfig {
    pub corpus_dir: PathBuf,
    pub test_mode: String,
    pub test_limit: u64,
    /// Seconds.
    pub timeout: u64,
    pub seq_len: u64,
    pub shrink_limit: u64,
    pub coverage: bool,
    pub format: String,
    pub crytic_args: Vec<String>,
    pub filter_functions: Vec<String>,
}

impl CampaignConfig {
    pub const DEFAULT_TEST_LIMIT: u64 = 50_000;
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
    pub const DEFAULT_SEQ_LEN: u64 = 100;
    pub const DEFAULT_SHRINK_LIMIT: u64 = 1_000;

    /// Check the numeric invariants: every budget must be positive.
    pub fn validate(&self) -> Result<(), InvalidConfigValue> {
        let positive = [
            ("testLimit", self.test_limit),
            ("timeout", self.timeout),
            ("seqLen", self.seq_len),
            ("shrinkLimit", self.shrink_limit),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(InvalidConfigValue {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        if self.corpus_dir.as_os_str().is_empty() {
            return Err(InvalidConfigValue {
                field: "corpusDir",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Merge overrides field by field; unspecified fields keep their value.
    pub fn merged(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(v) = &overrides.corpus_dir {
            self.corpus_dir = v.clone();
        }
        if let Some(v) = &overrides.test_mode {
            self.test_mode = v.clone();
        }
        if let Some(v) = overrides.test_limit {
            self.test_limit = v;
        }
        if let Some(v) = overrides.timeout {
            self.timeout = v;
        }
        if let Some(v) = overrides.seq_len {
            self.seq_len = v;
        }
        if let Some(v) = overrides.shrink_limit {
            self.shrink_limit = v;
        }
        if let Some(v) = overrides.coverage {
            self.coverage = v;
        }
        if let Some(v) = &overrides.format {
            self.format = v.clone();
        }
        if let Some(v) = &overrides.crytic_args {
            self.crytic_args = v.clone();
        }
        if let Some(v) = &overrides.filter_functions {
            self.filter_functions = v.clone();
        }
        self
    }
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from("corpus"),
            test_mode: "property".to_string(),
            test_limit: Self::DEFAULT_TEST_LIMIT,
            timeout: Self::DEFAULT_TIMEOUT_SECS,
            seq_len: Self::DEFAULT_SEQ_LEN,
            shrink_limit: Self::DEFAULT_SHRINK_LIMIT,
            coverage: true,
            format: "text".to_string(),
            crytic_args: Vec::new(),
            filter_functions: Vec::new(),
        }
    }
}

/// Caller-supplied overrides. `None` keeps the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigOverrides {
    pub corpus_dir: Option<PathBuf>,
    pub test_mode: Option<String>,
    pub test_limit: Option<u64>,
    pub timeout: Option<u64>,
    pub seq_len: Option<u64>,
    pub shrink_limit: Option<u64>,
    pub coverage: Option<bool>,
    pub format: Option<String>,
    pub crytic_args: Option<Vec<String>>,
    pub filter_functions: Option<Vec<String>>,
}
