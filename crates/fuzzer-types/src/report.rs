//! Report types for fuzz campaigns.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::outcome::RunStatus;

/// Per-property verdict read from a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed,
    Unknown,
}

impl Verdict {
    /// `Some(true)`/`Some(false)` for a decided verdict, `None` for unknown.
    pub fn as_passed(self) -> Option<bool> {
        match self {
            Verdict::Passed => Some(true),
            Verdict::Failed => Some(false),
            Verdict::Unknown => None,
        }
    }

    pub fn from_passed(passed: Option<bool>) -> Self {
        match passed {
            Some(true) => Verdict::Passed,
            Some(false) => Verdict::Failed,
            None => Verdict::Unknown,
        }
    }
}

/// Result for a single invariant's engine run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvariantResult {
    /// 1-based invariant position.
    pub index: usize,
    pub property_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invariant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harness_contract: Option<String>,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// `null` when the transcript did not decide the property.
    pub passed: Option<bool>,
    /// Classified lines, or the transcript tail when nothing was recognized.
    pub excerpt: String,
    pub failed_properties: Vec<String>,
    pub passed_properties: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<String>,
    pub elapsed_ms: u64,
    /// Whether this run counts toward campaign success.
    pub clean: bool,
    /// Full transcript; folded into the campaign's `rawOutput`.
    #[serde(default, skip_serializing)]
    pub transcript: String,
}

impl InvariantResult {
    pub fn verdict(&self) -> Verdict {
        Verdict::from_passed(self.passed)
    }
}

/// Aggregate report for one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignReport {
    /// True iff every run completed cleanly with no property violation.
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_name: Option<String>,
    /// Ordered by invariant index, never by completion time.
    pub per_invariant: Vec<InvariantResult>,
    pub coverage: String,
    pub raw_output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl CampaignReport {
    pub fn total(&self) -> usize {
        self.per_invariant.len()
    }

    pub fn failed(&self) -> usize {
        self.per_invariant
            .iter()
            .filter(|r| r.verdict() == Verdict::Failed)
            .count()
    }

    pub fn passed(&self) -> usize {
        self.per_invariant
            .iter()
            .filter(|r| r.verdict() == Verdict::Passed)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_verdict_serializes_as_null() {
        let result = InvariantResult {
            index: 1,
            property_name: "echidna_invariant_1".into(),
            invariant: None,
            harness_contract: None,
            status: RunStatus::TimedOut,
            exit_code: None,
            passed: None,
            excerpt: String::new(),
            failed_properties: vec![],
            passed_properties: vec![],
            coverage: None,
            elapsed_ms: 5,
            clean: false,
            transcript: "partial".into(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["passed"].is_null());
        assert_eq!(json["status"], "timed_out");
        assert_eq!(json["propertyName"], "echidna_invariant_1");
        assert!(json.get("transcript").is_none());
        assert_eq!(result.verdict(), Verdict::Unknown);
    }
}
