//! Transcript reduction.
//!
//! The engine's text report is meant for humans and its format is not
//! stable, so classification is a line-oriented substring match and nothing
//! more. Everything here is a pure function of its inputs: no process
//! handling, no I/O.

use serde::{Deserialize, Serialize};

use invariant_fuzzer_types::{CampaignReport, InvariantResult, RunOutcome, Verdict};

/// Lines kept from the end of an unrecognized transcript.
pub const EXCERPT_TAIL_LINES: usize = 20;

/// Substrings that mark a line as failed, passed, or a coverage summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierTokens {
    pub failed: String,
    pub passed: String,
    pub coverage: String,
}

impl Default for ClassifierTokens {
    fn default() -> Self {
        Self {
            failed: "failed!".to_string(),
            passed: "passed!".to_string(),
            coverage: "coverage:".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSummary {
    pub failed: Vec<String>,
    pub passed: Vec<String>,
    /// Last coverage line seen.
    pub coverage: Option<String>,
    /// Failed and passed lines in transcript order.
    pub excerpt: Vec<String>,
}

pub fn classify(transcript: &str) -> TranscriptSummary {
    classify_with(transcript, &ClassifierTokens::default())
}

pub fn classify_with(transcript: &str, tokens: &ClassifierTokens) -> TranscriptSummary {
    let mut summary = TranscriptSummary::default();
    for line in transcript.lines() {
        let line = line.trim();
        let mut property_line = false;
        if line.contains(tokens.failed.as_str()) {
            summary.failed.push(line.to_string());
            property_line = true;
        }
        if line.contains(tokens.passed.as_str()) {
            summary.passed.push(line.to_string());
            property_line = true;
        }
        if line.contains(tokens.coverage.as_str()) {
            summary.coverage = Some(line.to_string());
        }
        if property_line {
            summary.excerpt.push(line.to_string());
        }
    }
    summary
}

fn tail(transcript: &str, lines: usize) -> String {
    let all: Vec<&str> = transcript.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

pub fn reduce(index: usize, property_name: &str, outcome: &RunOutcome) -> InvariantResult {
    reduce_with(index, property_name, outcome, &ClassifierTokens::default())
}

/// Reduce one run to an invariant-level result.
///
/// - any failed line: `failed`
/// - otherwise any passed line on a completed run: `passed`
/// - otherwise `unknown`
///
/// The run is clean only if it completed, reported no failure, and either
/// reported a pass or exited 0.
pub fn reduce_with(
    index: usize,
    property_name: &str,
    outcome: &RunOutcome,
    tokens: &ClassifierTokens,
) -> InvariantResult {
    let transcript = outcome.transcript();
    let summary = classify_with(transcript, tokens);

    let verdict = if !summary.failed.is_empty() {
        Verdict::Failed
    } else if !summary.passed.is_empty() && matches!(outcome, RunOutcome::Completed { .. }) {
        Verdict::Passed
    } else {
        Verdict::Unknown
    };

    let clean = match outcome {
        RunOutcome::Completed { exit_code, .. } => {
            summary.failed.is_empty() && (!summary.passed.is_empty() || *exit_code == Some(0))
        }
        RunOutcome::TimedOut { .. } | RunOutcome::LaunchFailed { .. } => false,
    };

    let excerpt = match outcome {
        RunOutcome::LaunchFailed { cause } => cause.clone(),
        _ if !summary.excerpt.is_empty() => summary.excerpt.join("\n"),
        _ => tail(transcript, EXCERPT_TAIL_LINES),
    };

    InvariantResult {
        index,
        property_name: property_name.to_string(),
        invariant: None,
        harness_contract: None,
        status: outcome.status(),
        exit_code: outcome.exit_code(),
        passed: verdict.as_passed(),
        excerpt,
        failed_properties: summary.failed,
        passed_properties: summary.passed,
        coverage: summary.coverage,
        elapsed_ms: 0,
        clean,
        transcript: transcript.to_string(),
    }
}

/// Fold per-invariant results into the campaign report, ordered by index.
pub fn aggregate(mut results: Vec<InvariantResult>) -> CampaignReport {
    results.sort_by_key(|r| r.index);

    let success = results.iter().all(|r| r.clean);
    let coverage = results
        .iter()
        .filter_map(|r| r.coverage.as_deref())
        .collect::<Vec<_>>()
        .join("\n");

    let mut raw_output = String::new();
    for r in &results {
        if !raw_output.is_empty() && !raw_output.ends_with('\n') {
            raw_output.push('\n');
        }
        raw_output.push_str(&r.transcript);
    }

    CampaignReport {
        success,
        contract_name: None,
        per_invariant: results,
        coverage,
        raw_output,
        workspace: None,
        elapsed_ms: 0,
    }
}
