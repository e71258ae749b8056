//! Candidate invariant inference.

use std::time::Duration;
use tracing::debug;

use invariant_fuzzer_transport::{ChatCompletion, ChatRequest, OracleError};
use invariant_fuzzer_types::ContractSource;

pub const INFERENCE_TEMPERATURE: f64 = 0.7;

pub fn inference_prompt(source: &ContractSource) -> String {
    format!(
        "Analyze this Solidity smart contract and list potential invariants. \
         Return each invariant on a new line:\n\n{}",
        source.text()
    )
}

/// Split a completion into invariant statements, one per non-blank line,
/// with a leading `- ` or `* ` bullet removed.
pub fn parse_invariant_lines(content: &str) -> Vec<String> {
    content
        .trim()
        .lines()
        .map(|line| {
            let line = line.trim();
            let line = line.strip_prefix("- ").unwrap_or(line);
            line.strip_prefix("* ").unwrap_or(line).trim().to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// Ask the oracle for candidate invariants, in the order it lists them.
pub async fn infer_invariants(
    oracle: &dyn ChatCompletion,
    model: &str,
    source: &ContractSource,
    call_budget: Duration,
) -> Result<Vec<String>, OracleError> {
    let request = ChatRequest::new(model, INFERENCE_TEMPERATURE).user(inference_prompt(source));

    let response = tokio::time::timeout(call_budget, oracle.complete(&request))
        .await
        .map_err(|_| {
            OracleError::Unavailable(format!("no response within {}s", call_budget.as_secs()))
        })??;

    let invariants = parse_invariant_lines(response.first_content()?);
    debug!(
        contract = %source.name(),
        count = invariants.len(),
        "inferred invariants"
    );
    Ok(invariants)
}
