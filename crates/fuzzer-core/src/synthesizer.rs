//! Harness synthesis.
//!
//! One oracle call per invariant. The generated text is treated as opaque:
//! beyond unwrapping a Markdown code fence nothing about it is checked, and
//! the engine's compile step is the first thing to look at it.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use invariant_fuzzer_transport::{ChatCompletion, ChatRequest, OracleError};
use invariant_fuzzer_types::{ContractSource, HarnessUnit, Invariant};

use crate::workspace::CONTRACT_FILE;

pub const SYSTEM_PROMPT: &str =
    "You are an expert Solidity test generator specializing in Echidna property-based fuzzing tests.";

pub const SYNTHESIS_TEMPERATURE: f64 = 0.2;

/// User prompt for one invariant: source, invariant, and the exact template
/// the harness must follow (import, constructor initialization, and a
/// boolean property function named from the invariant position).
pub fn harness_prompt(source: &ContractSource, invariant: &Invariant) -> String {
    let base = source.name();
    let harness = invariant.harness_contract();
    let property = invariant.property_name();
    let statement = invariant.statement();

    format!(
        r#"Generate a Solidity test contract for Echidna fuzzing that follows these exact specifications:

Contract to test:
{code}

Invariant to verify:
{statement}

Requirements:
1. Use this exact format:
// SPDX-License-Identifier: MIT
pragma solidity ^0.8.0;

import "./{file}";

contract {harness} is {base} {{
    constructor() {base}() {{
        // Initialize state here with meaningful values
        // Set up any required initial conditions
    }}

    function {property}() public returns (bool) {{
        // Testing invariant: {statement}
        // IMPLEMENT THE FOLLOWING LOGIC:
        // 1. Set up any pre-conditions needed
        // 2. Execute the relevant contract operations
        // 3. Check the invariant condition
        // 4. Return true if the invariant holds, false if violated
    }}
}}
2. The property function must be named exactly {property}, take no arguments and return bool.
3. Respond with the Solidity source only."#,
        code = source.text(),
        file = CONTRACT_FILE,
    )
}

/// Unwrap the first Markdown code fence, if the completion has one.
pub fn strip_code_fence(text: &str) -> String {
    let Some(open) = text.find("```") else {
        return text.to_string();
    };
    let after_open = &text[open + 3..];
    // Skip the info string (```solidity).
    let Some(body_start) = after_open.find('\n') else {
        return text.to_string();
    };
    let body = &after_open[body_start + 1..];
    let body = match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    };
    format!("{}\n", body.trim_end())
}

/// Builds harness units through the inference oracle.
#[derive(Clone)]
pub struct HarnessSynthesizer {
    oracle: Arc<dyn ChatCompletion>,
    model: String,
    call_budget: Duration,
}

impl HarnessSynthesizer {
    pub const DEFAULT_CALL_BUDGET: Duration = Duration::from_secs(30);

    pub fn new(oracle: Arc<dyn ChatCompletion>, model: impl Into<String>) -> Self {
        Self {
            oracle,
            model: model.into(),
            call_budget: Self::DEFAULT_CALL_BUDGET,
        }
    }

    pub fn with_call_budget(mut self, budget: Duration) -> Self {
        self.call_budget = budget;
        self
    }

    pub fn request(&self, source: &ContractSource, invariant: &Invariant) -> ChatRequest {
        ChatRequest::new(self.model.clone(), SYNTHESIS_TEMPERATURE)
            .system(SYSTEM_PROMPT)
            .user(harness_prompt(source, invariant))
    }

    /// Generate the harness for one invariant. Failures are not retried.
    pub async fn synthesize(
        &self,
        source: &ContractSource,
        invariant: &Invariant,
    ) -> Result<HarnessUnit, OracleError> {
        let request = self.request(source, invariant);
        debug!(
            index = invariant.position(),
            property = %invariant.property_name(),
            "requesting harness"
        );

        let response = tokio::time::timeout(self.call_budget, self.oracle.complete(&request))
            .await
            .map_err(|_| {
                OracleError::Unavailable(format!(
                    "no response within {}s",
                    self.call_budget.as_secs()
                ))
            })??;

        let text = response.first_content()?;
        Ok(HarnessUnit::new(invariant.clone(), strip_code_fence(text)))
    }
}
