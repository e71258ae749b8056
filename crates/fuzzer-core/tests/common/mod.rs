#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use invariant_fuzzer_core::EngineCommand;
use invariant_fuzzer_transport::{ChatCompletion, ChatRequest, ChatResponse, OracleError};

/// Write a shell script engine stub and return a command that runs it via
/// `sh`, so the script never needs the executable bit.
pub fn stub_engine(dir: &Path, name: &str, body: &str) -> EngineCommand {
    let script = dir.join(name);
    std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
    EngineCommand::new("sh").with_prefix_args([script.display().to_string()])
}

pub fn missing_engine() -> EngineCommand {
    EngineCommand::new(PathBuf::from("/nonexistent/bin/echidna-test-stub"))
}

/// Chat double that counts calls and replies with a harness for whichever
/// invariant the prompt asks about.
pub struct CountingOracle {
    pub calls: AtomicUsize,
    pub fail_with: Option<OracleError>,
    pub delay: Option<Duration>,
}

impl CountingOracle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_with: None,
            delay: None,
        })
    }

    /// Answers only after `delay`.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_with: None,
            delay: Some(delay),
        })
    }

    pub fn failing(err: OracleError) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_with: Some(err),
            delay: None,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatCompletion for CountingOracle {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let harness = prompt
            .lines()
            .find(|l| l.starts_with("contract EchidnaTest_"))
            .unwrap_or("contract EchidnaTest_0 {")
            .to_string();
        Ok(ChatResponse::with_content(format!(
            "```solidity\n{harness}\n}}\n```"
        )))
    }
}

pub const VAULT: &str = "pragma solidity ^0.8.0;\ncontract Vault {\n    uint256 public total;\n}\n";
