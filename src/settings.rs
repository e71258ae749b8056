//! Environment-derived settings for the CLI.
//!
//! This is the only place the process environment is read. Library crates
//! receive plain [`OracleSettings`] / [`OrchestratorSettings`] values.

use std::path::PathBuf;

use invariant_fuzzer_core::{EngineCommand, OrchestratorSettings};
use invariant_fuzzer_transport::OracleSettings;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const ORACLE_URL_ENV: &str = "INVARIANT_FUZZER_ORACLE_URL";
pub const ENGINE_ENV: &str = "INVARIANT_FUZZER_ENGINE";
pub const HOME_ENV: &str = "INVARIANT_FUZZER_HOME";

/// `INVARIANT_FUZZER_HOME`, else `~/.invariant-fuzzer`.
fn workspace_root_from(lookup: &dyn Fn(&str) -> Option<String>) -> PathBuf {
    lookup(HOME_ENV)
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".invariant-fuzzer")
        })
}

/// Split an engine command line such as `docker run --rm echidna` into the
/// program and the arguments placed before the harness path.
pub fn parse_engine(command: &str) -> Option<EngineCommand> {
    let mut parts = command.split_whitespace();
    let program = parts.next()?;
    Some(EngineCommand::new(program).with_prefix_args(parts))
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub oracle: OracleSettings,
    pub orchestrator: OrchestratorSettings,
}

impl Settings {
    /// Load `.env` (if any), then read the environment.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenv::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let mut oracle = OracleSettings::default();
        oracle.api_key = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty());
        if let Some(url) = lookup(ORACLE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            oracle.endpoint = url;
        }

        let mut orchestrator = OrchestratorSettings::new(workspace_root_from(lookup));
        if let Some(engine) = lookup(ENGINE_ENV).as_deref().and_then(parse_engine) {
            orchestrator.engine = engine;
        }

        Self {
            oracle,
            orchestrator,
        }
    }

    /// Apply command-line overrides on top of the environment.
    pub fn with_overrides(mut self, workspace: Option<PathBuf>, engine: Option<&str>) -> Self {
        if let Some(root) = workspace {
            self.orchestrator.workspace_root = root;
        }
        if let Some(engine) = engine.and_then(parse_engine) {
            self.orchestrator.engine = engine;
        }
        self
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
