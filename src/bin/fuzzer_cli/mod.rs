//! CLI subcommand implementations for invariant-fuzzer

pub mod campaign;
pub mod config;
pub mod doctor;
pub mod infer;
pub mod reduce;
pub mod run;
pub mod synthesize;

use anyhow::{anyhow, bail, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use invariant_fuzzer::output::{print_json, read_input};
use invariant_fuzzer::settings::Settings;
use invariant_fuzzer_core::inference::parse_invariant_lines;
use invariant_fuzzer_core::{CampaignError, CampaignOrchestrator};
use invariant_fuzzer_transport::{ChatCompletion, OpenAiClient};
use invariant_fuzzer_types::ConfigOverrides;

/// Engine config overrides shared by `config`, `run` and `campaign`.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Corpus directory (relative paths are taken against the workspace root)
    #[arg(long)]
    pub corpus_dir: Option<PathBuf>,

    /// Engine test mode
    #[arg(long)]
    pub test_mode: Option<String>,

    /// Number of sequences to execute
    #[arg(long)]
    pub test_limit: Option<u64>,

    /// Campaign timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Calls per sequence
    #[arg(long)]
    pub seq_len: Option<u64>,

    /// Shrinking attempts
    #[arg(long)]
    pub shrink_limit: Option<u64>,

    /// Enable or disable coverage collection
    #[arg(long)]
    pub coverage: Option<bool>,

    /// Extra arguments passed through to the compilation framework
    #[arg(long = "crytic-arg", allow_hyphen_values = true)]
    pub crytic_args: Vec<String>,

    /// Only fuzz these functions
    #[arg(long = "filter-function")]
    pub filter_functions: Vec<String>,
}

impl ConfigArgs {
    pub fn to_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            corpus_dir: self.corpus_dir.clone(),
            test_mode: self.test_mode.clone(),
            test_limit: self.test_limit,
            timeout: self.timeout,
            seq_len: self.seq_len,
            shrink_limit: self.shrink_limit,
            coverage: self.coverage,
            format: None,
            crytic_args: (!self.crytic_args.is_empty()).then(|| self.crytic_args.clone()),
            filter_functions: (!self.filter_functions.is_empty())
                .then(|| self.filter_functions.clone()),
        }
    }
}

/// Where invariant statements come from.
#[derive(Args, Debug, Clone, Default)]
pub struct InvariantArgs {
    /// Invariant statement (repeatable)
    #[arg(long = "invariant", short = 'i')]
    pub invariants: Vec<String>,

    /// File with one invariant per line ("-" for stdin)
    #[arg(long)]
    pub invariants_file: Option<PathBuf>,
}

impl InvariantArgs {
    pub fn has_any(&self) -> bool {
        !self.invariants.is_empty() || self.invariants_file.is_some()
    }

    pub fn load(&self) -> Result<Vec<String>> {
        let mut invariants = self.invariants.clone();
        if let Some(path) = &self.invariants_file {
            invariants.extend(parse_invariant_lines(&read_input(path)?));
        }
        Ok(invariants)
    }
}

pub fn oracle_client(settings: &Settings) -> Arc<dyn ChatCompletion> {
    if settings.oracle.api_key.is_none() {
        warn!("no oracle api key configured; set OPENAI_API_KEY");
    }
    Arc::new(OpenAiClient::new(&settings.oracle))
}

pub fn orchestrator(settings: &Settings) -> CampaignOrchestrator {
    CampaignOrchestrator::new(
        oracle_client(settings),
        &settings.oracle,
        settings.orchestrator.clone(),
    )
}

pub fn require_positive(name: &str, value: usize) -> Result<usize> {
    if value == 0 {
        bail!("--{name} must be at least 1");
    }
    Ok(value)
}

/// Print the structured failure under `--json`, then fail with `what`.
pub fn report_failure<T>(err: CampaignError, json_output: bool, what: &str) -> Result<T> {
    let failure = err.to_failure();
    if json_output {
        print_json(&failure)?;
    }
    Err(anyhow!(err).context(format!("{what} ({})", failure.kind)))
}
