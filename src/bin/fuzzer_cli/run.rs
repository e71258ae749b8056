use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use invariant_fuzzer::output::{print_invariant, print_json};
use invariant_fuzzer::settings::Settings;
use invariant_fuzzer_core::config_builder::{parse_document, resolve_corpus_dir};
use invariant_fuzzer_core::{reduce, EngineInvocation, ProcessRunner};
use invariant_fuzzer_types::property_name;

use super::require_positive;

#[derive(Parser, Debug)]
#[command(
    about = "Run the engine once against an existing harness and config",
    long_about = "Launches the fuzz engine for one harness, enforces the config timeout \
                  (plus --slack seconds) as a wall-clock deadline, and prints the reduced \
                  result. Ctrl-C kills the engine's process group."
)]
pub struct RunCmd {
    /// Harness source file
    pub harness: PathBuf,

    /// Engine config document
    #[arg(long, short = 'c')]
    pub config: PathBuf,

    /// Harness contract to fuzz, e.g. EchidnaTest_1
    #[arg(long)]
    pub contract: String,

    /// Invariant index to report the result under
    #[arg(long, default_value_t = 1)]
    pub index: usize,

    /// Seconds added to the config timeout for compilation
    #[arg(long, default_value_t = 60)]
    pub slack: u64,
}

impl RunCmd {
    pub async fn execute(&self, settings: &Settings, json_output: bool) -> Result<()> {
        let index = require_positive("index", self.index)?;
        let text = std::fs::read_to_string(&self.config)
            .with_context(|| format!("read config {}", self.config.display()))?;
        let config = parse_document(&text)
            .with_context(|| format!("parse config {}", self.config.display()))?;
        config.validate()?;

        let corpus_dir =
            resolve_corpus_dir(&config.corpus_dir, &settings.orchestrator.workspace_root)?;
        std::fs::create_dir_all(&corpus_dir)
            .with_context(|| format!("create corpus directory {}", corpus_dir.display()))?;
        let mut invocation = EngineInvocation::new(&self.harness, &self.config, &self.contract)
            .with_corpus_dir(corpus_dir)
            .with_test_mode(&config.test_mode);
        if let Some(dir) = self.harness.parent().filter(|p| !p.as_os_str().is_empty()) {
            invocation = invocation.with_working_dir(dir);
        }

        let runner = ProcessRunner::new(settings.orchestrator.engine.clone())
            .with_drain_grace(settings.orchestrator.grace_period);
        let deadline = Duration::from_secs(config.timeout + self.slack);

        let cancel = CancellationToken::new();
        let on_ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_ctrl_c.cancel();
            }
        });

        let started = Instant::now();
        let outcome = runner.run_until(&invocation, deadline, &cancel).await;
        let mut result = reduce(index, &property_name(index), &outcome);
        result.harness_contract = Some(self.contract.clone());
        result.elapsed_ms = started.elapsed().as_millis() as u64;

        if json_output {
            print_json(&result)?;
        } else {
            print_invariant(&result);
            if !result.clean && !outcome.transcript().is_empty() {
                println!();
                print!("{}", outcome.transcript());
            }
        }

        if !result.clean {
            bail!("engine run was not clean ({})", result.status);
        }
        Ok(())
    }
}
