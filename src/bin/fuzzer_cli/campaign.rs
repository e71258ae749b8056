use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

use invariant_fuzzer::output::{print_json, print_report, read_input, write_json};
use invariant_fuzzer::settings::Settings;
use invariant_fuzzer_core::{CampaignError, CampaignRequest};

use super::{require_positive, ConfigArgs, InvariantArgs};

#[derive(Parser, Debug)]
#[command(
    about = "Run a full fuzz campaign for a contract",
    long_about = "Synthesizes one Echidna harness per invariant through the oracle, runs \
                  the engine against each harness under the config timeout, and reports \
                  a per-invariant verdict in invariant order.\n\n\
                  Without --invariant/--invariants-file, pass --infer to have the oracle \
                  propose the invariants first."
)]
pub struct CampaignCmd {
    /// Solidity source file ("-" for stdin)
    #[arg(long, short = 's')]
    pub source: PathBuf,

    #[command(flatten)]
    pub invariants: InvariantArgs,

    /// Ask the oracle for invariants when none are given
    #[arg(long)]
    pub infer: bool,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Engine runs allowed at once
    #[arg(long, default_value_t = 1)]
    pub max_parallel: usize,

    /// Keep the campaign directory (harnesses, configs) after the run
    #[arg(long)]
    pub keep_artifacts: bool,

    /// Also write the report JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl CampaignCmd {
    pub async fn execute(&self, settings: &Settings, json_output: bool) -> Result<()> {
        let mut settings = settings.clone();
        settings.orchestrator.max_parallel = require_positive("max-parallel", self.max_parallel)?;
        settings.orchestrator.keep_artifacts = self.keep_artifacts;
        let orchestrator = super::orchestrator(&settings);

        let source = read_input(&self.source)?;
        let mut invariants = self.invariants.load()?;
        if invariants.is_empty() && self.infer {
            invariants = match orchestrator.infer_invariants(&source).await {
                Ok(found) => found,
                Err(err) => return self.fail(err, json_output),
            };
            info!(count = invariants.len(), "using inferred invariants");
        }

        let request = CampaignRequest::new(source, invariants)
            .with_overrides(self.config.to_overrides());

        let cancel = CancellationToken::new();
        let on_ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_ctrl_c.cancel();
            }
        });

        let report = match orchestrator.run_campaign_with_cancel(request, &cancel).await {
            Ok(report) => report,
            Err(err) => return self.fail(err, json_output),
        };

        if let Some(path) = &self.report {
            write_json(path, &report)?;
        }
        if json_output {
            print_json(&report)?;
        } else {
            print_report(&report);
        }

        if !report.success {
            bail!(
                "campaign failed: {} of {} invariants not clean",
                report.per_invariant.iter().filter(|r| !r.clean).count(),
                report.total()
            );
        }
        Ok(())
    }

    fn fail(&self, err: CampaignError, json_output: bool) -> Result<()> {
        let failure = err.to_failure();
        if let Some(path) = &self.report {
            write_json(path, &failure)?;
        }
        super::report_failure(err, json_output, "campaign aborted")
    }
}
