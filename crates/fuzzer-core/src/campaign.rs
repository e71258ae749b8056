//! Campaign orchestration.
//!
//! One campaign: validate the request, synthesize one harness per invariant,
//! persist harnesses and engine configs into a fresh workspace, run the engine
//! for each harness (bounded in parallel, serialized per corpus directory),
//! then reduce and aggregate. Results are reported by invariant index, never
//! by completion order.

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use invariant_fuzzer_transport::{ChatCompletion, OracleSettings};
use invariant_fuzzer_types::{
    CampaignConfig, CampaignReport, ConfigOverrides, ContractSource, HarnessUnit, Invariant,
    InvariantResult, RunOutcome,
};

use crate::config_builder::ConfigBuilder;
use crate::corpus_lock::CorpusLocks;
use crate::error::CampaignError;
use crate::inference;
use crate::reducer::{aggregate, reduce};
use crate::runner::{EngineCommand, EngineInvocation, ProcessRunner};
use crate::synthesizer::HarnessSynthesizer;
use crate::workspace::CampaignWorkspace;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Holds `campaigns/` and the shared corpus.
    pub workspace_root: PathBuf,
    pub engine: EngineCommand,
    /// Engine runs allowed at once.
    pub max_parallel: usize,
    /// Added to the config timeout to cover harness compilation.
    pub deadline_slack: Duration,
    /// Leave the campaign directory in place after the report is built.
    pub keep_artifacts: bool,
    /// How long to drain output pipes after the engine exits or is killed.
    pub grace_period: Duration,
    pub config_defaults: CampaignConfig,
}

impl OrchestratorSettings {
    pub const DEFAULT_DEADLINE_SLACK: Duration = Duration::from_secs(60);

    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            ..Default::default()
        }
    }

    pub fn with_engine(mut self, engine: EngineCommand) -> Self {
        self.engine = engine;
        self
    }

    /// Wall-clock budget handed to the runner for one engine invocation.
    pub fn deadline_for(&self, config: &CampaignConfig) -> Duration {
        Duration::from_secs(config.timeout) + self.deadline_slack
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            workspace_root: std::env::temp_dir().join("invariant-fuzzer"),
            engine: EngineCommand::default(),
            max_parallel: 1,
            deadline_slack: Self::DEFAULT_DEADLINE_SLACK,
            keep_artifacts: false,
            grace_period: ProcessRunner::DEFAULT_DRAIN_GRACE,
            config_defaults: CampaignConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CampaignRequest {
    pub source: String,
    pub invariants: Vec<String>,
    pub overrides: ConfigOverrides,
}

impl CampaignRequest {
    pub fn new(source: impl Into<String>, invariants: Vec<String>) -> Self {
        Self {
            source: source.into(),
            invariants,
            overrides: ConfigOverrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Files written for one invariant before anything is launched.
struct PreparedRun {
    unit: HarnessUnit,
    harness_path: PathBuf,
    config_path: PathBuf,
    config: CampaignConfig,
}

pub struct CampaignOrchestrator {
    oracle: Arc<dyn ChatCompletion>,
    inference_model: String,
    call_budget: Duration,
    synthesizer: HarnessSynthesizer,
    config_builder: ConfigBuilder,
    runner: ProcessRunner,
    corpus_locks: CorpusLocks,
    settings: OrchestratorSettings,
}

impl CampaignOrchestrator {
    pub fn new(
        oracle: Arc<dyn ChatCompletion>,
        oracle_settings: &OracleSettings,
        settings: OrchestratorSettings,
    ) -> Self {
        let synthesizer =
            HarnessSynthesizer::new(Arc::clone(&oracle), oracle_settings.synthesis_model.clone())
                .with_call_budget(oracle_settings.timeout);
        let runner =
            ProcessRunner::new(settings.engine.clone()).with_drain_grace(settings.grace_period);
        Self {
            oracle,
            inference_model: oracle_settings.inference_model.clone(),
            call_budget: oracle_settings.timeout,
            synthesizer,
            config_builder: ConfigBuilder::with_defaults(settings.config_defaults.clone()),
            runner,
            corpus_locks: CorpusLocks::new(),
            settings,
        }
    }

    pub async fn infer_invariants(&self, source: &str) -> Result<Vec<String>, CampaignError> {
        let source = ContractSource::new(source)?;
        let invariants = inference::infer_invariants(
            self.oracle.as_ref(),
            &self.inference_model,
            &source,
            self.call_budget,
        )
        .await?;
        Ok(invariants)
    }

    /// One harness per invariant, in index order. The first oracle failure
    /// aborts the rest.
    pub async fn synthesize_all(
        &self,
        source: &ContractSource,
        invariants: &[Invariant],
    ) -> Result<Vec<HarnessUnit>, CampaignError> {
        let calls = invariants.iter().map(|invariant| async move {
            self.synthesizer
                .synthesize(source, invariant)
                .await
                .map_err(|source| CampaignError::Synthesis {
                    index: invariant.position(),
                    source,
                })
        });
        futures::future::try_join_all(calls).await
    }

    pub async fn run_campaign(&self, request: CampaignRequest) -> Result<CampaignReport, CampaignError> {
        self.run_campaign_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Run a full campaign. Cancelling `cancel` during synthesis abandons the
    /// oracle calls and fails with [`CampaignError::Cancelled`]. Once engines
    /// are running it kills the current one and reports it as timed out; runs
    /// not yet started are reported the same way without being launched.
    pub async fn run_campaign_with_cancel(
        &self,
        request: CampaignRequest,
        cancel: &CancellationToken,
    ) -> Result<CampaignReport, CampaignError> {
        let started = Instant::now();

        // Everything checkable locally is checked before the first oracle call.
        let source = ContractSource::new(request.source)?;
        let invariants = Invariant::from_statements(&request.invariants)?;
        let config = self.config_builder.build(&request.overrides)?;

        info!(
            contract = %source.name(),
            invariants = invariants.len(),
            timeout_secs = config.timeout,
            "starting campaign"
        );

        let units = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(contract = %source.name(), "campaign cancelled during harness synthesis");
                return Err(CampaignError::Cancelled);
            }
            units = self.synthesize_all(&source, &invariants) => units?,
        };

        let workspace = CampaignWorkspace::create(&self.settings.workspace_root, &source)?;
        let executed = self
            .execute(&workspace, &source, &config, units, cancel)
            .await;
        if !self.settings.keep_artifacts {
            workspace.cleanup();
        }

        let mut report = executed?;
        report.contract_name = Some(source.name().to_string());
        report.workspace = self
            .settings
            .keep_artifacts
            .then(|| workspace.dir().to_path_buf());
        report.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            contract = %source.name(),
            success = report.success,
            failed = report.failed(),
            elapsed_ms = report.elapsed_ms,
            "campaign finished"
        );
        Ok(report)
    }

    async fn execute(
        &self,
        workspace: &CampaignWorkspace,
        source: &ContractSource,
        config: &CampaignConfig,
        units: Vec<HarnessUnit>,
        cancel: &CancellationToken,
    ) -> Result<CampaignReport, CampaignError> {
        workspace.write_contract(source)?;

        let mut prepared = Vec::with_capacity(units.len());
        for unit in units {
            let harness_path = workspace.write_harness(&unit)?;
            let config_path = workspace.config_path(&unit.invariant);
            let written = self.config_builder.materialize(
                config,
                &config_path,
                &self.settings.workspace_root,
            )?;
            prepared.push(PreparedRun {
                unit,
                harness_path,
                config_path,
                config: written,
            });
        }

        let deadline = self.settings.deadline_for(config);
        let launch_failed = AtomicBool::new(false);
        let launch_failed = &launch_failed;

        let results: Vec<InvariantResult> = stream::iter(prepared)
            .map(|run| self.run_one(run, workspace.dir(), deadline, cancel, launch_failed))
            .buffered(self.settings.max_parallel.max(1))
            .collect()
            .await;

        Ok(aggregate(results))
    }

    async fn run_one(
        &self,
        run: PreparedRun,
        working_dir: &Path,
        deadline: Duration,
        cancel: &CancellationToken,
        launch_failed: &AtomicBool,
    ) -> InvariantResult {
        let invariant = &run.unit.invariant;
        let started = Instant::now();

        let outcome = match self.skipped(launch_failed, cancel) {
            Some(outcome) => outcome,
            None => {
                self.run_locked(&run, working_dir, deadline, cancel, launch_failed)
                    .await
            }
        };

        let mut result = reduce(invariant.position(), &run.unit.property_name, &outcome);
        result.invariant = Some(invariant.statement().to_string());
        result.harness_contract = Some(run.unit.contract_name.clone());
        result.elapsed_ms = started.elapsed().as_millis() as u64;
        result
    }

    /// Launch under the corpus lock, re-checking for skips once it is held.
    async fn run_locked(
        &self,
        run: &PreparedRun,
        working_dir: &Path,
        deadline: Duration,
        cancel: &CancellationToken,
        launch_failed: &AtomicBool,
    ) -> RunOutcome {
        let acquired = tokio::select! {
            acquired = self.corpus_locks.acquire(&run.config.corpus_dir) => acquired,
            _ = cancel.cancelled() => {
                warn!(corpus_dir = %run.config.corpus_dir.display(), "cancelled while waiting for corpus");
                return RunOutcome::TimedOut {
                    transcript: String::new(),
                };
            }
        };
        let _corpus = match acquired {
            Ok(guard) => guard,
            Err(err) => {
                return RunOutcome::LaunchFailed {
                    cause: format!(
                        "could not lock corpus {}: {err}",
                        run.config.corpus_dir.display()
                    ),
                }
            }
        };
        // The lock wait may have outlasted an earlier launch failure.
        if let Some(outcome) = self.skipped(launch_failed, cancel) {
            return outcome;
        }

        let invocation =
            EngineInvocation::new(&run.harness_path, &run.config_path, &run.unit.contract_name)
                .with_corpus_dir(&run.config.corpus_dir)
                .with_test_mode(&run.config.test_mode)
                .with_working_dir(working_dir);
        let outcome = self
            .runner
            .run_until(&invocation, deadline, &cancel.child_token())
            .await;
        if matches!(outcome, RunOutcome::LaunchFailed { .. }) {
            launch_failed.store(true, Ordering::SeqCst);
        }
        outcome
    }

    fn skipped(&self, launch_failed: &AtomicBool, cancel: &CancellationToken) -> Option<RunOutcome> {
        if launch_failed.load(Ordering::SeqCst) {
            return Some(RunOutcome::LaunchFailed {
                cause: "skipped: engine could not be launched for an earlier invariant".to_string(),
            });
        }
        if cancel.is_cancelled() {
            warn!("campaign cancelled before run started");
            return Some(RunOutcome::TimedOut {
                transcript: String::new(),
            });
        }
        None
    }
}
