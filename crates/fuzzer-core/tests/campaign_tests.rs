#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use common::{missing_engine, stub_engine, CountingOracle, VAULT};
use invariant_fuzzer_core::{
    CampaignError, CampaignOrchestrator, CampaignRequest, EngineCommand, OrchestratorSettings,
};
use invariant_fuzzer_transport::{OracleError, OracleSettings};
use invariant_fuzzer_types::{ConfigOverrides, InputError, RunStatus};

fn settings(root: &std::path::Path, engine: EngineCommand) -> OrchestratorSettings {
    OrchestratorSettings {
        deadline_slack: Duration::from_secs(5),
        grace_period: Duration::from_millis(500),
        ..OrchestratorSettings::new(root).with_engine(engine)
    }
}

fn orchestrator(oracle: Arc<CountingOracle>, settings: OrchestratorSettings) -> CampaignOrchestrator {
    CampaignOrchestrator::new(oracle, &OracleSettings::default(), settings)
}

fn short_timeout() -> ConfigOverrides {
    ConfigOverrides {
        timeout: Some(5),
        ..Default::default()
    }
}

/// Engine stub that reports the property named after its `--contract` filter.
const PASSING_ENGINE: &str = r#"contract=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--contract" ]; then contract="$2"; fi
  shift
done
n="${contract#EchidnaTest_}"
echo "echidna_invariant_${n}: passed! 🎉"
echo "Unique instructions: 42"
echo "coverage: ${n}0%"
"#;

#[tokio::test]
async fn test_empty_source_makes_no_oracle_calls() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = CountingOracle::new();
    let orch = orchestrator(Arc::clone(&oracle), settings(dir.path(), missing_engine()));

    let err = orch
        .run_campaign(CampaignRequest::new("   \n", vec!["x".into()]))
        .await
        .unwrap_err();
    assert!(matches!(err, CampaignError::Input(InputError::EmptySource)));
    assert_eq!(err.to_failure().kind, "input_error");
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn test_empty_invariant_list_makes_no_oracle_calls() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = CountingOracle::new();
    let orch = orchestrator(Arc::clone(&oracle), settings(dir.path(), missing_engine()));

    let err = orch
        .run_campaign(CampaignRequest::new(VAULT, Vec::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, CampaignError::Input(InputError::NoInvariants)));
    assert_eq!(oracle.calls(), 0);
    // Nothing was written either.
    assert!(!dir.path().join("campaigns").exists());
}

#[tokio::test]
async fn test_results_follow_invariant_order() {
    let dir = tempfile::tempdir().unwrap();
    let engine = stub_engine(dir.path(), "engine.sh", PASSING_ENGINE);
    let oracle = CountingOracle::new();
    let mut s = settings(dir.path(), engine);
    s.max_parallel = 3;
    let orch = orchestrator(Arc::clone(&oracle), s);

    let invariants = vec![
        "total never decreases".to_string(),
        "owner is never zero".to_string(),
        "supply is capped".to_string(),
    ];
    let report = orch
        .run_campaign(CampaignRequest::new(VAULT, invariants.clone()).with_overrides(short_timeout()))
        .await
        .unwrap();

    assert_eq!(oracle.calls(), 3);
    assert!(report.success, "{}", report.raw_output);
    assert_eq!(report.contract_name.as_deref(), Some("Vault"));
    assert_eq!(report.per_invariant.len(), 3);
    for (i, result) in report.per_invariant.iter().enumerate() {
        assert_eq!(result.index, i + 1);
        assert_eq!(result.property_name, format!("echidna_invariant_{}", i + 1));
        assert_eq!(result.invariant.as_deref(), Some(invariants[i].as_str()));
        assert_eq!(result.harness_contract.as_deref(), Some(format!("EchidnaTest_{}", i + 1).as_str()));
        assert_eq!(result.passed, Some(true));
        assert_eq!(result.status, RunStatus::Completed);
    }
    assert_eq!(report.coverage, "coverage: 10%\ncoverage: 20%\ncoverage: 30%");

    // Scratch directory removed, shared corpus kept.
    let campaigns: Vec<_> = std::fs::read_dir(dir.path().join("campaigns"))
        .unwrap()
        .collect();
    assert!(campaigns.is_empty());
    assert!(dir.path().join("corpus").is_dir());
    assert!(report.workspace.is_none());
}

#[tokio::test]
async fn test_failed_property_fails_campaign() {
    let dir = tempfile::tempdir().unwrap();
    let engine = stub_engine(
        dir.path(),
        "engine.sh",
        "echo 'echidna_invariant_1: failed!💥'\necho '  Call sequence:'\necho '    withdraw(1)'\nexit 1",
    );
    let orch = orchestrator(CountingOracle::new(), settings(dir.path(), engine));

    let report = orch
        .run_campaign(
            CampaignRequest::new(VAULT, vec!["total never decreases".into()])
                .with_overrides(short_timeout()),
        )
        .await
        .unwrap();

    assert!(!report.success);
    assert_eq!(report.per_invariant[0].passed, Some(false));
    assert!(report.raw_output.contains("withdraw(1)"));
}

#[tokio::test]
async fn test_missing_engine_reports_every_invariant() {
    let dir = tempfile::tempdir().unwrap();
    let orch = orchestrator(CountingOracle::new(), settings(dir.path(), missing_engine()));

    let report = orch
        .run_campaign(
            CampaignRequest::new(VAULT, vec!["a".into(), "b".into(), "c".into()])
                .with_overrides(short_timeout()),
        )
        .await
        .unwrap();

    assert!(!report.success);
    assert_eq!(report.per_invariant.len(), 3);
    assert!(report
        .per_invariant
        .iter()
        .all(|r| r.status == RunStatus::LaunchFailed && r.passed.is_none()));
    assert!(report.per_invariant[0].excerpt.contains("not found"));
    assert!(report.per_invariant[2].excerpt.starts_with("skipped"));
}

#[tokio::test]
async fn test_oracle_failure_is_surfaced_with_status() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = CountingOracle::failing(OracleError::Status {
        status: 401,
        body: "invalid api key".into(),
    });
    let orch = orchestrator(Arc::clone(&oracle), settings(dir.path(), missing_engine()));

    let err = orch
        .run_campaign(CampaignRequest::new(VAULT, vec!["a".into()]))
        .await
        .unwrap_err();
    let failure = err.to_failure();
    assert_eq!(failure.kind, "oracle_error");
    assert_eq!(failure.upstream_status, Some(401));
    assert_eq!(failure.index, Some(1));
    assert!(!dir.path().join("campaigns").exists());
}

#[tokio::test]
async fn test_invalid_override_rejected_before_oracle() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = CountingOracle::new();
    let orch = orchestrator(Arc::clone(&oracle), settings(dir.path(), missing_engine()));

    let err = orch
        .run_campaign(
            CampaignRequest::new(VAULT, vec!["a".into()]).with_overrides(ConfigOverrides {
                test_limit: Some(0),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "config_error");
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn test_timed_out_invariant_does_not_stop_others() {
    let dir = tempfile::tempdir().unwrap();
    let engine = stub_engine(
        dir.path(),
        "engine.sh",
        r#"case "$*" in
  *EchidnaTest_1*) echo 'fuzzing...'; exec sleep 30 ;;
  *) echo 'echidna_invariant_2: passed!' ;;
esac"#,
    );
    let mut s = settings(dir.path(), engine);
    s.deadline_slack = Duration::ZERO;
    let orch = orchestrator(CountingOracle::new(), s);

    let report = orch
        .run_campaign(
            CampaignRequest::new(VAULT, vec!["a".into(), "b".into()]).with_overrides(ConfigOverrides {
                timeout: Some(1),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

    assert!(!report.success);
    assert_eq!(report.per_invariant[0].status, RunStatus::TimedOut);
    assert!(report.per_invariant[0].excerpt.contains("fuzzing..."));
    assert_eq!(report.per_invariant[1].passed, Some(true));
}

#[tokio::test]
async fn test_keep_artifacts_leaves_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let engine = stub_engine(dir.path(), "engine.sh", PASSING_ENGINE);
    let mut s = settings(dir.path(), engine);
    s.keep_artifacts = true;
    let orch = orchestrator(CountingOracle::new(), s);

    let report = orch
        .run_campaign(CampaignRequest::new(VAULT, vec!["a".into()]).with_overrides(short_timeout()))
        .await
        .unwrap();

    let ws = report.workspace.expect("workspace kept");
    assert!(ws.join("Contract.sol").is_file());
    assert!(ws.join("invariant_1_test.sol").is_file());
    let config = std::fs::read_to_string(ws.join("invariant_1_echidna.yaml")).unwrap();
    assert!(config.contains("testLimit: 50000"));
    assert!(config.contains(&dir.path().join("corpus").display().to_string()));
}

#[tokio::test]
async fn test_infer_invariants_rejects_empty_source() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = CountingOracle::new();
    let orch = orchestrator(Arc::clone(&oracle), settings(dir.path(), missing_engine()));

    let err = orch.infer_invariants("").await.unwrap_err();
    assert_eq!(err.kind(), "input_error");
    assert_eq!(oracle.calls(), 0);
}

/// Engine stub that marks the corpus as in use while it runs and records
/// any run that finds the mark already there.
const CORPUS_WRITER_ENGINE: &str = r#"corpus=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--corpus-dir" ]; then corpus="$2"; fi
  shift
done
if ! mkdir "$corpus/.writer" 2>/dev/null; then
  echo overlap >> "$corpus/../overlaps.log"
fi
sleep 1
rmdir "$corpus/.writer" 2>/dev/null
echo "echidna_invariant_1: passed!"
"#;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_orchestrators_sharing_a_corpus_take_turns() {
    let dir = tempfile::tempdir().unwrap();
    let engine = stub_engine(dir.path(), "engine.sh", CORPUS_WRITER_ENGINE);
    let first = orchestrator(CountingOracle::new(), settings(dir.path(), engine.clone()));
    let second = orchestrator(CountingOracle::new(), settings(dir.path(), engine));

    let request = || CampaignRequest::new(VAULT, vec!["a".into()]).with_overrides(short_timeout());
    let started = Instant::now();
    let (a, b) = tokio::join!(
        first.run_campaign(request()),
        second.run_campaign(request())
    );

    assert!(a.unwrap().success);
    assert!(b.unwrap().success);
    assert!(!dir.path().join("overlaps.log").exists());
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert!(dir.path().join("corpus/.lock").is_file());
}

#[tokio::test]
async fn test_cancel_during_synthesis_stops_campaign() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = CountingOracle::slow(Duration::from_secs(30));
    let orch = orchestrator(Arc::clone(&oracle), settings(dir.path(), missing_engine()));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = orch
        .run_campaign_with_cancel(CampaignRequest::new(VAULT, vec!["a".into(), "b".into()]), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, CampaignError::Cancelled));
    assert_eq!(err.to_failure().kind, "cancelled");
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(oracle.calls(), 2);
    assert!(!dir.path().join("campaigns").exists());
}
