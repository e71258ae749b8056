use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::runner::EngineCommand;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoctorStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorCheck {
    pub id: String,
    pub name: String,
    pub status: DoctorStatus,
    pub passed: bool,
    pub detail: String,
    pub remediation: Option<String>,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorReport {
    pub ok: bool,
    pub passed: usize,
    pub failed: usize,
    pub engine: String,
    pub oracle_endpoint: String,
    pub workspace_root: PathBuf,
    pub checks: Vec<DoctorCheck>,
}

#[derive(Debug, Clone)]
pub struct DoctorConfig {
    pub engine: EngineCommand,
    pub oracle_endpoint: String,
    pub api_key_configured: bool,
    pub workspace_root: PathBuf,
    pub timeout: Duration,
}

fn pass_check(id: &str, name: &str, detail: String, start: Instant) -> DoctorCheck {
    DoctorCheck {
        id: id.to_string(),
        name: name.to_string(),
        status: DoctorStatus::Pass,
        passed: true,
        detail,
        remediation: None,
        duration_ms: start.elapsed().as_millis(),
    }
}

fn fail_check(
    id: &str,
    name: &str,
    detail: String,
    remediation: &str,
    start: Instant,
) -> DoctorCheck {
    DoctorCheck {
        id: id.to_string(),
        name: name.to_string(),
        status: DoctorStatus::Fail,
        passed: false,
        detail,
        remediation: Some(remediation.to_string()),
        duration_ms: start.elapsed().as_millis(),
    }
}

async fn run_version_command(engine: &EngineCommand, timeout: Duration) -> Result<String> {
    let program = engine.program.display().to_string();
    let child = Command::new(&engine.program)
        .args(&engine.prefix_args)
        .arg("--version")
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();
    let output = tokio::time::timeout(timeout, child)
        .await
        .map_err(|_| anyhow!("`{program} --version` did not answer within {}s", timeout.as_secs()))?
        .with_context(|| format!("failed to execute `{program} --version`"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(anyhow!(
            "`{program} --version` exited with status {}: {}",
            output.status,
            stderr
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(if stdout.is_empty() {
        format!("`{program}` answered --version")
    } else {
        stdout
    })
}

fn check_workspace_writable(root: &Path) -> Result<String> {
    std::fs::create_dir_all(root)
        .with_context(|| format!("create workspace root {}", root.display()))?;
    let scratch = tempfile::NamedTempFile::new_in(root)
        .with_context(|| format!("write into workspace root {}", root.display()))?;
    drop(scratch);
    Ok(format!("workspace root is writable: {}", root.display()))
}

pub async fn run_doctor(config: &DoctorConfig) -> Result<DoctorReport> {
    let mut checks = Vec::new();

    let engine_start = Instant::now();
    checks.push(match run_version_command(&config.engine, config.timeout).await {
        Ok(detail) => pass_check("fuzz_engine", "Fuzz Engine", detail, engine_start),
        Err(err) => fail_check(
            "fuzz_engine",
            "Fuzz Engine",
            err.to_string(),
            "Install echidna and ensure it is on PATH, or point `--engine` / INVARIANT_FUZZER_ENGINE at it.",
            engine_start,
        ),
    });

    let key_start = Instant::now();
    checks.push(if config.api_key_configured {
        pass_check(
            "oracle_api_key",
            "Oracle API Key",
            format!("api key configured for {}", config.oracle_endpoint),
            key_start,
        )
    } else {
        fail_check(
            "oracle_api_key",
            "Oracle API Key",
            "no api key configured".to_string(),
            "Set OPENAI_API_KEY in the environment or a .env file.",
            key_start,
        )
    });

    let ws_start = Instant::now();
    checks.push(match check_workspace_writable(&config.workspace_root) {
        Ok(detail) => pass_check("workspace_root", "Workspace Root", detail, ws_start),
        Err(err) => fail_check(
            "workspace_root",
            "Workspace Root",
            format!("{err:#}"),
            "Use `--workspace` with a writable path and verify directory permissions.",
            ws_start,
        ),
    });

    let passed = checks.iter().filter(|c| c.passed).count();
    let failed = checks.len() - passed;
    Ok(DoctorReport {
        ok: failed == 0,
        passed,
        failed,
        engine: config.engine.program.display().to_string(),
        oracle_endpoint: config.oracle_endpoint.clone(),
        workspace_root: config.workspace_root.clone(),
        checks,
    })
}
