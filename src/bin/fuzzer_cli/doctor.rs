use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::time::Duration;

use invariant_fuzzer::settings::Settings;
use invariant_fuzzer_core::health::{run_doctor, DoctorConfig, DoctorReport};

#[derive(Parser, Debug)]
#[command(about = "Check the engine, oracle credentials, and workspace")]
pub struct DoctorCmd {
    /// Timeout for the engine version check, in seconds
    #[arg(long, default_value_t = 20)]
    timeout_secs: u64,
}

fn print_report(report: &DoctorReport) {
    println!("invariant-fuzzer doctor");
    println!("  engine:    {}", report.engine);
    println!("  oracle:    {}", report.oracle_endpoint);
    println!("  workspace: {}", report.workspace_root.display());
    println!();

    for check in &report.checks {
        let status = if check.passed { "PASS" } else { "FAIL" };
        println!("[{}] {}: {}", status, check.name, check.detail);
        if let Some(remediation) = &check.remediation {
            println!("      fix: {}", remediation);
        }
    }

    println!();
    println!("Summary: {} passed, {} failed", report.passed, report.failed);
}

impl DoctorCmd {
    pub async fn execute(&self, settings: &Settings, json_output: bool) -> Result<()> {
        let report = run_doctor(&DoctorConfig {
            engine: settings.orchestrator.engine.clone(),
            oracle_endpoint: settings.oracle.endpoint.clone(),
            api_key_configured: settings.oracle.api_key.is_some(),
            workspace_root: settings.orchestrator.workspace_root.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        })
        .await?;

        if json_output {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("serialize doctor report")?
            );
        } else {
            print_report(&report);
        }

        if report.ok {
            Ok(())
        } else {
            Err(anyhow!("doctor found {} failing checks", report.failed))
        }
    }
}
