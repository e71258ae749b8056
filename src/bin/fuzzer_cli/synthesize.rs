use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use invariant_fuzzer::output::{print_json, read_input};
use invariant_fuzzer::settings::Settings;
use invariant_fuzzer_core::workspace::{write_atomic, CONTRACT_FILE};
use invariant_fuzzer_core::CampaignError;
use invariant_fuzzer_types::{ContractSource, HarnessUnit, Invariant};

use super::InvariantArgs;

#[derive(Parser, Debug)]
#[command(about = "Generate one Echidna harness per invariant")]
pub struct SynthesizeCmd {
    /// Solidity source file ("-" for stdin)
    #[arg(long, short = 's')]
    pub source: PathBuf,

    #[command(flatten)]
    pub invariants: InvariantArgs,

    /// Write the contract and harnesses into this directory
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

impl SynthesizeCmd {
    pub async fn execute(&self, settings: &Settings, json_output: bool) -> Result<()> {
        if !self.invariants.has_any() {
            bail!("pass at least one --invariant or --invariants-file");
        }
        let text = read_input(&self.source)?;
        let statements = self.invariants.load()?;
        let (source, units) = match synthesize(settings, text, &statements).await {
            Ok(done) => done,
            Err(err) => return super::report_failure(err, json_output, "harness synthesis failed"),
        };

        if let Some(dir) = &self.out_dir {
            write_atomic(&dir.join(CONTRACT_FILE), source.as_bytes())?;
            for unit in &units {
                let path = dir.join(unit.invariant.harness_file_name());
                write_atomic(&path, unit.source.as_bytes())
                    .with_context(|| format!("write harness #{}", unit.index()))?;
            }
        }

        if json_output {
            print_json(&serde_json::json!({
                "success": true,
                "contractName": source.name(),
                "harnesses": units,
            }))?;
        } else {
            for unit in &units {
                println!("// ---- {} ({}) ----", unit.contract_name, unit.invariant.statement());
                println!("{}", unit.source.trim_end());
            }
            if let Some(dir) = &self.out_dir {
                println!();
                println!("Wrote {} harnesses to {}", units.len(), dir.display());
            }
        }
        Ok(())
    }
}

async fn synthesize(
    settings: &Settings,
    text: String,
    statements: &[String],
) -> Result<(ContractSource, Vec<HarnessUnit>), CampaignError> {
    let source = ContractSource::new(text)?;
    let invariants = Invariant::from_statements(statements)?;
    let units = super::orchestrator(settings)
        .synthesize_all(&source, &invariants)
        .await?;
    Ok((source, units))
}
