use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use invariant_fuzzer::output::{print_json, read_input};
use invariant_fuzzer::settings::Settings;

#[derive(Parser, Debug)]
#[command(about = "Ask the oracle for candidate invariants of a contract")]
pub struct InferCmd {
    /// Solidity source file ("-" for stdin)
    #[arg(long, short = 's')]
    pub source: PathBuf,
}

impl InferCmd {
    pub async fn execute(&self, settings: &Settings, json_output: bool) -> Result<()> {
        let source = read_input(&self.source)?;
        let orchestrator = super::orchestrator(settings);
        let invariants = match orchestrator.infer_invariants(&source).await {
            Ok(found) => found,
            Err(err) => return super::report_failure(err, json_output, "invariant inference failed"),
        };

        if json_output {
            print_json(&serde_json::json!({
                "success": true,
                "invariants": invariants,
            }))?;
        } else {
            for invariant in &invariants {
                println!("{}", invariant);
            }
        }
        Ok(())
    }
}
