use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use invariant_fuzzer::output::{print_invariant, print_json, read_input};
use invariant_fuzzer_core::reduce;
use invariant_fuzzer_types::{property_name, RunOutcome};

use super::require_positive;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptStatus {
    Completed,
    TimedOut,
}

#[derive(Parser, Debug)]
#[command(about = "Classify a saved engine transcript")]
pub struct ReduceCmd {
    /// Transcript file ("-" for stdin)
    pub transcript: PathBuf,

    /// How the run ended
    #[arg(long, value_enum, default_value = "completed")]
    pub status: TranscriptStatus,

    /// Engine exit code, when known
    #[arg(long, allow_negative_numbers = true)]
    pub exit_code: Option<i32>,

    /// Invariant index to report the result under
    #[arg(long, default_value_t = 1)]
    pub index: usize,

    /// Property name to report the result under
    #[arg(long)]
    pub property: Option<String>,
}

impl ReduceCmd {
    pub fn execute(&self, json_output: bool) -> Result<()> {
        let index = require_positive("index", self.index)?;
        let transcript = read_input(&self.transcript)?;
        let outcome = match self.status {
            TranscriptStatus::Completed => RunOutcome::Completed {
                exit_code: self.exit_code,
                transcript,
            },
            TranscriptStatus::TimedOut => RunOutcome::TimedOut { transcript },
        };
        let property = self
            .property
            .clone()
            .unwrap_or_else(|| property_name(index));
        let result = reduce(index, &property, &outcome);

        if json_output {
            print_json(&result)?;
        } else {
            print_invariant(&result);
            println!("clean: {}", result.clean);
        }
        Ok(())
    }
}
