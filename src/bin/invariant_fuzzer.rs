//! invariant-fuzzer: property-fuzzing campaigns for Solidity contracts
//!
//! ## Commands
//!
//! - **infer**: Ask the oracle for candidate invariants
//! - **synthesize**: Generate one Echidna harness per invariant
//! - **config**: Render the engine config document
//! - **run**: Run the engine once against a harness and config
//! - **reduce**: Classify a saved engine transcript
//! - **campaign**: Synthesize, run, and report in one go
//! - **doctor**: Check the engine, oracle credentials, and workspace
//!
//! ## Example Usage
//!
//! ```bash
//! # Full campaign with two invariants
//! invariant-fuzzer campaign -s Vault.sol -i "total never decreases" -i "owner is never zero"
//!
//! # Let the oracle propose invariants, write the report to a file
//! invariant-fuzzer campaign -s Vault.sol --infer --report report.json
//!
//! # Classify a transcript from an earlier run
//! invariant-fuzzer reduce echidna.log --exit-code 1 --json
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod fuzzer_cli;

use fuzzer_cli::{
    campaign::CampaignCmd, config::ConfigCmd, doctor::DoctorCmd, infer::InferCmd,
    reduce::ReduceCmd, run::RunCmd, synthesize::SynthesizeCmd,
};
use invariant_fuzzer::settings::Settings;

#[derive(Parser)]
#[command(
    name = "invariant-fuzzer",
    author,
    version,
    about = "Property-fuzzing campaigns for Solidity contracts",
    long_about = "Turns a Solidity contract and a list of invariants into Echidna harnesses, \
                  runs the engine against each one under a deadline, and reduces the \
                  output into a per-invariant report.\n\n\
                  Reads OPENAI_API_KEY, INVARIANT_FUZZER_ORACLE_URL, INVARIANT_FUZZER_ENGINE \
                  and INVARIANT_FUZZER_HOME from the environment or a .env file."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON instead of human-readable format
    #[arg(long, global = true)]
    json: bool,

    /// Debug-level logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Workspace root for campaigns and the shared corpus
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Engine command line, e.g. "echidna" or "docker run --rm echidna"
    #[arg(long, global = true)]
    engine: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the oracle for candidate invariants
    Infer(InferCmd),

    /// Generate one Echidna harness per invariant
    Synthesize(SynthesizeCmd),

    /// Render the engine config document
    Config(ConfigCmd),

    /// Run the engine once against a harness and config
    Run(RunCmd),

    /// Classify a saved engine transcript
    Reduce(ReduceCmd),

    /// Synthesize, run, and report in one go
    Campaign(CampaignCmd),

    /// Check the engine, oracle credentials, and workspace
    Doctor(DoctorCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        command,
        json,
        verbose,
        workspace,
        engine,
    } = Cli::parse();

    invariant_fuzzer::logging::init(verbose);
    let settings = Settings::from_env().with_overrides(workspace, engine.as_deref());

    match command {
        Commands::Infer(cmd) => cmd.execute(&settings, json).await,
        Commands::Synthesize(cmd) => cmd.execute(&settings, json).await,
        Commands::Config(cmd) => cmd.execute(&settings, json),
        Commands::Run(cmd) => cmd.execute(&settings, json).await,
        Commands::Reduce(cmd) => cmd.execute(json),
        Commands::Campaign(cmd) => cmd.execute(&settings, json).await,
        Commands::Doctor(cmd) => cmd.execute(&settings, json).await,
    }
}
