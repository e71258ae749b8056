use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use invariant_fuzzer::output::print_json;
use invariant_fuzzer::settings::Settings;
use invariant_fuzzer_core::config_builder::render_document;
use invariant_fuzzer_core::ConfigBuilder;

use super::ConfigArgs;

#[derive(Parser, Debug)]
#[command(
    about = "Render the engine config document",
    long_about = "Merges the given overrides onto the default campaign config and prints \
                  the resulting engine YAML document. With --out the document is written \
                  atomically and the corpus directory is created."
)]
pub struct ConfigCmd {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Write the document here instead of printing it
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

impl ConfigCmd {
    pub fn execute(&self, settings: &Settings, json_output: bool) -> Result<()> {
        let builder = ConfigBuilder::with_defaults(settings.orchestrator.config_defaults.clone());
        let config = builder
            .build(&self.config.to_overrides())
            .context("invalid config")?;

        let config = match &self.out {
            Some(path) => builder
                .materialize(&config, path, &settings.orchestrator.workspace_root)
                .with_context(|| format!("write config {}", path.display()))?,
            None => config,
        };

        if json_output {
            print_json(&config)?;
        } else if let Some(path) = &self.out {
            println!("Wrote {}", path.display());
        } else {
            print!("{}", render_document(&config)?);
        }
        Ok(())
    }
}
