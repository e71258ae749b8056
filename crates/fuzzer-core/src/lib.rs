//! Invariant Fuzzer Core
//!
//! Fuzz campaign orchestration for Solidity contracts.
//!
//! A campaign takes contract source and a list of invariants, asks the
//! inference oracle for one harness contract per invariant, runs the external
//! property-fuzzing engine against each harness under a wall-clock deadline,
//! and reduces each free-text transcript into a structured report.
//!
//! # Core Modules
//!
//! - [`synthesizer`]: Builds one harness unit per invariant via the oracle
//! - [`inference`]: Asks the oracle for candidate invariants
//! - [`config_builder`]: Default/override merge and atomic config documents
//! - [`runner`]: Launches the engine, enforces the deadline, captures output
//! - [`reducer`]: Transcript classification and campaign aggregation
//! - [`campaign`]: The orchestrator tying the steps together
//! - [`health`]: Environment checks for the CLI `doctor` command
//!
//! # Example
//!
//! ```ignore
//! use invariant_fuzzer_core::campaign::{CampaignOrchestrator, CampaignRequest, OrchestratorSettings};
//!
//! let orchestrator = CampaignOrchestrator::new(oracle, &oracle_settings, OrchestratorSettings::default());
//! let report = orchestrator.run_campaign(CampaignRequest::new(source, invariants)).await?;
//! println!("success: {}", report.success);
//! ```

#![allow(clippy::result_large_err)]

pub mod campaign;
pub mod config_builder;
pub mod corpus_lock;
pub mod error;
pub mod health;
pub mod inference;
pub mod reducer;
pub mod runner;
pub mod synthesizer;
pub mod workspace;

pub use campaign::{CampaignOrchestrator, CampaignRequest, OrchestratorSettings};
pub use config_builder::ConfigBuilder;
pub use error::{CampaignError, CampaignFailure, ConfigError};
pub use reducer::{aggregate, classify, reduce, ClassifierTokens, TranscriptSummary};
pub use runner::{EngineCommand, EngineInvocation, ProcessRunner};
pub use synthesizer::HarnessSynthesizer;
