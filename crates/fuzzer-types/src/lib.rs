//! Shared types for the invariant-fuzzer workspace.
//!
//! Every crate in the workspace speaks in these types: the transport layer
//! never sees raw JSON maps, and the orchestrator never invents its own
//! request/response shapes.
//!
//! - [`contract`]: contract source, extracted contract name, invariants
//! - [`harness`]: generated harness units
//! - [`config`]: engine run parameters and caller overrides
//! - [`outcome`]: the tagged result of one engine invocation
//! - [`report`]: per-invariant results and the campaign report

pub mod config;
pub mod contract;
pub mod error;
pub mod harness;
pub mod outcome;
pub mod report;

pub use config::{CampaignConfig, ConfigOverrides, InvalidConfigValue};
pub use contract::{
    extract_contract_name, property_name, ContractName, ContractSource, Invariant, UNNAMED_CONTRACT,
};
pub use error::InputError;
pub use harness::HarnessUnit;
pub use outcome::{RunOutcome, RunStatus};
pub use report::{CampaignReport, InvariantResult, Verdict};
