//! Invariant Fuzzer
//!
//! Turns a Solidity contract and a list of invariants into an Echidna
//! property-fuzzing campaign and a structured report.
//!
//! This crate holds the pieces shared by the `invariant-fuzzer` binary and its
//! tests: environment-derived [`settings`], [`logging`] setup, and report
//! [`output`]. The campaign machinery itself lives in
//! `invariant_fuzzer_core`.

pub mod logging;
pub mod output;
pub mod settings;
