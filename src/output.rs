//! Report printing and JSON output.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use invariant_fuzzer_types::{CampaignReport, InvariantResult, Verdict};

/// Pretty JSON to `path`, or to stdout when `path` is `-`. A closed stdout
/// pipe is not an error.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if path.as_os_str() == "-" {
        return print_json(value);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }

    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).context("serialize JSON")?;
    writer.write_all(b"\n").ok();
    writer.flush().with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    if let Err(e) = serde_json::to_writer_pretty(&mut writer, value) {
        if e.is_io() && e.io_error_kind() == Some(io::ErrorKind::BrokenPipe) {
            return Ok(());
        }
        return Err(e).context("serialize JSON");
    }
    writer.write_all(b"\n").ok();
    writer.flush().ok();
    Ok(())
}

/// Read a whole input file, or stdin when `path` is `-`.
pub fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("read stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn verdict_label(result: &InvariantResult) -> &'static str {
    match result.verdict() {
        Verdict::Passed => "PASS",
        Verdict::Failed => "FAIL",
        Verdict::Unknown => "????",
    }
}

pub fn print_invariant(result: &InvariantResult) {
    println!(
        "[{}] #{} {} ({}, {} ms)",
        verdict_label(result),
        result.index,
        result.property_name,
        result.status,
        result.elapsed_ms
    );
    if let Some(invariant) = &result.invariant {
        println!("      invariant: {}", invariant);
    }
    if let Some(code) = result.exit_code {
        println!("      exit code: {}", code);
    }
    if let Some(coverage) = &result.coverage {
        println!("      {}", coverage);
    }
    if !result.excerpt.is_empty() {
        for line in result.excerpt.lines() {
            println!("      | {}", line);
        }
    }
}

pub fn print_report(report: &CampaignReport) {
    match &report.contract_name {
        Some(name) => println!("Campaign for {}", name),
        None => println!("Campaign"),
    }
    if let Some(ws) = &report.workspace {
        println!("  workspace: {}", ws.display());
    }
    println!();

    for result in &report.per_invariant {
        print_invariant(result);
    }

    println!();
    println!(
        "Summary: {} invariants, {} passed, {} failed, success={} ({} ms)",
        report.total(),
        report.passed(),
        report.failed(),
        report.success,
        report.elapsed_ms
    );
}
