use std::fs;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use vm::specs::MAX_ARGS;
use vm::{invoke_with, Signature, TrapKind};

use super::load_program_file;
use crate::config::Config;

pub struct RunOptions {
    pub path: String,
    pub args: Vec<u64>,
    pub config: Option<String>,
    pub data: Option<String>,
    pub arity: Option<u8>,
    pub void: bool,
    pub json: bool,
}

impl RunOptions {
    pub fn new(path: impl Into<String>, args: Vec<u64>) -> Self {
        Self {
            path: path.into(),
            args,
            config: None,
            data: None,
            arity: None,
            void: false,
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub entry: String,
    pub status: &'static str,
    pub value: Option<u64>,
    pub trap: Option<String>,
}

impl RunReport {
    fn new(entry: String, outcome: &Result<Option<u64>, TrapKind>) -> Self {
        match outcome {
            Ok(value) => Self {
                entry,
                status: "returned",
                value: *value,
                trap: None,
            },
            Err(trap) => Self {
                entry,
                status: "trapped",
                value: None,
                trap: Some(trap.to_string()),
            },
        }
    }
}

/// Load, configure and invoke; traps are reported, not returned as errors.
pub fn execute(opts: &RunOptions) -> Result<RunReport> {
    let config = Config::load(opts.config.as_deref())?;
    let table = config.helper_table()?;

    let arity = opts.arity.unwrap_or(opts.args.len().min(MAX_ARGS) as u8);
    let signature = Signature::new(arity, !opts.void).context("Invalid raw entry signature")?;
    let program = load_program_file(&opts.path, signature)?;

    let mut vm_config = config.vm_config();
    if let Some(data) = &opts.data {
        let context = fs::read(data).with_context(|| format!("Failed to read context {}", data))?;
        vm_config = vm_config.with_context(context);
    }

    let entry = program
        .entry()
        .map(|e| e.name().to_string())
        .unwrap_or_default();
    let outcome = invoke_with(&program, &opts.args, &table, vm_config);
    Ok(RunReport::new(entry, &outcome))
}

/// Stdout output for a report. A trap in text mode prints nothing here; it
/// comes back from `run_file` as the error instead.
pub fn render(report: &RunReport, json: bool) -> Result<Option<String>> {
    if json {
        return Ok(Some(serde_json::to_string_pretty(report)?));
    }
    Ok(match (&report.trap, report.value) {
        (Some(_), _) => None,
        (None, Some(value)) => Some(format!("{} = {} ({:#x})", report.entry, value, value)),
        (None, None) => Some(format!("{} returned", report.entry)),
    })
}

pub fn run_file(opts: &RunOptions) -> Result<()> {
    let report = execute(opts)?;

    if let Some(output) = render(&report, opts.json)? {
        println!("{}", output);
    }

    match report.trap {
        Some(trap) => Err(anyhow!("{}: trapped: {}", report.entry, trap)),
        None => Ok(()),
    }
}
