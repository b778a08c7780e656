//! Run a script file directly in the sandbox.
//!
//! Only `lookup` is bound; there is no oracle behind the script, so `agent`
//! is not available.

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::format::{format_summary, render_value, RunSummary};
use super::select_lookup;
use crate::bindings::CapabilityBindings;
use crate::budget::Budget;
use crate::config::Config;
use crate::error::SolveError;
use crate::sandbox::{ExecutionLimits, Sandbox};

pub(crate) async fn run(
    config: &Config,
    script: &Path,
    task_json: Option<&str>,
    offline: bool,
) -> Result<()> {
    let source = fs::read_to_string(script)
        .with_context(|| format!("Failed to read script: {}", script.display()))?;
    let task: Value = match task_json {
        Some(json) => serde_json::from_str(json).context("Failed to parse --task as JSON")?,
        None => Value::Null,
    };

    let lookup = select_lookup(config, offline)?;
    let sandbox = Sandbox::new(ExecutionLimits::from(&config.sandbox));
    let budget = Budget::new(config.executor.allowance);
    info!("Running {} with {} lookup", script.display(), lookup.name());

    let started = Utc::now();
    let bindings = Arc::new(CapabilityBindings::new(lookup, budget.clone()));
    let result = sandbox
        .run(&source, &task, bindings)
        .await
        .map_err(SolveError::from);
    let elapsed = Utc::now().signed_duration_since(started);

    eprint!(
        "{}",
        format_summary(&RunSummary {
            succeeded: result.is_ok(),
            elapsed,
            usage: format!("budget {}/{}", budget.spent(), budget.allowance()),
        })
    );

    println!("{}", render_value(&result?));
    Ok(())
}
