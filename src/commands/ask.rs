//! Answer a question with the reason-act-observe tool loop.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use super::format::{format_summary, RunSummary};
use super::select_lookup;
use crate::config::Config;
use crate::oracle::build_oracle;
use crate::tool_loop::ToolLoop;
use crate::tools::{SearchTool, ToolSet};

/// Runs the tool loop with `GoogleSearch` and prints the final answer.
pub(crate) async fn run(config: &Config, question: &str, offline: bool) -> Result<()> {
    let oracle = build_oracle(&config.oracle)?;
    let lookup = select_lookup(config, offline)?;
    info!("Asking {} with {} search", oracle.name(), lookup.name());

    let mut tools = ToolSet::new();
    tools.register(Arc::new(SearchTool::new(lookup)))?;
    let tool_loop = ToolLoop::new(oracle, tools, &config.tool_loop)?;

    let started = Utc::now();
    let result = tool_loop.run(question).await;
    let elapsed = Utc::now().signed_duration_since(started);

    let usage = match &result {
        Ok(outcome) => format!(
            "{} of {} iterations",
            outcome.iterations, config.tool_loop.max_iterations
        ),
        Err(_) => format!("limit {} iterations", config.tool_loop.max_iterations),
    };
    eprint!(
        "{}",
        format_summary(&RunSummary {
            succeeded: result.is_ok(),
            elapsed,
            usage,
        })
    );

    let outcome = result?;
    for (turn, step) in outcome.trace.iter().enumerate() {
        debug!("Turn {}:\n{}", turn + 1, step);
    }
    println!("{}", outcome.answer);
    Ok(())
}
