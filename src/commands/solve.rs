//! Solve a task with the recursive executor.

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use super::format::{format_summary, render_value, RunSummary};
use super::select_lookup;
use crate::budget::Budget;
use crate::config::Config;
use crate::executor::Executor;
use crate::oracle::build_oracle;
use crate::sandbox::ExecutionLimits;
use crate::task::Task;

/// Builds the task from either a question (plus format) or raw JSON.
pub(crate) fn task_from_args(
    question: Option<String>,
    format: Option<&str>,
    task_json: Option<&str>,
) -> Result<Task> {
    match (question, task_json) {
        (_, Some(json)) => Task::from_json_str(json),
        (Some(question), None) => Ok(Task::question(question, format)),
        (None, None) => anyhow::bail!("Give a question or --task"),
    }
}

/// Runs the executor on `task` and prints its result.
pub(crate) async fn run(config: &Config, task: Task, offline: bool) -> Result<()> {
    let oracle = build_oracle(&config.oracle)?;
    let lookup = select_lookup(config, offline)?;
    info!("Solving with {} and {} lookup", oracle.name(), lookup.name());

    let executor = Executor::new(
        oracle,
        lookup,
        &config.executor,
        ExecutionLimits::from(&config.sandbox),
    )?;
    let budget = Budget::new(executor.allowance());

    let started = Utc::now();
    let result = executor.solve_with(task, &budget).await;
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
