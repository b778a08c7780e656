//! Recursive executor: the oracle writes a script, the sandbox runs it.
//!
//! One node charges the budget for its oracle call, renders the
//! code-generation prompt, compiles the completion and runs it with `lookup`
//! and, when enabled, `agent` bound. `agent` re-enters [`Executor::solve_node`]
//! one level down with the same [`Budget`], so the budget rather than the
//! call depth bounds the tree.

use serde_json::Value as Json;
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::bindings::CapabilityBindings;
use crate::budget::{Budget, Charge};
use crate::config::ExecutorConfig;
use crate::error::SolveError;
use crate::lookup::Lookup;
use crate::oracle::Oracle;
use crate::prompt::{PromptBuilder, END_MARKER};
use crate::response::extract_code;
use crate::sandbox::{ExecutionLimits, Sandbox};
use crate::task::Task;

struct Inner {
    oracle: Arc<dyn Oracle>,
    lookup: Arc<dyn Lookup>,
    prompts: PromptBuilder,
    sandbox: Sandbox,
    allowance: u64,
    recursion: bool,
}

/// Cheap to clone; clones share collaborators.
#[derive(Clone)]
pub(crate) struct Executor {
    inner: Arc<Inner>,
}

impl Executor {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        lookup: Arc<dyn Lookup>,
        config: &ExecutorConfig,
        limits: ExecutionLimits,
    ) -> Result<Self, SolveError> {
        Ok(Self {
            inner: Arc::new(Inner {
                oracle,
                lookup,
                prompts: PromptBuilder::new()?,
                sandbox: Sandbox::new(limits),
                allowance: config.allowance,
                recursion: config.recursion,
            }),
        })
    }

    /// Allowance each top-level call starts with.
    pub fn allowance(&self) -> u64 {
        self.inner.allowance
    }

    /// Solves a top-level task with a fresh budget.
    pub async fn solve(&self, task: Task) -> Result<Json, SolveError> {
        self.solve_with(task, &Budget::new(self.inner.allowance))
            .await
    }

    /// Solves a top-level task against `budget`, which the caller can inspect
    /// afterwards.
    pub async fn solve_with(&self, task: Task, budget: &Budget) -> Result<Json, SolveError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("solve", run = %run_id);
        async {
            info!("Solving with an allowance of {}", budget.allowance());
            let result = self.solve_node(task, budget.clone(), 0).await;
            info!("Finished after spending {} of {}", budget.spent(), budget.allowance());
            result
        }
        .instrument(span)
        .await
    }

    /// Solves one node of the tree.
    pub async fn solve_node(
        &self,
        task: Task,
        budget: Budget,
        depth: usize,
    ) -> Result<Json, SolveError> {
        self.run_node(task, budget, depth)
            .instrument(info_span!("node", depth))
            .await
    }

    async fn run_node(&self, task: Task, budget: Budget, depth: usize) -> Result<Json, SolveError> {
        let inner = &self.inner;
        budget.charge(Charge::Oracle)?;

        let prompt = inner.prompts.codegen(&task, inner.recursion)?;
        debug!("Prompt:\n{}", prompt.text);

        let generated = inner
            .oracle
            .generate(&prompt.text, &prompt.stop)
            .await
            .map_err(|e| SolveError::oracle_failed(&e))?;
        let code = extract_code(&generated, END_MARKER);
        debug!("Generated script:\n{}", code);

        // Nothing runs unless the whole completion parses
        let program = inner.sandbox.compile(&code)?;

        let mut bindings = CapabilityBindings::new(inner.lookup.clone(), budget);
        if inner.recursion {
            bindings = bindings.with_recursion(self.clone(), depth);
        }

        let result = inner
            .sandbox
            .execute(&program, &task.to_value(), Arc::new(bindings))
            .await?;
        info!("Node at depth {} returned", depth);
        Ok(result)
    }
}
