//! Capabilities injected into one sandbox run.
//!
//! Every binding charges the shared budget before it does any work, so a
//! script cannot reach the outside world or recurse once the budget is gone.

use async_trait::async_trait;
use serde_json::Value as Json;
use std::sync::Arc;
use tracing::{debug, info};

use crate::budget::{Budget, Charge};
use crate::error::SolveError;
use crate::executor::Executor;
use crate::lookup::Lookup;
use crate::sandbox::{Bindings, Capability};
use crate::task::{json_kind, Task};

/// Handle for re-entering the executor one level down.
struct Recursion {
    executor: Executor,
    depth: usize,
}

/// The binding set of one sandbox instance.
pub(crate) struct CapabilityBindings {
    lookup: Arc<dyn Lookup>,
    budget: Budget,
    recursion: Option<Recursion>,
}

impl CapabilityBindings {
    /// Binds only `lookup`.
    pub fn new(lookup: Arc<dyn Lookup>, budget: Budget) -> Self {
        Self {
            lookup,
            budget,
            recursion: None,
        }
    }

    /// Also binds `agent`, solving sub-tasks at `depth + 1`.
    pub fn with_recursion(mut self, executor: Executor, depth: usize) -> Self {
        self.recursion = Some(Recursion { executor, depth });
        self
    }

    async fn lookup(&self, argument: Json) -> Result<Json, SolveError> {
        let Json::String(query) = argument else {
            return Err(SolveError::invalid_lookup_input(json_kind(&argument)));
        };
        self.budget.charge(Charge::Lookup)?;
        info!("lookup({:?})", query);

        let answer = self
            .lookup
            .lookup(&query)
            .await
            .map_err(|e| SolveError::tool_failed(self.lookup.name(), &e))?;
        debug!("lookup answered {:?}", answer);
        Ok(Json::String(answer))
    }

    async fn recurse(&self, argument: Json) -> Result<Json, SolveError> {
        let Some(recursion) = &self.recursion else {
            return Err(SolveError::execution_failed("agent is not available here"));
        };
        let task = Task::try_from(argument).map_err(|kind| {
            SolveError::execution_failed(format!(
                "agent expects a string or an object, got {kind}"
            ))
        })?;
        self.budget.charge(Charge::Recurse)?;

        recursion
            .executor
            .solve_node(task, self.budget.clone(), recursion.depth + 1)
            .await
    }
}

#[async_trait]
impl Bindings for CapabilityBindings {
    fn grants(&self, capability: Capability) -> bool {
        match capability {
            Capability::Lookup => true,
            Capability::Recurse => self.recursion.is_some(),
        }
    }

    async fn invoke(&self, capability: Capability, argument: Json) -> Result<Json, SolveError> {
        match capability {
            Capability::Lookup => self.lookup(argument).await,
            Capability::Recurse => self.recurse(argument).await,
        }
    }
}
