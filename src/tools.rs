//! Named tools offered to the oracle by the tool loop.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::SolveError;
use crate::lookup::Lookup;

/// A named capability with a description for the prompt.
#[async_trait]
pub(crate) trait Tool: Send + Sync {
    /// Exact name the oracle must use in `Action:`.
    fn name(&self) -> &str;

    /// One-line description rendered into the prompt.
    fn description(&self) -> &str;

    /// Runs the tool on the oracle's `Action Input:` text.
    async fn call(&self, input: &str) -> Result<String>;
}

/// Fixed, ordered set of tools for one loop run.
#[derive(Clone, Default)]
pub(crate) struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool; names must be unique.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        if self.tools.iter().any(|t| t.name() == tool.name()) {
            anyhow::bail!("Tool '{}' is already registered", tool.name());
        }
        debug!("Registered tool {}", tool.name());
        self.tools.push(tool);
        Ok(())
    }

    /// Finds a tool by exact name.
    pub fn get(&self, name: &str) -> Result<&Arc<dyn Tool>, SolveError> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| SolveError::unknown_tool(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }
}

/// Exposes a [`Lookup`] as the `GoogleSearch` tool.
pub(crate) struct SearchTool {
    lookup: Arc<dyn Lookup>,
}

impl SearchTool {
    pub const NAME: &'static str = "GoogleSearch";

    pub fn new(lookup: Arc<dyn Lookup>) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Get specific information from a search query. Input should be a question like 'How to add number in Clojure?'. Result will be the answer to the question."
    }

    async fn call(&self, input: &str) -> Result<String> {
        self.lookup.lookup(input).await
    }
}
