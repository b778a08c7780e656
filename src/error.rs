//! Error taxonomy for solving a task.
//!
//! Every variant is fatal for the invocation that raised it. Nothing in the
//! crate retries or recovers; errors unwind to the top-level caller, which
//! can match on the variant to see what fired.

use crate::budget::Charge;

/// Errors surfaced by the tool loop and the recursive executor.
#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    /// The shared budget of an invocation tree ran out.
    #[error("Budget exceeded: allowance of {allowance} exhausted while charging {operation}")]
    BudgetExceeded { allowance: u64, operation: Charge },

    /// The oracle produced text matching neither response grammar.
    #[error("Output of oracle is not parsable: '{output}'")]
    UnparsableOutput { output: String },

    /// The oracle named a tool outside the registered set.
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    /// Generated code called `lookup` with something other than text.
    #[error("lookup expects a string query, got {found}")]
    InvalidLookupInput { found: String },

    /// Sandboxed code was rejected, timed out, or raised while running.
    #[error("Sandboxed execution failed: {message}")]
    ExecutionFailed { message: String },

    /// The tool loop hit its iteration cap without a final answer.
    #[error("Max loops reached: {max_iterations}")]
    LoopBudgetExceeded { max_iterations: u32 },

    /// The oracle call itself failed (transport, status, malformed body).
    #[error("Oracle call failed: {message}")]
    OracleFailed { message: String },

    /// A tool-loop tool failed while handling its input.
    #[error("Tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },

    /// A prompt template failed to render.
    #[error("Failed to render prompt: {0}")]
    Prompt(#[from] minijinja::Error),
}

impl SolveError {
    /// Creates a `BudgetExceeded` error.
    pub fn budget_exceeded(allowance: u64, operation: Charge) -> Self {
        Self::BudgetExceeded {
            allowance,
            operation,
        }
    }

    /// Creates an `UnparsableOutput` error carrying the raw oracle text.
    pub fn unparsable_output(output: impl Into<String>) -> Self {
        Self::UnparsableOutput {
            output: output.into(),
        }
    }

    /// Creates an `UnknownTool` error.
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    /// Creates an `InvalidLookupInput` error from the offending type name.
    pub fn invalid_lookup_input(found: impl Into<String>) -> Self {
        Self::InvalidLookupInput {
            found: found.into(),
        }
    }

    /// Creates an `ExecutionFailed` error.
    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            message: message.into(),
        }
    }

    /// Creates a `LoopBudgetExceeded` error.
    pub fn loop_budget_exceeded(max_iterations: u32) -> Self {
        Self::LoopBudgetExceeded { max_iterations }
    }

    /// Creates an `OracleFailed` error from a collaborator error chain.
    pub fn oracle_failed(err: &anyhow::Error) -> Self {
        Self::OracleFailed {
            message: format!("{err:#}"),
        }
    }

    /// Creates a `ToolFailed` error from a collaborator error chain.
    pub fn tool_failed(tool: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: format!("{err:#}"),
        }
    }

    /// Returns true if the shared budget ran out.
    pub fn is_budget_exceeded(&self) -> bool {
        matches!(self, Self::BudgetExceeded { .. })
    }

    /// Returns true if the oracle output could not be parsed.
    pub fn is_unparsable_output(&self) -> bool {
        matches!(self, Self::UnparsableOutput { .. })
    }

    /// Returns true if the oracle named an unregistered tool.
    pub fn is_unknown_tool(&self) -> bool {
        matches!(self, Self::UnknownTool { .. })
    }

    /// Returns true if sandboxed execution failed.
    pub fn is_execution_failed(&self) -> bool {
        matches!(self, Self::ExecutionFailed { .. })
    }

    /// Returns true if the tool loop ran out of iterations.
    pub fn is_loop_budget_exceeded(&self) -> bool {
        matches!(self, Self::LoopBudgetExceeded { .. })
    }
}
