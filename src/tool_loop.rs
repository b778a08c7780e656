//! Bounded reason-act-observe loop.
//!
//! ```text
//! Idle -> Awaiting Oracle -> Parsing -> Dispatching Tool -> Awaiting Oracle ...
//!                                    -> Final Answer | error
//! ```
//!
//! Every response either ends the run or names one tool. The tool's result
//! is appended to the trace, which is resent in full on the next turn.

use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::ToolLoopConfig;
use crate::error::SolveError;
use crate::oracle::Oracle;
use crate::prompt::{PromptBuilder, OBSERVATION, THOUGHT};
use crate::response::{parse_action, Action};
use crate::tools::ToolSet;

/// Result of a run that reached a final answer.
#[derive(Debug, Clone)]
pub(crate) struct LoopOutcome {
    pub answer: String,
    /// Oracle calls made, the final one included.
    pub iterations: u32,
    /// Thought/action/observation blocks in order.
    pub trace: Vec<String>,
}

pub(crate) struct ToolLoop {
    oracle: Arc<dyn Oracle>,
    tools: ToolSet,
    prompts: PromptBuilder,
    max_iterations: u32,
}

impl ToolLoop {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        tools: ToolSet,
        config: &ToolLoopConfig,
    ) -> Result<Self, SolveError> {
        Ok(Self {
            oracle,
            tools,
            prompts: PromptBuilder::new()?,
            max_iterations: config.max_iterations,
        })
    }

    /// Runs until a final answer, an error, or the iteration cap.
    pub async fn run(&self, question: &str) -> Result<LoopOutcome, SolveError> {
        let span = info_span!("ask", run = %Uuid::new_v4());
        self.run_inner(question).instrument(span).await
    }

    async fn run_inner(&self, question: &str) -> Result<LoopOutcome, SolveError> {
        let head = self.prompts.tool_loop(question, &self.tools)?;
        debug!("Prompt:\n{}", head);
        let mut trace: Vec<String> = Vec::new();

        for iteration in 1..=self.max_iterations {
            let prompt = PromptBuilder::tool_loop_turn(&head, &trace);
            let generated = self
                .oracle
                .generate(&prompt.text, &prompt.stop)
                .await
                .map_err(|e| SolveError::oracle_failed(&e))?;
            debug!(iteration, "Oracle said:\n{}", generated);

            match parse_action(&generated)? {
                Action::Final(answer) => {
                    info!("Final answer after {} iteration(s)", iteration);
                    return Ok(LoopOutcome {
                        answer,
                        iterations: iteration,
                        trace,
                    });
                }
                Action::Tool { name, input } => {
                    let tool = self.tools.get(&name)?;
                    info!(iteration, "{}({:?})", name, input);
                    let observation = tool
                        .call(&input)
                        .await
                        .map_err(|e| SolveError::tool_failed(&name, &e))?;
                    debug!("Observation: {}", observation);
                    trace.push(format!("{generated}\n{OBSERVATION} {observation}\n{THOUGHT}"));
                }
            }
        }

        Err(SolveError::loop_budget_exceeded(self.max_iterations))
    }
}
