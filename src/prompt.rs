//! Prompt rendering for both grammars.

use minijinja::{context, Environment};
use serde::Serialize;

use crate::error::SolveError;
use crate::task::Task;
use crate::templates::{CODEGEN_PROMPT, TOOL_LOOP_PROMPT};
use crate::tools::ToolSet;

pub(crate) const OBSERVATION: &str = "Observation:";
pub(crate) const THOUGHT: &str = "Thought:";

/// Ends every generated script body.
pub(crate) const END_MARKER: &str = "EOF";

/// Rendered prompt text and the stop sequences that go with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Prompt {
    pub text: String,
    pub stop: Vec<String>,
}

#[derive(Serialize)]
struct ToolEntry<'a> {
    name: &'a str,
    description: &'a str,
}

/// Template engine holding both prompt grammars.
pub(crate) struct PromptBuilder {
    env: Environment<'static>,
}

impl PromptBuilder {
    pub fn new() -> Result<Self, SolveError> {
        let mut env = Environment::new();
        env.add_template("tool_loop", TOOL_LOOP_PROMPT)?;
        env.add_template("codegen", CODEGEN_PROMPT)?;
        Ok(Self { env })
    }

    /// Renders the fixed head of a tool-loop conversation.
    pub fn tool_loop(&self, question: &str, tools: &ToolSet) -> Result<String, SolveError> {
        let tools: Vec<_> = tools
            .iter()
            .map(|tool| ToolEntry {
                name: tool.name(),
                description: tool.description(),
            })
            .collect();
        let rendered = self.env.get_template("tool_loop")?.render(context! {
            tools => tools,
            question => question,
        })?;
        Ok(rendered)
    }

    /// Appends the conversation so far to the tool-loop head.
    ///
    /// Stops keep the oracle from writing its own observation.
    pub fn tool_loop_turn(head: &str, trace: &[String]) -> Prompt {
        Prompt {
            text: format!("{head}{}", trace.join("\n")),
            stop: vec![format!("\n{OBSERVATION}"), format!("\n\t{OBSERVATION}")],
        }
    }

    /// Renders the code-generation prompt for `task`.
    ///
    /// The prompt ends where the script body begins.
    pub fn codegen(&self, task: &Task, recursion: bool) -> Result<Prompt, SolveError> {
        let text = self.env.get_template("codegen")?.render(context! {
            task => task.to_json_string(),
            recursion => recursion,
            end_marker => END_MARKER,
        })?;
        Ok(Prompt {
            text,
            stop: vec![END_MARKER.to_string()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::stub::StaticLookup;
    use crate::tools::SearchTool;
    use std::sync::Arc;

    fn search_tools() -> ToolSet {
        let mut tools = ToolSet::new();
        tools
            .register(Arc::new(SearchTool::new(Arc::new(StaticLookup::new("x")))))
            .unwrap();
        tools
    }

    #[test]
    fn test_tool_loop_lists_tools_and_question() {
        let head = PromptBuilder::new()
            .unwrap()
            .tool_loop("What is 2 times 21?", &search_tools())
            .unwrap();
        assert!(head.starts_with("You can use tools to get new information."));
        assert!(head.contains("\nGoogleSearch: Get specific information from a search query."));
        assert!(head.contains("exactly one element of [GoogleSearch]\n"));
        assert!(head.ends_with("Question: What is 2 times 21?\nThought: "));
    }

    #[test]
    fn test_tool_loop_turn_joins_trace() {
        let trace = vec!["a\nObservation: 1\nThought:".to_string(), "b".to_string()];
        let prompt = PromptBuilder::tool_loop_turn("HEAD ", &trace);
        assert_eq!(prompt.text, "HEAD a\nObservation: 1\nThought:\nb");
        assert_eq!(prompt.stop, vec!["\nObservation:", "\n\tObservation:"]);
    }

    #[test]
    fn test_tool_loop_turn_with_empty_trace() {
        let prompt = PromptBuilder::tool_loop_turn("HEAD", &[]);
        assert_eq!(prompt.text, "HEAD");
    }

    #[test]
    fn test_codegen_ends_with_task() {
        let task = Task::question("What is 2 times 21?", Some("number"));
        let prompt = PromptBuilder::new().unwrap().codegen(&task, true).unwrap();
        assert!(prompt
            .text
            .ends_with("Task: {\"format\":\"number\",\"question\":\"What is 2 times 21?\"}\nBody:"));
        assert_eq!(prompt.stop, vec!["EOF"]);
    }

    #[test]
    fn test_codegen_mentions_agent_only_with_recursion() {
        let builder = PromptBuilder::new().unwrap();
        let task = Task::Text("q".to_string());
        let with = builder.codegen(&task, true).unwrap();
        let without = builder.codegen(&task, false).unwrap();
        assert!(with.text.contains("await agent(subtask)"));
        assert!(!without.text.contains("agent("));
        assert!(without.text.contains("await lookup(query)"));
    }
}
