//! Parsing of oracle responses.
//!
//! The tool-loop grammar has two productions over line-oriented text:
//!
//! ```text
//! response  := ... "Final Answer:" answer
//!            | ... "Action:" ["["] name ["]"] NEWLINE* "Action Input:" WS* input
//! ```
//!
//! The code-generation grammar is raw script text up to an end marker.

use crate::error::SolveError;

pub(crate) const FINAL_ANSWER: &str = "Final Answer:";
const ACTION: &str = "Action: ";
const ACTION_INPUT: &str = "Action Input:";

/// Outcome of parsing one tool-loop response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    /// The oracle is done.
    Final(String),
    /// The oracle wants `tool` run on `input`.
    Tool { name: String, input: String },
}

/// Parses a tool-loop response.
///
/// A final answer wins over any action in the same text; the answer is
/// whatever follows the last marker.
pub(crate) fn parse_action(text: &str) -> Result<Action, SolveError> {
    if let Some((_, answer)) = text.rsplit_once(FINAL_ANSWER) {
        return Ok(Action::Final(answer.trim().to_string()));
    }

    text.match_indices(ACTION)
        .find_map(|(start, _)| tool_call(&text[start + ACTION.len()..]))
        .ok_or_else(|| SolveError::unparsable_output(text))
}

/// Matches the rest of an `Action:` line and the `Action Input:` that follows.
fn tool_call(after_marker: &str) -> Option<Action> {
    let (name, rest) = match after_marker.split_once(ACTION_INPUT) {
        // Both markers on one line
        Some((name, rest)) if !name.contains('\n') => (name, rest),
        _ => {
            let (line, rest) = after_marker.split_once('\n')?;
            (line, rest.trim_start_matches('\n').strip_prefix(ACTION_INPUT)?)
        }
    };

    let name = tool_name(name);
    let input = rest.trim_start().lines().next().unwrap_or_default();
    let input = input.trim();
    let input = input.strip_prefix('"').unwrap_or(input);
    let input = input.strip_suffix('"').unwrap_or(input);

    Some(Action::Tool {
        name: name.to_string(),
        input: input.to_string(),
    })
}

fn tool_name(raw: &str) -> &str {
    let name = raw.trim();
    let name = name.strip_prefix('[').unwrap_or(name);
    let name = name.strip_suffix(']').unwrap_or(name);
    name.trim()
}

/// Extracts script text from a code-generation response.
///
/// Cuts at the first `end_marker`, then drops a surrounding markdown fence.
/// Whether the remainder is a complete program is for the compiler to decide.
pub(crate) fn extract_code(text: &str, end_marker: &str) -> String {
    let body = text.split(end_marker).next().unwrap_or_default().trim();

    let Some(fenced) = body.strip_prefix("```") else {
        return body.to_string();
    };
    // Drop the info string (```js) along with the opening fence line
    let fenced = fenced.split_once('\n').map_or("", |(_, rest)| rest);
    fenced
        .trim_end()
        .strip_suffix("```")
        .unwrap_or(fenced)
        .trim()
        .to_string()
}
