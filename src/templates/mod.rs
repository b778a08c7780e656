//! Embedded templates.

/// Default `ouroboros.toml` configuration.
pub(crate) const OUROBOROS_TOML: &str = include_str!("ouroboros.toml");

/// Credentials file written next to the configuration.
pub(crate) const ENV_EXAMPLE: &str = include_str!("env.example");

/// Reason-act-observe prompt.
pub(crate) const TOOL_LOOP_PROMPT: &str = include_str!("tool_loop.md");

/// Code-generation prompt.
pub(crate) const CODEGEN_PROMPT: &str = include_str!("codegen.md");
