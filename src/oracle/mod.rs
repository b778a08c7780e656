//! Oracles: black-box text generators.
//!
//! This module provides a unified interface over the services that turn a
//! prompt into text:
//! - OpenAI: any chat-completions endpoint (`POST {base_url}/chat/completions`)
//! - Command: an external program that reads the prompt on stdin
//!
//! The provider is selected via `[oracle].provider` in ouroboros.toml.

mod command;
#[cfg(test)]
pub(crate) mod mock;
mod openai;

pub(crate) use command::CommandOracle;
pub(crate) use openai::OpenAiOracle;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::OracleConfig;

/// Trait for text generators.
#[async_trait]
pub(crate) trait Oracle: Send + Sync {
    /// Returns the oracle name for display.
    fn name(&self) -> &'static str;

    /// Generates a continuation of `prompt`, ending before any of `stop`.
    async fn generate(&self, prompt: &str, stop: &[String]) -> Result<String>;
}

/// Supported oracle providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum OracleProvider {
    /// OpenAI-compatible chat completions over HTTP.
    #[default]
    OpenAi,
    /// External command reading the prompt on stdin.
    Command,
}

impl std::fmt::Display for OracleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Command => write!(f, "command"),
        }
    }
}

impl std::str::FromStr for OracleProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "command" => Ok(Self::Command),
            _ => anyhow::bail!("Unknown oracle provider: '{s}'. Supported: openai, command"),
        }
    }
}

/// Builds the configured oracle.
pub(crate) fn build_oracle(config: &OracleConfig) -> Result<Arc<dyn Oracle>> {
    Ok(match config.get_provider()? {
        OracleProvider::OpenAi => Arc::new(OpenAiOracle::new(config.openai.clone())?),
        OracleProvider::Command => Arc::new(CommandOracle::new(&config.command)?),
    })
}

/// Cuts `text` at the earliest occurrence of any stop sequence.
pub(crate) fn truncate_at_stop<'a>(text: &'a str, stop: &[String]) -> &'a str {
    stop.iter()
        .filter(|s| !s.is_empty())
        .filter_map(|s| text.find(s.as_str()))
        .min()
        .map_or(text, |end| &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_display() {
        assert_eq!(format!("{}", OracleProvider::OpenAi), "openai");
        assert_eq!(format!("{}", OracleProvider::Command), "command");
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!(
            "openai".parse::<OracleProvider>().unwrap(),
            OracleProvider::OpenAi
        );
        assert_eq!(
            "Command".parse::<OracleProvider>().unwrap(),
            OracleProvider::Command
        );
        assert!("cursor".parse::<OracleProvider>().is_err());
    }

    #[test]
    fn test_truncate_at_earliest_stop() {
        let stop = vec!["\nObservation:".to_string(), "EOF".to_string()];
        assert_eq!(
            truncate_at_stop("Action: X\nObservation: y EOF", &stop),
            "Action: X"
        );
        assert_eq!(truncate_at_stop("return 1;\nEOF\nmore", &stop), "return 1;\n");
        assert_eq!(truncate_at_stop("no stops here", &stop), "no stops here");
        assert_eq!(truncate_at_stop("text", &[String::new()]), "text");
    }

    #[test]
    fn test_build_command_oracle() {
        let mut config = OracleConfig {
            provider: "command".to_string(),
            ..OracleConfig::default()
        };
        config.command.command = "cat".to_string();
        let oracle = build_oracle(&config).unwrap();
        assert_eq!(oracle.name(), "Command");
    }
}
