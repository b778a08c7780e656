//! External command oracle
//!
//! Runs a configured command line and pipes the prompt via stdin:
//! ```bash
//! llm -m gpt-4o < prompt
//! ```
//!
//! The command has no notion of stop sequences, so the completion is cut at
//! the first one after it exits.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::{truncate_at_stop, Oracle};
use crate::config::CommandConfig;

/// Oracle backed by any program that reads a prompt and prints a completion
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
}

impl CommandOracle {
    pub fn new(config: &CommandConfig) -> Result<Self> {
        let mut words = shell_words::split(&config.command)
            .with_context(|| format!("Failed to parse oracle command: {}", config.command))?;
        if words.is_empty() {
            anyhow::bail!("Oracle command is empty; set [oracle.command] command in ouroboros.toml");
        }
        let program = words.remove(0);
        Ok(Self {
            program,
            args: words,
        })
    }
}

#[async_trait]
impl Oracle for CommandOracle {
    fn name(&self) -> &'static str {
        "Command"
    }

    async fn generate(&self, prompt: &str, stop: &[String]) -> Result<String> {
        info!("Running oracle command: {}", self.program);
        debug!("Oracle args: {:?}", self.args);

        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| {
                format!(
                    "Failed to run oracle command '{}'.\n\
                     \n\
                     Configure it in ouroboros.toml:\n\
                     [oracle.command]\n\
                     command = \"llm -m gpt-4o\"",
                    self.program
                )
            })?;

        // Feed stdin while draining stdout so a chatty command cannot stall on a full pipe
        let stdin = child.stdin.take();
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(prompt.as_bytes()).await {
                Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
                Err(e) => Err(e),
                Ok(()) => stdin.flush().await,
            }
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.context("Failed to wait for oracle command")?;
        fed.context("Failed to write prompt to oracle command")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Oracle stderr: {}", stderr);
            anyhow::bail!(
                "Oracle command failed with exit code {:?}:\n{}",
                output.status.code(),
                stderr
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("Output length: {} bytes", stdout.len());
        Ok(truncate_at_stop(&stdout, stop).to_string())
    }
}
