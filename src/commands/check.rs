//! Parse a script without running it.

use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::sandbox::{ExecutionLimits, Sandbox};

pub(crate) fn run(config: &Config, script: &Path) -> Result<()> {
    let source = fs::read_to_string(script)
        .with_context(|| format!("Failed to read script: {}", script.display()))?;

    let sandbox = Sandbox::new(ExecutionLimits::from(&config.sandbox));
    sandbox
        .compile(&source)
        .with_context(|| format!("{} does not parse", script.display()))?;

    println!("{} {} parses", "✓".green().bold(), script.display());
    Ok(())
}
