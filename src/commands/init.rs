//! Initialize ouroboros files in a directory.
//!
//! This module separates pure logic from IO by accepting closures for
//! filesystem operations, making the core logic easily testable.

use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::CONFIG_FILE;
use crate::templates;

// -----------------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------------

/// Runs the init command, writing the configuration and credentials template.
pub(crate) fn run(force: bool) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    info!("Initializing ouroboros in {}", cwd.display());

    let files = init_files();

    let results = init_project(
        &files,
        force,
        |path| cwd.join(path).exists(),
        |path, content| {
            fs::write(cwd.join(path), content)
                .with_context(|| format!("Failed to write {}", path.display()))
        },
    )?;

    print!("{}", format_results(&results, &files));

    Ok(())
}

// -----------------------------------------------------------------------------
// Internal types
// -----------------------------------------------------------------------------

/// File to be written during init, with its relative path and content.
#[derive(Debug, Clone, PartialEq, Eq)]
struct InitFile {
    /// Relative path for the file.
    path: PathBuf,
    /// File content.
    content: &'static str,
    /// Human-readable description.
    description: &'static str,
}

/// Result of attempting to write a file.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WriteResult {
    /// File was created.
    Created,
    /// File was overwritten.
    Overwritten,
    /// File was skipped (already exists).
    Skipped,
}

// -----------------------------------------------------------------------------
// Helper functions
// -----------------------------------------------------------------------------

/// Returns the list of files `init` writes.
fn init_files() -> Vec<InitFile> {
    vec![
        InitFile {
            path: PathBuf::from(CONFIG_FILE),
            content: templates::OUROBOROS_TOML,
            description: "Oracle, lookup and budget configuration",
        },
        InitFile {
            path: PathBuf::from(".env.example"),
            content: templates::ENV_EXAMPLE,
            description: "API keys (copy to .env)",
        },
    ]
}

/// Core init logic: decides which files to write and writes them.
///
/// Takes closures for IO operations to enable testing:
/// - `exists`: checks if a path exists
/// - `write_file`: writes content to a path
fn init_project<E, W>(
    files: &[InitFile],
    force: bool,
    exists: E,
    mut write_file: W,
) -> Result<Vec<(PathBuf, WriteResult)>>
where
    E: Fn(&Path) -> bool,
    W: FnMut(&Path, &str) -> Result<()>,
{
    let mut results = Vec::new();

    for file in files {
        let existed = exists(&file.path);
        let result = match (existed, force) {
            (true, false) => WriteResult::Skipped,
            (true, true) => {
                write_file(&file.path, file.content)?;
                WriteResult::Overwritten
            }
            (false, _) => {
                write_file(&file.path, file.content)?;
                WriteResult::Created
            }
        };
        results.push((file.path.clone(), result));
    }

    Ok(results)
}

/// Formats init results for display with colored output.
fn format_results(results: &[(PathBuf, WriteResult)], files: &[InitFile]) -> String {
    let mut lines = vec![
        format!("\n{} ouroboros initialized\n", "✓".green().bold()),
        "Files:".to_string(),
    ];

    for (path, result) in results {
        let desc = files
            .iter()
            .find(|f| &f.path == path)
            .map_or("", |f| f.description);

        lines.push(match result {
            WriteResult::Created => {
                format!("  {} - {}", path.display().to_string().cyan(), desc)
            }
            WriteResult::Overwritten => {
                format!("  {} {} (overwritten)", "↻".blue(), path.display())
            }
            WriteResult::Skipped => format!(
                "  {} {} (already exists, use --force to overwrite)",
                "⊘".yellow(),
                path.display()
            ),
        });
    }

    lines.push(format!("\n{}", "Next steps:".yellow().bold()));
    lines.push(format!(
        "  1. Copy {} to {} and fill in your API keys",
        ".env.example".cyan(),
        ".env".cyan()
    ));
    lines.push(format!(
        "  2. Edit {} to pick an oracle and a lookup",
        CONFIG_FILE.cyan()
    ));
    lines.push(format!(
        "  3. Run {}",
        "ouroboros solve \"What is the population of the capital of France?\"".green()
    ));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
