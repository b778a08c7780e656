//! ouroboros: let a language model solve tasks by writing sandboxed code that can call itself.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod bindings;
mod budget;
mod commands;
mod config;
mod error;
mod executor;
mod lookup;
mod oracle;
mod prompt;
mod response;
mod sandbox;
mod task;
mod templates;
mod tool_loop;
mod tools;

#[derive(Parser)]
#[command(name = "ouroboros")]
#[command(
    author,
    version,
    about = "Let a language model solve tasks by writing sandboxed code that can call itself"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Configuration file (default: ./ouroboros.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write ouroboros.toml and .env.example to the current directory
    Init {
        /// Force overwrite existing files
        #[arg(short, long)]
        force: bool,
    },

    /// Answer a question with the search tool loop
    Ask {
        /// The question to answer
        question: String,

        /// Oracle calls before giving up (overrides [tool_loop].max_iterations)
        #[arg(short, long)]
        max_iterations: Option<u32>,

        /// Answer every search with "No good search result found"
        #[arg(long)]
        offline: bool,
    },

    /// Solve a task by letting the oracle write code that may call itself
    Solve {
        /// The question to solve
        #[arg(required_unless_present = "task")]
        question: Option<String>,

        /// Expected shape of the answer, e.g. "number" or "array of strings"
        #[arg(short, long, conflicts_with = "task")]
        format: Option<String>,

        /// Task as JSON (a string or an object) instead of a question
        #[arg(short, long, conflicts_with = "question")]
        task: Option<String>,

        /// Allowance shared by every call in the tree (overrides [executor].allowance)
        #[arg(short, long)]
        budget: Option<u64>,

        /// Answer every lookup with "No good search result found"
        #[arg(long)]
        offline: bool,

        /// Do not let generated code call agent()
        #[arg(long)]
        no_recursion: bool,
    },

    /// Run a script file in the sandbox with only lookup bound
    Run {
        /// Script to run
        script: PathBuf,

        /// Value of `task` as JSON (default: null)
        #[arg(short, long)]
        task: Option<String>,

        /// Allowance for lookups (overrides [executor].allowance)
        #[arg(short, long)]
        budget: Option<u64>,

        /// Answer every lookup with "No good search result found"
        #[arg(long)]
        offline: bool,
    },

    /// Parse a script file without running it
    Check {
        /// Script to check
        script: PathBuf,
    },
}

/// Installs stderr logging, plus a file layer when `log_file` is given.
///
/// The returned guard flushes the file layer when dropped.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_filter = if verbose {
        "ouroboros=debug"
    } else {
        "ouroboros=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Credentials may live in .env; a missing file is fine
    let _ = dotenvy::dotenv();

    let _guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Init { force } => {
            commands::init::run(force)?;
        }
        Commands::Ask {
            question,
            max_iterations,
            offline,
        } => {
            let mut config = config::Config::resolve(cli.config.as_ref())?;
            if let Some(max_iterations) = max_iterations {
                config.tool_loop.max_iterations = max_iterations;
            }
            commands::ask::run(&config, &question, offline).await?;
        }
        Commands::Solve {
            question,
            format,
            task,
            budget,
            offline,
            no_recursion,
        } => {
            let mut config = config::Config::resolve(cli.config.as_ref())?;
            if let Some(budget) = budget {
                config.executor.allowance = budget;
            }
            if no_recursion {
                config.executor.recursion = false;
            }
            let task = commands::solve::task_from_args(question, format.as_deref(), task.as_deref())?;
            commands::solve::run(&config, task, offline).await?;
        }
        Commands::Run {
            script,
            task,
            budget,
            offline,
        } => {
            let mut config = config::Config::resolve(cli.config.as_ref())?;
            if let Some(budget) = budget {
                config.executor.allowance = budget;
            }
            commands::run::run(&config, &script, task.as_deref(), offline).await?;
        }
        Commands::Check { script } => {
            let config = config::Config::resolve(cli.config.as_ref())?;
            commands::check::run(&config, &script)?;
        }
    }

    Ok(())
}
