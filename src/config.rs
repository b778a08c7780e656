use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::lookup::LookupProvider;
use crate::oracle::OracleProvider;

pub const CONFIG_FILE: &str = "ouroboros.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub tool_loop: ToolLoopConfig,
}

/// Oracle configuration - selects and configures the text generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Which oracle to use: "openai" or "command"
    #[serde(default = "default_oracle_provider")]
    pub provider: String,

    /// OpenAI-compatible chat completions configuration
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// External command configuration
    #[serde(default)]
    pub command: CommandConfig,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: default_oracle_provider(),
            openai: OpenAiConfig::default(),
            command: CommandConfig::default(),
        }
    }
}

impl OracleConfig {
    /// Parse the provider string into an `OracleProvider`
    pub fn get_provider(&self) -> Result<OracleProvider> {
        self.provider.parse()
    }
}

fn default_oracle_provider() -> String {
    "openai".to_string()
}

/// Chat completions endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Model name sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// API root; any OpenAI-compatible server works
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Attempts per request, counting the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            base_url: default_openai_base_url(),
            api_key_env: default_openai_key_env(),
            request_timeout_secs: default_request_timeout(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f32 {
    0.5
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// External command oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Command line, split like a shell would; the prompt arrives on stdin
    /// - Example: "llm -m gpt-4o"
    /// - Example: "ollama run llama3"
    #[serde(default = "default_command")]
    pub command: String,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
        }
    }
}

fn default_command() -> String {
    "llm".to_string()
}

/// Lookup configuration - selects the information source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Which lookup to use: "serpapi" or "offline"
    #[serde(default = "default_lookup_provider")]
    pub provider: String,

    /// SerpAPI Google search configuration
    #[serde(default)]
    pub serpapi: SerpApiConfig,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            provider: default_lookup_provider(),
            serpapi: SerpApiConfig::default(),
        }
    }
}

impl LookupConfig {
    /// Parse the provider string into a `LookupProvider`
    pub fn get_provider(&self) -> Result<LookupProvider> {
        self.provider.parse()
    }
}

fn default_lookup_provider() -> String {
    "serpapi".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerpApiConfig {
    /// Environment variable holding the API key
    #[serde(default = "default_serpapi_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_engine")]
    pub engine: String,

    #[serde(default = "default_google_domain")]
    pub google_domain: String,

    /// Country of the search
    #[serde(default = "default_gl")]
    pub gl: String,

    /// Language of the search
    #[serde(default = "default_hl")]
    pub hl: String,

    #[serde(default = "default_serpapi_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for SerpApiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_serpapi_key_env(),
            engine: default_engine(),
            google_domain: default_google_domain(),
            gl: default_gl(),
            hl: default_hl(),
            base_url: default_serpapi_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_serpapi_key_env() -> String {
    "SERPAPI_API_KEY".to_string()
}

fn default_engine() -> String {
    "google".to_string()
}

fn default_google_domain() -> String {
    "google.com".to_string()
}

fn default_gl() -> String {
    "us".to_string()
}

fn default_hl() -> String {
    "en".to_string()
}

fn default_serpapi_base_url() -> String {
    "https://serpapi.com/search.json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Shared budget for one top-level call
    #[serde(default = "default_allowance")]
    pub allowance: u64,

    /// Whether generated code may call the executor recursively
    #[serde(default = "default_true")]
    pub recursion: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            allowance: default_allowance(),
            recursion: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Wall-clock limit per script in seconds
    #[serde(default = "default_sandbox_timeout")]
    pub timeout_secs: u64,

    /// Iterations any single loop in a script may run
    #[serde(default = "default_max_loop_iterations")]
    pub max_loop_iterations: u64,

    /// Depth of nested function calls in a script
    #[serde(default = "default_max_recursion")]
    pub max_recursion: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_sandbox_timeout(),
            max_loop_iterations: default_max_loop_iterations(),
            max_recursion: default_max_recursion(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolLoopConfig {
    /// Oracle calls before the loop gives up
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

impl Default for ToolLoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_allowance() -> u64 {
    20
}

fn default_sandbox_timeout() -> u64 {
    60
}

fn default_max_loop_iterations() -> u64 {
    1_000_000
}

fn default_max_recursion() -> usize {
    512
}

fn default_max_iterations() -> u32 {
    5
}

impl Config {
    /// Load configuration from file, using defaults if not found
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_file(&config_path)
    }

    /// Load configuration from an explicit path, which must exist
    pub fn load_file(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        Ok(config)
    }

    /// Load from `--config` when given, otherwise from the working directory,
    /// falling back to the user configuration directory
    pub fn resolve(explicit: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_file(path);
        }

        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        if cwd.join(CONFIG_FILE).exists() {
            return Self::load(&cwd);
        }

        match user_config_path() {
            Some(path) if path.exists() => Self::load_file(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// `~/.config/ouroboros/ouroboros.toml` or the platform equivalent
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ouroboros").join(CONFIG_FILE))
}
