//! OpenAI chat-completions oracle
//!
//! Sends the prompt as a single user message:
//! ```text
//! POST {base_url}/chat/completions
//! {"model": "...", "temperature": 0.5, "messages": [{"role": "user", "content": "..."}], "stop": [...]}
//! ```
//!
//! Works against any server speaking the same API (OpenAI, Ollama, vLLM).

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{truncate_at_stop, Oracle};
use crate::config::OpenAiConfig;

/// The API accepts at most this many stop sequences.
const MAX_STOP_SEQUENCES: usize = 4;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

/// Chat-completions oracle
pub struct OpenAiOracle {
    config: OpenAiConfig,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiOracle {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            warn!(
                "{} is not set; requests to {} are sent without credentials",
                config.api_key_env, config.base_url
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn request_body(&self, prompt: &str, stop: &[String]) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [{"role": "user", "content": prompt}],
        });
        if !stop.is_empty() {
            body["stop"] = json!(&stop[..stop.len().min(MAX_STOP_SEQUENCES)]);
        }
        body
    }
}

/// Pulls the text of the first choice out of a response body.
fn first_choice(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .context("Chat completion returned no choices")
}

#[async_trait]
impl Oracle for OpenAiOracle {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    /// Retries 5xx, 429 and network errors with delays of 2s, 4s, ...
    #[allow(tail_expr_drop_order)]
    async fn generate(&self, prompt: &str, stop: &[String]) -> Result<String> {
        let url = self.endpoint();
        let body = self.request_body(prompt, stop);
        info!("Requesting completion from {} ({})", url, self.config.model);
        debug!("Prompt length: {} bytes", prompt.len());

        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay_secs = 1u64 << attempt;
                warn!(
                    "Completion retry attempt {} after {}s delay",
                    attempt + 1,
                    delay_secs
                );
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
            }

            let mut request = self.client.post(&url).json(&body);
            if let Some(ref key) = self.api_key {
                request = request.bearer_auth(key);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed: ChatResponse = response
                            .json()
                            .await
                            .context("Failed to decode chat completion")?;
                        let text = first_choice(parsed)?;
                        debug!("Completion length: {} bytes", text.len());
                        return Ok(truncate_at_stop(&text, stop).to_string());
                    }

                    let detail = response.text().await.unwrap_or_default();

                    if status.is_server_error() || status.as_u16() == 429 {
                        last_error = Some(format!("Completion endpoint returned {status}: {detail}"));
                        continue;
                    }

                    anyhow::bail!("Completion endpoint returned error status {status}: {detail}");
                }
                Err(e) => {
                    last_error = Some(e.to_string());
                }
            }
        }

        anyhow::bail!(
            "Completion failed after {max_attempts} attempts: {}",
            last_error.unwrap_or_else(|| "unknown error".to_string())
        )
    }
}
