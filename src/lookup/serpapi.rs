//! Google search through SerpAPI
//!
//! ```text
//! GET https://serpapi.com/search.json?engine=google&q=...&google_domain=google.com&gl=us&hl=en&api_key=...
//! ```
//!
//! The answer is pulled from the richest section present, falling back to the
//! first organic snippet.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::{Lookup, NO_RESULT};
use crate::config::SerpApiConfig;

/// Sections tried in order; the first that holds a value wins.
const ANSWER_PATHS: &[&str] = &[
    "/answer_box/population",
    "/answer_box/answer",
    "/answer_box/snippet",
    "/answer_box/snippet_highlighted_words/0",
    "/sports_results/game_spotlight",
    "/knowledge_graph/description",
    "/organic_results/0/snippet",
];

/// SerpAPI search lookup
pub struct SerpApiLookup {
    config: SerpApiConfig,
    api_key: String,
    client: reqwest::Client,
}

impl SerpApiLookup {
    pub fn new(config: SerpApiConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).with_context(|| {
            format!(
                "{} is not set.\n\
                 \n\
                 Export a SerpAPI key, add it to .env, or search offline:\n\
                 [lookup]\n\
                 provider = \"offline\"",
                config.api_key_env
            )
        })?;

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
}

/// Extracts the best answer from a SerpAPI response.
pub(crate) fn extract_answer(response: &Value) -> String {
    ANSWER_PATHS
        .iter()
        .filter_map(|path| response.pointer(path))
        .find_map(|value| match value {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .unwrap_or_else(|| NO_RESULT.to_string())
}

#[async_trait]
impl Lookup for SerpApiLookup {
    fn name(&self) -> &'static str {
        "SerpApi"
    }

    async fn lookup(&self, query: &str) -> Result<String> {
        info!("Searching: {}", query);

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("engine", self.config.engine.as_str()),
                ("q", query),
                ("google_domain", self.config.google_domain.as_str()),
                ("gl", self.config.gl.as_str()),
                ("hl", self.config.hl.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("Search request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Search returned error status {status}: {body}");
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to decode search response")?;
        let answer = extract_answer(&body);
        debug!("Search answer: {}", answer);
        Ok(answer)
    }
}
