//! Lookups: the one outside information source generated code may reach.
//!
//! - SerpApi: Google search through serpapi.com
//! - Offline: answers every query with the no-result sentinel
//!
//! The provider is selected via `[lookup].provider` in ouroboros.toml.

mod offline;
mod serpapi;
#[cfg(test)]
pub(crate) mod stub;

pub(crate) use offline::OfflineLookup;
pub(crate) use serpapi::SerpApiLookup;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::LookupConfig;

/// Returned when a search produced nothing usable.
pub(crate) const NO_RESULT: &str = "No good search result found";

/// Trait for text-in, text-out information sources.
#[async_trait]
pub(crate) trait Lookup: Send + Sync {
    /// Returns the lookup name for display.
    fn name(&self) -> &'static str;

    /// Answers `query` with best-effort text, or [`NO_RESULT`].
    async fn lookup(&self, query: &str) -> Result<String>;
}

/// Supported lookup providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum LookupProvider {
    /// Google search through SerpAPI.
    #[default]
    SerpApi,
    /// No outside access.
    Offline,
}

impl std::fmt::Display for LookupProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SerpApi => write!(f, "serpapi"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

impl std::str::FromStr for LookupProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serpapi" => Ok(Self::SerpApi),
            "offline" => Ok(Self::Offline),
            _ => anyhow::bail!("Unknown lookup provider: '{s}'. Supported: serpapi, offline"),
        }
    }
}

/// Builds the configured lookup.
pub(crate) fn build_lookup(config: &LookupConfig) -> Result<Arc<dyn Lookup>> {
    Ok(match config.get_provider()? {
        LookupProvider::SerpApi => Arc::new(SerpApiLookup::new(config.serpapi.clone())?),
        LookupProvider::Offline => Arc::new(OfflineLookup),
    })
}
