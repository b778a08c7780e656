use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::{Lookup, NO_RESULT};

/// Lookup with no outside access; every query finds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineLookup;

#[async_trait]
impl Lookup for OfflineLookup {
    fn name(&self) -> &'static str {
        "Offline"
    }

    async fn lookup(&self, query: &str) -> Result<String> {
        debug!("Offline lookup for {:?}", query);
        Ok(NO_RESULT.to_string())
    }
}
