//! CLI command implementations.
//!
//! Each submodule implements an ouroboros CLI command with pure formatting
//! separated from IO for testability.

pub mod ask;
pub mod check;
pub mod format;
pub mod init;
pub mod run;
pub mod solve;

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::lookup::{build_lookup, Lookup, OfflineLookup};

/// Picks the configured lookup, or the offline one when asked.
pub(crate) fn select_lookup(config: &Config, offline: bool) -> Result<Arc<dyn Lookup>> {
    if offline {
        return Ok(Arc::new(OfflineLookup));
    }
    build_lookup(&config.lookup)
}
