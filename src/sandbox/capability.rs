//! Capabilities a sandbox instance can be granted.
//!
//! Scripts have no ambient authority. The only way out of the engine is a
//! call to a capability in the fixed set below, and only when the
//! [`Bindings`] for that run grant it.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value as Json;

use crate::error::SolveError;

/// The fixed set of capability kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Capability {
    /// Budget-checked information lookup, bound as `lookup(query)`.
    Lookup,
    /// Budget-checked re-entry into the executor, bound as `agent(task)`.
    Recurse,
}

impl Capability {
    pub const ALL: [Capability; 2] = [Capability::Lookup, Capability::Recurse];

    /// Name under which scripts call this capability.
    pub fn binding_name(self) -> &'static str {
        match self {
            Self::Lookup => "lookup",
            Self::Recurse => "agent",
        }
    }

    /// Resolves a script identifier to a capability kind.
    pub fn from_binding_name(name: &str) -> Option<Self> {
        match name {
            "lookup" => Some(Self::Lookup),
            "agent" => Some(Self::Recurse),
            _ => None,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.binding_name())
    }
}

/// The capability functions exposed inside one sandbox instance.
///
/// Arguments and results cross the boundary as JSON, so nothing the script
/// builds (functions, promises, cycles) reaches the host.
#[async_trait]
pub(crate) trait Bindings: Send + Sync {
    /// Whether scripts in this instance may call `capability`.
    fn grants(&self, capability: Capability) -> bool;

    /// Performs one capability call.
    async fn invoke(&self, capability: Capability, argument: Json) -> Result<Json, SolveError>;
}

/// A capability call made by a script, sent to the async side.
#[derive(Debug)]
pub(super) struct CallRequest {
    pub id: u64,
    pub capability: Capability,
    pub argument: Json,
}

/// The answer to a [`CallRequest`], sent back to the script thread.
#[derive(Debug)]
pub(super) struct CallResponse {
    pub id: u64,
    pub result: Result<Json, SolveError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_names_round_trip() {
        for capability in Capability::ALL {
            assert_eq!(
                Capability::from_binding_name(capability.binding_name()),
                Some(capability)
            );
        }
        assert_eq!(Capability::from_binding_name("fetch"), None);
    }

    #[test]
    fn test_display_uses_binding_name() {
        assert_eq!(Capability::Recurse.to_string(), "agent");
    }
}
