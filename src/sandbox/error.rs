//! Failures of a script run.
//!
//! A capability failure keeps the original [`SolveError`], so a budget or
//! lookup failure deep inside a script reaches the caller unchanged. Anything
//! the engine itself reports becomes an execution failure.

use std::time::Duration;

use crate::error::SolveError;

/// Errors that can occur while compiling or running a script.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// The script is not a complete, well-formed program.
    #[error("Syntax error: {message}")]
    Syntax { message: String },

    /// The script threw, or a promise it awaited rejected.
    #[error("Uncaught {message}")]
    Thrown { message: String },

    /// The engine could not run the script or read back its result.
    #[error("Runtime error: {message}")]
    Runtime { message: String },

    /// Execution exceeded the configured wall-clock timeout.
    #[error("Script execution timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// An injected capability failed; the original error is preserved.
    #[error(transparent)]
    Capability(Box<SolveError>),
}

impl SandboxError {
    /// Creates a `Syntax` error.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
        }
    }

    /// Creates a `Thrown` error.
    pub fn thrown(message: impl Into<String>) -> Self {
        Self::Thrown {
            message: message.into(),
        }
    }

    /// Creates a `Runtime` error.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }

    /// Creates a `Timeout` error from a `Duration`.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Returns true if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns true if this is a syntax error.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }

    /// Returns true if the script threw.
    pub fn is_thrown(&self) -> bool {
        matches!(self, Self::Thrown { .. })
    }
}

impl From<SolveError> for SandboxError {
    fn from(err: SolveError) -> Self {
        Self::Capability(Box::new(err))
    }
}

impl From<SandboxError> for SolveError {
    /// Capability failures pass through unchanged; everything else the
    /// sandbox raises is an execution failure.
    fn from(err: SandboxError) -> Self {
        match err {
            SandboxError::Capability(inner) => *inner,
            other => SolveError::execution_failed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::Charge;

    #[test]
    fn test_syntax_error() {
        let err = SandboxError::syntax("SyntaxError: unexpected token");
        assert!(err.is_syntax());
        assert!(!err.is_timeout());
        assert_eq!(
            err.to_string(),
            "Syntax error: SyntaxError: unexpected token"
        );
    }

    #[test]
    fn test_timeout_error() {
        let err = SandboxError::timeout(Duration::from_millis(1500));
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Script execution timed out after 1500 ms");
    }

    #[test]
    fn test_thrown_error() {
        let err = SandboxError::thrown("Error: nope");
        assert!(err.is_thrown());
        assert_eq!(err.to_string(), "Uncaught Error: nope");
    }

    #[test]
    fn test_capability_error_passes_through() {
        let err = SandboxError::from(SolveError::budget_exceeded(3, Charge::Lookup));
        let solve: SolveError = err.into();
        assert!(solve.is_budget_exceeded());
    }

    #[test]
    fn test_script_errors_become_execution_failed() {
        let solve: SolveError = SandboxError::thrown("Error: nope").into();
        assert!(solve.is_execution_failed());
        assert_eq!(
            solve.to_string(),
            "Sandboxed execution failed: Uncaught Error: nope"
        );

        let solve: SolveError = SandboxError::timeout(Duration::from_secs(1)).into();
        assert!(solve.is_execution_failed());
    }
}
