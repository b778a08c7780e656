//! Mock oracle for testing.
//!
//! Returns predetermined completions so the tool loop and the executor can
//! be driven end to end without a model.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{truncate_at_stop, Oracle};

type Responder = dyn Fn(&str) -> MockResponse + Send + Sync;

/// A mock oracle.
///
/// Returns configurable responses and records prompts for test assertions.
#[derive(Clone)]
pub(crate) struct MockOracle {
    /// Responses to return in order. Cycles if more invocations than responses.
    responses: Arc<Vec<MockResponse>>,
    /// Picks a response from the prompt instead of by position.
    responder: Option<Arc<Responder>>,
    /// Number of times `generate` has been called.
    invocation_count: Arc<AtomicUsize>,
    /// Every prompt received, in call order.
    prompts: Arc<Mutex<Vec<String>>>,
}

/// A single mock response configuration.
#[derive(Debug, Clone)]
pub(crate) enum MockResponse {
    /// Return the given completion, cut at the caller's stop sequences.
    Success(String),
    /// Return an error with the given message.
    Error(String),
}

impl MockOracle {
    /// Create a mock that returns the given responses in order.
    ///
    /// If invoked more times than responses, it cycles back to the first.
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(responses),
            responder: None,
            invocation_count: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always succeeds with the given completion.
    pub fn always_succeed(output: &str) -> Self {
        Self::new(vec![MockResponse::Success(output.to_string())])
    }

    /// Create a mock that always fails with the given error.
    pub fn always_fail(error: &str) -> Self {
        Self::new(vec![MockResponse::Error(error.to_string())])
    }

    /// Create a mock whose completion depends on the prompt.
    ///
    /// Useful when concurrent callers make the call order unpredictable.
    pub fn respond_with(
        responder: impl Fn(&str) -> MockResponse + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Some(Arc::new(responder)),
            ..Self::new(Vec::new())
        }
    }

    /// Get the number of times `generate` was called.
    pub fn invocation_count(&self) -> usize {
        self.invocation_count.load(Ordering::SeqCst)
    }

    /// Get every prompt received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Oracle for MockOracle {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn generate(&self, prompt: &str, stop: &[String]) -> Result<String> {
        let count = self.invocation_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let response = match &self.responder {
            Some(responder) => responder(prompt),
            None => self.responses[count % self.responses.len()].clone(),
        };

        match response {
            MockResponse::Success(output) => Ok(truncate_at_stop(&output, stop).to_string()),
            MockResponse::Error(msg) => anyhow::bail!("{msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_oracle_name() {
        let oracle = MockOracle::always_succeed("ok");
        assert_eq!(oracle.name(), "Mock");
    }

    #[tokio::test]
    async fn test_mock_oracle_success() {
        let oracle = MockOracle::always_succeed("Final Answer: 42");
        let result = oracle.generate("prompt", &[]).await.unwrap();
        assert_eq!(result, "Final Answer: 42");
    }

    #[tokio::test]
    async fn test_mock_oracle_error() {
        let oracle = MockOracle::always_fail("model overloaded");
        let result = oracle.generate("prompt", &[]).await;
        assert!(result.unwrap_err().to_string().contains("model overloaded"));
    }

    #[tokio::test]
    async fn test_mock_oracle_cycles_responses() {
        let oracle = MockOracle::new(vec![
            MockResponse::Success("first".to_string()),
            MockResponse::Success("second".to_string()),
        ]);

        let r1 = oracle.generate("", &[]).await.unwrap();
        let r2 = oracle.generate("", &[]).await.unwrap();
        let r3 = oracle.generate("", &[]).await.unwrap();

        assert_eq!(r1, "first");
        assert_eq!(r2, "second");
        assert_eq!(r3, "first"); // Cycles back
    }

    #[tokio::test]
    async fn test_mock_oracle_applies_stop() {
        let oracle = MockOracle::always_succeed("return 1;\nEOF\ntrailing");
        let result = oracle.generate("", &["EOF".to_string()]).await.unwrap();
        assert_eq!(result, "return 1;\n");
    }

    #[tokio::test]
    async fn test_mock_oracle_records_prompts() {
        let oracle = MockOracle::always_succeed("ok");
        let _ = oracle.generate("one", &[]).await;
        let _ = oracle.generate("two", &[]).await;
        assert_eq!(oracle.invocation_count(), 2);
        assert_eq!(oracle.prompts(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_mock_oracle_responder() {
        let oracle = MockOracle::respond_with(|prompt| {
            MockResponse::Success(format!("saw {} bytes", prompt.len()))
        });
        assert_eq!(oracle.generate("abc", &[]).await.unwrap(), "saw 3 bytes");
    }
}
