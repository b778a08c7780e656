//! Scripted lookup for testing.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::Lookup;

/// Answers every query with a fixed string, optionally after a delay.
#[derive(Debug, Clone)]
pub(crate) struct StaticLookup {
    answer: String,
    delay: Option<Duration>,
    call_count: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl StaticLookup {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            delay: None,
            call_count: Arc::new(AtomicUsize::new(0)),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sleeps before answering, so concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Lookup for StaticLookup {
    fn name(&self) -> &'static str {
        "Static"
    }

    async fn lookup(&self, query: &str) -> Result<String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.answer.clone())
    }
}
