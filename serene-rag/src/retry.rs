//! Timeouts and capped retries for external calls.
//!
//! Embedding and generation calls are the only unbounded-latency operations
//! in the pipeline. [`RetryPolicy`] bounds each attempt with a timeout and
//! retries transient failures with exponential backoff. [`RetryingEmbedder`]
//! and [`RetryingGenerator`] wrap any provider, so the pipeline itself never
//! needs to know whether retries are in play.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;

/// How many times to attempt an external call and how long each attempt may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_millis(500), timeout: None }
    }
}

impl RetryPolicy {
    /// A policy making at most `max_attempts` attempts (at least one).
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts: max_attempts.max(1), ..Self::default() }
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self::new(1)
    }

    /// Set the delay before the first retry. Each further retry doubles it.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Abandon any attempt that runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Maximum number of attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Per-attempt timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Delay after the failed attempt numbered `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }

    /// Run `call` until it succeeds, fails permanently, or attempts run out.
    ///
    /// An attempt exceeding the timeout counts as a transient
    /// [`RagError::Timeout`]. Non-transient errors are returned immediately.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            let result = match self.timeout {
                Some(limit) => tokio::time::timeout(limit, call()).await.unwrap_or_else(|_| {
                    Err(RagError::Timeout {
                        operation: operation.to_string(),
                        millis: limit.as_millis() as u64,
                    })
                }),
                None => call().await,
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        error!(operation, attempts = attempt, error = %e, "giving up");
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// An [`EmbeddingProvider`] that applies a [`RetryPolicy`] to another provider.
pub struct RetryingEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    policy: RetryPolicy,
}

impl RetryingEmbedder {
    /// Wrap `inner` with `policy`.
    pub fn new(inner: Arc<dyn EmbeddingProvider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl EmbeddingProvider for RetryingEmbedder {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.policy.run("embed", || self.inner.embed(text)).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.policy.run("embed_batch", || self.inner.embed_batch(texts)).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

/// A [`GenerationProvider`] that applies a [`RetryPolicy`] to another provider.
pub struct RetryingGenerator {
    inner: Arc<dyn GenerationProvider>,
    policy: RetryPolicy,
}

impl RetryingGenerator {
    /// Wrap `inner` with `policy`.
    pub fn new(inner: Arc<dyn GenerationProvider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl GenerationProvider for RetryingGenerator {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.policy.run("generate", || self.inner.generate(prompt)).await
    }
}
