//! Configuration for ingestion, retrieval, and external calls.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::retry::RetryPolicy;

/// How documents are split into chunks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// Fixed-size windows advancing by `chunk_size - chunk_overlap`.
    #[default]
    Fixed,
    /// Paragraph, then sentence, then word boundaries.
    Recursive,
}

impl std::str::FromStr for ChunkingStrategy {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "recursive" => Ok(Self::Recursive),
            other => Err(RagError::ConfigError(format!("unknown chunking strategy '{other}'"))),
        }
    }
}

/// Configuration parameters for the answer pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Chunking strategy used at ingestion.
    pub chunking: ChunkingStrategy,
    /// Number of chunks retrieved per query.
    pub top_k: usize,
    /// Longest accepted query, in characters, after trimming.
    pub max_query_chars: usize,
    /// Per-attempt timeout for embedding and generation calls.
    pub call_timeout_secs: u64,
    /// Attempts per external call, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each further attempt.
    pub retry_base_delay_ms: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            chunking: ChunkingStrategy::Fixed,
            top_k: 4,
            max_query_chars: 1000,
            call_timeout_secs: 30,
            max_attempts: 3,
            retry_base_delay_ms: 500,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `max_query_chars == 0`
    /// - `max_attempts == 0` or `call_timeout_secs == 0`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.max_query_chars == 0 {
            return Err(RagError::ConfigError(
                "max_query_chars must be greater than zero".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(RagError::ConfigError("max_attempts must be at least one".to_string()));
        }
        if self.call_timeout_secs == 0 {
            return Err(RagError::ConfigError(
                "call_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The retry policy applied to embedding and generation calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts)
            .with_base_delay(Duration::from_millis(self.retry_base_delay_ms))
            .with_timeout(Duration::from_secs(self.call_timeout_secs))
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the chunking strategy.
    pub fn chunking(mut self, strategy: ChunkingStrategy) -> Self {
        self.config.chunking = strategy;
        self
    }

    /// Set the number of chunks retrieved per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the longest accepted query length.
    pub fn max_query_chars(mut self, max: usize) -> Self {
        self.config.max_query_chars = max;
        self
    }

    /// Set the per-attempt timeout for external calls.
    pub fn call_timeout_secs(mut self, secs: u64) -> Self {
        self.config.call_timeout_secs = secs;
        self
    }

    /// Set the number of attempts per external call.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Set the delay before the first retry.
    pub fn retry_base_delay_ms(mut self, millis: u64) -> Self {
        self.config.retry_base_delay_ms = millis;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
