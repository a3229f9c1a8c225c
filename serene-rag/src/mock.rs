//! Deterministic providers for tests, demos, and offline runs.
//!
//! None of these touch the network. [`HashEmbeddingProvider`] gives texts
//! that share words a positive cosine similarity and identical texts a
//! similarity of exactly one, which is enough to exercise retrieval.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0100_0000_01b3)
    })
}

/// Feature-hashing embedder: each lowercase word adds ±1 to one bucket.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    /// Create an embedder producing vectors of `dimensions` entries.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    fn name(&self) -> &str {
        "hash"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let hash = fnv1a(word.to_lowercase().as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// An embedder whose every call fails with a transient error.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingEmbeddingProvider;

#[async_trait]
impl EmbeddingProvider for FailingEmbeddingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::EmbeddingError {
            provider: "failing".into(),
            message: "quota exceeded".into(),
        })
    }

    fn dimensions(&self) -> usize {
        0
    }
}

/// A generator that returns its prompt unchanged and counts its calls.
#[derive(Debug, Default)]
pub struct EchoGenerationProvider {
    calls: AtomicUsize,
}

impl EchoGenerationProvider {
    /// Create a new echo generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times [`generate`](GenerationProvider::generate) was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for EchoGenerationProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(prompt.to_string())
    }
}

/// A generator that always replies with the same text.
#[derive(Debug)]
pub struct ScriptedGenerationProvider {
    reply: String,
    calls: AtomicUsize,
}

impl ScriptedGenerationProvider {
    /// Create a generator that always answers `reply`.
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into(), calls: AtomicUsize::new(0) }
    }

    /// Number of times [`generate`](GenerationProvider::generate) was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGenerationProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

/// A generator that fails the first `failures` calls, then echoes.
#[derive(Debug)]
pub struct FailingGenerationProvider {
    failures: usize,
    calls: AtomicUsize,
}

impl FailingGenerationProvider {
    /// A generator that never succeeds.
    pub fn always() -> Self {
        Self::times(usize::MAX)
    }

    /// A generator that fails `failures` times before succeeding.
    pub fn times(failures: usize) -> Self {
        Self { failures, calls: AtomicUsize::new(0) }
    }

    /// Number of times [`generate`](GenerationProvider::generate) was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for FailingGenerationProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(RagError::GenerationError {
                provider: "failing".into(),
                message: format!("upstream 503 on call {}", call + 1),
            });
        }
        Ok(prompt.to_string())
    }
}
