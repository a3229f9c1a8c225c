//! Generation model trait.

use async_trait::async_trait;

use crate::error::Result;

/// A stateless, single-turn text generation model.
///
/// No conversation history is passed: every call is one prompt in, one
/// complete answer out.
///
/// # Example
///
/// ```rust,ignore
/// use serene_rag::GenerationProvider;
///
/// let answer = model.generate("Summarise: ...").await?;
/// ```
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Generate a complete response for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
