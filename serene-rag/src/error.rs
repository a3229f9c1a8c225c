//! Error types for the `serene-rag` crate.

use thiserror::Error;

/// Errors that can occur while ingesting documents or answering a query.
///
/// None of these cross the [`AnswerPipeline`](crate::AnswerPipeline) boundary:
/// the pipeline folds them into an [`Outcome`](crate::Outcome). They do
/// surface from startup calls such as [`initialize`](crate::initialize) and
/// [`RagConfigBuilder::build`](crate::RagConfigBuilder::build).
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while calling the generation model.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An external call did not complete within its time budget.
    #[error("{operation} timed out after {millis}ms")]
    Timeout {
        /// The operation that was abandoned.
        operation: String,
        /// The per-attempt time budget in milliseconds.
        millis: u64,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The document source could not be read.
    #[error("Loader error ({source_path}): {message}")]
    LoaderError {
        /// The path or pattern being loaded.
        source_path: String,
        /// A description of the failure.
        message: String,
    },

    /// An error in the pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl RagError {
    /// Whether retrying the failed operation could succeed.
    ///
    /// Upstream provider failures and timeouts are transient. Configuration,
    /// loader and stage-order errors are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RagError::EmbeddingError { .. }
                | RagError::GenerationError { .. }
                | RagError::Timeout { .. }
        )
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
