//! # serene-rag
//!
//! Retrieval-augmented answering for a supportive mental-health chatbot.
//!
//! ## Overview
//!
//! Documents are chunked and embedded once at startup into an in-memory
//! [`SemanticIndex`]. Each query then runs through an [`AnswerPipeline`]:
//!
//! - **Gates**: length validation, then crisis detection. A crisis query
//!   gets a fixed resources response and never reaches the model.
//! - **Retrieve**: top-k chunks by cosine similarity.
//! - **Generate**: one model call with the retrieved context.
//! - **Finish**: a disclaimer is appended to every generated answer.
//!
//! Upstream failures never escape as errors: the pipeline returns
//! [`Outcome::Unavailable`] with a generic message and logs the detail.
//!
//! Alongside the pipeline, [`SurveyRecommender`] suggests articles from
//! health-survey answers and [`TopicTitler`] names a conversation.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use serene_rag::{AnswerPipeline, RagConfig, initialize, load_documents};
//! use serene_rag::mock::{EchoGenerationProvider, HashEmbeddingProvider};
//!
//! let config = RagConfig::default();
//! let documents = load_documents("documents/*.txt")?;
//! let index = initialize(&documents, &config, Arc::new(HashEmbeddingProvider::default())).await?;
//!
//! let pipeline = AnswerPipeline::builder()
//!     .config(config)
//!     .index(Arc::new(index))
//!     .generator(Arc::new(EchoGenerationProvider::new()))
//!     .build()?;
//!
//! let outcome = pipeline.answer("How can I calm down?").await;
//! ```
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `openai` | OpenAI embeddings and chat completions |
//! | `gemini` | Gemini `generateContent` |
//! | `full` | Both providers |

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod finisher;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod generation;
pub mod index;
pub mod loader;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod retry;
pub mod safety;
pub mod survey;
pub mod topic;

pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker, chunker_for};
pub use config::{ChunkingStrategy, RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use finisher::{DISCLAIMER, finish};
#[cfg(feature = "gemini")]
pub use gemini::GeminiGenerationProvider;
pub use generation::GenerationProvider;
pub use index::{SemanticIndex, cosine_similarity, initialize};
pub use loader::load_documents;
#[cfg(feature = "openai")]
pub use openai::{OpenAIChatProvider, OpenAIEmbeddingProvider};
pub use pipeline::{
    AnswerPipeline, AnswerPipelineBuilder, Failure, GENERIC_FAILURE, NOT_ENOUGH_INFORMATION,
    Outcome, PipelineState, Stage,
};
pub use retry::{RetryPolicy, RetryingEmbedder, RetryingGenerator};
pub use safety::{CRISIS_RESPONSE, CrisisGate, Gate, GateVerdict, LengthGate, detect_crisis};
pub use survey::{Recommendation, SurveyOutcome, SurveyRecommender};
pub use topic::TopicTitler;
