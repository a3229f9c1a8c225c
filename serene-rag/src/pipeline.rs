//! Answer pipeline orchestrator.
//!
//! The [`AnswerPipeline`] runs one query through a fixed sequence:
//!
//! 1. safety gates, in order (see [`crate::safety`]); any gate may end the run
//! 2. **Retrieve**: search the [`SemanticIndex`] for context
//! 3. **Generate**: fill the prompt template and call the model once
//! 4. finish: append the disclaimer
//!
//! Steps 2 and 3 are the [`PipelineState`] transitions
//! `Start → Retrieved → Answered`. Nothing fails across the pipeline
//! boundary: every run ends in an [`Outcome`].
//!
//! # Example
//!
//! ```rust,ignore
//! use serene_rag::{AnswerPipeline, RagConfig};
//!
//! let pipeline = AnswerPipeline::builder()
//!     .config(RagConfig::default())
//!     .index(Arc::new(index))
//!     .generator(Arc::new(model))
//!     .build()?;
//!
//! match pipeline.answer("How can I calm down?").await {
//!     Outcome::Answered { answer, .. } => println!("{answer}"),
//!     other => println!("{other:?}"),
//! }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::RagConfig;
use crate::document::SearchResult;
use crate::error::{RagError, Result};
use crate::finisher::finish;
use crate::generation::GenerationProvider;
use crate::index::SemanticIndex;
use crate::safety::{Gate, GateVerdict, default_gates};

/// Answer used when retrieval found no context at all.
pub const NOT_ENOUGH_INFORMATION: &str = "As a Mental Health subjected Chatbot, I am unable to answer this question, as I do not have any context related to it.";

/// The only text a user sees when retrieval or generation is unavailable.
pub const GENERIC_FAILURE: &str =
    "Sorry, I could not generate a response right now. Please try again in a moment.";

/// Fill the instruction template with `question` and the retrieved context.
///
/// Chunks are joined in the order given, separated by a blank line.
pub fn build_prompt(question: &str, context: &[SearchResult]) -> String {
    let context =
        context.iter().map(|result| result.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n");
    format!(
        "You are a helpful mental health assistant chatbot. Use the following context to answer the user's question.
Answer only from the context. If the context does not cover the question, say so rather than guessing.
Try to keep it within 1-2 paragraphs, and be concise and supportive.
Context:
{context}

Question: {question}

Answer:"
    )
}

/// Which external dependency was unavailable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Failure {
    /// The embedding call behind retrieval failed.
    Retrieval,
    /// The generation model call failed.
    Generation,
}

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A generated (or no-context fallback) answer with the disclaimer appended.
    Answered {
        /// The sanitized question.
        query: String,
        /// The finished answer.
        answer: String,
    },
    /// Crisis language was detected; nothing was retrieved or generated.
    Crisis {
        /// The sanitized question.
        query: String,
        /// The fixed crisis-resources response, without a disclaimer.
        response: String,
    },
    /// The query failed validation. The reason is safe to show the user.
    Rejected {
        /// User-facing reason.
        reason: String,
    },
    /// An upstream call failed after retries.
    Unavailable {
        /// The stage that failed.
        failure: Failure,
        /// Always [`GENERIC_FAILURE`].
        message: String,
    },
}

/// Progress of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing retrieved yet.
    Start,
    /// Context retrieved, no answer yet.
    Retrieved,
    /// Answer stored. Terminal.
    Answered,
}

/// Per-run state flowing through Retrieve and Generate.
///
/// Created per query and never shared between runs.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    /// The sanitized question.
    pub question: String,
    /// Retrieved chunks, most similar first.
    pub retrieved_context: Vec<SearchResult>,
    /// The model's answer, before the disclaimer.
    pub answer: Option<String>,
    stage: Stage,
}

impl PipelineState {
    /// A fresh state in [`Stage::Start`].
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            retrieved_context: Vec::new(),
            answer: None,
            stage: Stage::Start,
        }
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Retrieve transition: `Start → Retrieved`.
    ///
    /// An empty result is not an error.
    ///
    /// # Errors
    ///
    /// [`RagError::PipelineError`] when not in [`Stage::Start`]; otherwise
    /// the index's embedding error.
    pub async fn retrieve(mut self, index: &SemanticIndex, top_k: usize) -> Result<Self> {
        if self.stage != Stage::Start {
            return Err(RagError::PipelineError(format!(
                "retrieve called in stage {:?}",
                self.stage
            )));
        }
        self.retrieved_context = index.search(&self.question, top_k).await?;
        self.stage = Stage::Retrieved;
        debug!(chunks = self.retrieved_context.len(), "retrieved context");
        Ok(self)
    }

    /// Generate transition: `Retrieved → Answered`.
    ///
    /// With no retrieved context the model is not called and the answer is
    /// [`NOT_ENOUGH_INFORMATION`].
    ///
    /// # Errors
    ///
    /// [`RagError::PipelineError`] when not in [`Stage::Retrieved`]; otherwise
    /// the generator's error, including an empty reply.
    pub async fn generate(mut self, generator: &dyn GenerationProvider) -> Result<Self> {
        if self.stage != Stage::Retrieved {
            return Err(RagError::PipelineError(format!(
                "generate called in stage {:?}",
                self.stage
            )));
        }

        let answer = if self.retrieved_context.is_empty() {
            info!("no context retrieved, using fallback answer");
            NOT_ENOUGH_INFORMATION.to_string()
        } else {
            let prompt = build_prompt(&self.question, &self.retrieved_context);
            let reply = generator.generate(&prompt).await?;
            let reply = reply.trim();
            if reply.is_empty() {
                return Err(RagError::GenerationError {
                    provider: generator.name().to_string(),
                    message: "model returned an empty response".to_string(),
                });
            }
            reply.to_string()
        };

        self.answer = Some(answer);
        self.stage = Stage::Answered;
        Ok(self)
    }
}

/// The query-to-answer transform. Construct one via [`AnswerPipeline::builder()`].
///
/// Cheap to share behind an `Arc`; concurrent calls to
/// [`answer`](AnswerPipeline::answer) do not interfere.
pub struct AnswerPipeline {
    index: Arc<SemanticIndex>,
    generator: Arc<dyn GenerationProvider>,
    gates: Vec<Box<dyn Gate>>,
    top_k: usize,
}

impl std::fmt::Debug for AnswerPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerPipeline")
            .field("index", &self.index)
            .field("generator", &self.generator.name())
            .field("gates", &self.gates.iter().map(|g| g.name()).collect::<Vec<_>>())
            .field("top_k", &self.top_k)
            .finish()
    }
}

impl AnswerPipeline {
    /// Create a new [`AnswerPipelineBuilder`].
    pub fn builder() -> AnswerPipelineBuilder {
        AnswerPipelineBuilder::default()
    }

    /// The index queried during Retrieve.
    pub fn index(&self) -> &Arc<SemanticIndex> {
        &self.index
    }

    /// Names of the gates, in evaluation order.
    pub fn gate_names(&self) -> Vec<&str> {
        self.gates.iter().map(|gate| gate.name()).collect()
    }

    /// Run the gates, in order, on `raw_query`.
    ///
    /// Returns the query as rewritten by the gates, or the outcome of the
    /// first gate that short-circuits.
    pub async fn screen(&self, raw_query: &str) -> std::result::Result<String, Outcome> {
        let mut query = raw_query.to_string();
        for gate in &self.gates {
            match gate.check(query).await {
                GateVerdict::Pass(next) => query = next,
                GateVerdict::ShortCircuit(outcome) => {
                    debug!(gate = gate.name(), "gate short-circuited");
                    return Err(outcome);
                }
            }
        }
        Ok(query)
    }

    /// Answer `raw_query`: gates → retrieve → generate → finish.
    pub async fn answer(&self, raw_query: &str) -> Outcome {
        let query = match self.screen(raw_query).await {
            Ok(query) => query,
            Err(outcome) => return outcome,
        };

        let retrieval = PipelineState::new(query.as_str()).retrieve(&self.index, self.top_k).await;
        let state = match retrieval {
            Ok(state) => state,
            Err(e) => {
                error!(error = %e, "retrieval unavailable");
                return unavailable(Failure::Retrieval);
            }
        };
        let retrieved = state.retrieved_context.len();

        let state = match state.generate(self.generator.as_ref()).await {
            Ok(state) => state,
            Err(e) => {
                error!(provider = self.generator.name(), error = %e, "generation unavailable");
                return unavailable(Failure::Generation);
            }
        };

        let answer = match state.answer {
            Some(answer) => finish(&answer),
            None => return unavailable(Failure::Generation),
        };

        info!(retrieved, answer_len = answer.len(), "query answered");
        Outcome::Answered { query, answer }
    }
}

fn unavailable(failure: Failure) -> Outcome {
    Outcome::Unavailable { failure, message: GENERIC_FAILURE.to_string() }
}

/// Builder for constructing an [`AnswerPipeline`].
///
/// `index` and `generator` are required. Without explicit gates the
/// pipeline uses [`default_gates`] with the configured length limit.
#[derive(Default)]
pub struct AnswerPipelineBuilder {
    config: Option<RagConfig>,
    index: Option<Arc<SemanticIndex>>,
    generator: Option<Arc<dyn GenerationProvider>>,
    gates: Option<Vec<Box<dyn Gate>>>,
}

impl AnswerPipelineBuilder {
    /// Set the pipeline configuration. Defaults to [`RagConfig::default`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the semantic index.
    pub fn index(mut self, index: Arc<SemanticIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the generation model.
    pub fn generator(mut self, generator: Arc<dyn GenerationProvider>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Replace the gate list. Gates run in the given order.
    pub fn gates(mut self, gates: Vec<Box<dyn Gate>>) -> Self {
        self.gates = Some(gates);
        self
    }

    /// Build the [`AnswerPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or
    /// the configuration is invalid.
    pub fn build(self) -> Result<AnswerPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let index =
            self.index.ok_or_else(|| RagError::ConfigError("index is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::ConfigError("generator is required".to_string()))?;
        let gates = self.gates.unwrap_or_else(|| default_gates(config.max_query_chars));

        Ok(AnswerPipeline { index, generator, gates, top_k: config.top_k })
    }
}
