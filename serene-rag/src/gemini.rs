//! Gemini generation provider using the `generateContent` REST endpoint.
//!
//! This module is only available when the `gemini` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used for topic titles.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|part| part.text).collect();
        Some(text)
    }
}

/// A [`GenerationProvider`] backed by Google's Gemini API.
///
/// # Example
///
/// ```rust,ignore
/// use serene_rag::gemini::GeminiGenerationProvider;
///
/// let model = GeminiGenerationProvider::from_env()?.with_model("gemini-2.5-flash");
/// let reply = model.generate("Suggest three articles about sleep.").await?;
/// ```
pub struct GeminiGenerationProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiGenerationProvider {
    /// Create a provider for [`DEFAULT_GEMINI_MODEL`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] for an empty key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::ConfigError("Gemini API key must not be empty".to_string()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.into(),
            model: DEFAULT_GEMINI_MODEL.into(),
        })
    }

    /// Create a provider using the `GEMINI_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            RagError::ConfigError("GEMINI_API_KEY environment variable not set".to_string())
        })?;
        Self::new(api_key)
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The configured model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn failure(&self, message: String) -> RagError {
        RagError::GenerationError { provider: "Gemini".into(), message }
    }
}

#[async_trait]
impl GenerationProvider for GeminiGenerationProvider {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            provider = "Gemini",
            model = %self.model,
            prompt_len = prompt.len(),
            "generate content"
        );

        let content = Content { role: "user", parts: [Part { text: prompt }] };
        let body = GenerateRequest { contents: [content] };
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Gemini", error = %e, "request failed");
                self.failure(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!(provider = "Gemini", %status, %detail, "API error");
            return Err(self.failure(format!("API returned {status}: {detail}")));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            error!(provider = "Gemini", error = %e, "failed to parse response");
            self.failure(format!("failed to parse response: {e}"))
        })?;

        let text = parsed
            .text()
            .ok_or_else(|| self.failure("response contained no candidates".into()))?;
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body =
            GenerateRequest { contents: [Content { role: "user", parts: [Part { text: "hi" }] }] };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"contents": [{"role": "user", "parts": [{"text": "hi"}]}]})
        );
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let raw = r#"{"candidates":[
            {"content":{"parts":[{"text":"Anxiety "},{"text":"Support"}]}},
            {"content":{"parts":[{"text":"ignored"}]}}
        ]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("Anxiety Support"));
    }

    #[test]
    fn blocked_response_has_no_text() {
        let parsed: GenerateResponse = serde_json::from_str(r#"{"promptFeedback":{}}"#).unwrap();
        assert!(parsed.text().is_none());
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(GeminiGenerationProvider::new(""), Err(RagError::ConfigError(_))));
        let provider = GeminiGenerationProvider::new("key").unwrap().with_model("gemini-2.5-flash");
        assert_eq!(provider.model(), "gemini-2.5-flash");
    }
}
