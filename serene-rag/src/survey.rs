//! Health-survey article recommendations.
//!
//! Survey answers are screened for crisis language first. Otherwise the
//! model is asked for a JSON array of articles, which is pulled out of its
//! free-form reply. A reply without a usable array yields one fixed general
//! recommendation.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::generation::GenerationProvider;
use crate::safety::{CRISIS_RESPONSE, detect_crisis};

/// Result text for a successful recommendation run.
pub const RECOMMENDATIONS_GENERATED: &str = "Recommendations generated";

/// Result text when the model is unavailable.
pub const RECOMMENDATIONS_FAILED: &str = "Error generating recommendations.";

static JSON_ARRAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[\s*\{.*?\}\s*\]").expect("unreachable error: invalid recommendation pattern")
});

/// One suggested article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Article title.
    pub title: String,
    /// One-line summary of the article.
    pub summary: String,
    /// Article URL.
    pub link: String,
}

impl Recommendation {
    /// The recommendation returned when the model gives nothing usable.
    pub fn general_support() -> Self {
        Self {
            title: "General Mental Health Support".to_string(),
            summary: "Basic tips to improve mental wellbeing.".to_string(),
            link: "https://www.mentalhealth.gov/".to_string(),
        }
    }
}

/// How a survey run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SurveyOutcome {
    /// Crisis language in the answers. No recommendations are given.
    Crisis { response: String },
    /// At least one recommendation.
    Recommended { recommendations: Vec<Recommendation> },
    /// The model call failed.
    Unavailable,
}

impl SurveyOutcome {
    /// The user-facing result line.
    pub fn result_text(&self) -> &str {
        match self {
            Self::Crisis { response } => response,
            Self::Recommended { .. } => RECOMMENDATIONS_GENERATED,
            Self::Unavailable => RECOMMENDATIONS_FAILED,
        }
    }

    /// The recommendations, empty unless [`SurveyOutcome::Recommended`].
    pub fn recommendations(&self) -> &[Recommendation] {
        match self {
            Self::Recommended { recommendations } => recommendations,
            _ => &[],
        }
    }
}

/// Join every answer value into one string for crisis screening.
///
/// String values are used as-is; other values use their JSON text.
pub fn combine_answers(answers: &Map<String, Value>) -> String {
    answers
        .values()
        .map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the recommendation prompt for `answers`.
pub fn build_survey_prompt(answers: &Map<String, Value>) -> String {
    let answers = serde_json::to_string_pretty(answers).unwrap_or_default();
    format!(
        r#"You are a helpful mental health assistant.
Based on these user answers to a health checkup, suggest 3 relevant mental health articles.
Return the result in this JSON format:
[
  {{
    "title": "Article Title",
    "summary": "Brief summary",
    "link": "https://example.com/article"
  }}
]

 Try to get a link from an actual article from the internet.
User Answers:
{answers}"#
    )
}

/// Pull the first JSON array of objects out of a model reply.
///
/// Returns an empty list when no array is found or it does not parse.
pub fn extract_recommendations(reply: &str) -> Vec<Recommendation> {
    let Some(found) = JSON_ARRAY.find(reply) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<Recommendation>>(found.as_str()) {
        Ok(recommendations) => recommendations,
        Err(e) => {
            warn!(error = %e, "recommendation array did not parse");
            Vec::new()
        }
    }
}

/// Turns survey answers into article recommendations.
pub struct SurveyRecommender {
    generator: Arc<dyn GenerationProvider>,
}

impl SurveyRecommender {
    /// Create a recommender backed by `generator`.
    pub fn new(generator: Arc<dyn GenerationProvider>) -> Self {
        Self { generator }
    }

    /// Screen `answers` and ask the model for recommendations.
    pub async fn recommend(&self, answers: &Map<String, Value>) -> SurveyOutcome {
        if detect_crisis(&combine_answers(answers)) {
            warn!(answers = answers.len(), "crisis detected in survey answers");
            return SurveyOutcome::Crisis { response: CRISIS_RESPONSE.to_string() };
        }

        let reply = match self.generator.generate(&build_survey_prompt(answers)).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(provider = self.generator.name(), error = %e, "survey generation failed");
                return SurveyOutcome::Unavailable;
            }
        };

        let mut recommendations = extract_recommendations(&reply);
        if recommendations.is_empty() {
            info!("no usable recommendations in reply, using general support");
            recommendations.push(Recommendation::general_support());
        }
        SurveyOutcome::Recommended { recommendations }
    }
}
