//! Pre-generation safety gates.
//!
//! A [`Gate`] inspects the query before any retrieval or generation work and
//! either passes it on (possibly rewritten) or short-circuits the pipeline
//! with a finished [`Outcome`]. The pipeline evaluates its gates in order;
//! [`default_gates`] yields the reference order: length validation first,
//! then crisis detection.

use async_trait::async_trait;
use tracing::warn;

use crate::pipeline::Outcome;

/// Rejection text for a missing or blank query.
pub const QUERY_REQUIRED: &str = "Query parameter is required";

/// Rejection text for a query over the length limit.
pub const MESSAGE_TOO_LONG: &str = "Message too long.";

/// Phrases that indicate a possible crisis. Matched case-insensitively as
/// plain substrings.
pub const CRISIS_KEYWORDS: [&str; 10] = [
    "suicide",
    "kill myself",
    "end it all",
    "harm myself",
    "hurt myself",
    "want to die",
    "worthless",
    "hopeless",
    "cutting",
    "overdose",
];

/// Pre-authored response returned instead of generated text when a crisis
/// phrase is detected.
pub const CRISIS_RESPONSE: &str = "As an AI Chatbot, I hold concern for you. Please reach out for help:
- Take a look at the Hotlines page, and dial any numbers.
- Call 988 (Suicide & Crisis Lifeline)
- Text \"HELLO\" to 741741 (Crisis Text Line)
- Call 911 for emergencies";

/// Trim `raw` and check it against the length limit.
///
/// Length is counted in characters after trimming. A blank query is also
/// rejected.
///
/// # Errors
///
/// Returns the user-facing rejection message.
pub fn validate_and_sanitize(raw: &str, max_chars: usize) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(QUERY_REQUIRED.to_string());
    }
    if trimmed.chars().count() > max_chars {
        return Err(MESSAGE_TOO_LONG.to_string());
    }
    Ok(trimmed.to_string())
}

/// Whether `text` contains any of the [`CRISIS_KEYWORDS`].
pub fn detect_crisis(text: &str) -> bool {
    let lowered = text.to_lowercase();
    CRISIS_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

/// Result of evaluating one [`Gate`].
#[derive(Debug, Clone, PartialEq)]
pub enum GateVerdict {
    /// Continue with this (possibly rewritten) query.
    Pass(String),
    /// Stop the pipeline and return this outcome.
    ShortCircuit(Outcome),
}

/// A check run on the query before retrieval.
#[async_trait]
pub trait Gate: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Inspect `query` and decide whether the pipeline continues.
    async fn check(&self, query: String) -> GateVerdict;
}

/// Trims the query and rejects it when blank or too long.
#[derive(Debug, Clone, Copy)]
pub struct LengthGate {
    max_chars: usize,
}

impl LengthGate {
    /// Reject queries longer than `max_chars` characters after trimming.
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

#[async_trait]
impl Gate for LengthGate {
    fn name(&self) -> &str {
        "length"
    }

    async fn check(&self, query: String) -> GateVerdict {
        match validate_and_sanitize(&query, self.max_chars) {
            Ok(clean) => GateVerdict::Pass(clean),
            Err(reason) => GateVerdict::ShortCircuit(Outcome::Rejected { reason }),
        }
    }
}

/// Redirects crisis language to the fixed crisis-resources response.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrisisGate;

#[async_trait]
impl Gate for CrisisGate {
    fn name(&self) -> &str {
        "crisis"
    }

    async fn check(&self, query: String) -> GateVerdict {
        if !detect_crisis(&query) {
            return GateVerdict::Pass(query);
        }
        let preview: String = query.chars().take(50).collect();
        warn!(query = %preview, "crisis detected");
        GateVerdict::ShortCircuit(Outcome::Crisis { query, response: CRISIS_RESPONSE.to_string() })
    }
}

/// The reference gate order: length validation, then crisis detection.
pub fn default_gates(max_query_chars: usize) -> Vec<Box<dyn Gate>> {
    vec![Box::new(LengthGate::new(max_query_chars)), Box::new(CrisisGate)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_trims_whitespace() {
        assert_eq!(validate_and_sanitize("  hello \n", 1000).unwrap(), "hello");
    }

    #[test]
    fn sanitize_rejects_long_input() {
        let long = "a".repeat(1001);
        assert_eq!(validate_and_sanitize(&long, 1000).unwrap_err(), MESSAGE_TOO_LONG);
        assert!(validate_and_sanitize(&"a".repeat(1000), 1000).is_ok());
    }

    #[test]
    fn surrounding_whitespace_does_not_count() {
        let padded = format!("   {}   ", "a".repeat(1000));
        assert!(validate_and_sanitize(&padded, 1000).is_ok());
    }

    #[test]
    fn sanitize_rejects_blank_input() {
        assert_eq!(validate_and_sanitize("   ", 1000).unwrap_err(), QUERY_REQUIRED);
    }

    #[test]
    fn crisis_detection_is_case_insensitive() {
        assert!(detect_crisis("I Want To DIE"));
        assert!(detect_crisis("feeling hopeless lately"));
        assert!(!detect_crisis("How can I calm down?"));
    }

    #[test]
    fn every_keyword_triggers() {
        for keyword in CRISIS_KEYWORDS {
            assert!(detect_crisis(&format!("lately I think about {keyword} a lot")), "{keyword}");
        }
    }

    #[test]
    fn crisis_response_lists_resources() {
        assert!(CRISIS_RESPONSE.contains("988"));
        assert!(CRISIS_RESPONSE.contains("741741"));
        assert!(CRISIS_RESPONSE.contains("911"));
    }

    #[tokio::test]
    async fn crisis_gate_short_circuits() {
        let verdict = CrisisGate.check("I want to die".to_string()).await;
        assert_eq!(
            verdict,
            GateVerdict::ShortCircuit(Outcome::Crisis {
                query: "I want to die".to_string(),
                response: CRISIS_RESPONSE.to_string(),
            })
        );
    }

    #[tokio::test]
    async fn length_gate_passes_sanitized_query() {
        let verdict = LengthGate::new(10).check("  short  ".to_string()).await;
        assert_eq!(verdict, GateVerdict::Pass("short".to_string()));
    }

    #[test]
    fn default_gate_order() {
        let names: Vec<String> =
            default_gates(1000).iter().map(|g| g.name().to_string()).collect();
        assert_eq!(names, vec!["length", "crisis"]);
    }
}
