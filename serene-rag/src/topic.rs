//! Short conversation titles.
//!
//! The first user message is spell-corrected against a small table of
//! common misspellings, sent to the model for a 2-3 word title, and the
//! reply is cleaned up. A reply that is unusable after cleaning falls back
//! to a title picked by keyword family.

use std::sync::Arc;

use tracing::{debug, error};

use crate::generation::GenerationProvider;

/// Title used for empty input or when the model call fails.
pub const UNTITLED: &str = "Untitled Chat";

/// Longest prefix of the corrected message sent to the model, in characters.
const PROMPT_INPUT_CHARS: usize = 300;

const CORRECTIONS: &[(&str, &str)] = &[
    ("anxeity", "anxiety"),
    ("aniety", "anxiety"),
    ("anexiety", "anxiety"),
    ("depresion", "depression"),
    ("depress", "depression"),
    ("depresed", "depressed"),
    ("stres", "stress"),
    ("stresed", "stressed"),
    ("overwelmed", "overwhelmed"),
    ("panick", "panic"),
    ("panik", "panic"),
    ("anxius", "anxious"),
    ("lonley", "lonely"),
    ("lonly", "lonely"),
    ("isloated", "isolated"),
    ("slepp", "sleep"),
    ("slep", "sleep"),
    ("insomia", "insomnia"),
    ("relatinship", "relationship"),
    ("relashionship", "relationship"),
    ("counceling", "counseling"),
    ("councilor", "counselor"),
    ("mindfulnes", "mindfulness"),
    ("mediation", "meditation"),
    ("addication", "addiction"),
    ("adiction", "addiction"),
    ("tramatic", "traumatic"),
    ("truama", "trauma"),
    ("trama", "trauma"),
];

const REPLY_PREFIXES: [&str; 5] = ["title:", "topic:", "generate title:", "response:", "answer:"];

/// Keyword families checked in order when the model reply is unusable.
const FALLBACKS: [(&[&str], &str); 4] = [
    (&["anxiety", "anxious", "panic", "worried", "nervous"], "Anxiety Support"),
    (&["depression", "depressed", "sad", "hopeless", "down"], "Mood Support"),
    (&["stress", "overwhelmed", "burnout"], "Stress Management"),
    (&["trauma", "ptsd", "abuse"], "Trauma Recovery"),
];

const GENERAL_FALLBACK: &str = "Mental Health Support";

/// Lowercase `text` and replace known misspellings word by word.
///
/// Surrounding punctuation is ignored for the lookup and dropped from
/// corrected words; other words are kept as they were, lowercased.
pub fn correct_spelling(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .map(|word| {
            let bare = word.trim_matches(|c: char| ".,!?;:\"()[]{}".contains(c));
            CORRECTIONS
                .iter()
                .find(|(wrong, _)| *wrong == bare)
                .map_or(word, |(_, right)| *right)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn build_topic_prompt(corrected: &str) -> String {
    let input: String = corrected.chars().take(PROMPT_INPUT_CHARS).collect();
    format!(
        r#"You are an expert mental health chatbot. Generate a precise 2-3 word title that summarizes the core emotional need or topic from this message.

Key Requirements:
- Use warm, supportive language (not clinical)
- Focus on help/support rather than problems
- Be concise but meaningful
- Avoid medical terminology

Input: "{input}"

Quality Examples:
"I keep having panic attacks at work" → "Workplace Anxiety"
"My depression is getting worse lately" → "Depression Care"
"How can I improve my self confidence" → "Building Confidence"
"I can't sleep because my mind races" → "Sleep Support"
"My relationship with my partner is falling apart" → "Relationship Guidance"
"I feel completely overwhelmed with life" → "Life Balance"
"I'm grieving the loss of my mother" → "Grief Healing"
"I think I might have PTSD from trauma" → "Trauma Recovery"
"I want to learn meditation techniques" → "Mindfulness Training"
"I'm struggling with alcohol addiction" → "Addiction Recovery"

Generate title:"#
    )
}

/// Strip quotes, punctuation, and a leading label from a model reply.
fn clean_reply(reply: &str) -> String {
    let title = reply.trim().trim_matches(|c: char| "\"'.,!?:".contains(c)).trim();
    let lowered = title.to_lowercase();
    for prefix in REPLY_PREFIXES {
        if lowered.starts_with(prefix) {
            if let Some(rest) = title.get(prefix.len()..) {
                return rest.trim().to_string();
            }
        }
    }
    title.to_string()
}

fn capitalize_words(title: &str) -> String {
    title
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn fallback_title(corrected: &str) -> &'static str {
    let lowered = corrected.to_lowercase();
    FALLBACKS
        .iter()
        .find(|(terms, _)| terms.iter().any(|term| lowered.contains(term)))
        .map_or(GENERAL_FALLBACK, |(_, title)| *title)
}

/// Turn a model reply into a title, or `None` when it is unusable.
///
/// A usable title has 3 to 45 characters after cleaning and does not start
/// with "i ".
pub fn accept_title(reply: &str) -> Option<String> {
    let title = clean_reply(reply);
    let len = title.chars().count();
    if (3..=45).contains(&len) && !title.to_lowercase().starts_with("i ") {
        Some(capitalize_words(&title))
    } else {
        None
    }
}

/// Produces conversation titles with a generation model.
pub struct TopicTitler {
    generator: Arc<dyn GenerationProvider>,
}

impl TopicTitler {
    /// Create a titler backed by `generator`.
    pub fn new(generator: Arc<dyn GenerationProvider>) -> Self {
        Self { generator }
    }

    /// Title for a conversation starting with `text`. Never fails.
    pub async fn title(&self, text: &str) -> String {
        let text = text.trim();
        if text.is_empty() {
            return UNTITLED.to_string();
        }

        let corrected = correct_spelling(text);
        let reply = match self.generator.generate(&build_topic_prompt(&corrected)).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(provider = self.generator.name(), error = %e, "topic generation failed");
                return UNTITLED.to_string();
            }
        };

        match accept_title(&reply) {
            Some(title) => title,
            None => {
                debug!(reply = %reply, "unusable title, falling back to keywords");
                fallback_title(&corrected).to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FailingGenerationProvider, ScriptedGenerationProvider};

    fn titler(reply: &str) -> TopicTitler {
        TopicTitler::new(Arc::new(ScriptedGenerationProvider::new(reply)))
    }

    #[test]
    fn corrects_known_misspellings() {
        assert_eq!(correct_spelling("My ANXEITY is bad!"), "my anxiety is bad!");
        assert_eq!(correct_spelling("cant slepp."), "cant sleep");
        assert_eq!(correct_spelling("  feeling   fine "), "feeling fine");
    }

    #[test]
    fn cleans_quotes_and_labels() {
        assert_eq!(
            accept_title("\"Title: workplace anxiety\"").as_deref(),
            Some("Workplace Anxiety")
        );
        assert_eq!(accept_title("Sleep support.").as_deref(), Some("Sleep Support"));
        assert_eq!(accept_title("GRIEF HEALING").as_deref(), Some("Grief Healing"));
    }

    #[test]
    fn rejects_short_long_and_first_person_titles() {
        assert_eq!(accept_title("ok"), None);
        assert_eq!(accept_title(&"word ".repeat(12)), None);
        assert_eq!(accept_title("I think this is about sleep"), None);
    }

    #[test]
    fn fallback_follows_family_order() {
        assert_eq!(fallback_title("nervous and sad"), "Anxiety Support");
        assert_eq!(fallback_title("feeling down"), "Mood Support");
        assert_eq!(fallback_title("total burnout"), "Stress Management");
        assert_eq!(fallback_title("ptsd flashbacks"), "Trauma Recovery");
        assert_eq!(fallback_title("hello there"), "Mental Health Support");
    }

    #[test]
    fn prompt_truncates_input() {
        let prompt = build_topic_prompt(&"a".repeat(500));
        assert!(prompt.contains(&format!("Input: \"{}\"", "a".repeat(300))));
        assert!(!prompt.contains(&"a".repeat(301)));
    }

    #[tokio::test]
    async fn empty_text_is_untitled_without_a_model_call() {
        let model = Arc::new(ScriptedGenerationProvider::new("Anything"));
        let titler = TopicTitler::new(model.clone());
        assert_eq!(titler.title("   ").await, UNTITLED);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn usable_reply_is_title_cased() {
        let title = titler("workplace anxiety").title("I keep having panic attacks").await;
        assert_eq!(title, "Workplace Anxiety");
    }

    #[tokio::test]
    async fn unusable_reply_uses_corrected_keywords() {
        assert_eq!(titler("I").title("so much stres at work").await, "Stress Management");
    }

    #[tokio::test]
    async fn model_failure_is_untitled() {
        let titler = TopicTitler::new(Arc::new(FailingGenerationProvider::always()));
        assert_eq!(titler.title("I feel anxious").await, UNTITLED);
    }
}
