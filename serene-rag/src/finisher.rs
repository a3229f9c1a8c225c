//! Mandatory disclaimer appended to generated answers.

/// Trailing block appended to every generated answer.
pub const DISCLAIMER: &str =
    "**Disclaimer:** I am not a licensed therapist. Please consult a professional for serious concerns.";

/// Append the [`DISCLAIMER`] after `answer`, separated by a blank line.
///
/// Not idempotent: each call appends another copy, so call it exactly once
/// per answer.
pub fn finish(answer: &str) -> String {
    format!("{answer}\n\n{DISCLAIMER}")
}
