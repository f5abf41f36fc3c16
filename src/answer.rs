use serde::{Deserialize, Serialize};

use crate::model::Puzzle;

/// How typed answers are compared against the accepted ones. Chosen per deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerPolicy {
    /// Case, whitespace and punctuation are ignored ("Sun-Set!" matches "sunset").
    #[default]
    Normalized,
    /// Case-insensitive, but otherwise the input must match exactly.
    Exact,
}

impl AnswerPolicy {
    /// The form of `text` that takes part in comparisons under this policy.
    pub fn canonical(self, text: &str) -> String {
        match self {
            AnswerPolicy::Normalized => normalize(text),
            AnswerPolicy::Exact => text.to_lowercase(),
        }
    }
}

/// Lower-cases `text` and drops everything that is not an ASCII letter or digit.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Returns true if `raw_input` matches at least one of the puzzle's accepted answers.
pub fn check(policy: AnswerPolicy, puzzle: &Puzzle, raw_input: &str) -> bool {
    let input = policy.canonical(raw_input);
    puzzle
        .accepted_answers
        .iter()
        .any(|answer| policy.canonical(answer) == input)
}
