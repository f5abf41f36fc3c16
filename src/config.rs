use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::answer::AnswerPolicy;
use crate::model::Puzzle;

pub const DEFAULT_DEPLOYMENT: &str = "birthday";

const BUILTIN_DEPLOYMENTS: &[(&str, &str)] = &[
    ("birthday", include_str!("../deployments/birthday.json")),
    ("anniversary", include_str!("../deployments/anniversary.json")),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read deployment: {0}")]
    Io(#[from] std::io::Error),
    #[error("deployment is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown deployment {0:?}")]
    UnknownDeployment(String),
    #[error("deployment has no puzzles")]
    NoPuzzles,
    #[error("{letters} target letters for {puzzles} puzzles")]
    LetterCountMismatch { letters: usize, puzzles: usize },
    #[error("puzzle {index} has no accepted answers")]
    NoAcceptedAnswers { index: usize },
    #[error("puzzle {index} accepts {answer:?}, which can never be typed under {policy:?}")]
    UnmatchableAnswer {
        index: usize,
        answer: String,
        policy: AnswerPolicy,
    },
    #[error("reorder delay {reorder:?} must be non-zero and shorter than reveal delay {reveal:?}")]
    DelayOrder { reorder: Duration, reveal: Duration },
}

/// A deployment exactly as written in its JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentFile {
    pub name: String,
    pub title: String,
    pub letters: Vec<char>,
    pub puzzles: Vec<PuzzleEntry>,
    #[serde(default)]
    pub matching: AnswerPolicy,
    pub reorder_delay_ms: u64,
    pub reveal_delay_ms: u64,
    pub secret_image: String,
    #[serde(default)]
    pub background_image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleEntry {
    pub prompt: String,
    pub accepts: Vec<String>,
}

/// A validated deployment: everything the engine and the views need, fixed for the lifetime of
/// the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub name: String,
    pub title: String,
    pub puzzles: Vec<Puzzle>,
    pub policy: AnswerPolicy,
    /// D1: all-solved instant -> display order collapses.
    pub reorder_delay: Duration,
    /// D2: all-solved instant -> secret is revealed.
    pub reveal_delay: Duration,
    pub secret_image: String,
    pub background_image: Option<String>,
}

impl GateConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: DeploymentFile = serde_json::from_str(json)?;
        Self::try_from(file)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Loads one of the deployments compiled into the binary.
    pub fn builtin(name: &str) -> Result<Self, ConfigError> {
        let (_, json) = BUILTIN_DEPLOYMENTS
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .ok_or_else(|| ConfigError::UnknownDeployment(name.to_string()))?;
        Self::from_json(json)
    }

    pub fn builtin_names() -> impl Iterator<Item = &'static str> {
        BUILTIN_DEPLOYMENTS.iter().map(|(name, _)| *name)
    }

    pub fn tile_count(&self) -> usize {
        self.puzzles.len()
    }

    pub fn puzzle(&self, index: usize) -> &Puzzle {
        &self.puzzles[index]
    }

    /// The hidden message, read in original puzzle order.
    pub fn secret_message(&self) -> String {
        self.puzzles.iter().map(|p| p.target_letter).collect()
    }
}

impl TryFrom<DeploymentFile> for GateConfig {
    type Error = ConfigError;

    fn try_from(file: DeploymentFile) -> Result<Self, Self::Error> {
        if file.puzzles.is_empty() {
            return Err(ConfigError::NoPuzzles);
        }
        if file.letters.len() != file.puzzles.len() {
            return Err(ConfigError::LetterCountMismatch {
                letters: file.letters.len(),
                puzzles: file.puzzles.len(),
            });
        }

        let reorder = Duration::from_millis(file.reorder_delay_ms);
        let reveal = Duration::from_millis(file.reveal_delay_ms);
        if reorder.is_zero() || reorder >= reveal {
            return Err(ConfigError::DelayOrder { reorder, reveal });
        }

        let policy = file.matching;
        let mut puzzles = Vec::with_capacity(file.puzzles.len());
        for (index, (entry, letter)) in file.puzzles.into_iter().zip(file.letters).enumerate() {
            if entry.accepts.is_empty() {
                return Err(ConfigError::NoAcceptedAnswers { index });
            }
            if let Some(answer) = entry
                .accepts
                .iter()
                .find(|answer| policy.canonical(answer).is_empty())
            {
                return Err(ConfigError::UnmatchableAnswer {
                    index,
                    answer: answer.clone(),
                    policy,
                });
            }
            puzzles.push(Puzzle {
                target_letter: letter,
                prompt: entry.prompt,
                accepted_answers: entry.accepts,
            });
        }

        Ok(Self {
            name: file.name,
            title: file.title,
            puzzles,
            policy,
            reorder_delay: reorder,
            reveal_delay: reveal,
            secret_image: file.secret_image,
            background_image: file.background_image,
        })
    }
}
