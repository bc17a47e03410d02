//! Data models for the quiz engine.

use crate::error::UsernameError;
use chrono::Duration;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Stable question identifier, normalized to a string.
pub type QuestionId = String;

/// Weight given to every question on a user's first encounter.
pub const DEFAULT_WEIGHT: u32 = 100;
/// Floor applied after a correct answer.
pub const MIN_WEIGHT: u32 = 2;
/// Ceiling applied after an incorrect answer.
pub const MAX_WEIGHT: u32 = 500;
/// Recency right after a question is answered.
pub const DEFAULT_RECENCY: u32 = 1;

static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_-]{3,20}$").unwrap());

// Question files number their prompts ("12. What is ...").
static PROMPT_NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.").unwrap());

fn default_base_weight() -> u64 {
    1
}

fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<QuestionId, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

/// A multiple-choice question from the bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier, stable across runs.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: QuestionId,
    /// Prompt text as stored in the bank.
    #[serde(rename = "question")]
    pub prompt: String,
    /// Choices in their stored order.
    pub choices: Vec<String>,
    /// Canonical correct answer; equals exactly one choice after trimming.
    pub answer: String,
    /// Sampling weight used before the user has any statistics for this question.
    #[serde(rename = "adj_weight", default = "default_base_weight")]
    pub base_weight: u64,
}

impl Question {
    /// Create a question with the default base weight.
    pub fn new(
        id: impl Into<QuestionId>,
        prompt: impl Into<String>,
        choices: Vec<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            choices,
            answer: answer.into(),
            base_weight: default_base_weight(),
        }
    }

    /// Set the base weight.
    pub fn with_base_weight(mut self, weight: u64) -> Self {
        self.base_weight = weight;
        self
    }

    /// Whether `choice` matches the canonical answer, ignoring surrounding whitespace.
    pub fn is_correct(&self, choice: &str) -> bool {
        choice.trim() == self.answer.trim()
    }

    /// Prompt with any leading enumeration removed.
    pub fn display_prompt(&self) -> String {
        PROMPT_NUMBER_REGEX.replace(&self.prompt, "").trim().to_string()
    }
}

/// Per-user statistics for one question.
///
/// `sampling_weight` is always `recency * weight`; fields are private so that the
/// relation cannot be broken from outside the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionStat {
    weight: u32,
    recency: u32,
    sampling_weight: u64,
    times_chosen: u32,
    times_correct: u32,
}

impl Default for QuestionStat {
    fn default() -> Self {
        Self::new()
    }
}

impl QuestionStat {
    /// Statistics for a question the user has never seen.
    pub fn new() -> Self {
        Self {
            weight: DEFAULT_WEIGHT,
            recency: DEFAULT_RECENCY,
            sampling_weight: DEFAULT_RECENCY as u64 * DEFAULT_WEIGHT as u64,
            times_chosen: 0,
            times_correct: 0,
        }
    }

    /// Rebuild a stat from stored parts. Returns `None` if any invariant is violated.
    pub fn from_parts(
        weight: u32,
        recency: u32,
        times_chosen: u32,
        times_correct: u32,
    ) -> Option<Self> {
        let valid = (MIN_WEIGHT..=MAX_WEIGHT).contains(&weight)
            && recency >= 1
            && times_correct <= times_chosen;
        valid.then(|| Self {
            weight,
            recency,
            sampling_weight: recency as u64 * weight as u64,
            times_chosen,
            times_correct,
        })
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn recency(&self) -> u32 {
        self.recency
    }

    pub fn sampling_weight(&self) -> u64 {
        self.sampling_weight
    }

    pub fn times_chosen(&self) -> u32 {
        self.times_chosen
    }

    pub fn times_correct(&self) -> u32 {
        self.times_correct
    }

    /// One more quiz has started since this question was last answered.
    pub(crate) fn bump_recency(&mut self) {
        self.recency = self.recency.saturating_add(1);
        self.sampling_weight = self.recency as u64 * self.weight as u64;
    }

    /// Set a new weight and mark the question as just answered.
    pub(crate) fn reweight(&mut self, weight: u32) {
        self.weight = weight.clamp(MIN_WEIGHT, MAX_WEIGHT);
        self.recency = DEFAULT_RECENCY;
        self.sampling_weight = self.recency as u64 * self.weight as u64;
    }

    pub(crate) fn count_answer(&mut self, correct: bool) {
        self.times_chosen += 1;
        if correct {
            self.times_correct += 1;
        }
    }
}

/// A validated, lowercased username.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Username(String);

impl Username {
    /// Trim, lowercase and validate a raw username.
    pub fn parse(raw: &str) -> Result<Self, UsernameError> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(UsernameError::Empty);
        }
        if !USERNAME_REGEX.is_match(&normalized) {
            return Err(UsernameError::Invalid);
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Username {
    type Err = UsernameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the engine remembers about one user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    stats: BTreeMap<QuestionId, QuestionStat>,
    scores: Vec<u32>,
}

impl UserProfile {
    /// Fresh profile with default statistics for every given question.
    pub fn seeded(questions: &[Question]) -> Self {
        Self {
            stats: questions
                .iter()
                .map(|q| (q.id.clone(), QuestionStat::new()))
                .collect(),
            scores: Vec::new(),
        }
    }

    /// Rebuild a profile from stored parts.
    pub fn from_parts(stats: BTreeMap<QuestionId, QuestionStat>, scores: Vec<u32>) -> Self {
        Self { stats, scores }
    }

    pub fn stat(&self, id: &str) -> Option<&QuestionStat> {
        self.stats.get(id)
    }

    pub fn stats(&self) -> &BTreeMap<QuestionId, QuestionStat> {
        &self.stats
    }

    /// Final scores of past quizzes, oldest first.
    pub fn scores(&self) -> &[u32] {
        &self.scores
    }

    /// Number of questions this user has answered at least once.
    pub fn questions_answered(&self) -> usize {
        self.stats.values().filter(|s| s.times_chosen > 0).count()
    }

    /// Number of questions this user has answered correctly at least once.
    pub fn questions_ever_correct(&self) -> usize {
        self.stats.values().filter(|s| s.times_correct > 0).count()
    }

    pub(crate) fn stat_mut(&mut self, id: &str) -> &mut QuestionStat {
        self.stats.entry(id.to_string()).or_default()
    }

    pub(crate) fn push_score(&mut self, score: u32) {
        self.scores.push(score);
    }
}

/// Parameters for a single quiz attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Questions to draw; clamped to the bank size.
    pub questions_per_quiz: usize,
    /// Wall-clock limit for the whole quiz.
    pub duration: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            questions_per_quiz: 25,
            duration: Duration::minutes(25),
        }
    }
}
