//! The question bank, loaded once at startup and read-only afterwards.

use crate::error::{BankError, BankResult};
use crate::models::Question;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Immutable, ordered set of questions.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Load a bank from a JSON file containing an array of questions.
    pub fn load(path: &Path) -> BankResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BankError::NotFound(path.to_path_buf()),
            _ => BankError::Io(e),
        })?;
        let bank = Self::from_json(&content)?;
        info!(path = %path.display(), questions = bank.len(), "loaded question bank");
        Ok(bank)
    }

    /// Parse a bank from JSON text.
    pub fn from_json(content: &str) -> BankResult<Self> {
        let questions: Vec<Question> = serde_json::from_str(content)?;
        Self::new(questions)
    }

    /// Build a bank, validating every question.
    pub fn new(questions: Vec<Question>) -> BankResult<Self> {
        let mut seen = HashSet::new();
        for question in &questions {
            if !seen.insert(question.id.as_str()) {
                return Err(BankError::Malformed(format!(
                    "duplicate question id {}",
                    question.id
                )));
            }
            validate(question)?;
        }
        Ok(Self { questions })
    }

    /// Build a bank without validation.
    #[cfg(test)]
    pub(crate) fn unchecked(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

fn validate(question: &Question) -> BankResult<()> {
    let malformed =
        |reason: &str| BankError::Malformed(format!("question {}: {}", question.id, reason));

    if question.choices.is_empty() {
        return Err(malformed("no choices"));
    }
    let matching = question
        .choices
        .iter()
        .filter(|choice| question.is_correct(choice))
        .count();
    if matching != 1 {
        return Err(malformed("answer must match exactly one choice"));
    }
    if question.base_weight == 0 {
        return Err(malformed("base weight must be positive"));
    }
    Ok(())
}
