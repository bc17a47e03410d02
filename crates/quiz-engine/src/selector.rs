//! Weighted question selection without replacement.
//!
//! Each draw normalizes the sampling weights of the questions still in the
//! pool, picks one with probability proportional to its weight, and removes it.

use crate::bank::QuestionBank;
use crate::error::{SelectError, SelectResult};
use crate::models::{Question, UserProfile};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// A drawn question with its choices in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedQuestion {
    question: Question,
    choices: Vec<String>,
}

impl SelectedQuestion {
    /// Wrap a question, shuffling its choices once.
    pub fn shuffled<R: Rng + ?Sized>(question: &Question, rng: &mut R) -> Self {
        let mut choices = question.choices.clone();
        choices.shuffle(rng);
        Self {
            question: question.clone(),
            choices,
        }
    }

    /// Wrap a question keeping its stored choice order.
    pub fn in_order(question: &Question) -> Self {
        Self {
            question: question.clone(),
            choices: question.choices.clone(),
        }
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    pub fn id(&self) -> &str {
        &self.question.id
    }

    pub fn prompt(&self) -> String {
        self.question.display_prompt()
    }

    /// Choices in the order they should be shown.
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn answer(&self) -> &str {
        &self.question.answer
    }

    pub fn is_correct(&self, choice: &str) -> bool {
        self.question.is_correct(choice)
    }
}

/// Weight the sampler uses for `question`: the user's sampling weight, or the
/// question's base weight if the user has no statistics for it yet.
pub fn sampling_weight(profile: &UserProfile, question: &Question) -> u64 {
    profile
        .stat(&question.id)
        .map(|stat| stat.sampling_weight())
        .unwrap_or(question.base_weight)
}

/// Draw `min(k, bank.len())` distinct questions in draw order.
pub fn select<R: Rng + ?Sized>(
    profile: &UserProfile,
    bank: &QuestionBank,
    k: usize,
    rng: &mut R,
) -> SelectResult<Vec<SelectedQuestion>> {
    if bank.is_empty() {
        return Err(SelectError::EmptyBank);
    }

    let mut pool: Vec<(&Question, u64)> = bank
        .iter()
        .map(|q| (q, sampling_weight(profile, q)))
        .collect();

    if let Some((question, weight)) = pool.iter().find(|(_, w)| *w == 0) {
        return Err(SelectError::InvalidWeights {
            question_id: question.id.clone(),
            weight: *weight,
        });
    }

    let count = k.min(pool.len());
    let mut drawn = Vec::with_capacity(count);

    while drawn.len() < count {
        let total: f64 = pool.iter().map(|(_, w)| *w as f64).sum();
        let target: f64 = rng.gen();

        // Falls back to the last entry when rounding leaves the sum just below 1.
        let mut index = pool.len() - 1;
        let mut cumulative = 0.0;
        for (i, (_, weight)) in pool.iter().enumerate() {
            cumulative += *weight as f64 / total;
            if target < cumulative {
                index = i;
                break;
            }
        }

        let (question, weight) = pool.remove(index);
        debug!(
            question = %question.id,
            weight,
            probability = weight as f64 / total,
            "drew question"
        );
        drawn.push(SelectedQuestion::shuffled(question, rng));
    }

    Ok(drawn)
}
