//! End-of-quiz report.

use crate::bank::QuestionBank;
use crate::models::UserProfile;
use crate::session::{EndReason, QuizSession};
use chrono::Duration;

/// Figures shown once a quiz is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSummary {
    pub score: u32,
    pub total: usize,
    pub reason: Option<EndReason>,
    pub elapsed: Duration,
    /// Elapsed time divided by the number of questions in the quiz.
    pub per_question: Duration,
    /// Bank questions this user has ever answered.
    pub answered_ever: usize,
    pub bank_size: usize,
    /// Of those, questions answered correctly at least once.
    pub correct_ever: usize,
    /// Every final score, oldest first, including this quiz.
    pub history: Vec<u32>,
}

impl QuizSummary {
    pub fn new(session: &QuizSession, profile: &UserProfile, bank: &QuestionBank) -> Self {
        let elapsed = session.elapsed();
        let per_question = elapsed / session.total().max(1) as i32;
        let answered_ever = bank
            .iter()
            .filter(|q| profile.stat(&q.id).is_some_and(|s| s.times_chosen() > 0))
            .count();
        let correct_ever = bank
            .iter()
            .filter(|q| profile.stat(&q.id).is_some_and(|s| s.times_correct() > 0))
            .count();

        Self {
            score: session.score(),
            total: session.total(),
            reason: session.end_reason(),
            elapsed,
            per_question,
            answered_ever,
            bank_size: bank.len(),
            correct_ever,
            history: profile.scores().to_vec(),
        }
    }

    /// Share of the bank ever answered, in percent.
    pub fn coverage_percent(&self) -> f64 {
        percent(self.answered_ever, self.bank_size)
    }

    /// Share of answered questions ever answered correctly, in percent.
    pub fn mastery_percent(&self) -> f64 {
        percent(self.correct_ever, self.answered_ever)
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

/// `N min M sec`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.num_seconds().max(0);
    format!("{} min {} sec", secs / 60, secs % 60)
}
