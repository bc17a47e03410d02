//! Timed quiz sessions.
//!
//! A session moves `Created -> InProgress -> Completed`. Callers drive it:
//! [`QuizSession::load_question`] starts it, [`QuizSession::answer`] records at
//! most one answer per position, and [`QuizSession::advance`] moves on. Time
//! expiry is reported by a timer through [`QuizSession::tick`], which completes
//! the session at most once.

use crate::bank::QuestionBank;
use crate::error::{PersistError, SelectError, SessionError, SessionResult};
use crate::models::{SessionConfig, Username};
use crate::selector::{self, SelectedQuestion};
use crate::store::PerformanceStore;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::info;

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    InProgress,
    Completed,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Every question was answered and advanced past.
    Finished,
    /// The time limit ran out.
    TimeExpired,
}

/// Result of answering the current question.
#[derive(Debug)]
pub struct AnswerOutcome {
    pub correct: bool,
    /// Canonical answer, for feedback.
    pub answer: String,
    /// Lifetime tally for this question after the answer.
    pub times_correct: u32,
    pub times_chosen: u32,
    /// Set when the statistics could not be saved.
    pub persist_error: Option<PersistError>,
}

/// Result of finishing a session.
#[derive(Debug)]
pub struct Completion {
    pub score: u32,
    pub total: usize,
    pub reason: EndReason,
    pub persist_error: Option<PersistError>,
}

/// Result of [`QuizSession::advance`].
#[derive(Debug)]
pub enum Advance {
    /// Moved to the next question.
    Next,
    /// The session is over.
    Completed(Completion),
}

/// One timed attempt at a quiz.
#[derive(Debug, Clone)]
pub struct QuizSession {
    username: Username,
    questions: Vec<SelectedQuestion>,
    answers: Vec<Option<bool>>,
    position: usize,
    score: u32,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    duration: Duration,
    state: SessionState,
    end_reason: Option<EndReason>,
}

impl QuizSession {
    /// Start a quiz for `username`: create the profile if needed, raise recency
    /// across the bank, save, then draw the questions.
    ///
    /// The second element carries a failed save; the session is usable either way.
    pub fn start<R: Rng + ?Sized>(
        store: &mut PerformanceStore,
        bank: &QuestionBank,
        username: &Username,
        config: &SessionConfig,
        rng: &mut R,
    ) -> SessionResult<(Self, Option<PersistError>)> {
        if bank.is_empty() {
            return Err(SelectError::EmptyBank.into());
        }
        if config.questions_per_quiz == 0 {
            return Err(SessionError::NoQuestions);
        }

        store.get(username, bank);
        store.begin_session(username, bank);
        let persist_error = store.persist().err();

        let profile = store.get(username, bank);
        let questions = selector::select(profile, bank, config.questions_per_quiz, rng)?;
        let session = Self::new(username.clone(), questions, Utc::now(), config.duration)?;

        info!(
            user = %username,
            questions = session.total(),
            duration_secs = config.duration.num_seconds(),
            "started quiz"
        );
        Ok((session, persist_error))
    }

    /// Build a session from already selected questions.
    pub fn new(
        username: Username,
        questions: Vec<SelectedQuestion>,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> SessionResult<Self> {
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }
        Ok(Self {
            username,
            answers: vec![None; questions.len()],
            questions,
            position: 0,
            score: 0,
            started_at,
            finished_at: None,
            duration,
            state: SessionState::Created,
            end_reason: None,
        })
    }

    /// Show the current question, starting the session on first use.
    pub fn load_question(&mut self) -> SessionResult<&SelectedQuestion> {
        match self.state {
            SessionState::Completed => Err(SessionError::SessionClosed),
            SessionState::Created | SessionState::InProgress => {
                self.state = SessionState::InProgress;
                self.questions
                    .get(self.position)
                    .ok_or(SessionError::SessionClosed)
            }
        }
    }

    /// Record an answer for the current question.
    pub fn answer(
        &mut self,
        choice: &str,
        store: &mut PerformanceStore,
    ) -> SessionResult<AnswerOutcome> {
        self.answer_at(Utc::now(), choice, store)
    }

    /// [`answer`](Self::answer) with an explicit clock reading. Past the time
    /// limit the session completes instead and the answer is rejected.
    pub fn answer_at(
        &mut self,
        now: DateTime<Utc>,
        choice: &str,
        store: &mut PerformanceStore,
    ) -> SessionResult<AnswerOutcome> {
        self.ensure_in_progress()?;
        if self.is_expired_at(now) {
            self.finish(EndReason::TimeExpired, now, store);
            return Err(SessionError::SessionClosed);
        }
        if self.answers[self.position].is_some() {
            return Err(SessionError::AlreadyAnswered);
        }

        let question = &self.questions[self.position];
        let correct = question.is_correct(choice);
        let stat = store.record_answer(&self.username, question.id(), correct);
        let persist_error = store.persist().err();

        self.answers[self.position] = Some(correct);
        if correct {
            self.score += 1;
        }

        Ok(AnswerOutcome {
            correct,
            answer: question.answer().to_string(),
            times_correct: stat.times_correct(),
            times_chosen: stat.times_chosen(),
            persist_error,
        })
    }

    /// Move past the answered current question.
    pub fn advance(&mut self, store: &mut PerformanceStore) -> SessionResult<Advance> {
        self.advance_at(Utc::now(), store)
    }

    /// [`advance`](Self::advance) with an explicit clock reading.
    pub fn advance_at(
        &mut self,
        now: DateTime<Utc>,
        store: &mut PerformanceStore,
    ) -> SessionResult<Advance> {
        self.ensure_in_progress()?;
        if self.is_expired_at(now) {
            return Ok(Advance::Completed(self.finish(EndReason::TimeExpired, now, store)));
        }
        if self.answers[self.position].is_none() {
            return Err(SessionError::NotAnswered);
        }

        self.position += 1;
        if self.position >= self.questions.len() {
            return Ok(Advance::Completed(self.finish(EndReason::Finished, now, store)));
        }
        Ok(Advance::Next)
    }

    /// Timer signal. Completes the session once the time limit has passed;
    /// later calls return `None`.
    pub fn tick(&mut self, store: &mut PerformanceStore) -> Option<Completion> {
        self.tick_at(Utc::now(), store)
    }

    /// [`tick`](Self::tick) with an explicit clock reading.
    pub fn tick_at(
        &mut self,
        now: DateTime<Utc>,
        store: &mut PerformanceStore,
    ) -> Option<Completion> {
        if self.state == SessionState::Completed || !self.is_expired_at(now) {
            return None;
        }
        Some(self.finish(EndReason::TimeExpired, now, store))
    }

    fn ensure_in_progress(&self) -> SessionResult<()> {
        match self.state {
            SessionState::Created => Err(SessionError::NotStarted),
            SessionState::InProgress => Ok(()),
            SessionState::Completed => Err(SessionError::SessionClosed),
        }
    }

    fn finish(
        &mut self,
        reason: EndReason,
        now: DateTime<Utc>,
        store: &mut PerformanceStore,
    ) -> Completion {
        self.state = SessionState::Completed;
        self.finished_at = Some(now);
        self.end_reason = Some(reason);

        store.record_session_score(&self.username, self.score);
        let persist_error = store.persist().err();
        info!(
            user = %self.username,
            score = self.score,
            total = self.questions.len(),
            reason = ?reason,
            "finished quiz"
        );

        Completion {
            score: self.score,
            total: self.questions.len(),
            reason,
            persist_error,
        }
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Completed
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    /// Current question, if the session has not run past the last one.
    pub fn current(&self) -> Option<&SelectedQuestion> {
        self.questions.get(self.position)
    }

    /// Whether the current position already has an answer.
    pub fn current_answered(&self) -> bool {
        self.answers.get(self.position).is_some_and(Option::is_some)
    }

    /// Zero-based index of the current question.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn questions(&self) -> &[SelectedQuestion] {
        &self.questions
    }

    /// Per-position outcome; `None` for positions never answered.
    pub fn answers(&self) -> &[Option<bool>] {
        &self.answers
    }

    /// Correct answers so far.
    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Time spent, frozen once the session completes.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Duration {
        let end = self.finished_at.unwrap_or(now);
        (end - self.started_at).max(Duration::zero())
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Utc::now())
    }

    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        (self.duration - self.elapsed_at(now)).max(Duration::zero())
    }

    pub fn remaining(&self) -> Duration {
        self.remaining_at(Utc::now())
    }

    /// Remaining time as `MM:SS`.
    pub fn format_remaining(&self) -> String {
        let remaining = self.remaining();
        format!(
            "{:02}:{:02}",
            remaining.num_minutes(),
            remaining.num_seconds() % 60
        )
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.elapsed_at(now) >= self.duration
    }
}
