//! Adaptive question selection and scoring for timed multiple-choice quizzes.
//!
//! Every user keeps a weight and a recency factor per question. Their product,
//! the sampling weight, decides how likely a question is to be drawn into the
//! next quiz.
//!
//! # Features
//!
//! - **Question bank**: validated JSON question files, read-only once loaded
//! - **Performance store**: per-user statistics behind a swappable backend (JSON file or SQLite)
//! - **Weighted selection**: probability-proportional draws without replacement
//! - **Weight updates**: correct answers shrink a question's weight, misses double it
//! - **Quiz sessions**: timed runs with one answer per question and one-shot expiry

pub mod backend;
pub mod bank;
pub mod error;
pub mod models;
pub mod selector;
pub mod session;
pub mod store;
pub mod summary;
pub mod updater;

pub use backend::{JsonFileBackend, MemoryBackend, SqliteBackend, StatsBackend};
pub use bank::QuestionBank;
pub use error::{
    BankError, PersistError, SelectError, SessionError, StoreError, StoreWarning, UsernameError,
};
pub use models::{Question, QuestionId, QuestionStat, SessionConfig, UserProfile, Username};
pub use selector::{select, SelectedQuestion};
pub use session::{Advance, AnswerOutcome, Completion, EndReason, QuizSession, SessionState};
pub use store::PerformanceStore;
pub use summary::QuizSummary;
