//! Error types for the quiz engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the question bank. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum BankError {
    /// Question file does not exist.
    #[error("Questions file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Question file exists but could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Question file is not valid JSON or violates a bank invariant.
    #[error("Malformed question bank: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for BankError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

pub type BankResult<T> = Result<T, BankError>;

/// Errors raised by the user-statistics store and its backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Stored data parsed but does not describe valid profiles.
    #[error("Malformed store: {0}")]
    Malformed(String),
}

impl StoreError {
    /// Whether the stored data itself is unusable, as opposed to the medium failing.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Json(_) | Self::Malformed(_))
    }
}

/// A failed write. Never fatal: the in-memory state stays valid.
pub type PersistError = StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Non-fatal conditions surfaced while loading the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreWarning {
    /// The stored data was unreadable and has been replaced with an empty store.
    #[error("User data was corrupted and has been reset: {reason}")]
    Discarded { reason: String },
}

/// Errors raised by weighted selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("Cannot select questions from an empty bank")]
    EmptyBank,

    #[error("Question {question_id} has non-positive sampling weight {weight}")]
    InvalidWeights { question_id: String, weight: u64 },
}

pub type SelectResult<T> = Result<T, SelectError>;

/// Errors raised by quiz session transitions. None of them mutate state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("No question has been loaded yet")]
    NotStarted,

    #[error("This question has already been answered")]
    AlreadyAnswered,

    #[error("Answer the current question before advancing")]
    NotAnswered,

    #[error("The quiz is already over")]
    SessionClosed,

    #[error("A quiz needs at least one question")]
    NoQuestions,

    #[error("Selection failed: {0}")]
    Select(#[from] SelectError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Username validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsernameError {
    #[error("Please enter a username.")]
    Empty,

    #[error(
        "Username must be 3-20 chars long and only contain letters, numbers, underscores, or dashes."
    )]
    Invalid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_classification() {
        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(StoreError::from(json).is_malformed());
        assert!(StoreError::Malformed("bad".into()).is_malformed());

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!StoreError::from(io).is_malformed());
    }
}
