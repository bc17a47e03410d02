//! Storage media for user statistics.
//!
//! The store treats its backend as a key-value map from username to profile.
//! Any medium that can load and save the whole map works.

mod json;
mod sqlite;

pub use json::JsonFileBackend;
pub use sqlite::SqliteBackend;

use crate::error::{StoreError, StoreResult};
use crate::models::{UserProfile, Username};
use std::collections::BTreeMap;

/// All stored profiles, keyed by username.
pub type Profiles = BTreeMap<Username, UserProfile>;

/// A durable home for user statistics.
pub trait StatsBackend {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Read every profile. `Ok(None)` means nothing has been stored yet.
    fn load(&self) -> StoreResult<Option<Profiles>>;

    /// Replace the stored data with `profiles`.
    fn save(&mut self, profiles: &Profiles) -> StoreResult<()>;

    /// Drop stored data that could not be parsed, so the next save starts clean.
    fn discard(&mut self) -> StoreResult<()> {
        Ok(())
    }
}

/// Keeps everything in memory. Used by tests and by hosts that opt out of persistence.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    saved: Option<Profiles>,
    fail_writes: bool,
    saves: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with previously saved profiles.
    pub fn with_profiles(profiles: Profiles) -> Self {
        Self {
            saved: Some(profiles),
            ..Self::default()
        }
    }

    /// Make every save fail, to exercise the non-fatal write path.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl StatsBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self) -> StoreResult<Option<Profiles>> {
        Ok(self.saved.clone())
    }

    fn save(&mut self, profiles: &Profiles) -> StoreResult<()> {
        if self.fail_writes {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "writes disabled",
            )));
        }
        self.saved = Some(profiles.clone());
        self.saves += 1;
        Ok(())
    }
}
