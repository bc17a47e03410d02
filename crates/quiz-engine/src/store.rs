//! Per-user performance statistics.

use crate::backend::{MemoryBackend, Profiles, StatsBackend};
use crate::bank::QuestionBank;
use crate::error::{PersistError, StoreResult, StoreWarning};
use crate::models::{QuestionStat, UserProfile, Username};
use crate::updater;
use tracing::{debug, info, warn};

/// Owns every user profile and is the only writer of persisted statistics.
pub struct PerformanceStore {
    backend: Box<dyn StatsBackend>,
    profiles: Profiles,
}

impl std::fmt::Debug for PerformanceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceStore")
            .field("backend", &self.backend.name())
            .field("users", &self.profiles.len())
            .finish()
    }
}

impl PerformanceStore {
    /// Read durable state from `backend`.
    ///
    /// A missing store yields no users. A malformed store is discarded and
    /// reported through the returned warning; only failures of the medium
    /// itself are errors.
    pub fn load(
        mut backend: Box<dyn StatsBackend>,
    ) -> StoreResult<(Self, Option<StoreWarning>)> {
        let (profiles, warning) = match backend.load() {
            Ok(Some(profiles)) => (profiles, None),
            Ok(None) => {
                info!(backend = backend.name(), "no stored user data, starting empty");
                (Profiles::new(), None)
            }
            Err(e) if e.is_malformed() => {
                warn!(backend = backend.name(), error = %e, "discarding malformed user data");
                backend.discard()?;
                (
                    Profiles::new(),
                    Some(StoreWarning::Discarded {
                        reason: e.to_string(),
                    }),
                )
            }
            Err(e) => return Err(e),
        };

        info!(backend = backend.name(), users = profiles.len(), "loaded user data");
        Ok((Self { backend, profiles }, warning))
    }

    /// Empty store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryBackend::new()),
            profiles: Profiles::new(),
        }
    }

    /// Profile for `username`, created with default statistics for every
    /// question in `bank` if absent. Does not persist.
    pub fn get(&mut self, username: &Username, bank: &QuestionBank) -> &UserProfile {
        self.profiles.entry(username.clone()).or_insert_with(|| {
            info!(user = %username, "creating profile");
            UserProfile::seeded(bank.questions())
        })
    }

    /// Profile for `username`, if one exists.
    pub fn profile(&self, username: &Username) -> Option<&UserProfile> {
        self.profiles.get(username)
    }

    pub fn contains(&self, username: &Username) -> bool {
        self.profiles.contains_key(username)
    }

    pub fn users(&self) -> impl Iterator<Item = &Username> {
        self.profiles.keys()
    }

    /// Raise the recency of every question in `bank` by one. Runs once per
    /// quiz start, before sampling.
    pub fn begin_session(&mut self, username: &Username, bank: &QuestionBank) {
        let profile = self.profiles.entry(username.clone()).or_default();
        for question in bank.iter() {
            profile.stat_mut(&question.id).bump_recency();
        }
        debug!(user = %username, questions = bank.len(), "raised recency for bank");
    }

    /// Apply the weight rule to one question and count the answer.
    pub fn record_answer(
        &mut self,
        username: &Username,
        question_id: &str,
        correct: bool,
    ) -> QuestionStat {
        let stat = self
            .profiles
            .entry(username.clone())
            .or_default()
            .stat_mut(question_id);
        *stat = updater::apply(stat, correct);
        stat.count_answer(correct);
        debug!(
            user = %username,
            question = question_id,
            correct,
            weight = stat.weight(),
            "recorded answer"
        );
        *stat
    }

    /// Append a final score to the user's history.
    pub fn record_session_score(&mut self, username: &Username, score: u32) {
        self.profiles
            .entry(username.clone())
            .or_default()
            .push_score(score);
    }

    /// Write the full store. Failure leaves the in-memory state untouched.
    pub fn persist(&mut self) -> Result<(), PersistError> {
        self.backend.save(&self.profiles).inspect_err(|e| {
            warn!(backend = self.backend.name(), error = %e, "failed to save user data");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{fixtures::sample_profiles, JsonFileBackend, SqliteBackend};
    use crate::models::Question;
    use std::path::Path;

    fn bank() -> QuestionBank {
        QuestionBank::new(vec![
            Question::new("1", "One", vec!["a".into(), "b".into()], "a"),
            Question::new("2", "Two", vec!["a".into(), "b".into()], "b"),
            Question::new("3", "Three", vec!["a".into(), "b".into()], "a"),
        ])
        .unwrap()
    }

    fn user(name: &str) -> Username {
        Username::parse(name).unwrap()
    }

    #[test]
    fn test_get_creates_seeded_profile() {
        let mut store = PerformanceStore::in_memory();
        let profile = store.get(&user("alice"), &bank());
        assert_eq!(profile.stats().len(), 3);
        assert!(profile.stats().values().all(|s| *s == QuestionStat::new()));
        assert!(store.contains(&user("alice")));
    }

    #[test]
    fn test_begin_session_bumps_whole_bank() {
        let bank = bank();
        let mut store = PerformanceStore::in_memory();
        let alice = user("alice");
        store.get(&alice, &bank);

        store.begin_session(&alice, &bank);
        store.begin_session(&alice, &bank);
        let stat = store.profile(&alice).unwrap().stat("2").unwrap();
        assert_eq!(stat.recency(), 3);
        assert_eq!(stat.sampling_weight(), 300);
    }

    #[test]
    fn test_begin_session_seeds_new_questions() {
        let mut store = PerformanceStore::in_memory();
        let alice = user("alice");
        store.get(&alice, &bank());

        let mut questions = bank().questions().to_vec();
        questions.push(Question::new("4", "Four", vec!["a".into()], "a"));
        let grown = QuestionBank::new(questions).unwrap();

        store.begin_session(&alice, &grown);
        assert_eq!(store.profile(&alice).unwrap().stat("4").unwrap().recency(), 2);
    }

    #[test]
    fn test_record_answer_counts() {
        let bank = bank();
        let mut store = PerformanceStore::in_memory();
        let alice = user("alice");
        store.get(&alice, &bank);
        store.begin_session(&alice, &bank);

        let stat = store.record_answer(&alice, "1", true);
        assert_eq!(stat.weight(), 75);
        assert_eq!(stat.recency(), 1);
        assert_eq!(stat.times_chosen(), 1);
        assert_eq!(stat.times_correct(), 1);

        let stat = store.record_answer(&alice, "1", false);
        assert_eq!(stat.weight(), 150);
        assert_eq!(stat.times_chosen(), 2);
        assert_eq!(stat.times_correct(), 1);

        // Unanswered questions keep their recency.
        assert_eq!(store.profile(&alice).unwrap().stat("2").unwrap().recency(), 2);
    }

    #[test]
    fn test_score_history_appends() {
        let mut store = PerformanceStore::in_memory();
        let alice = user("alice");
        store.record_session_score(&alice, 4);
        store.record_session_score(&alice, 7);
        assert_eq!(store.profile(&alice).unwrap().scores(), &[4, 7]);
    }

    #[test]
    fn test_missing_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("user_data.json"));
        let (store, warning) = PerformanceStore::load(Box::new(backend)).unwrap();
        assert!(warning.is_none());
        assert_eq!(store.users().count(), 0);
    }

    #[test]
    fn test_malformed_store_is_discarded_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_data.json");
        std::fs::write(&path, "[1, 2").unwrap();

        let (store, warning) =
            PerformanceStore::load(Box::new(JsonFileBackend::new(&path))).unwrap();
        assert!(matches!(warning, Some(StoreWarning::Discarded { .. })));
        assert_eq!(store.users().count(), 0);
    }

    #[test]
    fn test_locked_sqlite_store_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_data.db");
        SqliteBackend::new(&path).save(&sample_profiles()).unwrap();

        let holder = rusqlite::Connection::open(&path).unwrap();
        holder.execute_batch("BEGIN EXCLUSIVE").unwrap();
        let err = PerformanceStore::load(Box::new(SqliteBackend::new(&path))).unwrap_err();
        assert!(!err.is_malformed());
        holder.execute_batch("ROLLBACK").unwrap();

        assert!(path.exists());
        let (store, warning) = PerformanceStore::load(Box::new(SqliteBackend::new(&path))).unwrap();
        assert!(warning.is_none());
        assert_eq!(store.profiles, sample_profiles());
    }

    #[test]
    fn test_persist_failure_keeps_memory_state() {
        let (mut store, _) = PerformanceStore::load(Box::new(MemoryBackend::failing())).unwrap();
        let alice = user("alice");
        store.get(&alice, &bank());
        store.record_answer(&alice, "1", false);

        assert!(store.persist().is_err());
        assert_eq!(store.profile(&alice).unwrap().stat("1").unwrap().weight(), 200);
    }

    fn json_backend(dir: &Path) -> Box<dyn StatsBackend> {
        Box::new(JsonFileBackend::new(dir.join("user_data.json")))
    }

    fn sqlite_backend(dir: &Path) -> Box<dyn StatsBackend> {
        Box::new(SqliteBackend::new(dir.join("user_data.db")))
    }

    #[test]
    fn test_round_trip_through_json_and_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let makers: [fn(&Path) -> Box<dyn StatsBackend>; 2] = [json_backend, sqlite_backend];

        for make in makers {
            let (mut store, _) =
                PerformanceStore::load(Box::new(MemoryBackend::with_profiles(sample_profiles())))
                    .unwrap();
            store.backend = make(dir.path());
            store.persist().unwrap();

            let (reloaded, warning) = PerformanceStore::load(make(dir.path())).unwrap();
            assert!(warning.is_none());
            assert_eq!(reloaded.profiles, sample_profiles());
        }
    }
}
