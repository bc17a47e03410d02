//! JSON file backend.
//!
//! Each user is stored as parallel maps keyed by question id:
//!
//! ```json
//! { "alice": { "weights": {"1": 75}, "times_chosen": {"1": 1},
//!              "correct_answers": {"1": 1}, "adj": {"1": 1},
//!              "adj_weights": {"1": 75}, "scores": [3] } }
//! ```
//!
//! `adj_weights` is derived data; it is written for readers of the file and
//! recomputed on load.

use super::{Profiles, StatsBackend};
use crate::error::{StoreError, StoreResult};
use crate::models::{QuestionStat, UserProfile, Username, DEFAULT_RECENCY, DEFAULT_WEIGHT};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfileRecord {
    #[serde(default)]
    weights: BTreeMap<String, u32>,
    #[serde(default)]
    times_chosen: BTreeMap<String, u32>,
    #[serde(default)]
    correct_answers: BTreeMap<String, u32>,
    #[serde(default)]
    adj: BTreeMap<String, u32>,
    #[serde(default)]
    adj_weights: BTreeMap<String, u64>,
    #[serde(default)]
    scores: Vec<u32>,
}

impl ProfileRecord {
    fn from_profile(profile: &UserProfile) -> Self {
        let mut record = Self {
            scores: profile.scores().to_vec(),
            ..Self::default()
        };
        for (id, stat) in profile.stats() {
            record.weights.insert(id.clone(), stat.weight());
            record.times_chosen.insert(id.clone(), stat.times_chosen());
            record.correct_answers.insert(id.clone(), stat.times_correct());
            record.adj.insert(id.clone(), stat.recency());
            record.adj_weights.insert(id.clone(), stat.sampling_weight());
        }
        record
    }

    fn into_profile(self, username: &str) -> StoreResult<UserProfile> {
        let ids: BTreeSet<&String> = self
            .weights
            .keys()
            .chain(self.adj.keys())
            .chain(self.times_chosen.keys())
            .chain(self.correct_answers.keys())
            .collect();

        let mut stats = BTreeMap::new();
        for id in ids {
            let stat = QuestionStat::from_parts(
                self.weights.get(id).copied().unwrap_or(DEFAULT_WEIGHT),
                self.adj.get(id).copied().unwrap_or(DEFAULT_RECENCY),
                self.times_chosen.get(id).copied().unwrap_or(0),
                self.correct_answers.get(id).copied().unwrap_or(0),
            )
            .ok_or_else(|| {
                StoreError::Malformed(format!(
                    "user {}: statistics for question {} are out of range",
                    username, id
                ))
            })?;
            stats.insert(id.clone(), stat);
        }
        Ok(UserProfile::from_parts(stats, self.scores))
    }
}

/// Stores every profile in a single pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatsBackend for JsonFileBackend {
    fn name(&self) -> &str {
        "json"
    }

    fn load(&self) -> StoreResult<Option<Profiles>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let records: BTreeMap<String, ProfileRecord> = serde_json::from_str(&content)?;
        let mut profiles = Profiles::new();
        for (name, record) in records {
            let username = Username::parse(&name)
                .map_err(|_| StoreError::Malformed(format!("invalid username {:?}", name)))?;
            profiles.insert(username, record.into_profile(&name)?);
        }
        Ok(Some(profiles))
    }

    fn save(&mut self, profiles: &Profiles) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let records: BTreeMap<&str, ProfileRecord> = profiles
            .iter()
            .map(|(name, profile)| (name.as_str(), ProfileRecord::from_profile(profile)))
            .collect();
        let content = serde_json::to_string_pretty(&records)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}
