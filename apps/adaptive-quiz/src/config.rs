//! Configuration for the adaptive quiz.

use quiz_engine::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub quiz: QuizConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Config {
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(self)?;
            std::fs::write(path, content)?;
        }
        Ok(())
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("", "", "adaptive-quiz")
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|d| d.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|d| d.data_dir().to_path_buf())
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::data_dir().map(|d| d.join("adaptive-quiz.log"))
    }

    /// Where user statistics live: the configured path, or a file in the data dir.
    pub fn store_path(&self) -> PathBuf {
        if let Some(path) = &self.storage.path {
            return path.clone();
        }
        let file = match self.storage.backend {
            StorageBackend::Json => "user_data.json",
            StorageBackend::Sqlite => "user_data.db",
        };
        Self::data_dir()
            .map(|d| d.join(file))
            .unwrap_or_else(|| file.into())
    }

    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            questions_per_quiz: self.quiz.questions_per_quiz,
            duration: chrono::Duration::seconds(i64::from(self.quiz.duration_secs)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    #[serde(default = "default_questions_per_quiz")]
    pub questions_per_quiz: usize,
    /// Time limit in seconds. Values beyond `u32` are rejected when parsing.
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u32,
    #[serde(default = "default_questions_file")]
    pub questions_file: PathBuf,
}

fn default_questions_per_quiz() -> usize { 25 }
fn default_duration_secs() -> u32 { 25 * 60 }
fn default_questions_file() -> PathBuf { PathBuf::from("questions.json") }

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            questions_per_quiz: default_questions_per_quiz(),
            duration_secs: default_duration_secs(),
            questions_file: default_questions_file(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_true")]
    pub show_history_chart: bool,
    #[serde(default = "default_true")]
    pub show_question_tally: bool,
}

fn default_true() -> bool { true }

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_history_chart: true,
            show_question_tally: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.quiz.questions_per_quiz, 25);
        assert_eq!(config.to_session_config().duration, chrono::Duration::minutes(25));
        assert_eq!(config.storage.backend, StorageBackend::Json);
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [quiz]
            questions_per_quiz = 10

            [storage]
            backend = "sqlite"
            path = "/tmp/stats.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.quiz.questions_per_quiz, 10);
        assert_eq!(config.quiz.duration_secs, 1500);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.store_path(), PathBuf::from("/tmp/stats.db"));
        assert!(config.display.show_history_chart);
    }

    #[test]
    fn test_duration_limits() {
        let huge = "[quiz]\nduration_secs = 9223372036854775807\n";
        assert!(toml::from_str::<Config>(huge).is_err());

        let mut config = Config::default();
        config.quiz.duration_secs = u32::MAX;
        assert_eq!(
            config.to_session_config().duration,
            chrono::Duration::seconds(u32::MAX as i64)
        );
    }
}
