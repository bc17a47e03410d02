//! SQLite backend.

use super::{Profiles, StatsBackend};
use crate::error::{StoreError, StoreResult};
use crate::models::{QuestionStat, UserProfile, Username};
use rusqlite::{params, Connection, ErrorCode};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        username TEXT PRIMARY KEY
    );

    CREATE TABLE IF NOT EXISTS question_stats (
        username TEXT NOT NULL REFERENCES users(username),
        question_id TEXT NOT NULL,
        weight INTEGER NOT NULL,
        recency INTEGER NOT NULL,
        times_chosen INTEGER NOT NULL DEFAULT 0,
        times_correct INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (username, question_id)
    );

    CREATE TABLE IF NOT EXISTS scores (
        username TEXT NOT NULL REFERENCES users(username),
        position INTEGER NOT NULL,
        score INTEGER NOT NULL,
        PRIMARY KEY (username, position)
    );
"#;

/// Stores profiles in an SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    path: PathBuf,
}

impl SqliteBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> StoreResult<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(conn)
    }
}

impl StatsBackend for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn load(&self) -> StoreResult<Option<Profiles>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let conn = self.open().map_err(classify_load_error)?;
        read_profiles(&conn).map(Some).map_err(classify_load_error)
    }

    fn save(&mut self, profiles: &Profiles) -> StoreResult<()> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM scores", [])?;
        tx.execute("DELETE FROM question_stats", [])?;
        tx.execute("DELETE FROM users", [])?;

        for (username, profile) in profiles {
            tx.execute("INSERT INTO users (username) VALUES (?1)", params![username.as_str()])?;
            for (question_id, stat) in profile.stats() {
                tx.execute(
                    "INSERT INTO question_stats
                        (username, question_id, weight, recency, times_chosen, times_correct)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        username.as_str(),
                        question_id,
                        stat.weight(),
                        stat.recency(),
                        stat.times_chosen(),
                        stat.times_correct(),
                    ],
                )?;
            }
            for (position, score) in profile.scores().iter().enumerate() {
                tx.execute(
                    "INSERT INTO scores (username, position, score) VALUES (?1, ?2, ?3)",
                    params![username.as_str(), position as i64, score],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn discard(&mut self) -> StoreResult<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Errors about the file's contents become `Malformed`; busy, locked or
/// unreadable databases stay `Sqlite` so the data is never discarded for them.
fn classify_load_error(e: StoreError) -> StoreError {
    match e {
        StoreError::Sqlite(err) if is_content_error(&err) => {
            StoreError::Malformed(err.to_string())
        }
        other => other,
    }
}

fn is_content_error(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, _) => matches!(
            err.code,
            // A foreign schema ("no such column") surfaces as the generic SQLITE_ERROR.
            ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt | ErrorCode::Unknown
        ),
        rusqlite::Error::SqlInputError { error, .. } => error.code == ErrorCode::Unknown,
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => true,
        _ => false,
    }
}

fn read_profiles(conn: &Connection) -> StoreResult<Profiles> {
    let mut users: BTreeMap<String, (BTreeMap<String, QuestionStat>, Vec<u32>)> = BTreeMap::new();

    let mut stmt = conn.prepare("SELECT username FROM users")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    for name in names {
        users.entry(name).or_default();
    }

    let mut stmt = conn.prepare(
        "SELECT username, question_id, weight, recency, times_chosen, times_correct
         FROM question_stats",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, u32>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (name, question_id, weight, recency, chosen, correct) in rows {
        let stat = QuestionStat::from_parts(weight, recency, chosen, correct).ok_or_else(|| {
            StoreError::Malformed(format!(
                "user {}: statistics for question {} are out of range",
                name, question_id
            ))
        })?;
        users.entry(name).or_default().0.insert(question_id, stat);
    }

    let mut stmt = conn.prepare("SELECT username, score FROM scores ORDER BY username, position")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    for (name, score) in rows {
        users.entry(name).or_default().1.push(score);
    }

    let mut profiles = Profiles::new();
    for (name, (stats, scores)) in users {
        let username = Username::parse(&name)
            .map_err(|_| StoreError::Malformed(format!("invalid username {:?}", name)))?;
        profiles.insert(username, UserProfile::from_parts(stats, scores));
    }
    Ok(profiles)
}
