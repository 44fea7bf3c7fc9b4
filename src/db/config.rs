use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout: Duration,
    pub journal_mode: SqliteJournalMode,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, DbConfigError> {
        let url = match std::env::var("DATABASE_URL") {
            Ok(value) if !value.trim().is_empty() => value,
            _ => default_database_url()?,
        };

        if !url.starts_with("sqlite:") {
            return Err(DbConfigError::UnsupportedUrl { url });
        }

        let journal_mode = std::env::var("SQLITE_JOURNAL_MODE")
            .ok()
            .as_deref()
            .and_then(SqliteJournalMode::parse)
            .unwrap_or(SqliteJournalMode::Wal);

        Ok(Self {
            url,
            max_connections: env_u32("DB_MAX_CONNECTIONS", 5),
            busy_timeout: Duration::from_millis(env_u64("SQLITE_BUSY_TIMEOUT_MS", 30000)),
            journal_mode,
        })
    }

    /// Config for a database file at `path`, bypassing the environment.
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            url: format!("sqlite:{}?mode=rwc", path.display()),
            max_connections: 5,
            busy_timeout: Duration::from_secs(30),
            journal_mode: SqliteJournalMode::Wal,
        }
    }
}

pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("phraseology-trainer")
        .join("trainer.db")
}

fn default_database_url() -> Result<String, DbConfigError> {
    let path = default_database_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| DbConfigError::DataDir {
            path: parent.display().to_string(),
            message: err.to_string(),
        })?;
    }
    Ok(format!("sqlite:{}?mode=rwc", path.display()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqliteJournalMode {
    Wal,
    Delete,
    Truncate,
    Memory,
}

impl SqliteJournalMode {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "WAL" => Some(Self::Wal),
            "DELETE" => Some(Self::Delete),
            "TRUNCATE" => Some(Self::Truncate),
            "MEMORY" => Some(Self::Memory),
            _ => None,
        }
    }

    pub fn as_sqlx(self) -> sqlx::sqlite::SqliteJournalMode {
        match self {
            Self::Wal => sqlx::sqlite::SqliteJournalMode::Wal,
            Self::Delete => sqlx::sqlite::SqliteJournalMode::Delete,
            Self::Truncate => sqlx::sqlite::SqliteJournalMode::Truncate,
            Self::Memory => sqlx::sqlite::SqliteJournalMode::Memory,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbConfigError {
    #[error("unsupported DATABASE_URL (expected sqlite:): {url}")]
    UnsupportedUrl { url: String },
    #[error("failed to create data directory {path}: {message}")]
    DataDir { path: String, message: String },
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}
