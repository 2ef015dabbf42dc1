use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

const DEFAULT_DATABASE_PATH: &str = "./data/english-tutor.db";

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    pub journal_mode: SqliteJournalMode,
    pub busy_timeout: Duration,
    pub foreign_keys: bool,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, DbConfigError> {
        let raw_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| DEFAULT_DATABASE_PATH.to_string());
        if raw_path.trim().is_empty() {
            return Err(DbConfigError::Invalid {
                key: "DATABASE_PATH",
                value: raw_path,
            });
        }

        let journal_mode = match std::env::var("SQLITE_JOURNAL_MODE") {
            Ok(value) => SqliteJournalMode::parse(&value).ok_or(DbConfigError::Invalid {
                key: "SQLITE_JOURNAL_MODE",
                value,
            })?,
            Err(_) => SqliteJournalMode::Wal,
        };

        Ok(Self {
            path: resolve_path_relative_to_manifest_dir(raw_path.trim()),
            journal_mode,
            busy_timeout: Duration::from_millis(env_u64("SQLITE_BUSY_TIMEOUT_MS", 5000)),
            foreign_keys: env_bool("SQLITE_FOREIGN_KEYS", true),
            max_connections: env_u32("DB_MAX_CONNECTIONS", 5).max(1),
        })
    }

    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            journal_mode: SqliteJournalMode::Wal,
            busy_timeout: Duration::from_secs(5),
            foreign_keys: true,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqliteJournalMode {
    Wal,
    Delete,
    Truncate,
    Persist,
    Memory,
    Off,
}

impl SqliteJournalMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "WAL" => Some(Self::Wal),
            "DELETE" => Some(Self::Delete),
            "TRUNCATE" => Some(Self::Truncate),
            "PERSIST" => Some(Self::Persist),
            "MEMORY" => Some(Self::Memory),
            "OFF" => Some(Self::Off),
            _ => None,
        }
    }

    pub fn to_sqlx(self) -> sqlx::sqlite::SqliteJournalMode {
        use sqlx::sqlite::SqliteJournalMode as Mode;
        match self {
            Self::Wal => Mode::Wal,
            Self::Delete => Mode::Delete,
            Self::Truncate => Mode::Truncate,
            Self::Persist => Mode::Persist,
            Self::Memory => Mode::Memory,
            Self::Off => Mode::Off,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
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

fn resolve_path_relative_to_manifest_dir(value: &str) -> PathBuf {
    let raw = Path::new(value);
    if raw.is_absolute() {
        return raw.to_path_buf();
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(raw)
}
