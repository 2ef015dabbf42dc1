pub mod config;
pub mod operations;
pub mod schema;

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::config::{DbConfig, DbConfigError};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    location: String,
}

impl Database {
    pub async fn from_env() -> Result<Arc<Self>, DbInitError> {
        let config = DbConfig::from_env()?;
        Self::connect(&config).await.map(Arc::new)
    }

    pub async fn connect(config: &DbConfig) -> Result<Self, DbInitError> {
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| DbInitError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(config.journal_mode.to_sqlx())
            .busy_timeout(config.busy_timeout)
            .foreign_keys(config.foreign_keys);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            location: config.path.display().to_string(),
        };
        db.init_schema().await?;
        Ok(db)
    }

    /// Private in-memory database, one connection so every query sees the same data.
    pub async fn in_memory() -> Result<Self, DbInitError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            location: ":memory:".to_string(),
        };
        db.init_schema().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub async fn ping(&self) -> HealthCheckResult {
        let started = Instant::now();
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => HealthCheckResult {
                healthy: true,
                latency_ms: Some(started.elapsed().as_millis() as u64),
                error: None,
            },
            Err(err) => HealthCheckResult {
                healthy: false,
                latency_ms: None,
                error: Some(err.to_string()),
            },
        }
    }

    async fn init_schema(&self) -> Result<(), DbInitError> {
        let applied = schema::apply_schema(&self.pool).await?;
        tracing::info!(statements = applied, location = %self.location, "database schema ready");
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error(transparent)]
    Config(#[from] DbConfigError),
    #[error("failed to create database directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub(crate) fn now_naive() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn format_naive_iso(value: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(value, Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
