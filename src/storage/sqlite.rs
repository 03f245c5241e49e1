use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use super::CounterStore;
use crate::core::domain::Counters;
use crate::core::errors::SweepError;

/// Single-row SQLite table holding the counters (`id = 1`).
#[derive(Debug, Clone)]
pub struct SqliteCounterStore {
    pool: SqlitePool,
}

impl SqliteCounterStore {
    pub async fn new_with_url(database_url: &str) -> Result<Self, SweepError> {
        // normalize sqlite URLs: accept "sqlite:" or "sqlite://"
        let mut db_url = database_url.to_string();
        if db_url.starts_with("sqlite:")
            && !db_url.starts_with("sqlite://")
            && !db_url.starts_with("sqlite::memory:")
        {
            db_url = db_url.replacen("sqlite:", "sqlite://", 1);
        }

        // ensure parent directory exists for file-backed sqlite URLs
        if let Some(path) = db_url.strip_prefix("sqlite://") {
            let path_only = path.split_once('?').map(|(p, _)| p).unwrap_or(path);
            if path_only != ":memory:" && !path_only.is_empty() {
                if let Some(parent) = std::path::Path::new(path_only).parent() {
                    if !parent.as_os_str().is_empty() {
                        if let Err(e) = std::fs::create_dir_all(parent) {
                            warn!("Failed to create database dir {:?}: {}", parent, e);
                        }
                    }
                }
            }
        }

        let connect_options = SqliteConnectOptions::from_str(&db_url)
            .map_err(|e| SweepError::Config(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        // one writer is all the counter task ever needs
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(connect_options)
            .await?;

        let store = Self { pool };
        store.initialize_schema().await?;

        info!("Counter storage initialized");
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<(), SweepError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS count_scan (
                id INTEGER PRIMARY KEY,
                count_number INTEGER NOT NULL,
                transfer_count INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn to_db(value: u64) -> Result<i64, SweepError> {
    i64::try_from(value).map_err(|_| SweepError::Persistence(format!("Counter {} out of range", value)))
}

fn from_db(value: i64) -> Result<u64, SweepError> {
    u64::try_from(value).map_err(|_| SweepError::Persistence(format!("Negative counter {}", value)))
}

#[async_trait]
impl CounterStore for SqliteCounterStore {
    async fn load(&self) -> Result<Counters, SweepError> {
        let row = sqlx::query("SELECT count_number, transfer_count FROM count_scan WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Counters {
                check_count: from_db(row.try_get("count_number")?)?,
                transfer_count: from_db(row.try_get("transfer_count")?)?,
            }),
            None => Ok(Counters::default()),
        }
    }

    async fn save(&self, counters: &Counters) -> Result<Counters, SweepError> {
        sqlx::query(
            r#"
            INSERT INTO count_scan (id, count_number, transfer_count) VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                count_number = excluded.count_number,
                transfer_count = excluded.transfer_count
            "#,
        )
        .bind(to_db(counters.check_count)?)
        .bind(to_db(counters.transfer_count)?)
        .execute(&self.pool)
        .await?;
        Ok(*counters)
    }
}
