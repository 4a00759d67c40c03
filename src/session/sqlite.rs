use std::path::Path;

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Row, SqlitePool,
};

use super::SessionStore;
use crate::error::{ApiError, Result};

/// Persistent client-side storage, the durable analogue of the browser's
/// local storage.
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| {
                ApiError::unexpected(format!(
                    "Failed to open session store at {}: {e}",
                    path.display()
                ))
            })?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| ApiError::unexpected(format!("Failed to run store migrations: {e}")))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT record_value FROM session_records WHERE record_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApiError::unexpected(format!("Failed to read session record: {e}")))?;

        Ok(row.map(|row| row.get(0)))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
          INSERT INTO session_records (record_key, record_value, updated_at)
          VALUES (?, ?, strftime('%s', 'now'))
          ON CONFLICT(record_key) DO UPDATE
          SET record_value = excluded.record_value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::unexpected(format!("Failed to write session record: {e}")))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM session_records WHERE record_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::unexpected(format!("Failed to remove session record: {e}")))?;

        Ok(())
    }
}
