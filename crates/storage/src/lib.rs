use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use shared::{
    domain::ClientId,
    protocol::{Answer, Card, SessionSnapshot},
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub snapshot: SessionSnapshot,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("stored {column} for client {client_id} is not valid json: {source}")]
    CorruptColumn {
        client_id: String,
        column: &'static str,
        source: serde_json::Error,
    },
    #[error("stored current_index {value} for client {client_id} is negative")]
    NegativeIndex { client_id: String, value: i64 },
    #[error("current_index {value} for client {client_id} does not fit a database integer")]
    IndexOutOfRange { client_id: String, value: usize },
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn load_session(&self, client_id: &ClientId) -> Result<Option<StoredSession>> {
        let row = sqlx::query(
            "SELECT client_id, history, current_index, cards, updated_at
             FROM therapy_sessions
             WHERE client_id = ?",
        )
        .bind(client_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| decode_session(client_id, &r)).transpose()
    }

    /// Inserts or replaces the whole snapshot for its client.
    pub async fn upsert_session(&self, snapshot: &SessionSnapshot) -> Result<DateTime<Utc>> {
        let history = serde_json::to_string(&snapshot.history).context("encode history")?;
        let cards = serde_json::to_string(&snapshot.cards).context("encode cards")?;
        let current_index =
            i64::try_from(snapshot.position).map_err(|_| StorageError::IndexOutOfRange {
                client_id: snapshot.client_id.as_str().to_string(),
                value: snapshot.position,
            })?;
        let updated_at = Utc::now();

        sqlx::query(
            "INSERT INTO therapy_sessions (client_id, history, current_index, cards, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(client_id) DO UPDATE SET
                history = excluded.history,
                current_index = excluded.current_index,
                cards = excluded.cards,
                updated_at = excluded.updated_at",
        )
        .bind(snapshot.client_id.as_str())
        .bind(history)
        .bind(current_index)
        .bind(cards)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(updated_at)
    }

    /// Returns whether a row was removed.
    pub async fn delete_session(&self, client_id: &ClientId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM therapy_sessions WHERE client_id = ?")
            .bind(client_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_sessions(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM therapy_sessions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn decode_session(client_id: &ClientId, row: &SqliteRow) -> Result<StoredSession> {
    let corrupt = |column: &'static str| {
        move |source| StorageError::CorruptColumn {
            client_id: client_id.to_string(),
            column,
            source,
        }
    };

    let history: Vec<Answer> =
        serde_json::from_str(&row.get::<String, _>(1)).map_err(corrupt("history"))?;
    let cards: Vec<Card> =
        serde_json::from_str(&row.get::<String, _>(3)).map_err(corrupt("cards"))?;
    let raw_index = row.get::<i64, _>(2);
    let position = usize::try_from(raw_index).map_err(|_| StorageError::NegativeIndex {
        client_id: client_id.to_string(),
        value: raw_index,
    })?;

    Ok(StoredSession {
        snapshot: SessionSnapshot {
            client_id: client_id.clone(),
            history,
            position,
            cards,
        },
        updated_at: row.get::<DateTime<Utc>, _>(4),
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
