use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::types::Json;
use tokio::sync::Mutex;
use toolbelt_core::logs::{Direction, LOG_RETENTION, NewLogEntry, RequestLogEntry};
use toolbelt_core::store::{Store, StoreError};
use toolbelt_core::tools::ToolDefinition;

#[derive(sqlx::FromRow)]
struct LogRow {
    id: i64,
    session_id: String,
    direction: String,
    method: String,
    params: Option<Json<Value>>,
    result: Option<Json<Value>>,
    error: Option<Json<Value>>,
    timestamp: DateTime<Utc>,
}

impl TryFrom<LogRow> for RequestLogEntry {
    type Error = StoreError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        let direction = Direction::parse(&row.direction).ok_or_else(|| {
            StoreError::Backend(format!("unknown log direction '{}'", row.direction))
        })?;
        Ok(RequestLogEntry {
            id: row.id as u64,
            session_id: row.session_id,
            direction,
            method: row.method,
            params: row.params.map(|p| p.0),
            result: row.result.map(|r| r.0),
            error: row.error.map(|e| e.0),
            timestamp: row.timestamp,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ToolRow {
    name: String,
    description: String,
    input_schema: Json<Value>,
    mock_response: Json<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ToolRow> for ToolDefinition {
    fn from(row: ToolRow) -> Self {
        ToolDefinition {
            name: row.name,
            description: row.description,
            input_schema: row.input_schema.0,
            mock_response: row.mock_response.0,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

/// SQLite-backed store. Writes go through one lock so append and trim stay atomic.
pub struct SqliteStore {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl SqliteStore {
    pub async fn connect(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(backend)?;
        tracing::info!(path = %path.display(), "sqlite store connected");
        Self::with_pool(pool).await
    }

    /// Private in-memory database; a single connection keeps every query on the same db.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(backend)?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("../migrations")
            .run(&pool)
            .await
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
        })
    }

    async fn append(&self, entry: NewLogEntry) -> Result<RequestLogEntry, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut stored = entry.into_entry(0, Utc::now());

        let mut tx = self.pool.begin().await.map_err(backend)?;
        let id = sqlx::query(
            "INSERT INTO request_logs (session_id, direction, method, params, result, error, timestamp) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&stored.session_id)
        .bind(stored.direction.as_str())
        .bind(&stored.method)
        .bind(stored.params.as_ref().map(Json))
        .bind(stored.result.as_ref().map(Json))
        .bind(stored.error.as_ref().map(Json))
        .bind(stored.timestamp)
        .execute(&mut *tx)
        .await
        .map_err(backend)?
        .last_insert_rowid();

        sqlx::query(
            "DELETE FROM request_logs WHERE id <= \
             (SELECT id FROM request_logs ORDER BY id DESC LIMIT 1 OFFSET ?)",
        )
        .bind(LOG_RETENTION as i64)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;
        tx.commit().await.map_err(backend)?;

        stored.id = id as u64;
        Ok(stored)
    }

    async fn newest(&self, limit: usize) -> Result<Vec<RequestLogEntry>, StoreError> {
        let rows = sqlx::query_as::<_, LogRow>(
            "SELECT id, session_id, direction, method, params, result, error, timestamp \
             FROM request_logs ORDER BY id DESC LIMIT ?",
        )
        .bind(limit.min(LOG_RETENTION) as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.into_iter().map(RequestLogEntry::try_from).collect()
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        sqlx::query("DELETE FROM request_logs")
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn upsert(&self, tool: ToolDefinition) -> Result<ToolDefinition, StoreError> {
        let _guard = self.write_lock.lock().await;
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO mock_tools (name, description, input_schema, mock_response, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(name) DO UPDATE SET \
                description = excluded.description, \
                input_schema = excluded.input_schema, \
                mock_response = excluded.mock_response, \
                updated_at = excluded.updated_at",
        )
        .bind(&tool.name)
        .bind(&tool.description)
        .bind(Json(&tool.input_schema))
        .bind(Json(&tool.mock_response))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        let row = sqlx::query_as::<_, ToolRow>(
            "SELECT name, description, input_schema, mock_response, created_at, updated_at \
             FROM mock_tools WHERE name = ?",
        )
        .bind(&tool.name)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.into())
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let result = sqlx::query("DELETE FROM mock_tools WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn tools(&self) -> Result<Vec<ToolDefinition>, StoreError> {
        let rows = sqlx::query_as::<_, ToolRow>(
            "SELECT name, description, input_schema, mock_response, created_at, updated_at \
             FROM mock_tools ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        Ok(rows.into_iter().map(ToolDefinition::from).collect())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn append_log(&self, entry: NewLogEntry) -> Result<RequestLogEntry, StoreError> {
        self.append(entry).await
    }

    async fn list_logs(&self, limit: usize) -> Result<Vec<RequestLogEntry>, StoreError> {
        self.newest(limit).await
    }

    async fn clear_logs(&self) -> Result<(), StoreError> {
        self.clear().await
    }

    async fn upsert_tool(&self, tool: ToolDefinition) -> Result<ToolDefinition, StoreError> {
        self.upsert(tool).await
    }

    async fn delete_tool(&self, name: &str) -> Result<bool, StoreError> {
        self.delete(name).await
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, StoreError> {
        self.tools().await
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}
