//! `PostgreSQL` record store.
//!
//! This module provides a `PostgreSQL`-backed [`TaskStore`] using `sqlx`.
//! Every write is a single statement, so single-record writes are atomic
//! and same-id writes are serialized by row locks.
//!
//! # Table Schema
//!
//! ```sql
//! CREATE TABLE tasks (
//!     id BIGSERIAL PRIMARY KEY,
//!     title TEXT NOT NULL,
//!     description TEXT NOT NULL DEFAULT '',
//!     completed BOOLEAN NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     owner_id TEXT NULL
//! );
//! CREATE INDEX idx_tasks_owner_id ON tasks(owner_id);
//! ```
//!
//! `BIGSERIAL` sequences never hand out a value twice, so deleted ids are
//! not reused.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use sqlx::PgPool;

use crate::domain::{OwnerId, TaskDraft, TaskId, TaskRecord, Timestamp};
use crate::infrastructure::{RepositoryError, TaskFilter, TaskStore};

const SCHEMA_STATEMENTS: [&str; 2] = [
    "CREATE TABLE IF NOT EXISTS tasks ( \
         id BIGSERIAL PRIMARY KEY, \
         title TEXT NOT NULL, \
         description TEXT NOT NULL DEFAULT '', \
         completed BOOLEAN NOT NULL, \
         created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(), \
         owner_id TEXT NULL \
     )",
    "CREATE INDEX IF NOT EXISTS idx_tasks_owner_id ON tasks(owner_id)",
];

const RETURNING_COLUMNS: &str = "id, title, description, completed, created_at, owner_id";

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw row as read from the `tasks` table.
#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: i64,
    title: String,
    description: String,
    completed: bool,
    created_at: DateTime<Utc>,
    owner_id: Option<String>,
}

impl TryFrom<TaskRow> for TaskRecord {
    type Error = RepositoryError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let id = u64::try_from(row.id).map_err(|_| {
            RepositoryError::SerializationError(format!("negative task id {}", row.id))
        })?;

        Ok(Self {
            id: TaskId::new(id),
            title: row.title,
            description: row.description,
            completed: row.completed,
            created_at: Timestamp::from_datetime(row.created_at),
            owner: row.owner_id.map(OwnerId::new),
        })
    }
}

/// Ids above `i64::MAX` cannot exist in a `BIGSERIAL` column.
fn database_id(id: TaskId) -> Option<i64> {
    i64::try_from(id.value()).ok()
}

#[allow(clippy::needless_pass_by_value)]
fn database_error(error: sqlx::Error) -> RepositoryError {
    RepositoryError::DatabaseError(error.to_string())
}

// =============================================================================
// PostgreSQL Task Store
// =============================================================================

/// `PostgreSQL` implementation of [`TaskStore`].
///
/// # Example
///
/// ```ignore
/// use todo_core::infrastructure::PostgresTaskStore;
///
/// let pool = PgPool::connect("postgres://localhost/todo").await?;
/// let store = PostgresTaskStore::new(pool);
/// store.ensure_schema().await?;
/// ```
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: PgPool,
}

impl PostgresTaskStore {
    /// Creates a new store over the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the `tasks` table and its owner index if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DatabaseError` if a statement fails.
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(database_error)?;
        }
        tracing::info!("PostgreSQL task schema ready");
        Ok(())
    }

    async fn insert(&self, draft: TaskDraft) -> Result<TaskRecord, RepositoryError> {
        let sql = format!(
            "INSERT INTO tasks (title, description, completed, created_at, owner_id) \
             VALUES ($1, $2, $3, COALESCE($4, NOW()), $5) \
             RETURNING {RETURNING_COLUMNS}"
        );

        let row: TaskRow = sqlx::query_as(&sql)
            .bind(draft.title)
            .bind(draft.description)
            .bind(draft.completed)
            .bind(draft.created_at.map(|timestamp| *timestamp.as_datetime()))
            .bind(draft.owner.map(|owner| owner.as_str().to_string()))
            .fetch_one(&self.pool)
            .await
            .map_err(database_error)?;

        TaskRecord::try_from(row)
    }

    async fn replace(&self, id: TaskId, draft: TaskDraft) -> Result<TaskRecord, RepositoryError> {
        let sql = format!(
            "UPDATE tasks SET title = $2, description = $3, completed = $4, \
             created_at = COALESCE($5, created_at), owner_id = $6 \
             WHERE id = $1 \
             RETURNING {RETURNING_COLUMNS}"
        );

        let Some(row_id) = database_id(id) else {
            return Err(RepositoryError::NotFound(id));
        };

        let row: Option<TaskRow> = sqlx::query_as(&sql)
            .bind(row_id)
            .bind(draft.title)
            .bind(draft.description)
            .bind(draft.completed)
            .bind(draft.created_at.map(|timestamp| *timestamp.as_datetime()))
            .bind(draft.owner.map(|owner| owner.as_str().to_string()))
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error)?;

        row.map_or(Err(RepositoryError::NotFound(id)), TaskRecord::try_from)
    }
}

impl TaskStore for PostgresTaskStore {
    fn put(&self, draft: TaskDraft) -> BoxFuture<'_, Result<TaskRecord, RepositoryError>> {
        async move {
            match draft.id {
                None => self.insert(draft).await,
                Some(id) => self.replace(id, draft).await,
            }
        }
        .boxed()
    }

    fn get(&self, id: TaskId) -> BoxFuture<'_, Result<Option<TaskRecord>, RepositoryError>> {
        async move {
            let Some(row_id) = database_id(id) else {
                return Ok(None);
            };

            let sql = format!("SELECT {RETURNING_COLUMNS} FROM tasks WHERE id = $1");
            let row: Option<TaskRow> = sqlx::query_as(&sql)
                .bind(row_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(database_error)?;

            row.map(TaskRecord::try_from).transpose()
        }
        .boxed()
    }

    fn list(&self, filter: TaskFilter) -> BoxStream<'_, Result<TaskRecord, RepositoryError>> {
        const LIST_SQL: &str = "SELECT id, title, description, completed, created_at, owner_id \
             FROM tasks \
             WHERE ($1::TEXT IS NULL OR owner_id = $1) \
               AND ($2::BOOLEAN IS NULL OR completed = $2) \
             ORDER BY id ASC";

        sqlx::query_as::<_, TaskRow>(LIST_SQL)
            .bind(filter.owner.map(|owner| owner.as_str().to_string()))
            .bind(filter.completed)
            .fetch(&self.pool)
            .map(|row| {
                row.map_err(database_error)
                    .and_then(TaskRecord::try_from)
            })
            .boxed()
    }

    fn delete(&self, id: TaskId) -> BoxFuture<'_, Result<bool, RepositoryError>> {
        async move {
            let Some(row_id) = database_id(id) else {
                return Ok(false);
            };

            let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
                .bind(row_id)
                .execute(&self.pool)
                .await
                .map_err(database_error)?;

            Ok(result.rows_affected() > 0)
        }
        .boxed()
    }
}

// =============================================================================
// Tests
// =============================================================================
