//! Record store contract.
//!
//! This module defines the [`TaskStore`] trait implemented by every backing
//! store, the [`TaskFilter`] query type, and the backend error type.
//!
//! Methods return boxed futures and streams so that stores can be swapped
//! behind an `Arc<dyn TaskStore>` at runtime.

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::domain::{OwnerId, TaskDraft, TaskId, TaskRecord};

// =============================================================================
// Repository Error
// =============================================================================

/// Errors that can occur during store operations.
///
/// Absence is not an error for `get`/`delete`: those report it through
/// `Ok(None)` / `Ok(false)`. [`RepositoryError::NotFound`] is only raised by
/// `put` when asked to replace a record that does not exist.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A replacement targeted an id with no record behind it.
    #[error("Record not found: {0}")]
    NotFound(TaskId),

    /// The write lost a race with another writer on the same record.
    #[error("Write conflict on record {0}")]
    Conflict(TaskId),

    /// Connection loss, constraint violation, or any other backend failure.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A stored row could not be mapped to a record.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl RepositoryError {
    /// Returns true for backend failures, as opposed to domain outcomes.
    #[must_use]
    pub const fn is_backend_failure(&self) -> bool {
        matches!(self, Self::DatabaseError(_) | Self::SerializationError(_))
    }
}

// =============================================================================
// Task Filter
// =============================================================================

/// Explicit query parameters for [`TaskStore::list`].
///
/// Every field that is `Some` must match; an empty filter matches all
/// records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Only records owned by this principal.
    pub owner: Option<OwnerId>,
    /// Only records with this completion flag.
    pub completed: Option<bool>,
}

impl TaskFilter {
    /// A filter that matches every record.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// A filter scoped to one principal.
    #[must_use]
    pub fn owned_by(owner: impl Into<OwnerId>) -> Self {
        Self {
            owner: Some(owner.into()),
            completed: None,
        }
    }

    /// Returns a new filter that also restricts the completion flag.
    #[must_use]
    pub fn with_completed(self, completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..self
        }
    }

    /// Returns true if no criteria are set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.owner.is_none() && self.completed.is_none()
    }

    /// Returns true if `record` satisfies every criterion.
    #[must_use]
    pub fn matches(&self, record: &TaskRecord) -> bool {
        self.owner
            .as_ref()
            .is_none_or(|owner| record.owner.as_ref() == Some(owner))
            && self
                .completed
                .is_none_or(|completed| record.completed == completed)
    }
}

// =============================================================================
// Task Store
// =============================================================================

/// Keyed storage of task records.
///
/// # Contract
///
/// - `put` with `draft.id == None` allocates a fresh, never-reused id and
///   inserts. `put` with `Some(id)` replaces the record at `id` in place,
///   keeping its `created_at` when the draft omits one, and fails with
///   [`RepositoryError::NotFound`] if no record exists there.
/// - `get` returns `Ok(None)` for an unknown id.
/// - `delete` returns `Ok(false)` for an unknown id.
/// - `list` yields records in insertion order; filtered listings keep that
///   relative order. The stream is lazy, and calling `list` again restarts
///   it from the beginning.
///
/// Writes to the same id are serialized; writes to different ids do not
/// interfere. There is no cross-record atomicity.
pub trait TaskStore: Send + Sync {
    /// Inserts or replaces a record and returns it as stored.
    fn put(&self, draft: TaskDraft) -> BoxFuture<'_, Result<TaskRecord, RepositoryError>>;

    /// Finds a record by id.
    fn get(&self, id: TaskId) -> BoxFuture<'_, Result<Option<TaskRecord>, RepositoryError>>;

    /// Streams the records matching `filter`.
    fn list(&self, filter: TaskFilter) -> BoxStream<'_, Result<TaskRecord, RepositoryError>>;

    /// Deletes a record by id. Returns `true` if it existed.
    fn delete(&self, id: TaskId) -> BoxFuture<'_, Result<bool, RepositoryError>>;
}

// =============================================================================
// Tests
// =============================================================================
