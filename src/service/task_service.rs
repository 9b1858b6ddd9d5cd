//! Task service orchestration.
//!
//! [`TaskService`] is the only entry point callers use. Each operation runs
//! validation, a cache lookup or invalidation, and a store call in a fixed
//! order:
//!
//! | Operation | Validation | Cache                     | Store             |
//! |-----------|------------|---------------------------|-------------------|
//! | `create`  | payload    | invalidate new id         | `put` (insert)    |
//! | `get`     | -          | read-through              | `get` on miss     |
//! | `update`  | payload    | read-through, invalidate  | `put` (replace)   |
//! | `delete`  | -          | read-through, invalidate  | `delete`          |
//! | `list`    | -          | bypassed                  | `list`            |
//!
//! Backend failures on reads are retried once. Writes are never retried.

use std::sync::Arc;

use futures::TryStreamExt;

use super::ServiceError;
use crate::domain::{Clock, TaskDraft, TaskId, TaskPayload, TaskRecord, TaskValidator};
use crate::infrastructure::{CacheResult, RecordCache, RepositoryError, TaskFilter, TaskStore};

/// Create/read/update/delete/list over a [`TaskStore`], with validation and
/// a read-through [`RecordCache`].
///
/// The service is `Send + Sync`; share it behind an `Arc` for concurrent
/// callers. `S` may be a concrete store or `dyn TaskStore`.
///
/// # Example
///
/// ```ignore
/// let service = TaskService::new(
///     Arc::new(InMemoryTaskStore::new()),
///     RecordCache::default(),
///     TaskValidator::default(),
///     Arc::new(SystemClock),
/// );
///
/// let created = service.create(TaskPayload::new("Buy milk", false)).await?;
/// let fetched = service.get(created.id).await?;
/// ```
pub struct TaskService<S: TaskStore + ?Sized = dyn TaskStore> {
    store: Arc<S>,
    cache: RecordCache,
    validator: TaskValidator,
    clock: Arc<dyn Clock>,
}

impl<S: TaskStore + ?Sized> std::fmt::Debug for TaskService<S> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TaskService")
            .field("store", &std::any::type_name::<S>())
            .field("cache", &self.cache)
            .field("validator", &self.validator)
            .field("clock", &self.clock)
            .finish()
    }
}

impl<S: TaskStore + ?Sized> TaskService<S> {
    /// Creates a service from its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        cache: RecordCache,
        validator: TaskValidator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            cache,
            validator,
            clock,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    #[must_use]
    pub const fn cache(&self) -> &RecordCache {
        &self.cache
    }

    #[must_use]
    pub const fn validator(&self) -> &TaskValidator {
        &self.validator
    }

    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Validates `payload` and stores it as a new record.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` if the payload breaks any field rule
    /// - `ServiceError::Store` / `ServiceError::Conflict` if the store rejects the write
    pub async fn create(&self, payload: TaskPayload) -> Result<TaskRecord, ServiceError> {
        let task = self.validator.validate(&payload).inspect_err(|violations| {
            tracing::debug!(violations = violations.len(), "Create rejected by validation");
        })?;

        let draft = TaskDraft::insert(task, Some(self.clock.now()));
        let record = self.store.put(draft).await.inspect_err(|error| {
            tracing::warn!(error = %error, "Create rejected by store");
        })?;

        // Clears any negative entry left by an earlier lookup of this id.
        self.cache.invalidate(record.id);

        tracing::debug!(task_id = %record.id, "Task created");
        Ok(record)
    }

    /// Returns the record stored under `id`.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` if no such record exists
    /// - `ServiceError::Store` if the store fails twice in a row
    pub async fn get(&self, id: TaskId) -> Result<TaskRecord, ServiceError> {
        self.get_with_status(id).await.map(|result| result.value)
    }

    /// Like [`get`](Self::get), but also reports how the cache served the read.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn get_with_status(
        &self,
        id: TaskId,
    ) -> Result<CacheResult<TaskRecord>, ServiceError> {
        let result = self
            .cache
            .get_or_load(id, || self.fetch_with_retry(id))
            .await?;

        let status = result.cache_status;
        result.value.map_or_else(
            || {
                tracing::debug!(task_id = %id, cache_status = %status, "Task not found");
                Err(ServiceError::NotFound { id })
            },
            |record| Ok(CacheResult::new(record, status)),
        )
    }

    /// Replaces the record under `id` with `payload`.
    ///
    /// The identifier, `created_at` and owner of the existing record are
    /// kept.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` if no such record exists, checked before validation
    /// - `ServiceError::Validation` if the payload breaks any field rule
    /// - `ServiceError::Store` / `ServiceError::Conflict` if the store rejects the write
    pub async fn update(
        &self,
        id: TaskId,
        payload: TaskPayload,
    ) -> Result<TaskRecord, ServiceError> {
        let existing = self.get(id).await?;

        let task = self.validator.validate(&payload).inspect_err(|violations| {
            tracing::debug!(
                task_id = %id,
                violations = violations.len(),
                "Update rejected by validation"
            );
        })?;

        let draft = TaskDraft::replacement(&existing, task);
        let result = self.store.put(draft).await;

        // A failed put may still have landed.
        self.cache.invalidate(id);

        let record = result.inspect_err(|error| {
            tracing::warn!(task_id = %id, error = %error, "Update rejected by store");
        })?;

        tracing::debug!(task_id = %id, "Task updated");
        Ok(record)
    }

    /// Deletes the record under `id`.
    ///
    /// Deleting the same id twice fails the second time with `NotFound`.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` if no such record exists
    /// - `ServiceError::Store` if the store rejects the delete
    pub async fn delete(&self, id: TaskId) -> Result<(), ServiceError> {
        self.get(id).await?;

        let result = self.store.delete(id).await;
        self.cache.invalidate(id);

        let removed = result.inspect_err(|error| {
            tracing::warn!(task_id = %id, error = %error, "Delete rejected by store");
        })?;

        if !removed {
            tracing::debug!(task_id = %id, "Task vanished before delete");
            return Err(ServiceError::NotFound { id });
        }

        tracing::debug!(task_id = %id, "Task deleted");
        Ok(())
    }

    /// Lists records matching `filter` in insertion order.
    ///
    /// Listings are read straight from the store and never cached.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` if the store fails twice in a row.
    pub async fn list(&self, filter: &TaskFilter) -> Result<Vec<TaskRecord>, ServiceError> {
        let records = match self.collect(filter).await {
            Err(error) if error.is_backend_failure() => {
                tracing::warn!(error = %error, "Store listing failed, retrying once");
                self.collect(filter).await?
            }
            other => other?,
        };

        tracing::debug!(count = records.len(), "Tasks listed");
        Ok(records)
    }

    // =========================================================================
    // Store Access
    // =========================================================================

    async fn fetch_with_retry(&self, id: TaskId) -> Result<Option<TaskRecord>, RepositoryError> {
        match self.store.get(id).await {
            Err(error) if error.is_backend_failure() => {
                tracing::warn!(task_id = %id, error = %error, "Store read failed, retrying once");
                self.store.get(id).await
            }
            other => other,
        }
    }

    async fn collect(&self, filter: &TaskFilter) -> Result<Vec<TaskRecord>, RepositoryError> {
        self.store.list(filter.clone()).try_collect().await
    }
}

// =============================================================================
// Tests
// =============================================================================
