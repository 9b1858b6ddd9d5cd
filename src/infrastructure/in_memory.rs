//! In-memory record store.
//!
//! Records live in an ordered map wrapped in `Arc<RwLock<...>>`. Ids come
//! from a monotonic counter that is only advanced under the write lock, so
//! map order is insertion order and ids are never handed out twice.
//!
//! Clones share the same underlying storage.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};
use tokio::sync::RwLock;

use crate::domain::{Clock, SystemClock, TaskDraft, TaskId, TaskRecord};
use crate::infrastructure::{RepositoryError, TaskFilter, TaskStore};

/// In-memory implementation of [`TaskStore`].
///
/// # Example
///
/// ```ignore
/// use todo_core::infrastructure::InMemoryTaskStore;
///
/// let store = InMemoryTaskStore::new();
/// let record = store.put(draft).await?;
/// let found = store.get(record.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryTaskStore {
    records: Arc<RwLock<BTreeMap<TaskId, TaskRecord>>>,
    next_id: Arc<AtomicU64>,
    clock: Arc<dyn Clock>,
}

impl InMemoryTaskStore {
    /// Creates an empty store stamping default timestamps from the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store using `clock` for inserts without a `created_at`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            clock,
        }
    }

    /// Number of records currently stored.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true if the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::significant_drop_tightening)]
impl TaskStore for InMemoryTaskStore {
    fn put(&self, draft: TaskDraft) -> BoxFuture<'_, Result<TaskRecord, RepositoryError>> {
        async move {
            let mut guard = self.records.write().await;

            let record = match draft.id {
                None => {
                    let id = TaskId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
                    let created_at = draft.created_at.unwrap_or_else(|| self.clock.now());
                    draft.into_record(id, created_at)
                }
                Some(id) => {
                    let Some(existing) = guard.get(&id) else {
                        return Err(RepositoryError::NotFound(id));
                    };
                    let created_at = draft.created_at.unwrap_or(existing.created_at);
                    draft.into_record(id, created_at)
                }
            };

            guard.insert(record.id, record.clone());
            Ok(record)
        }
        .boxed()
    }

    fn get(&self, id: TaskId) -> BoxFuture<'_, Result<Option<TaskRecord>, RepositoryError>> {
        async move {
            let guard = self.records.read().await;
            Ok(guard.get(&id).cloned())
        }
        .boxed()
    }

    fn list(&self, filter: TaskFilter) -> BoxStream<'_, Result<TaskRecord, RepositoryError>> {
        // The snapshot is taken on first poll, not when the stream is built.
        stream::once(async move {
            let guard = self.records.read().await;
            let matching: Vec<TaskRecord> = guard
                .values()
                .filter(|record| filter.matches(record))
                .cloned()
                .collect();
            stream::iter(matching.into_iter().map(Ok))
        })
        .flatten()
        .boxed()
    }

    fn delete(&self, id: TaskId) -> BoxFuture<'_, Result<bool, RepositoryError>> {
        async move {
            let mut guard = self.records.write().await;
            Ok(guard.remove(&id).is_some())
        }
        .boxed()
    }
}

// =============================================================================
// Tests
// =============================================================================
