//! Common test helpers for integration tests.
//!
//! This module provides a scripted store double that counts calls and
//! injects failures, plus fixtures for building services around it.
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::{ScriptedStore, service_with};
//! ```
//!
//! # Note
//!
//! The `#![allow(dead_code)]` attribute is necessary because Rust compiles each
//! integration test file as a separate crate. Helpers used only by some test
//! files would otherwise generate dead code warnings in the others.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{TimeZone, Utc};
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};

use todo_core::domain::{FixedClock, TaskDraft, TaskId, TaskRecord, TaskValidator, Timestamp};
use todo_core::infrastructure::{
    CacheConfig, InMemoryTaskStore, RecordCache, RepositoryError, TaskFilter, TaskStore,
};
use todo_core::service::TaskService;

// =============================================================================
// Time Helpers
// =============================================================================

/// The instant every fixture clock is pinned to.
pub fn t0() -> Timestamp {
    Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap())
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(t0()))
}

// =============================================================================
// Scripted Store
// =============================================================================

/// Per-operation call counters.
#[derive(Debug, Default)]
pub struct StoreCalls {
    pub puts: AtomicUsize,
    pub gets: AtomicUsize,
    pub lists: AtomicUsize,
    pub deletes: AtomicUsize,
}

/// An in-memory store that counts calls and fails on demand.
///
/// Failure counters are consumed one per call: `fail_gets(1)` makes exactly
/// the next `get` fail with a `DatabaseError`.
#[derive(Debug)]
pub struct ScriptedStore {
    inner: InMemoryTaskStore,
    pub calls: StoreCalls,
    get_failures: AtomicUsize,
    list_failures: AtomicUsize,
    put_failures: AtomicUsize,
    delete_failures: AtomicUsize,
    put_conflicts: AtomicBool,
    delete_vanishes: AtomicBool,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryTaskStore::with_clock(fixed_clock()),
            calls: StoreCalls::default(),
            get_failures: AtomicUsize::new(0),
            list_failures: AtomicUsize::new(0),
            put_failures: AtomicUsize::new(0),
            delete_failures: AtomicUsize::new(0),
            put_conflicts: AtomicBool::new(false),
            delete_vanishes: AtomicBool::new(false),
        }
    }

    /// The wrapped store, for writes that bypass the service.
    pub fn inner(&self) -> &InMemoryTaskStore {
        &self.inner
    }

    pub fn fail_gets(&self, count: usize) {
        self.get_failures.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` listings fail after yielding their first record.
    pub fn fail_lists(&self, count: usize) {
        self.list_failures.store(count, Ordering::SeqCst);
    }

    pub fn fail_puts(&self, count: usize) {
        self.put_failures.store(count, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, count: usize) {
        self.delete_failures.store(count, Ordering::SeqCst);
    }

    /// Makes every replacement `put` report a write conflict.
    pub fn conflict_puts(&self, enabled: bool) {
        self.put_conflicts.store(enabled, Ordering::SeqCst);
    }

    /// Makes `delete` remove the record but report it as already gone,
    /// as if a concurrent delete won the race.
    pub fn vanish_on_delete(&self, enabled: bool) {
        self.delete_vanishes.store(enabled, Ordering::SeqCst);
    }

    pub fn gets(&self) -> usize {
        self.calls.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.calls.puts.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.calls.lists.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.calls.deletes.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedStore {
    fn default() -> Self {
        Self::new()
    }
}

fn take(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
            remaining.checked_sub(1)
        })
        .is_ok()
}

fn injected(operation: &str) -> RepositoryError {
    RepositoryError::DatabaseError(format!("injected {operation} failure"))
}

impl TaskStore for ScriptedStore {
    fn put(&self, draft: TaskDraft) -> BoxFuture<'_, Result<TaskRecord, RepositoryError>> {
        self.calls.puts.fetch_add(1, Ordering::SeqCst);
        if take(&self.put_failures) {
            return async { Err(injected("put")) }.boxed();
        }
        if let Some(id) = draft.id
            && self.put_conflicts.load(Ordering::SeqCst)
        {
            return async move { Err(RepositoryError::Conflict(id)) }.boxed();
        }
        self.inner.put(draft)
    }

    fn get(&self, id: TaskId) -> BoxFuture<'_, Result<Option<TaskRecord>, RepositoryError>> {
        self.calls.gets.fetch_add(1, Ordering::SeqCst);
        if take(&self.get_failures) {
            return async { Err(injected("get")) }.boxed();
        }
        self.inner.get(id)
    }

    fn list(&self, filter: TaskFilter) -> BoxStream<'_, Result<TaskRecord, RepositoryError>> {
        self.calls.lists.fetch_add(1, Ordering::SeqCst);
        if take(&self.list_failures) {
            return self
                .inner
                .list(filter)
                .take(1)
                .chain(stream::once(async { Err(injected("list")) }))
                .boxed();
        }
        self.inner.list(filter)
    }

    fn delete(&self, id: TaskId) -> BoxFuture<'_, Result<bool, RepositoryError>> {
        self.calls.deletes.fetch_add(1, Ordering::SeqCst);
        if take(&self.delete_failures) {
            return async { Err(injected("delete")) }.boxed();
        }
        if self.delete_vanishes.load(Ordering::SeqCst) {
            return async move {
                self.inner.delete(id).await?;
                Ok(false)
            }
            .boxed();
        }
        self.inner.delete(id)
    }
}

// =============================================================================
// Service Fixtures
// =============================================================================

/// Builds a service over `store` with default validation and a `t0` clock.
pub fn service_with(store: Arc<ScriptedStore>, cache: CacheConfig) -> TaskService<ScriptedStore> {
    TaskService::new(
        store,
        RecordCache::new(cache),
        TaskValidator::default(),
        fixed_clock(),
    )
}

/// Builds a type-erased service over a fresh in-memory store.
pub fn dyn_service() -> TaskService {
    let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::with_clock(fixed_clock()));
    TaskService::new(
        store,
        RecordCache::default(),
        TaskValidator::default(),
        fixed_clock(),
    )
}
