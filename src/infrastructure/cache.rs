//! Read-through record cache.
//!
//! [`RecordCache`] memoizes single-record reads in front of a store. It is
//! an explicit collaborator: the service calls [`RecordCache::get_or_load`]
//! on reads and [`RecordCache::invalidate`] after every write.
//!
//! # Cache Scope
//!
//! - **Cached**: single-record reads by id, including absent results
//!   (negative entries), for `ttl`
//! - **Bypassed**: listings (variable results, difficult invalidation)
//!
//! # Invalidation
//!
//! Writes remove the entry instead of updating it, so the next read always
//! re-fetches what the store actually persisted. Every invalidation bumps an
//! epoch under the same lock that guards the entries. A load populates the
//! cache only if the epoch it observed before loading is still current when
//! it takes that lock, so a slow read can never re-insert a value that a
//! concurrent write has already superseded.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::domain::{TaskId, TaskRecord};

/// Default time-to-live for cached entries (10 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Default maximum number of cached entries.
pub const DEFAULT_CAPACITY: usize = 1024;

// =============================================================================
// Cache Configuration Types
// =============================================================================

/// Configuration for cache behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Whether caching is enabled. Disabled caches bypass every read.
    pub enabled: bool,
    /// Time-to-live for positive and negative entries.
    pub ttl: Duration,
    /// Maximum number of entries before least-recently-used eviction.
    pub capacity: NonZeroUsize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: DEFAULT_TTL,
            capacity: NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl CacheConfig {
    /// Creates a new `CacheConfig`.
    ///
    /// A zero TTL is raised to one second and a zero capacity to one entry.
    #[must_use]
    pub fn new(enabled: bool, ttl: Duration, capacity: usize) -> Self {
        Self {
            enabled,
            ttl: ttl.max(Duration::from_secs(1)),
            capacity: NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// A configuration with caching turned off.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Creates a `CacheConfig` from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `CACHE_ENABLED`: `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`,
    ///   case-insensitive (default: true)
    /// - `CACHE_TTL_SECS`: TTL in seconds (default: 600, minimum: 1)
    /// - `CACHE_CAPACITY`: maximum entries (default: 1024, minimum: 1)
    ///
    /// Unparseable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let enabled = std::env::var("CACHE_ENABLED")
            .ok()
            .and_then(|value| parse_flag(&value))
            .unwrap_or(true);

        let ttl_seconds = std::env::var("CACHE_TTL_SECS")
            .ok()
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(DEFAULT_TTL.as_secs());

        let capacity = std::env::var("CACHE_CAPACITY")
            .ok()
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(DEFAULT_CAPACITY);

        Self::new(enabled, Duration::from_secs(ttl_seconds), capacity)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

// =============================================================================
// Cache Result Types
// =============================================================================

/// How a cached read was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Value was found in cache.
    Hit,
    /// Value was not in cache and was loaded from the store.
    Miss,
    /// Cache is disabled; the store was read directly.
    Bypass,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(formatter, "HIT"),
            Self::Miss => write!(formatter, "MISS"),
            Self::Bypass => write!(formatter, "BYPASS"),
        }
    }
}

/// A value together with the way it was served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheResult<T> {
    pub value: T,
    pub cache_status: CacheStatus,
}

impl<T> CacheResult<T> {
    #[must_use]
    pub const fn new(value: T, cache_status: CacheStatus) -> Self {
        Self {
            value,
            cache_status,
        }
    }

    #[must_use]
    pub const fn hit(value: T) -> Self {
        Self::new(value, CacheStatus::Hit)
    }

    #[must_use]
    pub const fn miss(value: T) -> Self {
        Self::new(value, CacheStatus::Miss)
    }

    #[must_use]
    pub const fn bypass(value: T) -> Self {
        Self::new(value, CacheStatus::Bypass)
    }

    pub fn map<U, F>(self, function: F) -> CacheResult<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheResult {
            value: function(self.value),
            cache_status: self.cache_status,
        }
    }
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

// =============================================================================
// Record Cache
// =============================================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    /// `None` marks a known-absent record.
    record: Option<TaskRecord>,
    /// `None` when the TTL reaches past the clock's range.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

#[derive(Debug)]
struct CacheState {
    entries: LruCache<TaskId, CacheEntry>,
    epoch: u64,
}

/// Bounded LRU memo of single-record reads, keyed by id.
///
/// All methods are synchronous except [`get_or_load`](Self::get_or_load),
/// which only suspends inside the caller-supplied loader.
#[derive(Debug)]
pub struct RecordCache {
    state: Mutex<CacheState>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RecordCache {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(config.capacity),
                epoch: 0,
            }),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Looks up `id`.
    ///
    /// Returns `None` on a miss (or an expired entry), `Some(None)` for a
    /// cached absence, and `Some(Some(record))` for a cached record.
    #[allow(clippy::option_option)]
    pub fn lookup(&self, id: TaskId) -> Option<Option<TaskRecord>> {
        if !self.config.enabled {
            return None;
        }

        let now = Instant::now();
        let mut state = self.state.lock();
        let cached = state
            .entries
            .get(&id)
            .map(|entry| (entry.is_live(now), entry.record.clone()));
        match cached {
            Some((true, record)) => Some(record),
            Some((false, _)) => {
                state.entries.pop(&id);
                None
            }
            None => None,
        }
    }

    fn entry(&self, record: Option<TaskRecord>) -> CacheEntry {
        CacheEntry {
            record,
            expires_at: Instant::now().checked_add(self.config.ttl),
        }
    }

    /// Stores `record` (or a negative entry when `None`) under `id`.
    pub fn insert(&self, id: TaskId, record: Option<TaskRecord>) {
        if !self.config.enabled {
            return;
        }

        let entry = self.entry(record);
        self.state.lock().entries.put(id, entry);
    }

    /// Removes the entry for `id`, if any.
    pub fn invalidate(&self, id: TaskId) {
        let mut state = self.state.lock();
        state.epoch = state.epoch.wrapping_add(1);
        state.entries.pop(&id);
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.epoch = state.epoch.wrapping_add(1);
        state.entries.clear();
    }

    /// Number of live and expired-but-unswept entries.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Read-through lookup.
    ///
    /// On a hit the cached value is returned without calling `load`. On a
    /// miss `load` is awaited and its result (present or absent) is cached,
    /// unless an invalidation happened while it was running. Loader errors
    /// are returned as-is and never cached.
    ///
    /// # Errors
    ///
    /// Returns whatever error `load` returns.
    pub async fn get_or_load<F, Fut, E>(
        &self,
        id: TaskId,
        load: F,
    ) -> Result<CacheResult<Option<TaskRecord>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<TaskRecord>, E>>,
    {
        if !self.config.enabled {
            return load().await.map(CacheResult::bypass);
        }

        if let Some(cached) = self.lookup(id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(task_id = %id, "Cache hit");
            return Ok(CacheResult::hit(cached));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(task_id = %id, "Cache miss, loading from store");

        let epoch_before = self.state.lock().epoch;
        let loaded = load().await?;

        let entry = self.entry(loaded.clone());
        let mut state = self.state.lock();
        if state.epoch == epoch_before {
            state.entries.put(id, entry);
        } else {
            drop(state);
            tracing::debug!(task_id = %id, "Invalidated during load, not caching");
        }

        Ok(CacheResult::miss(loaded))
    }
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

// =============================================================================
// Tests
// =============================================================================
