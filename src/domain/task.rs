//! Task record domain model.
//!
//! This module contains the single entity managed by the service, its
//! value objects, and the payload/draft shapes that flow between the
//! service, the validation engine, and the record stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Value Objects - Newtypes
// =============================================================================

/// Unique identifier for a task record.
///
/// Identifiers are allocated by the record store on creation and are never
/// reused, even after the record is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Creates a `TaskId` from its numeric value.
    ///
    /// This does not allocate anything; only stores hand out new ids.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the numeric value of the identifier.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl From<u64> for TaskId {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

/// Opaque reference to an external principal that owns a record.
///
/// The core never dereferences it; it is only compared for equality when
/// filtering listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Creates a new `OwnerId`.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for OwnerId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A timestamp wrapper for `DateTime<Utc>`.
///
/// Timestamps are produced by a [`Clock`](crate::domain::Clock) rather than
/// read from the system directly, so tests stay deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a `Timestamp` from a `DateTime<Utc>`.
    #[must_use]
    pub const fn from_datetime(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Returns the inner `DateTime<Utc>`.
    #[must_use]
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::from_datetime(datetime)
    }
}

// =============================================================================
// TaskRecord
// =============================================================================

/// A stored task record.
///
/// A record with a given `id` either exists in full or does not exist;
/// stores never expose partially written records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Store-assigned identifier.
    pub id: TaskId,
    /// Trimmed, non-empty title.
    pub title: String,
    /// Description, empty when none was given.
    pub description: String,
    /// Whether the task is done.
    pub completed: bool,
    /// Set once at creation, never mutated.
    pub created_at: Timestamp,
    /// Optional owning principal, used only as a partition key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerId>,
}

// =============================================================================
// TaskPayload
// =============================================================================

/// A proposed record as submitted by a caller on create or update.
///
/// Every field is optional here; the validation engine decides what is
/// required. Use [`TaskPayload::from_json`] to map loosely-typed input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskPayload {
    /// Proposed title.
    pub title: Option<String>,
    /// Proposed description.
    pub description: Option<String>,
    /// Proposed completion flag.
    pub completed: Option<bool>,
    /// Owning principal supplied by the caller's context.
    pub owner: Option<OwnerId>,
}

impl TaskPayload {
    /// Creates a payload carrying the two fields required on every write.
    #[must_use]
    pub fn new(title: impl Into<String>, completed: bool) -> Self {
        Self {
            title: Some(title.into()),
            completed: Some(completed),
            ..Self::default()
        }
    }

    /// Returns a new payload with the given title.
    #[must_use]
    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..self
        }
    }

    /// Returns a new payload with the given description.
    #[must_use]
    pub fn with_description(self, description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..self
        }
    }

    /// Returns a new payload with the given completion flag.
    #[must_use]
    pub fn with_completed(self, completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..self
        }
    }

    /// Returns a new payload owned by the given principal.
    #[must_use]
    pub fn with_owner(self, owner: impl Into<OwnerId>) -> Self {
        Self {
            owner: Some(owner.into()),
            ..self
        }
    }

    /// Maps a loosely-typed JSON object to a payload.
    ///
    /// Fields with the wrong JSON type (a numeric `title`, a string or `null`
    /// `completed`, ...) are mapped to `None` rather than rejected here, so
    /// that the validation engine reports them together with every other
    /// violation. Anything other than an object yields an empty payload.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let string_field = |name: &str| {
            object
                .get(name)
                .and_then(serde_json::Value::as_str)
                .map(ToString::to_string)
        };

        Self {
            title: string_field("title"),
            description: string_field("description"),
            completed: object.get("completed").and_then(serde_json::Value::as_bool),
            owner: string_field("owner").map(OwnerId::new),
        }
    }
}

// =============================================================================
// ValidTask / TaskDraft
// =============================================================================

/// A payload that passed validation, in normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidTask {
    /// Trimmed title.
    pub title: String,
    /// Description, empty when absent.
    pub description: String,
    /// Completion flag.
    pub completed: bool,
    /// Owner carried over from the payload.
    pub owner: Option<OwnerId>,
}

/// The record shape handed to a store's `put`.
///
/// `id: None` asks the store to allocate a fresh identifier. `created_at:
/// None` asks the store to assign the creation time on insert, or to keep
/// the original one on replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    /// Target identifier, `None` for inserts.
    pub id: Option<TaskId>,
    /// Title to persist.
    pub title: String,
    /// Description to persist.
    pub description: String,
    /// Completion flag to persist.
    pub completed: bool,
    /// Creation time, if the caller supplies one.
    pub created_at: Option<Timestamp>,
    /// Owning principal.
    pub owner: Option<OwnerId>,
}

impl TaskDraft {
    /// Builds an insert draft from a validated payload.
    #[must_use]
    pub fn insert(task: ValidTask, created_at: Option<Timestamp>) -> Self {
        Self {
            id: None,
            title: task.title,
            description: task.description,
            completed: task.completed,
            created_at,
            owner: task.owner,
        }
    }

    /// Builds a full-replacement draft for an existing record.
    ///
    /// The identifier, creation time and owner are taken from `existing`;
    /// everything else comes from the validated payload.
    #[must_use]
    pub fn replacement(existing: &TaskRecord, task: ValidTask) -> Self {
        Self {
            id: Some(existing.id),
            title: task.title,
            description: task.description,
            completed: task.completed,
            created_at: Some(existing.created_at),
            owner: existing.owner.clone(),
        }
    }

    /// Materializes the draft into a record with the given id and creation time.
    #[must_use]
    pub fn into_record(self, id: TaskId, created_at: Timestamp) -> TaskRecord {
        TaskRecord {
            id,
            title: self.title,
            description: self.description,
            completed: self.completed,
            created_at,
            owner: self.owner,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
