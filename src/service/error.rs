//! Service error taxonomy.

use thiserror::Error;

use crate::domain::{TaskId, Violation};
use crate::infrastructure::RepositoryError;

// =============================================================================
// Service Error
// =============================================================================

/// Errors returned by [`TaskService`](super::TaskService) operations.
///
/// Each variant has a stable machine-readable [`code`](Self::code) that
/// transport adapters can forward to clients unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The payload broke one or more field rules. Never retried.
    #[error("Validation failed: {}", join_violations(.violations))]
    Validation {
        /// Every violation, in field order.
        violations: Vec<Violation>,
    },

    /// No record exists under `id`. Never retried.
    #[error("Task not found: {id}")]
    NotFound { id: TaskId },

    /// The backing store failed.
    #[error("Store failure: {source}")]
    Store {
        #[source]
        source: RepositoryError,
    },

    /// The store rejected a write that raced with another writer.
    #[error("Write conflict on task {id}")]
    Conflict { id: TaskId },
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ServiceError {
    pub const VALIDATION_ERROR: &'static str = "VALIDATION_ERROR";
    pub const NOT_FOUND: &'static str = "NOT_FOUND";
    pub const CONFLICT: &'static str = "CONFLICT";
    pub const STORE_ERROR: &'static str = "STORE_ERROR";

    /// Returns the machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => Self::VALIDATION_ERROR,
            Self::NotFound { .. } => Self::NOT_FOUND,
            Self::Store { .. } => Self::STORE_ERROR,
            Self::Conflict { .. } => Self::CONFLICT,
        }
    }

    /// Returns true if the failure is transient and the call may be repeated.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Store { .. })
    }

    /// Returns the violations of a validation failure, empty otherwise.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Validation { violations } => violations,
            _ => &[],
        }
    }
}

impl From<Vec<Violation>> for ServiceError {
    fn from(violations: Vec<Violation>) -> Self {
        Self::Validation { violations }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(id) => Self::NotFound { id },
            RepositoryError::Conflict(id) => Self::Conflict { id },
            source @ (RepositoryError::DatabaseError(_)
            | RepositoryError::SerializationError(_)) => Self::Store { source },
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
