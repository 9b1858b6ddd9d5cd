//! Validation engine for task payloads.
//!
//! Validation is a pure function from a [`TaskPayload`] to either a
//! normalized [`ValidTask`] or the complete list of field violations.
//! Every field is checked independently and errors are accumulated rather
//! than short-circuited, so callers see every problem in one pass.
//!
//! # Rules
//!
//! | Field         | Reason     | Condition                                   |
//! |---------------|------------|---------------------------------------------|
//! | `title`       | `required` | missing, empty or whitespace-only           |
//! | `title`       | `too_long` | more than 100 characters after trimming     |
//! | `description` | `too_long` | more than 500 characters                    |
//! | `completed`   | `required` | missing or not a boolean                    |
//!
//! Violations are always ordered by field declaration order: title,
//! description, completed.

use serde::{Deserialize, Serialize};

use super::{TaskPayload, ValidTask};

/// Default maximum title length, in characters.
pub const TITLE_MAX_CHARS: usize = 100;

/// Default maximum description length, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 500;

// =============================================================================
// Violation Types
// =============================================================================

/// A validated field, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Description,
    Completed,
}

impl Field {
    /// Returns the wire name of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Why a field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Required,
    TooLong,
}

impl Reason {
    /// Returns the reason code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::TooLong => "too_long",
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Violation {
    pub field: Field,
    pub reason: Reason,
}

impl Violation {
    #[must_use]
    pub const fn new(field: Field, reason: Reason) -> Self {
        Self { field, reason }
    }

    #[must_use]
    pub const fn required(field: Field) -> Self {
        Self::new(field, Reason::Required)
    }

    #[must_use]
    pub const fn too_long(field: Field) -> Self {
        Self::new(field, Reason::TooLong)
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}: {}", self.field, self.reason)
    }
}

// =============================================================================
// Validation Rules
// =============================================================================

/// Length limits applied by a [`TaskValidator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    pub title_max_chars: usize,
    pub description_max_chars: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            title_max_chars: TITLE_MAX_CHARS,
            description_max_chars: DESCRIPTION_MAX_CHARS,
        }
    }
}

/// Error-accumulating result: a value, or every violation found.
type Validated<A> = Result<A, Vec<Violation>>;

fn validate_title(title: Option<&str>, max_chars: usize) -> Validated<String> {
    let trimmed = title.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        Err(vec![Violation::required(Field::Title)])
    } else if trimmed.chars().count() > max_chars {
        Err(vec![Violation::too_long(Field::Title)])
    } else {
        Ok(trimmed.to_string())
    }
}

fn validate_description(description: Option<&str>, max_chars: usize) -> Validated<String> {
    match description {
        None => Ok(String::new()),
        Some(text) if text.chars().count() > max_chars => {
            Err(vec![Violation::too_long(Field::Description)])
        }
        Some(text) => Ok(text.to_string()),
    }
}

fn validate_completed(completed: Option<bool>) -> Validated<bool> {
    completed.ok_or_else(|| vec![Violation::required(Field::Completed)])
}

/// Combines three independent validations, concatenating errors in
/// argument order.
fn validated_map3<A, B, C, D, F>(
    first: Validated<A>,
    second: Validated<B>,
    third: Validated<C>,
    combiner: F,
) -> Validated<D>
where
    F: FnOnce(A, B, C) -> D,
{
    match (first, second, third) {
        (Ok(a), Ok(b), Ok(c)) => Ok(combiner(a, b, c)),
        (first, second, third) => {
            let mut violations = Vec::new();
            violations.extend(first.err().into_iter().flatten());
            violations.extend(second.err().into_iter().flatten());
            violations.extend(third.err().into_iter().flatten());
            Err(violations)
        }
    }
}

// =============================================================================
// TaskValidator
// =============================================================================

/// Validates create and update payloads against a set of [`ValidationRules`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskValidator {
    rules: ValidationRules,
}

impl TaskValidator {
    #[must_use]
    pub const fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    #[must_use]
    pub const fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    /// Validates a payload.
    ///
    /// # Errors
    ///
    /// Returns a non-empty list of violations, ordered title, description,
    /// completed, when any rule fails.
    pub fn validate(&self, payload: &TaskPayload) -> Result<ValidTask, Vec<Violation>> {
        validated_map3(
            validate_title(payload.title.as_deref(), self.rules.title_max_chars),
            validate_description(
                payload.description.as_deref(),
                self.rules.description_max_chars,
            ),
            validate_completed(payload.completed),
            |title, description, completed| ValidTask {
                title,
                description,
                completed,
                owner: payload.owner.clone(),
            },
        )
    }
}

/// Validates a payload with the default rules.
///
/// # Errors
///
/// See [`TaskValidator::validate`].
pub fn validate(payload: &TaskPayload) -> Result<ValidTask, Vec<Violation>> {
    TaskValidator::default().validate(payload)
}

// =============================================================================
// Tests
// =============================================================================
