//! Domain module for task records.
//!
//! This module contains the record model, the validation engine, and the
//! clock abstraction used to stamp creation times.

pub mod clock;
pub mod task;
pub mod validation;

pub use clock::{Clock, FixedClock, ManualClock, SystemClock};
pub use task::{OwnerId, TaskDraft, TaskId, TaskPayload, TaskRecord, Timestamp, ValidTask};
pub use validation::{
    DESCRIPTION_MAX_CHARS, Field, Reason, TITLE_MAX_CHARS, TaskValidator, ValidationRules,
    Violation, validate,
};
