//! Service layer.
//!
//! This module contains [`TaskService`], which composes validation, the
//! read-through cache and a record store, and the [`ServiceError`] taxonomy
//! it reports.

mod error;
mod task_service;

pub use error::ServiceError;
pub use task_service::TaskService;
