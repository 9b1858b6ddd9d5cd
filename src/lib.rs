//! # todo-core
//!
//! The core of a task-record service: keyed storage of task records behind
//! swappable backends, field validation, and a read-through cache with
//! invalidate-on-write.
//!
//! ## Overview
//!
//! - **Domain** ([`domain`]): the record model, payloads, clocks and the
//!   validation engine
//! - **Infrastructure** ([`infrastructure`]): the [`TaskStore`] contract,
//!   in-memory and `PostgreSQL` backends, the [`RecordCache`], and the
//!   configuration-driven [`ServiceFactory`]
//! - **Service** ([`service`]): [`TaskService`] with `create`, `get`,
//!   `update`, `delete` and `list`
//!
//! ## Feature Flags
//!
//! - `postgres`: the `sqlx`-backed [`PostgresTaskStore`](infrastructure::PostgresTaskStore)
//!
//! ## Example
//!
//! ```ignore
//! use todo_core::infrastructure::ServiceFactory;
//! use todo_core::domain::TaskPayload;
//!
//! todo_core::telemetry::init_tracing();
//!
//! let service = ServiceFactory::from_env()?.create().await?;
//! let record = service.create(TaskPayload::new("Buy milk", false)).await?;
//! assert_eq!(service.get(record.id).await?, record);
//! ```
//!
//! [`TaskStore`]: infrastructure::TaskStore
//! [`RecordCache`]: infrastructure::RecordCache
//! [`ServiceFactory`]: infrastructure::ServiceFactory
//! [`TaskService`]: service::TaskService

pub mod domain;
pub mod infrastructure;
pub mod service;
pub mod telemetry;
