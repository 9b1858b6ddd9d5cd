//! Infrastructure module for record storage.
//!
//! This module contains the record store contract and its backends, the
//! read-through cache, and the factory that wires them into a service.

pub mod cache;
pub mod factory;
pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod repository;

pub use cache::{CacheConfig, CacheResult, CacheStats, CacheStatus, RecordCache};
pub use factory::{
    ConfigurationError, FactoryError, ServiceConfig, ServiceConfigBuilder, ServiceFactory,
    StorageMode,
};
pub use in_memory::InMemoryTaskStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresTaskStore;
pub use repository::{RepositoryError, TaskFilter, TaskStore};
