//! Service factory for runtime backend selection.
//!
//! This module turns environment (or in-code) configuration into a ready
//! [`TaskService`] wired to the selected record store and a read-through
//! cache.
//!
//! # Environment Variables
//!
//! - `STORAGE_MODE`: `in_memory` (default) | `postgres`
//! - `DATABASE_URL`: `PostgreSQL` connection URL (required when `STORAGE_MODE=postgres`)
//! - `CACHE_ENABLED`, `CACHE_TTL_SECS`, `CACHE_CAPACITY`: see [`CacheConfig::from_env`]
//!
//! # Example
//!
//! ```ignore
//! use todo_core::infrastructure::{ServiceConfig, ServiceFactory};
//!
//! let config = ServiceConfig::load()?;
//! let service = ServiceFactory::new(config).create().await?;
//!
//! let record = service.create(payload).await?;
//! ```

use std::env;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use super::{CacheConfig, InMemoryTaskStore, RecordCache, TaskStore};
use crate::domain::{SystemClock, TaskValidator};
use crate::service::TaskService;

// =============================================================================
// Configuration Types
// =============================================================================

/// Storage backend for task records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageMode {
    /// Process-local storage. Suitable for testing and development.
    #[default]
    InMemory,
    /// `PostgreSQL` storage. Requires the `postgres` feature.
    Postgres,
}

impl FromStr for StorageMode {
    type Err = ConfigurationError;

    /// Parses a storage mode from a string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidStorageMode` if the string is not recognized.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            _ => Err(ConfigurationError::InvalidStorageMode(value.to_string())),
        }
    }
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InMemory => write!(formatter, "in_memory"),
            Self::Postgres => write!(formatter, "postgres"),
        }
    }
}

/// Configuration for [`ServiceFactory`].
///
/// Use [`ServiceConfig::builder`] for a fluent API to construct this.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Backend holding the records.
    pub storage_mode: StorageMode,
    /// `PostgreSQL` connection URL (required when `storage_mode` is `Postgres`).
    pub database_url: Option<String>,
    /// Read-through cache settings.
    pub cache: CacheConfig,
}

impl ServiceConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Loads a `.env` file if one is present, then reads the environment.
    ///
    /// # Errors
    ///
    /// See [`ServiceConfig::from_env`].
    pub fn load() -> Result<Self, ConfigurationError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded environment file");
        }
        Self::from_env()
    }

    /// Creates a configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if:
    /// - `STORAGE_MODE` contains an invalid value
    /// - `DATABASE_URL` is missing when `STORAGE_MODE=postgres`
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let storage_mode = match env::var("STORAGE_MODE") {
            Ok(value) => value.parse()?,
            Err(env::VarError::NotPresent) => StorageMode::default(),
            Err(env::VarError::NotUnicode(_)) => {
                return Err(ConfigurationError::InvalidStorageMode(
                    "<non-UTF-8 value>".to_string(),
                ));
            }
        };

        let database_url = env::var("DATABASE_URL")
            .ok()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let config = Self {
            storage_mode,
            database_url,
            cache: CacheConfig::from_env(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::MissingDatabaseUrl` if `PostgreSQL` is
    /// selected without a connection URL.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.storage_mode == StorageMode::Postgres && self.database_url.is_none() {
            return Err(ConfigurationError::MissingDatabaseUrl);
        }
        Ok(())
    }
}

/// Builder for [`ServiceConfig`].
///
/// # Example
///
/// ```ignore
/// let config = ServiceConfig::builder()
///     .storage_mode(StorageMode::Postgres)
///     .database_url("postgres://localhost/todo")
///     .cache(CacheConfig::disabled())
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ServiceConfigBuilder {
    storage_mode: StorageMode,
    database_url: Option<String>,
    cache: CacheConfig,
}

impl ServiceConfigBuilder {
    /// Sets the storage mode.
    #[must_use]
    pub const fn storage_mode(mut self, mode: StorageMode) -> Self {
        self.storage_mode = mode;
        self
    }

    /// Sets the `PostgreSQL` database URL.
    #[must_use]
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Sets the cache configuration.
    #[must_use]
    pub const fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the configuration is invalid.
    pub fn build(self) -> Result<ServiceConfig, ConfigurationError> {
        let config = ServiceConfig {
            storage_mode: self.storage_mode,
            database_url: self.database_url,
            cache: self.cache,
        };

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Error Types
// =============================================================================

/// Errors in the supplied configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Invalid storage mode value.
    #[error("Invalid storage mode: '{0}'. Expected 'in_memory' or 'postgres'")]
    InvalidStorageMode(String),

    /// Missing `DATABASE_URL` when storage mode is Postgres.
    #[error("DATABASE_URL environment variable is required when STORAGE_MODE=postgres")]
    MissingDatabaseUrl,
}

/// Errors that can occur during factory initialization.
#[derive(Debug, Error)]
pub enum FactoryError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Database connection or schema setup error.
    #[error("Database connection error: {0}")]
    DatabaseConnection(String),

    /// The selected backend was not compiled into this build.
    #[error("Storage backend '{0}' is not available in this build")]
    BackendUnavailable(StorageMode),
}

// =============================================================================
// Service Factory
// =============================================================================

/// Factory for creating a [`TaskService`] based on configuration.
///
/// # Example
///
/// ```ignore
/// let factory = ServiceFactory::from_env()?;
/// let service = factory.create().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ServiceFactory {
    config: ServiceConfig,
}

impl ServiceFactory {
    /// Creates a new factory with the given configuration.
    #[must_use]
    pub const fn new(config: ServiceConfig) -> Self {
        Self { config }
    }

    /// Creates a new factory from `.env` and environment variables.
    ///
    /// # Errors
    ///
    /// Returns `FactoryError::Configuration` if environment configuration is invalid.
    pub fn from_env() -> Result<Self, FactoryError> {
        let config = ServiceConfig::load()?;
        Ok(Self::new(config))
    }

    /// Returns the configuration used by this factory.
    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Creates the task service.
    ///
    /// # Errors
    ///
    /// Returns `FactoryError` if:
    /// - The database connection or schema setup fails
    /// - `PostgreSQL` is selected but the `postgres` feature is disabled
    pub async fn create(&self) -> Result<TaskService<dyn TaskStore>, FactoryError> {
        let store = self.create_store().await?;

        tracing::info!(
            storage_mode = %self.config.storage_mode,
            cache_enabled = self.config.cache.enabled,
            cache_ttl_secs = self.config.cache.ttl.as_secs(),
            cache_capacity = self.config.cache.capacity.get(),
            "Task service initialized"
        );

        Ok(TaskService::new(
            store,
            RecordCache::new(self.config.cache),
            TaskValidator::default(),
            Arc::new(SystemClock),
        ))
    }

    /// Creates the configured record store.
    ///
    /// # Errors
    ///
    /// See [`ServiceFactory::create`].
    pub async fn create_store(&self) -> Result<Arc<dyn TaskStore>, FactoryError> {
        match self.config.storage_mode {
            StorageMode::InMemory => Ok(Arc::new(InMemoryTaskStore::new())),
            StorageMode::Postgres => self.create_postgres_store().await,
        }
    }

    #[cfg(feature = "postgres")]
    async fn create_postgres_store(&self) -> Result<Arc<dyn TaskStore>, FactoryError> {
        let database_url = self
            .config
            .database_url
            .as_ref()
            .ok_or(ConfigurationError::MissingDatabaseUrl)?;

        let pool = sqlx::PgPool::connect(database_url)
            .await
            .map_err(|error| FactoryError::DatabaseConnection(error.to_string()))?;

        let store = super::PostgresTaskStore::new(pool);
        store
            .ensure_schema()
            .await
            .map_err(|error| FactoryError::DatabaseConnection(error.to_string()))?;

        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "postgres"))]
    #[allow(clippy::unused_async)]
    async fn create_postgres_store(&self) -> Result<Arc<dyn TaskStore>, FactoryError> {
        tracing::warn!("STORAGE_MODE=postgres requires the `postgres` feature");
        Err(FactoryError::BackendUnavailable(self.config.storage_mode))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskPayload;
    use rstest::rstest;
    use std::time::Duration;

    // -------------------------------------------------------------------------
    // StorageMode Tests
    // -------------------------------------------------------------------------

    #[rstest]
    #[case("in_memory", StorageMode::InMemory)]
    #[case("inmemory", StorageMode::InMemory)]
    #[case("memory", StorageMode::InMemory)]
    #[case("IN_MEMORY", StorageMode::InMemory)]
    #[case("postgres", StorageMode::Postgres)]
    #[case("postgresql", StorageMode::Postgres)]
    #[case("pg", StorageMode::Postgres)]
    #[case(" POSTGRES ", StorageMode::Postgres)]
    fn test_storage_mode_from_str_valid(#[case] input: &str, #[case] expected: StorageMode) {
        let result: Result<StorageMode, _> = input.parse();
        assert_eq!(result, Ok(expected));
    }

    #[rstest]
    #[case("invalid")]
    #[case("mysql")]
    #[case("")]
    fn test_storage_mode_from_str_invalid(#[case] input: &str) {
        let result: Result<StorageMode, _> = input.parse();
        assert_eq!(
            result,
            Err(ConfigurationError::InvalidStorageMode(input.to_string()))
        );
    }

    #[rstest]
    fn test_storage_mode_display_roundtrips() {
        for mode in [StorageMode::InMemory, StorageMode::Postgres] {
            assert_eq!(mode.to_string().parse::<StorageMode>(), Ok(mode));
        }
    }

    // -------------------------------------------------------------------------
    // ServiceConfig Tests
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_service_config_default() {
        let config = ServiceConfig::default();
        assert_eq!(config.storage_mode, StorageMode::InMemory);
        assert!(config.database_url.is_none());
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[rstest]
    #[case(StorageMode::InMemory, None, true)]
    #[case(StorageMode::Postgres, None, false)]
    #[case(StorageMode::Postgres, Some("postgres://localhost/todo"), true)]
    fn test_service_config_validate(
        #[case] storage_mode: StorageMode,
        #[case] database_url: Option<&str>,
        #[case] valid: bool,
    ) {
        let config = ServiceConfig {
            storage_mode,
            database_url: database_url.map(ToString::to_string),
            cache: CacheConfig::default(),
        };
        assert_eq!(config.validate().is_ok(), valid);
    }

    #[rstest]
    fn test_builder_sets_fields() {
        let config = ServiceConfig::builder()
            .storage_mode(StorageMode::Postgres)
            .database_url("postgres://localhost/todo")
            .cache(CacheConfig::new(true, Duration::from_secs(30), 8))
            .build()
            .unwrap();

        assert_eq!(config.storage_mode, StorageMode::Postgres);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/todo")
        );
        assert_eq!(config.cache.ttl, Duration::from_secs(30));
        assert_eq!(config.cache.capacity.get(), 8);
    }

    #[rstest]
    fn test_builder_rejects_postgres_without_url() {
        let result = ServiceConfig::builder()
            .storage_mode(StorageMode::Postgres)
            .build();
        assert_eq!(result, Err(ConfigurationError::MissingDatabaseUrl));
    }

    // -------------------------------------------------------------------------
    // ServiceFactory Tests
    // -------------------------------------------------------------------------

    #[rstest]
    #[tokio::test]
    async fn test_factory_creates_in_memory_service() {
        let factory = ServiceFactory::new(ServiceConfig::default());
        let service = factory.create().await.unwrap();

        let created = service
            .create(TaskPayload::new("Buy milk", false))
            .await
            .unwrap();
        let found = service.get(created.id).await.unwrap();

        assert_eq!(found, created);
    }

    #[cfg(not(feature = "postgres"))]
    #[rstest]
    #[tokio::test]
    async fn test_factory_reports_unavailable_backend() {
        let config = ServiceConfig::builder()
            .storage_mode(StorageMode::Postgres)
            .database_url("postgres://localhost/todo")
            .build()
            .unwrap();

        let result = ServiceFactory::new(config).create().await;

        assert!(matches!(
            result,
            Err(FactoryError::BackendUnavailable(StorageMode::Postgres))
        ));
    }

    #[rstest]
    fn test_factory_error_from_configuration_error() {
        let error: FactoryError = ConfigurationError::MissingDatabaseUrl.into();
        assert!(matches!(
            error,
            FactoryError::Configuration(ConfigurationError::MissingDatabaseUrl)
        ));
    }
}
