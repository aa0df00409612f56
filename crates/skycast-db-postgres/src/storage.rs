//! PostgreSQL implementation of the ForecastStore trait.

use async_trait::async_trait;
use sqlx_postgres::PgPool;
use tracing::instrument;

use skycast_storage::{ForecastRecord, ForecastStore, StorageError};

use crate::config::PostgresConfig;
use crate::migrations;
use crate::pool;
use crate::queries::forecast;

/// PostgreSQL record store for cached forecasts.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new `PostgresStore` with the given configuration.
    ///
    /// This will:
    /// 1. Create a connection pool
    /// 2. Run migrations (if configured)
    ///
    /// # Errors
    ///
    /// Returns an error if the connection pool cannot be created
    /// or if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ForecastStore for PostgresStore {
    #[instrument(skip(self), fields(backend = "postgres"))]
    async fn get(&self, city: &str) -> Result<Option<ForecastRecord>, StorageError> {
        forecast::get(&self.pool, city).await
    }

    #[instrument(skip(self, record), fields(backend = "postgres", city = %record.city))]
    async fn upsert(&self, record: &ForecastRecord) -> Result<(), StorageError> {
        forecast::upsert(&self.pool, record).await
    }

    async fn ping(&self) -> Result<(), StorageError> {
        pool::test_connection(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
