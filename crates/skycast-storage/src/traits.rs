//! The record store trait.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::ForecastRecord;

/// Persists one forecast record per city key.
///
/// Implementations must be thread-safe (`Send + Sync`); the server shares a
/// single store across all request handlers.
///
/// # Example
///
/// ```ignore
/// use skycast_storage::{ForecastStore, StorageError};
///
/// async fn cached(store: &dyn ForecastStore, city: &str) -> Result<Option<String>, StorageError> {
///     Ok(store.get(city).await?.map(|r| r.forecast))
/// }
/// ```
#[async_trait]
pub trait ForecastStore: Send + Sync {
    /// Reads the record stored for `city`.
    ///
    /// Keys are compared verbatim. Returns `None` if no record exists.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing records.
    async fn get(&self, city: &str) -> Result<Option<ForecastRecord>, StorageError>;

    /// Inserts the record or fully replaces the one stored for its city.
    ///
    /// The replacement is atomic with respect to the key. A record whose
    /// `updated_at` is older than the stored one is ignored, so the stored
    /// timestamp never moves backwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the write could not be performed.
    async fn upsert(&self, record: &ForecastRecord) -> Result<(), StorageError>;

    /// Checks that the backend is reachable.
    ///
    /// Backends without an external dependency are always reachable.
    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Returns the name of the backend (e.g. "postgres", "memory").
    fn backend_name(&self) -> &'static str;
}
