//! # skycast-storage
//!
//! Record store abstraction for the SkyCast forecast server.
//!
//! This crate defines the [`ForecastStore`] trait, the [`ForecastRecord`]
//! entity and the [`StorageError`] type. It does not contain any
//! implementations; those live in `skycast-db-postgres` and
//! `skycast-db-memory`.
//!
//! ## Example
//!
//! ```ignore
//! use skycast_storage::{ForecastRecord, ForecastStore, StorageError};
//!
//! async fn remember(
//!     store: &dyn ForecastStore,
//!     city: &str,
//!     forecast: &str,
//! ) -> Result<(), StorageError> {
//!     let record = ForecastRecord::new(city, forecast, time::OffsetDateTime::now_utc());
//!     store.upsert(&record).await
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::ForecastStore;
pub use types::{ForecastRecord, truncate_to_micros};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shareable store trait object.
pub type DynForecastStore = std::sync::Arc<dyn ForecastStore>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use skycast_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::traits::ForecastStore;
    pub use crate::types::ForecastRecord;
    pub use crate::{DynForecastStore, StorageResult};
}
