//! In-memory record store for the SkyCast server.
//!
//! This crate provides an in-memory implementation of the `ForecastStore`
//! trait from `skycast-storage`, using the papaya lock-free HashMap for
//! concurrent access. Nothing survives a restart, so it is meant for tests
//! and for running the server locally without a database.
//!
//! # Example
//!
//! ```ignore
//! use skycast_db_memory::InMemoryStore;
//! use skycast_storage::ForecastStore;
//!
//! let store = InMemoryStore::new();
//! assert!(store.get("Paris").await?.is_none());
//! ```

mod storage;

pub use skycast_storage::{ForecastRecord, ForecastStore, StorageError};
pub use storage::{InMemoryStore, StoreStats};

/// Type alias for a shareable store trait object.
pub type DynForecastStore = std::sync::Arc<dyn ForecastStore>;

/// Creates a new in-memory store behind a trait object.
pub fn create_store() -> DynForecastStore {
    std::sync::Arc::new(InMemoryStore::new())
}
