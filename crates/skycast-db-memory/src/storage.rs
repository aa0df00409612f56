use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;
use skycast_storage::{ForecastRecord, ForecastStore, StorageError};

/// In-memory record store keyed by city.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: PapayaHashMap<String, ForecastRecord>,
    reads: AtomicU64,
    writes: AtomicU64,
}

/// Operation counters for an [`InMemoryStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub reads: u64,
    pub writes: u64,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the given records.
    pub fn with_records(records: impl IntoIterator<Item = ForecastRecord>) -> Self {
        let store = Self::new();
        {
            let map = store.data.pin();
            for record in records {
                map.insert(record.city.clone(), record);
            }
        }
        store
    }

    /// Number of cities stored.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads and writes served since creation. Pre-populated records are not counted.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl ForecastStore for InMemoryStore {
    async fn get(&self, city: &str) -> Result<Option<ForecastRecord>, StorageError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.data.pin().get(city).cloned())
    }

    async fn upsert(&self, record: &ForecastRecord) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.data.pin().update_or_insert(
            record.city.clone(),
            |stored| {
                if stored.updated_at <= record.updated_at {
                    record.clone()
                } else {
                    stored.clone()
                }
            },
            record.clone(),
        );
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
