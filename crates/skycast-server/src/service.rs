//! Cache-aside forecast lookup.
//!
//! A stored record younger than [`FORECAST_TTL`] is served as-is. Anything
//! else goes to the provider, and the fresh value is written back on a best
//! effort basis: a failed write is logged and counted, never surfaced.

use std::sync::Arc;

use skycast_storage::{DynForecastStore, ForecastRecord, StorageError, truncate_to_micros};
use time::OffsetDateTime;
use tracing::{debug, error, instrument, warn};

use crate::coalesce::InflightRequests;
use crate::metrics::{self, CacheOutcome};
use crate::provider::{ForecastProvider, ProviderError};

/// Maximum age of a stored forecast before it is refreshed.
pub const FORECAST_TTL: time::Duration = time::Duration::minutes(30);

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

type RefreshResult = Result<ForecastRecord, ProviderError>;

#[derive(Clone)]
pub struct ForecastService {
    store: DynForecastStore,
    provider: Arc<dyn ForecastProvider>,
    clock: Arc<dyn Clock>,
    inflight: Option<Arc<InflightRequests<RefreshResult>>>,
}

impl ForecastService {
    pub fn new(store: DynForecastStore, provider: Arc<dyn ForecastProvider>) -> Self {
        Self {
            store,
            provider,
            clock: Arc::new(SystemClock),
            inflight: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share one provider fetch between concurrent refreshes of the same city.
    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.inflight = enabled.then(|| Arc::new(InflightRequests::new()));
        self
    }

    pub fn store(&self) -> &DynForecastStore {
        &self.store
    }

    /// Returns the forecast for `city`, refreshing it from the provider when
    /// the stored copy is missing or stale.
    #[instrument(skip(self))]
    pub async fn get_forecast(&self, city: &str) -> Result<ForecastRecord, ServiceError> {
        let stored = self.store.get(city).await.inspect_err(|e| {
            metrics::record_store_read_failure(e.category());
            error!(category = %e.category(), error = %e, "Failed to read forecast from store");
        })?;

        let now = self.clock.now();
        match stored {
            Some(record) if record.is_fresh_at(now, FORECAST_TTL) => {
                metrics::record_cache_lookup(CacheOutcome::Hit);
                debug!(updated_at = %record.updated_at, "Serving stored forecast");
                return Ok(record);
            }
            Some(record) => {
                metrics::record_cache_lookup(CacheOutcome::Stale);
                debug!(age_secs = record.age_at(now).whole_seconds(), "Stored forecast is stale");
            }
            None => {
                metrics::record_cache_lookup(CacheOutcome::Miss);
                debug!("No stored forecast");
            }
        }

        let refreshed = match &self.inflight {
            Some(inflight) => inflight.run(city, || self.refresh(city)).await,
            None => self.refresh(city).await,
        };
        refreshed.map_err(ServiceError::from)
    }

    async fn refresh(&self, city: &str) -> RefreshResult {
        let forecast = self.provider.fetch(city).await.inspect_err(|e| {
            metrics::record_upstream_failure(e.kind());
            warn!(city, error = %e, "Forecast provider failed");
        })?;

        let record = ForecastRecord::new(city, forecast, truncate_to_micros(self.clock.now()));
        if let Err(e) = self.store.upsert(&record).await {
            metrics::record_store_write_failure(e.category());
            error!(
                city,
                category = %e.category(),
                error = %e,
                "Failed to write forecast back to store"
            );
        }
        Ok(record)
    }
}
