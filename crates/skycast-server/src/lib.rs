//! SkyCast forecast server.
//!
//! Serves `GET /forecast?city_name=<city>` from a record store, refreshing
//! entries older than [`service::FORECAST_TTL`] from the upstream weather API.

pub mod coalesce;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod provider;
pub mod server;
pub mod service;

pub use crate::config::{AppConfig, CacheConfig, PostgresStorageConfig, ServerConfig, StorageBackend};
pub use error::ApiError;
pub use observability::init_tracing;
pub use provider::{ForecastProvider, ProviderError, WeatherApiClient};
pub use server::{AppState, ServerBuilder, SkycastServer, build_app, create_store};
pub use service::{Clock, FORECAST_TTL, ForecastService, ServiceError, SystemClock};
