use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{Router, middleware, routing::get};
use skycast_storage::{DynForecastStore, StorageError};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::{AppConfig, StorageBackend, StorageConfig},
    handlers,
    middleware as app_middleware,
    provider::{ForecastProvider, WeatherApiClient},
    service::{Clock, ForecastService},
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: ForecastService,
    pub metrics_enabled: bool,
}

impl AppState {
    pub fn new(service: ForecastService) -> Self {
        Self {
            service,
            metrics_enabled: false,
        }
    }

    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }
}

pub struct SkycastServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/forecast", get(handlers::forecast))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/metrics", get(handlers::metrics_endpoint))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &axum::http::Request<axum::body::Body>| {
                            use tracing::field::Empty;
                            tracing::info_span!(
                                "http.request",
                                http.method = %req.method(),
                                http.target = %req.uri().path(),
                                http.status_code = Empty,
                            )
                        })
                        .on_response(
                            |res: &axum::http::Response<axum::body::Body>,
                             latency: std::time::Duration,
                             span: &tracing::Span| {
                                span.record(
                                    "http.status_code",
                                    tracing::field::display(res.status().as_u16()),
                                );
                                tracing::info!(
                                    http.status = %res.status().as_u16(),
                                    elapsed_ms = %latency.as_millis(),
                                    "request handled"
                                );
                            },
                        ),
                )
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(app_middleware::record_metrics)),
        )
        .with_state(state)
}

/// Opens the record store selected by configuration.
///
/// For PostgreSQL this creates the pool and runs migrations.
pub async fn create_store(cfg: &StorageConfig) -> Result<DynForecastStore, StorageError> {
    match cfg.backend {
        StorageBackend::Postgres => {
            let store: DynForecastStore =
                skycast_db_postgres::create_store(cfg.postgres.to_postgres_config()).await?;
            Ok(store)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory store; cached forecasts are lost on restart");
            Ok(skycast_db_memory::create_store())
        }
    }
}

#[derive(Default)]
pub struct ServerBuilder {
    config: AppConfig,
    addr: Option<SocketAddr>,
    store: Option<DynForecastStore>,
    provider: Option<Arc<dyn ForecastProvider>>,
    clock: Option<Arc<dyn Clock>>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    /// Use an already opened store instead of the configured backend.
    pub fn with_store(mut self, store: DynForecastStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn ForecastProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub async fn build(self) -> anyhow::Result<SkycastServer> {
        let cfg = self.config;

        let store = match self.store {
            Some(store) => store,
            None => create_store(&cfg.storage)
                .await
                .context("failed to initialize record store")?,
        };

        let provider: Arc<dyn ForecastProvider> = match self.provider {
            Some(provider) => provider,
            None => Arc::new(
                WeatherApiClient::new(&cfg.weather).context("failed to build weather API client")?,
            ),
        };
        if cfg.weather.api_key.as_deref().is_none_or(str::is_empty) {
            tracing::warn!("WEATHER_API_KEY is not set; forecast refreshes will fail");
        }

        let mut service =
            ForecastService::new(store, provider).with_coalescing(cfg.cache.coalesce_inflight);
        if let Some(clock) = self.clock {
            service = service.with_clock(clock);
        }

        tracing::info!(
            store = service.store().backend_name(),
            coalesce_inflight = cfg.cache.coalesce_inflight,
            "Forecast service ready"
        );

        let state = AppState::new(service).with_metrics(cfg.metrics.enabled);
        Ok(SkycastServer {
            addr: self.addr.unwrap_or_else(|| cfg.addr()),
            app: build_app(state),
        })
    }
}

impl SkycastServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("failed to bind {}", self.addr))?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
