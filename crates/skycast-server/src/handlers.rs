use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Serialize;
use tracing::warn;

use crate::error::ApiError;
use crate::metrics::render_metrics;
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

#[derive(Serialize)]
pub struct ReadyResponse<'a> {
    status: &'a str,
    store: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// `GET /forecast?city_name=<city>`
///
/// A repeated `city_name` resolves to its first occurrence.
pub async fn forecast(
    State(state): State<AppState>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::validation(e.body_text()))?;
    let city = first_city_name(params)
        .ok_or_else(|| ApiError::validation("city_name query parameter is required"))?;

    let record = state.service.get_forecast(&city).await?;
    Ok((StatusCode::OK, Json(record)))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

fn first_city_name(params: Vec<(String, String)>) -> Option<String> {
    params
        .into_iter()
        .find(|(key, _)| key == "city_name")
        .map(|(_, value)| value)
        .filter(|city| !city.is_empty())
}

/// Ready once the store answers a ping.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.service.store();
    let backend = store.backend_name();
    match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadyResponse {
                status: "ready",
                store: backend,
                error: None,
            }),
        ),
        Err(e) => {
            warn!(store = backend, category = %e.category(), error = %e, "Store ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    status: "unavailable",
                    store: backend,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

/// Prometheus text exposition.
pub async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    if !state.metrics_enabled {
        return (StatusCode::NOT_FOUND, "metrics disabled").into_response();
    }
    match render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}
