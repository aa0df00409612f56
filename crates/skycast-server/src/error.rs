//! HTTP-facing error type.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::provider::ProviderError;
use crate::service::ServiceError;

/// Errors returned by request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad client input (400).
    #[error("{0}")]
    Validation(String),

    /// The record store could not be read.
    #[error("{0}")]
    Storage(String),

    /// The server is missing configuration it needs to answer.
    #[error("{0}")]
    Config(String),

    /// The forecast provider failed.
    #[error("{0}")]
    Upstream(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) | Self::Config(_) | Self::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Value of the `error` field in the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::Upstream(_) => "upstream",
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Storage(e) => Self::Storage(e.to_string()),
            ServiceError::Provider(e) => e.into(),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        if err.is_config() {
            Self::Config(err.to_string())
        } else {
            Self::Upstream(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "Request failed");
        } else {
            tracing::debug!(kind = self.kind(), error = %self, "Request rejected");
        }

        let body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skycast_storage::StorageError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::validation("missing city_name").status_code(),
            StatusCode::BAD_REQUEST
        );

        let storage: ApiError =
            ServiceError::Storage(StorageError::connection("refused")).into();
        assert_eq!(storage.kind(), "storage");
        assert_eq!(storage.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let config: ApiError = ServiceError::Provider(ProviderError::MissingApiKey).into();
        assert_eq!(config.kind(), "config");
        assert_eq!(config.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let upstream: ApiError =
            ServiceError::Provider(ProviderError::Status { status: 503 }).into();
        assert_eq!(upstream.kind(), "upstream");
        assert_eq!(upstream.to_string(), "error from weather API: 503");
    }

    #[test]
    fn test_response_has_json_body() {
        let response = ApiError::validation("missing city_name").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()["content-type"],
            "application/json"
        );
    }
}
