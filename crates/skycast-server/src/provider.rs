//! Forecast provider backed by the weatherapi.com current-conditions API.
//!
//! The provider returns a single value: the current temperature in Celsius,
//! formatted with one decimal place. That string is what the cache stores and
//! what clients receive as `forecast`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::WeatherConfig;

/// Default base URL of the upstream weather API.
pub const DEFAULT_WEATHER_API_URL: &str = "https://api.weatherapi.com/v1";

const USER_AGENT: &str = concat!("skycast/", env!("CARGO_PKG_VERSION"));

/// Errors returned by a [`ForecastProvider`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// No API credential is configured.
    #[error("WEATHER_API_KEY is not set")]
    MissingApiKey,

    /// The request could not be sent or the response could not be read.
    #[error("weather API request failed: {0}")]
    Request(String),

    /// The API answered with a non-200 status.
    #[error("error from weather API: {status}")]
    Status { status: u16 },

    /// The body did not have the expected shape.
    #[error("weather API response could not be parsed: {0}")]
    Parse(String),
}

impl ProviderError {
    /// Configuration problem on our side rather than an upstream failure.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::MissingApiKey)
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingApiKey => "missing_api_key",
            Self::Request(_) => "request",
            Self::Status { .. } => "status",
            Self::Parse(_) => "parse",
        }
    }
}

/// Source of fresh forecasts for the cache.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Fetches the current forecast payload for `city`.
    async fn fetch(&self, city: &str) -> Result<String, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: CurrentConditions,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temp_c: f64,
}

/// Formats a Celsius temperature the way it is cached and served.
pub fn format_temperature(temp_c: f64) -> String {
    format!("{temp_c:.1}")
}

/// Client for the weatherapi.com `current.json` endpoint.
#[derive(Clone)]
pub struct WeatherApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for WeatherApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherApiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "****"))
            .finish()
    }
}

impl WeatherApiClient {
    /// Builds a client from configuration. A missing key is accepted here and
    /// reported on the first fetch.
    pub fn new(config: &WeatherConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/current.json", self.base_url)
    }
}

#[async_trait]
impl ForecastProvider for WeatherApiClient {
    #[instrument(skip(self))]
    async fn fetch(&self, city: &str) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingApiKey)?;

        debug!(endpoint = %self.endpoint(), "Fetching current conditions");

        // without_url(): the query string carries the API key
        let resp = self
            .client
            .get(self.endpoint())
            .query(&[("key", api_key), ("q", city), ("aqi", "no")])
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.without_url().to_string()))?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(ProviderError::Status {
                status: status.as_u16(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| ProviderError::Request(e.without_url().to_string()))?;
        let parsed: CurrentResponse =
            serde_json::from_slice(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;

        let forecast = format_temperature(parsed.current.temp_c);
        debug!(temp_c = parsed.current.temp_c, %forecast, "Fetched current conditions");
        Ok(forecast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: Option<&str>) -> WeatherApiClient {
        let config = WeatherConfig {
            api_key: api_key.map(String::from),
            base_url: format!("{}/v1/", server.uri()),
            timeout_ms: 2_000,
        };
        WeatherApiClient::new(&config).expect("client")
    }

    #[test]
    fn test_format_temperature() {
        assert_eq!(format_temperature(21.37), "21.4");
        assert_eq!(format_temperature(18.5), "18.5");
        assert_eq!(format_temperature(-3.04), "-3.0");
        assert_eq!(format_temperature(0.0), "0.0");
        assert_eq!(format_temperature(30.0), "30.0");
    }

    #[tokio::test]
    async fn test_fetch_sends_key_and_city() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/current.json"))
            .and(query_param("key", "test-key"))
            .and(query_param("q", "São Paulo"))
            .and(query_param("aqi", "no"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "location": { "name": "São Paulo" },
                "current": { "temp_c": 21.37, "condition": { "text": "Sunny" } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("test-key"));
        let forecast = client.fetch("São Paulo").await.expect("fetch");
        assert_eq!(forecast, "21.4");
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        for key in [None, Some("")] {
            let client = client_for(&server, key);
            let err = client.fetch("Paris").await.unwrap_err();
            assert!(matches!(err, ProviderError::MissingApiKey));
            assert!(err.is_config());
        }
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/current.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("k")).fetch("Atlantis").await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 503 }));
        assert!(!err.is_config());
        assert_eq!(err.kind(), "status");
    }

    #[tokio::test]
    async fn test_unexpected_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/current.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "current": {} })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server, Some("k")).fetch("Paris").await.unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = WeatherConfig {
            api_key: Some("abc123".into()),
            ..Default::default()
        };
        let client = WeatherApiClient::new(&config).expect("client");
        assert!(!format!("{client:?}").contains("abc123"));
    }

    #[tokio::test]
    async fn test_request_error_does_not_leak_key() {
        // Nothing listens on port 9 locally
        let config = WeatherConfig {
            api_key: Some("leaky-key".into()),
            base_url: "http://127.0.0.1:9/v1".into(),
            timeout_ms: 500,
        };
        let client = WeatherApiClient::new(&config).expect("client");
        let err = client.fetch("Paris").await.unwrap_err();
        assert!(matches!(err, ProviderError::Request(_)));
        assert!(!err.to_string().contains("leaky-key"));
    }
}
