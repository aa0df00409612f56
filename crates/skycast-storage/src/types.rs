//! The forecast record entity.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// The cached forecast for a single city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRecord {
    /// City key, case-sensitive and taken verbatim from the client.
    pub city: String,
    /// When the forecast was last refreshed from the provider (UTC).
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// The forecast payload: a one-decimal Celsius temperature.
    pub forecast: String,
}

impl ForecastRecord {
    /// Creates a new record.
    #[must_use]
    pub fn new(
        city: impl Into<String>,
        forecast: impl Into<String>,
        updated_at: OffsetDateTime,
    ) -> Self {
        Self {
            city: city.into(),
            updated_at,
            forecast: forecast.into(),
        }
    }

    /// Age of the record relative to `now`.
    ///
    /// Negative if `updated_at` lies in the future.
    #[must_use]
    pub fn age_at(&self, now: OffsetDateTime) -> Duration {
        now - self.updated_at
    }

    /// Returns `true` if the record is strictly younger than `ttl` at `now`.
    #[must_use]
    pub fn is_fresh_at(&self, now: OffsetDateTime, ttl: Duration) -> bool {
        self.age_at(now) < ttl
    }
}

/// Drops sub-microsecond precision, matching what PostgreSQL keeps.
#[must_use]
pub fn truncate_to_micros(dt: OffsetDateTime) -> OffsetDateTime {
    dt.replace_nanosecond(dt.nanosecond() / 1_000 * 1_000)
        .unwrap_or(dt)
}
