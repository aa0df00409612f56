//! Point lookup and upsert queries for the `weather` table.

use chrono::{DateTime, Utc};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use time::OffsetDateTime;

use skycast_storage::{ForecastRecord, StorageError};

use crate::error::query_error;

const SELECT_FORECAST: &str = "SELECT city, updated_at, forecast FROM weather WHERE city = $1";

const UPSERT_FORECAST: &str = r#"INSERT INTO weather (city, updated_at, forecast)
       VALUES ($1, $2, $3)
       ON CONFLICT (city)
       DO UPDATE SET updated_at = EXCLUDED.updated_at, forecast = EXCLUDED.forecast
       WHERE weather.updated_at <= EXCLUDED.updated_at"#;

/// Converts chrono DateTime to time OffsetDateTime.
fn chrono_to_time(dt: DateTime<Utc>) -> Result<OffsetDateTime, StorageError> {
    OffsetDateTime::from_unix_timestamp(dt.timestamp())
        .map(|t| t + time::Duration::nanoseconds(i64::from(dt.timestamp_subsec_nanos())))
        .map_err(|e| StorageError::internal(format!("Stored timestamp out of range: {e}")))
}

/// Converts time OffsetDateTime to chrono DateTime for binding.
fn time_to_chrono(dt: OffsetDateTime) -> Result<DateTime<Utc>, StorageError> {
    DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), dt.nanosecond())
        .ok_or_else(|| StorageError::internal(format!("Timestamp out of range: {dt}")))
}

/// Reads the record for `city`, if any.
pub async fn get(pool: &PgPool, city: &str) -> Result<Option<ForecastRecord>, StorageError> {
    let row: Option<(String, DateTime<Utc>, String)> = query_as(SELECT_FORECAST)
        .bind(city)
        .fetch_optional(pool)
        .await
        .map_err(|e| query_error("Failed to read forecast", e))?;

    row.map(|(city, updated_at, forecast)| {
        Ok(ForecastRecord {
            city,
            updated_at: chrono_to_time(updated_at)?,
            forecast,
        })
    })
    .transpose()
}

/// Inserts the record or replaces the one stored for its city, unless the
/// stored row is newer.
pub async fn upsert(pool: &PgPool, record: &ForecastRecord) -> Result<(), StorageError> {
    let updated_at = time_to_chrono(record.updated_at)?;

    query(UPSERT_FORECAST)
        .bind(&record.city)
        .bind(updated_at)
        .bind(&record.forecast)
        .execute(pool)
        .await
        .map_err(|e| query_error("Failed to upsert forecast", e))?;

    Ok(())
}
