//! Reading Routes
//!
//! `POST /data` ingests one reading from a sensor node, `GET /data` returns
//! the most recent readings for the dashboard.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use chrono::SecondsFormat;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::{ApiError, AppState};
use storage::{NewReading, Reading};

/// Body sent by sensor nodes
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IngestPayload {
    pub temperature: f64,
    pub humidity: f64,
    #[serde(deserialize_with = "deserialize_gas")]
    pub gas: i64,
}

impl IngestPayload {
    /// Parse a raw request body. The body must be a JSON object; arrays are
    /// rejected even though serde would accept them for a struct.
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ApiError::MalformedRequest("empty body".to_string()));
        }

        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| ApiError::MalformedRequest(format!("body is not JSON: {e}")))?;

        if !value.is_object() {
            return Err(ApiError::MalformedRequest(
                "body is not a JSON object".to_string(),
            ));
        }

        serde_json::from_value(value)
            .map_err(|e| ApiError::MalformedRequest(e.to_string()))
    }
}

impl From<IngestPayload> for NewReading {
    fn from(payload: IngestPayload) -> Self {
        NewReading::new(payload.temperature, payload.humidity, payload.gas)
    }
}

/// Gas level arrives as a JSON number; integral floats such as `412.0` are
/// accepted, fractional ones are not.
fn deserialize_gas<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(value) = number.as_i64() {
        return Ok(value);
    }

    match number.as_f64() {
        Some(value) if is_integral(value) => Ok(value as i64),
        _ => Err(de::Error::custom(format!(
            "gas must be an integer, got {number}"
        ))),
    }
}

fn is_integral(value: f64) -> bool {
    value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64
}

/// Acknowledgement for an accepted reading
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Wire shape of a stored reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingResponse {
    pub id: i64,
    pub temperature: f64,
    pub humidity: f64,
    pub gas_level: i64,
    /// RFC 3339, UTC, millisecond precision
    pub timestamp: String,
}

impl From<&Reading> for ReadingResponse {
    fn from(reading: &Reading) -> Self {
        Self {
            id: reading.id,
            temperature: reading.temperature,
            humidity: reading.humidity,
            gas_level: reading.gas_level,
            timestamp: reading
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Ingest one reading
///
/// The body is read as raw bytes so nodes that omit `Content-Type` are still
/// accepted.
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let payload = IngestPayload::from_body(&body)?;
    let stored = state.repository.insert(payload.into()).await?;

    debug!(
        "Stored reading {} (temperature={}, humidity={}, gas_level={})",
        stored.id, stored.temperature, stored.humidity, stored.gas_level
    );
    metrics::counter!("readings_ingested_total").increment(1);

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Data received successfully!".to_string(),
        }),
    ))
}

/// Get the most recent readings, newest first
pub async fn list_recent(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ReadingResponse>>, ApiError> {
    let readings = state.repository.list_recent(state.recent_limit).await?;
    Ok(Json(readings.iter().map(ReadingResponse::from).collect()))
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
