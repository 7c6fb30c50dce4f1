//! Health and Metrics Routes

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use crate::AppState;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// `None` when the store could not be queried
    pub reading_count: Option<u64>,
}

/// Health check handler
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let (status, label, reading_count) = match state.repository.count().await {
        Ok(count) => (StatusCode::OK, "healthy", Some(count)),
        Err(e) => {
            error!("Health check could not reach reading store: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", None)
        }
    };

    let response = HealthResponse {
        status: label.to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        reading_count,
    };

    (status, Json(response))
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_router;
    use axum::{body::Body, http::Request};
    use storage::{NewReading, ReadingRepository};
    use tower::ServiceExt;

    async fn state() -> Arc<AppState> {
        let repository = ReadingRepository::in_memory().await.unwrap();
        Arc::new(AppState::new(repository, 20))
    }

    async fn call(state: Arc<AppState>, uri: &str) -> Response<Body> {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        create_router(state).oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_reading_count() {
        let state = state().await;
        state
            .repository
            .insert(NewReading::new(21.0, 45.0, 300))
            .await
            .unwrap();

        let response = call(state, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["reading_count"], 1);
    }

    #[tokio::test]
    async fn test_health_degraded_when_store_closed() {
        let state = state().await;
        state.repository.close().await;

        let response = call(state, "/health").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_metrics_absent_without_recorder() {
        let response = call(state().await, "/metrics").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
