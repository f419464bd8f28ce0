use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::otel::Ingestor;
use crate::storage::{SqliteStore, StoreStats, TableSummary};

/// Application state shared across handlers
pub struct AppState {
    pub store: Arc<SqliteStore>,
    pub ingestor: Ingestor,
}

impl AppState {
    pub fn new(ingestor: Ingestor) -> Self {
        Self {
            store: Arc::clone(ingestor.store()),
            ingestor,
        }
    }
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Stats
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub metrics_count: i64,
    pub events_count: i64,
    pub metrics_time_range: TimeRange,
    pub events_time_range: TimeRange,
}

#[derive(Debug, Serialize)]
pub struct TimeRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl From<TableSummary> for TimeRange {
    fn from(summary: TableSummary) -> Self {
        Self {
            start: summary.start,
            end: summary.end,
        }
    }
}

impl From<StoreStats> for StatsResponse {
    fn from(stats: StoreStats) -> Self {
        Self {
            metrics_count: stats.metrics.count,
            events_count: stats.events.count,
            metrics_time_range: stats.metrics.into(),
            events_time_range: stats.events.into(),
        }
    }
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    let store = Arc::clone(&state.store);
    let stats = tokio::task::spawn_blocking(move || store.stats())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| {
            tracing::error!("Error getting stats: {}", e);
            ApiError::Internal(e.to_string())
        })?;

    Ok(Json(stats.into()))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "status": "error",
            "message": message
        });

        (status, Json(body)).into_response()
    }
}
