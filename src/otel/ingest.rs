//! OTLP ingest: flatten a payload and commit its rows in one transaction

use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use super::logs::flatten_logs;
use super::metrics::flatten_metrics;
use super::model::otlp_json::{ExportLogsServiceRequest, ExportMetricsServiceRequest};
use crate::api::handlers::{ApiError, AppState};
use crate::clock::Clock;
use crate::storage::{Record, SqliteStore, StorageError};

/// Coordinates flattening and persistence for one payload at a time
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<SqliteStore>,
    clock: Arc<dyn Clock>,
}

impl Ingestor {
    pub fn new(store: Arc<SqliteStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &Arc<SqliteStore> {
        &self.store
    }

    /// Parse and store an OTLP/JSON metrics export
    pub fn ingest_metrics(&self, body: &[u8]) -> Result<usize, IngestError> {
        let request: ExportMetricsServiceRequest =
            serde_json::from_slice(body).map_err(IngestError::MalformedPayload)?;
        self.ingest_metrics_request(&request)
    }

    pub fn ingest_metrics_request(
        &self,
        request: &ExportMetricsServiceRequest,
    ) -> Result<usize, IngestError> {
        let rows = flatten_metrics(request, self.clock.as_ref());
        self.ingest(&rows)
    }

    /// Parse and store an OTLP/JSON logs export
    pub fn ingest_logs(&self, body: &[u8]) -> Result<usize, IngestError> {
        let request: ExportLogsServiceRequest =
            serde_json::from_slice(body).map_err(IngestError::MalformedPayload)?;
        self.ingest_logs_request(&request)
    }

    pub fn ingest_logs_request(
        &self,
        request: &ExportLogsServiceRequest,
    ) -> Result<usize, IngestError> {
        let rows = flatten_logs(request, self.clock.as_ref());
        self.ingest(&rows)
    }

    /// Write all rows through the store's writer in a single transaction
    pub fn ingest<R: Record>(&self, rows: &[R]) -> Result<usize, IngestError> {
        let written = self.store.insert_batch(rows)?;
        tracing::debug!("Committed {} rows to {}", written, R::TABLE);
        Ok(written)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Malformed OTLP payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    #[error("Failed to persist rows: {0}")]
    Persistence(#[from] StorageError),
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::MalformedPayload(_) => ApiError::BadRequest(err.to_string()),
            IngestError::Persistence(_) => ApiError::Internal(err.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsStored {
    pub status: &'static str,
    pub metrics_stored: usize,
}

#[derive(Debug, Serialize)]
pub struct LogsStored {
    pub status: &'static str,
    pub logs_stored: usize,
}

/// Handle OTLP/HTTP metric export (JSON format)
///
/// Endpoint: POST /v1/metrics
pub async fn handle_otlp_metrics(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<MetricsStored>, ApiError> {
    let ingestor = state.ingestor.clone();
    let count = tokio::task::spawn_blocking(move || ingestor.ingest_metrics(&body))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| {
            tracing::error!("Error storing metrics: {}", e);
            ApiError::from(e)
        })?;

    tracing::info!("Stored {} metric data points", count);
    Ok(Json(MetricsStored {
        status: "success",
        metrics_stored: count,
    }))
}

/// Handle OTLP/HTTP log export (JSON format)
///
/// Endpoint: POST /v1/logs
pub async fn handle_otlp_logs(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<LogsStored>, ApiError> {
    let ingestor = state.ingestor.clone();
    let count = tokio::task::spawn_blocking(move || ingestor.ingest_logs(&body))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| {
            tracing::error!("Error storing logs: {}", e);
            ApiError::from(e)
        })?;

    tracing::info!("Stored {} log/event records", count);
    Ok(Json(LogsStored {
        status: "success",
        logs_stored: count,
    }))
}
