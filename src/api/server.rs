use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{health_check, stats, AppState};
use crate::clock::SystemClock;
use crate::otel::{handle_otlp_logs, handle_otlp_metrics, Ingestor};
use crate::storage::{SqliteStore, StoreOptions};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub busy_timeout: Duration,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            db_path: PathBuf::from("/data/claude_monitoring.db"),
            busy_timeout: Duration::from_secs(5),
            max_body_bytes: 16 * 1024 * 1024, // 16MB
        }
    }
}

/// Body limit in bytes for a megabyte count; `None` if unparsable or too large
pub fn body_limit_from_mb(mb: &str) -> Option<usize> {
    mb.trim().parse::<usize>().ok()?.checked_mul(1024 * 1024)
}

/// Build the application router
pub fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        // OTLP/HTTP receivers
        .route("/v1/metrics", post(handle_otlp_metrics))
        .route("/v1/logs", post(handle_otlp_logs))
        // Health check
        .route("/health", get(health_check))
        // Stats
        .route("/stats", get(stats))
        // Middleware
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Open the store; this creates the tables on first start
    let store = Arc::new(SqliteStore::open(
        &config.db_path,
        StoreOptions {
            busy_timeout: config.busy_timeout,
        },
    )?);

    let ingestor = Ingestor::new(store, Arc::new(SystemClock));
    let state = Arc::new(AppState::new(ingestor));

    let app = build_router(state, config.max_body_bytes);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting OTLP bridge on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("OTLP bridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received, draining in-flight requests...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    fn create_test_app(max_body_bytes: usize) -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            SqliteStore::open(dir.path().join("bridge.db"), StoreOptions::default()).unwrap(),
        );
        let clock = FixedClock::from_unix_nanos(1_700_000_000_000_000_000);
        let state = Arc::new(AppState::new(Ingestor::new(store, Arc::new(clock))));
        (dir, build_router(state, max_body_bytes))
    }

    fn post_json(uri: &str, body: impl Into<String>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.into()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_body_limit_from_mb() {
        assert_eq!(body_limit_from_mb("16"), Some(16 * 1024 * 1024));
        assert_eq!(body_limit_from_mb(" 1 "), Some(1024 * 1024));
        assert_eq!(body_limit_from_mb("lots"), None);
        assert_eq!(body_limit_from_mb(&usize::MAX.to_string()), None);
    }

    #[tokio::test]
    async fn test_health_check() {
        let (_dir, app) = create_test_app(1024);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_ingest_and_stats() {
        let (_dir, app) = create_test_app(1024 * 1024);

        let metrics = serde_json::json!({
            "resourceMetrics": [{
                "scopeMetrics": [{
                    "metrics": [{
                        "name": "claude_code.lines_of_code.count",
                        "sum": {"dataPoints": [
                            {"timeUnixNano": "1700000100000000000", "asInt": "12"},
                            {"timeUnixNano": "1700000200000000000", "asInt": "3"}
                        ]}
                    }]
                }]
            }]
        });

        let response = app
            .clone()
            .oneshot(post_json("/v1/metrics", metrics.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["metrics_stored"], 2);

        let logs = serde_json::json!({
            "resourceLogs": [{
                "scopeLogs": [{
                    "logRecords": [{"body": {"stringValue": "claude_code.tool_result"}}]
                }]
            }]
        });

        let response = app
            .clone()
            .oneshot(post_json("/v1/logs", logs.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["logs_stored"], 1);

        let response = app
            .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["metrics_count"], 2);
        assert_eq!(body["events_count"], 1);
        assert_eq!(
            body["metrics_time_range"]["start"],
            "2023-11-14 22:15:00.000000"
        );
        assert_eq!(body["metrics_time_range"]["end"], "2023-11-14 22:16:40.000000");
        assert_eq!(body["events_time_range"]["start"], "2023-11-14 22:13:20.000000");
    }

    #[tokio::test]
    async fn test_stats_on_empty_store() {
        let (_dir, app) = create_test_app(1024);

        let response = app
            .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["metrics_count"], 0);
        assert!(body["events_time_range"]["start"].is_null());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_bad_request() {
        let (_dir, app) = create_test_app(1024);

        let response = app
            .oneshot(post_json("/v1/logs", "{not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["status"], "error");
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Malformed OTLP payload"));
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let (_dir, app) = create_test_app(64);

        let padding = "x".repeat(256);
        let body = format!(r#"{{"resourceMetrics": [], "padding": "{}"}}"#, padding);
        let response = app.oneshot(post_json("/v1/metrics", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
