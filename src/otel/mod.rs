//! OpenTelemetry support for the bridge
//!
//! Receives OTLP/HTTP JSON exports and flattens them into the `metrics` and
//! `events` tables.
//!
//! ## Ingest
//!
//! Point an OTel Collector at the bridge:
//! ```yaml
//! exporters:
//!   otlphttp:
//!     endpoint: http://sqlite-bridge:5000
//!     encoding: json
//! ```
//!
//! Or export directly from an application:
//! ```bash
//! OTEL_EXPORTER_OTLP_ENDPOINT=http://localhost:5000
//! OTEL_EXPORTER_OTLP_PROTOCOL=http/json
//! ```
//!
//! ## Flattening
//!
//! Attributes are merged resource < scope < point/record, well-known keys are
//! promoted to columns, and everything else is kept as a JSON object in
//! `custom_attributes`:
//! ```sql
//! SELECT timestamp, event_name, tool_name, duration_ms,
//!        json_extract(custom_attributes, '$."user.email"') AS email
//! FROM events
//! WHERE session_id = 'abc'
//! ORDER BY timestamp
//! ```

mod attributes;
mod ingest;
mod logs;
mod metrics;
mod model;
mod projection;

pub use attributes::{decode_value, merge_into, resolve, MergedAttributes};
pub use ingest::{handle_otlp_logs, handle_otlp_metrics, IngestError, Ingestor};
pub use logs::{flatten_logs, UNKNOWN_EVENT};
pub use metrics::flatten_metrics;
pub use model::{otlp_json, EventRow, Identity, MetricRow};
pub use projection::{ColumnProjector, Projection, EVENT_COLUMNS, METRIC_COLUMNS};
