//! sqlite-bridge: OTLP/JSON telemetry into SQLite
//!
//! Receives OpenTelemetry metrics and logs pushed by a collector, flattens the
//! resource → scope → metric/log → data point trees into fixed-column rows, and
//! stores them in two SQLite tables (`metrics` and `events`) for dashboards.
//!
//! # Features
//!
//! - **Attribute Merging**: resource < scope < point/record precedence
//! - **Column Promotion**: well-known keys (`session.id`, `model`, ...) become typed columns
//! - **Overflow Blob**: every other attribute is kept in a JSON `custom_attributes` column
//! - **Atomic Ingest**: one transaction per payload, all rows or none
//! - **Serialized Writes**: a single writer connection; reads never wait on it
//!
//! # Example
//!
//! ```no_run
//! use sqlite_bridge::clock::SystemClock;
//! use sqlite_bridge::otel::Ingestor;
//! use sqlite_bridge::storage::{SqliteStore, StoreOptions};
//! use std::sync::Arc;
//!
//! let store = SqliteStore::open("telemetry.db", StoreOptions::default()).unwrap();
//! let ingestor = Ingestor::new(Arc::new(store), Arc::new(SystemClock));
//!
//! let payload = br#"{"resourceLogs": [{"scopeLogs": [{"logRecords": [
//!     {"body": {"stringValue": "claude_code.user_prompt"}}
//! ]}]}]}"#;
//! let stored = ingestor.ingest_logs(payload).unwrap();
//! println!("Stored {} events", stored);
//! ```

pub mod api;
pub mod clock;
pub mod data;
pub mod otel;
pub mod storage;

// Re-export commonly used types
pub use data::AttributeValue;
pub use otel::{EventRow, IngestError, Ingestor, MetricRow};
pub use storage::{SqliteStore, StorageError, StoreOptions};
