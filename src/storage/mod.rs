pub mod engine;
pub mod schema;

pub use engine::{SqliteStore, StorageError, StoreOptions, StoreStats, TableSummary};
pub use schema::{format_timestamp, Record, Table};
