use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::schema::{Record, Table, SCHEMA};

/// Store tuning options
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// How long a connection waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// SQLite-backed telemetry store.
///
/// All writes go through a single connection behind a mutex so concurrent
/// ingest calls queue instead of contending for the database lock. Reads open
/// their own read-only connection and run alongside queued writes.
pub struct SqliteStore {
    path: PathBuf,
    options: StoreOptions,
    writer: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and apply the schema
    pub fn open(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.busy_timeout(options.busy_timeout)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(SCHEMA)?;

        tracing::info!("Database initialized at {} (journal_mode={})", path.display(), mode);

        Ok(Self {
            path,
            options,
            writer: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert rows in one transaction.
    ///
    /// Either every row is committed or none is. An empty batch returns 0
    /// without taking the writer lock.
    pub fn insert_batch<R: Record>(&self, rows: &[R]) -> Result<usize, StorageError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut conn = self.writer.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(R::INSERT_SQL)?;
            for (index, row) in rows.iter().enumerate() {
                // Dropping `tx` on the error path rolls the whole batch back
                row.insert(&mut stmt).map_err(|source| StorageError::Insert {
                    table: R::TABLE,
                    index,
                    source,
                })?;
            }
        }
        tx.commit()?;

        Ok(rows.len())
    }

    /// Open a read-only connection that does not contend with the writer lock
    fn reader(&self) -> Result<Connection, StorageError> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(self.options.busy_timeout)?;
        Ok(conn)
    }

    /// Row count and timestamp range of one table
    pub fn table_summary(&self, table: Table) -> Result<TableSummary, StorageError> {
        let conn = self.reader()?;
        Self::summarize(&conn, table)
    }

    fn summarize(conn: &Connection, table: Table) -> Result<TableSummary, StorageError> {
        let sql = format!(
            "SELECT COUNT(*), MIN(timestamp), MAX(timestamp) FROM {}",
            table.as_str()
        );
        let summary = conn.query_row(&sql, [], |row| {
            Ok(TableSummary {
                count: row.get(0)?,
                start: row.get(1)?,
                end: row.get(2)?,
            })
        })?;
        Ok(summary)
    }

    /// Summaries of both tables, read through one connection
    pub fn stats(&self) -> Result<StoreStats, StorageError> {
        let conn = self.reader()?;
        Ok(StoreStats {
            metrics: Self::summarize(&conn, Table::Metrics)?,
            events: Self::summarize(&conn, Table::Events)?,
        })
    }

    pub fn health_check(&self) -> Result<(), StorageError> {
        let conn = self.reader()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn with_writer<T>(&self, f: impl FnOnce(&Connection) -> T) -> T {
        f(&self.writer.lock())
    }
}

/// Aggregate view of one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub count: i64,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub metrics: TableSummary,
    pub events: TableSummary,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to insert row {index} into '{table}': {source}")]
    Insert {
        table: Table,
        index: usize,
        #[source]
        source: rusqlite::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otel::{Identity, MetricRow};
    use chrono::DateTime;
    use std::sync::Arc;

    fn open_temp() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("bridge.db"), StoreOptions::default()).unwrap();
        (dir, store)
    }

    fn make_metric(name: &str, nanos: i64) -> MetricRow {
        MetricRow {
            timestamp: DateTime::from_timestamp_nanos(nanos),
            identity: Identity {
                session_id: Some("session-1".to_string()),
                ..Identity::default()
            },
            metric_name: name.to_string(),
            metric_value: 1.0,
            metric_unit: "count".to_string(),
            model: None,
            metric_type: None,
            tool: None,
            decision: None,
            language: None,
            custom_attributes: "{}".to_string(),
        }
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("bridge.db");
        let store = SqliteStore::open(&path, StoreOptions::default()).unwrap();

        assert!(path.exists());
        assert_eq!(store.path(), path.as_path());
        store.health_check().unwrap();
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.db");
        {
            let store = SqliteStore::open(&path, StoreOptions::default()).unwrap();
            store.insert_batch(&[make_metric("a", 1_000)]).unwrap();
        }
        let store = SqliteStore::open(&path, StoreOptions::default()).unwrap();
        assert_eq!(store.table_summary(Table::Metrics).unwrap().count, 1);
    }

    #[test]
    fn test_insert_batch_and_summary() {
        let (_dir, store) = open_temp();

        let rows = vec![
            make_metric("claude_code.session.count", 1_700_000_000_000_000_000),
            make_metric("claude_code.token.usage", 1_700_000_060_000_000_000),
        ];
        assert_eq!(store.insert_batch(&rows).unwrap(), 2);

        let summary = store.table_summary(Table::Metrics).unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.start.as_deref(), Some("2023-11-14 22:13:20.000000"));
        assert_eq!(summary.end.as_deref(), Some("2023-11-14 22:14:20.000000"));

        let stats = store.stats().unwrap();
        assert_eq!(stats.metrics.count, 2);
        assert_eq!(stats.events, TableSummary::default());
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let (_dir, store) = open_temp();
        let rows: Vec<MetricRow> = Vec::new();
        assert_eq!(store.insert_batch(&rows).unwrap(), 0);
        assert_eq!(store.table_summary(Table::Metrics).unwrap().count, 0);
    }

    #[test]
    fn test_failed_row_rolls_back_batch() {
        let (_dir, store) = open_temp();
        store.with_writer(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_poison BEFORE INSERT ON metrics
                 WHEN NEW.metric_name = 'poison'
                 BEGIN SELECT RAISE(ABORT, 'poison row'); END;",
            )
            .unwrap();
        });

        let rows = vec![
            make_metric("ok.first", 1_000),
            make_metric("poison", 2_000),
            make_metric("ok.last", 3_000),
        ];
        let err = store.insert_batch(&rows).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Insert {
                table: Table::Metrics,
                index: 1,
                ..
            }
        ));
        assert_eq!(store.table_summary(Table::Metrics).unwrap().count, 0);

        // The writer is usable again after the rollback
        assert_eq!(store.insert_batch(&[make_metric("ok.again", 4_000)]).unwrap(), 1);
        assert_eq!(store.table_summary(Table::Metrics).unwrap().count, 1);
    }

    #[test]
    fn test_concurrent_writers_are_serialized() {
        let (_dir, store) = open_temp();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let rows: Vec<MetricRow> = (0..25)
                        .map(|i| make_metric("concurrent", (t * 100 + i + 1) as i64))
                        .collect();
                    store.insert_batch(&rows).unwrap()
                })
            })
            .collect();

        let written: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(written, 200);
        assert_eq!(store.table_summary(Table::Metrics).unwrap().count, 200);
    }
}
