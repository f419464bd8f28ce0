//! Table layout and row binding for the SQLite store

use chrono::{DateTime, Utc};
use rusqlite::{params, Statement};

use crate::otel::{EventRow, MetricRow};

/// Idempotent DDL applied when the store opens
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp DATETIME NOT NULL,
    session_id TEXT,
    account_uuid TEXT,
    organization_id TEXT,
    terminal_type TEXT,
    app_version TEXT,
    metric_name TEXT NOT NULL,
    metric_value REAL NOT NULL,
    metric_unit TEXT,
    model TEXT,
    type TEXT,
    tool TEXT,
    decision TEXT,
    language TEXT,
    custom_attributes TEXT
);
CREATE INDEX IF NOT EXISTS idx_metrics_timestamp ON metrics (timestamp);
CREATE INDEX IF NOT EXISTS idx_metrics_session_id ON metrics (session_id);
CREATE INDEX IF NOT EXISTS idx_metrics_metric_name ON metrics (metric_name);

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp DATETIME NOT NULL,
    session_id TEXT,
    account_uuid TEXT,
    organization_id TEXT,
    terminal_type TEXT,
    app_version TEXT,
    event_name TEXT NOT NULL,
    prompt TEXT,
    prompt_length INTEGER,
    tool_name TEXT,
    success TEXT,
    duration_ms INTEGER,
    error TEXT,
    decision TEXT,
    source TEXT,
    tool_parameters TEXT,
    model TEXT,
    cost_usd REAL,
    input_tokens INTEGER,
    output_tokens INTEGER,
    cache_read_tokens INTEGER,
    cache_creation_tokens INTEGER,
    status_code INTEGER,
    attempt INTEGER,
    custom_attributes TEXT
);
CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events (timestamp);
CREATE INDEX IF NOT EXISTS idx_events_session_id ON events (session_id);
CREATE INDEX IF NOT EXISTS idx_events_event_name ON events (event_name);
";

const INSERT_METRIC: &str = "
INSERT INTO metrics (
    timestamp, session_id, account_uuid, organization_id,
    terminal_type, app_version, metric_name, metric_value,
    metric_unit, model, type, tool, decision, language,
    custom_attributes
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
";

const INSERT_EVENT: &str = "
INSERT INTO events (
    timestamp, session_id, account_uuid, organization_id,
    terminal_type, app_version, event_name, prompt,
    prompt_length, tool_name, success, duration_ms,
    error, decision, source, tool_parameters, model,
    cost_usd, input_tokens, output_tokens, cache_read_tokens,
    cache_creation_tokens, status_code, attempt, custom_attributes
) VALUES (
    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
    ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25
)
";

/// Persisted tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Metrics,
    Events,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Metrics => "metrics",
            Table::Events => "events",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row type that can be inserted into one table
pub trait Record {
    const TABLE: Table;
    const INSERT_SQL: &'static str;

    fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize>;
}

/// Stored timestamp form; sorts lexicographically in time order
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

impl Record for MetricRow {
    const TABLE: Table = Table::Metrics;
    const INSERT_SQL: &'static str = INSERT_METRIC;

    fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            format_timestamp(&self.timestamp),
            self.identity.session_id,
            self.identity.account_uuid,
            self.identity.organization_id,
            self.identity.terminal_type,
            self.identity.app_version,
            self.metric_name,
            self.metric_value,
            self.metric_unit,
            self.model,
            self.metric_type,
            self.tool,
            self.decision,
            self.language,
            self.custom_attributes,
        ])
    }
}

impl Record for EventRow {
    const TABLE: Table = Table::Events;
    const INSERT_SQL: &'static str = INSERT_EVENT;

    fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            format_timestamp(&self.timestamp),
            self.identity.session_id,
            self.identity.account_uuid,
            self.identity.organization_id,
            self.identity.terminal_type,
            self.identity.app_version,
            self.event_name,
            self.prompt,
            self.prompt_length,
            self.tool_name,
            self.success,
            self.duration_ms,
            self.error,
            self.decision,
            self.source,
            self.tool_parameters,
            self.model,
            self.cost_usd,
            self.input_tokens,
            self.output_tokens,
            self.cache_read_tokens,
            self.cache_creation_tokens,
            self.status_code,
            self.attempt,
            self.custom_attributes,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_format_sorts_by_time() {
        let early = DateTime::from_timestamp_nanos(1_700_000_000_000_001_000);
        let late = DateTime::from_timestamp_nanos(1_700_000_009_500_000_000);

        assert_eq!(format_timestamp(&early), "2023-11-14 22:13:20.000001");
        assert!(format_timestamp(&early) < format_timestamp(&late));
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('metrics', 'events')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);

        let indexes: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(indexes, 6);
    }
}
