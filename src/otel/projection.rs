//! Column projection: splitting merged attributes into fixed columns and an
//! overflow blob.

use std::collections::{BTreeMap, HashMap};

use super::attributes::MergedAttributes;
use super::model::Identity;
use crate::data::AttributeValue;

/// Known keys promoted to columns on the `metrics` table
pub const METRIC_COLUMNS: ColumnProjector = ColumnProjector::new(&[
    ("session.id", "session_id"),
    ("user.account_uuid", "account_uuid"),
    ("organization.id", "organization_id"),
    ("terminal.type", "terminal_type"),
    ("app.version", "app_version"),
    ("model", "model"),
    ("type", "type"),
    ("tool", "tool"),
    ("decision", "decision"),
    ("language", "language"),
]);

/// Known keys promoted to columns on the `events` table
pub const EVENT_COLUMNS: ColumnProjector = ColumnProjector::new(&[
    ("session.id", "session_id"),
    ("user.account_uuid", "account_uuid"),
    ("organization.id", "organization_id"),
    ("terminal.type", "terminal_type"),
    ("app.version", "app_version"),
    ("event.name", "event_name"),
    ("prompt", "prompt"),
    ("prompt_length", "prompt_length"),
    ("tool_name", "tool_name"),
    ("success", "success"),
    ("duration_ms", "duration_ms"),
    ("error", "error"),
    ("decision", "decision"),
    ("source", "source"),
    ("tool_parameters", "tool_parameters"),
    ("model", "model"),
    ("cost_usd", "cost_usd"),
    ("input_tokens", "input_tokens"),
    ("output_tokens", "output_tokens"),
    ("cache_read_tokens", "cache_read_tokens"),
    ("cache_creation_tokens", "cache_creation_tokens"),
    ("status_code", "status_code"),
    ("attempt", "attempt"),
]);

/// Maps known attribute keys to column names for one table
#[derive(Debug, Clone, Copy)]
pub struct ColumnProjector {
    columns: &'static [(&'static str, &'static str)],
}

impl ColumnProjector {
    pub const fn new(columns: &'static [(&'static str, &'static str)]) -> Self {
        Self { columns }
    }

    /// Column for an attribute key, if the key is known
    pub fn column_for(&self, key: &str) -> Option<&'static str> {
        self.columns
            .iter()
            .find(|(known, _)| *known == key)
            .map(|(_, column)| *column)
    }

    pub fn is_known(&self, key: &str) -> bool {
        self.column_for(key).is_some()
    }

    /// Partition merged attributes into known columns and residual entries
    pub fn project(&self, merged: MergedAttributes) -> Projection {
        let mut known = HashMap::new();
        let mut residual = BTreeMap::new();

        for (key, value) in merged {
            match self.column_for(&key) {
                Some(column) => {
                    known.insert(column, value);
                }
                None => {
                    residual.insert(key, value);
                }
            }
        }

        Projection { known, residual }
    }
}

/// Result of projecting one attribute mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub known: HashMap<&'static str, AttributeValue>,
    pub residual: BTreeMap<String, AttributeValue>,
}

impl Projection {
    /// Value for a TEXT column
    pub fn text(&self, column: &str) -> Option<String> {
        self.known.get(column).map(AttributeValue::to_text)
    }

    /// Value for an INTEGER column; uncoercible values become NULL
    pub fn integer(&self, column: &str) -> Option<i64> {
        let value = self.known.get(column)?;
        let coerced = value.as_i64();
        if coerced.is_none() {
            tracing::debug!(
                "Dropping {} value for integer column {}: {}",
                value.type_name(),
                column,
                value
            );
        }
        coerced
    }

    /// Value for a REAL column; uncoercible values become NULL
    pub fn real(&self, column: &str) -> Option<f64> {
        let value = self.known.get(column)?;
        let coerced = value.as_f64();
        if coerced.is_none() {
            tracing::debug!(
                "Dropping {} value for real column {}: {}",
                value.type_name(),
                column,
                value
            );
        }
        coerced
    }

    pub fn identity(&self) -> Identity {
        Identity {
            session_id: self.text("session_id"),
            account_uuid: self.text("account_uuid"),
            organization_id: self.text("organization_id"),
            terminal_type: self.text("terminal_type"),
            app_version: self.text("app_version"),
        }
    }

    /// Residual attributes as a key-sorted JSON object.
    ///
    /// JSON has no NaN or infinity, so non-finite floats are written as text.
    pub fn residual_json(&self) -> String {
        let residual: BTreeMap<&str, AttributeValue> = self
            .residual
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    AttributeValue::Float(f) if !f.is_finite() => {
                        AttributeValue::String(value.to_text())
                    }
                    other => other.clone(),
                };
                (key.as_str(), value)
            })
            .collect();
        serde_json::to_string(&residual).unwrap_or_else(|_| "{}".to_string())
    }
}
