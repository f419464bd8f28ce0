//! Flattened telemetry rows and the OTLP/JSON wire model

use chrono::{DateTime, Utc};

/// Identity columns shared by the metrics and events tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identity {
    pub session_id: Option<String>,
    pub account_uuid: Option<String>,
    pub organization_id: Option<String>,
    pub terminal_type: Option<String>,
    pub app_version: Option<String>,
}

/// One metric data point ready for storage
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub timestamp: DateTime<Utc>,
    pub identity: Identity,
    pub metric_name: String,
    pub metric_value: f64,
    pub metric_unit: String,
    pub model: Option<String>,
    /// Stored in the `type` column
    pub metric_type: Option<String>,
    pub tool: Option<String>,
    pub decision: Option<String>,
    pub language: Option<String>,
    /// Attributes without a dedicated column, as a JSON object
    pub custom_attributes: String,
}

/// One log record ready for storage
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub timestamp: DateTime<Utc>,
    pub identity: Identity,
    pub event_name: String,
    pub prompt: Option<String>,
    pub prompt_length: Option<i64>,
    pub tool_name: Option<String>,
    pub success: Option<String>,
    pub duration_ms: Option<i64>,
    pub error: Option<String>,
    pub decision: Option<String>,
    pub source: Option<String>,
    pub tool_parameters: Option<String>,
    pub model: Option<String>,
    pub cost_usd: Option<f64>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub cache_read_tokens: Option<i64>,
    pub cache_creation_tokens: Option<i64>,
    pub status_code: Option<i64>,
    pub attempt: Option<i64>,
    /// Attributes without a dedicated column, as a JSON object
    pub custom_attributes: String,
}

/// OTLP JSON format structures (for HTTP/JSON ingest)
pub mod otlp_json {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// A 64-bit number as OTLP/JSON may send it: a JSON number or a decimal string.
    /// Anything else is kept as `Other` and reads as absent.
    #[derive(Debug, Clone, PartialEq, Deserialize)]
    #[serde(untagged)]
    pub enum JsonNumber {
        Int(i64),
        Float(f64),
        Text(String),
        Other(Value),
    }

    impl JsonNumber {
        pub fn from_value(value: &Value) -> Option<Self> {
            match value {
                Value::Number(n) => n
                    .as_i64()
                    .map(JsonNumber::Int)
                    .or_else(|| n.as_f64().map(JsonNumber::Float)),
                Value::String(s) => Some(JsonNumber::Text(s.clone())),
                _ => None,
            }
        }

        pub fn as_i64(&self) -> Option<i64> {
            match self {
                JsonNumber::Int(i) => Some(*i),
                JsonNumber::Float(f) => integral(*f),
                JsonNumber::Text(s) => {
                    let s = s.trim();
                    s.parse::<i64>()
                        .ok()
                        .or_else(|| s.parse::<f64>().ok().and_then(integral))
                }
                JsonNumber::Other(_) => None,
            }
        }

        pub fn as_f64(&self) -> Option<f64> {
            match self {
                JsonNumber::Int(i) => Some(*i as f64),
                JsonNumber::Float(f) => Some(*f),
                JsonNumber::Text(s) => s.trim().parse::<f64>().ok(),
                JsonNumber::Other(_) => None,
            }
        }
    }

    fn integral(f: f64) -> Option<i64> {
        if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
            Some(f as i64)
        } else {
            None
        }
    }

    /// Explicit `null` reads the same as a missing field
    fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }

    // ------------------------------------------------------------------------
    // Common
    // ------------------------------------------------------------------------

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Resource {
        pub attributes: Option<Vec<KeyValue>>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct InstrumentationScope {
        pub name: Option<String>,
        pub version: Option<String>,
        pub attributes: Option<Vec<KeyValue>>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct KeyValue {
        #[serde(default, deserialize_with = "null_as_default")]
        pub key: String,
        #[serde(default, deserialize_with = "null_as_default")]
        pub value: AnyValue,
    }

    /// Tagged value union. Tags other than the four scalars land in `other`.
    ///
    /// Tag payloads are kept as raw JSON so a mistyped tag (`{"boolValue": "yes"}`)
    /// never fails the document; the typed accessors just skip it.
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AnyValue {
        pub string_value: Option<Value>,
        pub int_value: Option<Value>,
        pub double_value: Option<Value>,
        pub bool_value: Option<Value>,
        #[serde(flatten)]
        pub other: serde_json::Map<String, Value>,
    }

    impl AnyValue {
        pub fn as_string(&self) -> Option<&str> {
            self.string_value.as_ref()?.as_str()
        }

        pub fn as_int(&self) -> Option<i64> {
            JsonNumber::from_value(self.int_value.as_ref()?)?.as_i64()
        }

        pub fn as_double(&self) -> Option<f64> {
            JsonNumber::from_value(self.double_value.as_ref()?)?.as_f64()
        }

        pub fn as_bool(&self) -> Option<bool> {
            self.bool_value.as_ref()?.as_bool()
        }

        /// Reassemble the raw value object as it arrived on the wire
        pub fn to_json(&self) -> Value {
            let mut map = serde_json::Map::new();
            let tags = [
                ("stringValue", &self.string_value),
                ("intValue", &self.int_value),
                ("doubleValue", &self.double_value),
                ("boolValue", &self.bool_value),
            ];
            for (tag, value) in tags {
                if let Some(value) = value {
                    map.insert(tag.to_string(), value.clone());
                }
            }
            for (key, value) in &self.other {
                map.insert(key.clone(), value.clone());
            }
            Value::Object(map)
        }
    }

    // ------------------------------------------------------------------------
    // Metrics
    // ------------------------------------------------------------------------

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ExportMetricsServiceRequest {
        #[serde(default, deserialize_with = "null_as_default")]
        pub resource_metrics: Vec<ResourceMetrics>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResourceMetrics {
        pub resource: Option<Resource>,
        #[serde(default, deserialize_with = "null_as_default")]
        pub scope_metrics: Vec<ScopeMetrics>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ScopeMetrics {
        pub scope: Option<InstrumentationScope>,
        #[serde(default, deserialize_with = "null_as_default")]
        pub metrics: Vec<Metric>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Metric {
        #[serde(default, deserialize_with = "null_as_default")]
        pub name: String,
        pub description: Option<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        pub unit: String,
        pub sum: Option<DataPoints>,
        pub gauge: Option<DataPoints>,
        pub histogram: Option<DataPoints>,
    }

    impl Metric {
        /// Data points of the first family present, checked as sum, gauge, histogram
        pub fn data_points(&self) -> Option<&[DataPoint]> {
            self.sum
                .as_ref()
                .or(self.gauge.as_ref())
                .or(self.histogram.as_ref())
                .map(|family| family.data_points.as_slice())
        }
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DataPoints {
        #[serde(default, deserialize_with = "null_as_default")]
        pub data_points: Vec<DataPoint>,
    }

    /// Number or histogram data point; only the fields the bridge reads
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DataPoint {
        pub attributes: Option<Vec<KeyValue>>,
        pub time_unix_nano: Option<JsonNumber>,
        pub as_double: Option<JsonNumber>,
        pub as_int: Option<JsonNumber>,
    }

    impl DataPoint {
        /// Floating reading, else integer reading, else 0.
        ///
        /// NaN counts as missing: SQLite stores it as NULL, which the
        /// `metric_value NOT NULL` constraint would reject.
        pub fn value(&self) -> f64 {
            self.as_double
                .as_ref()
                .and_then(JsonNumber::as_f64)
                .filter(|v| !v.is_nan())
                .or_else(|| {
                    self.as_int
                        .as_ref()
                        .and_then(JsonNumber::as_i64)
                        .map(|i| i as f64)
                })
                .unwrap_or(0.0)
        }
    }

    // ------------------------------------------------------------------------
    // Logs
    // ------------------------------------------------------------------------

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ExportLogsServiceRequest {
        #[serde(default, deserialize_with = "null_as_default")]
        pub resource_logs: Vec<ResourceLogs>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResourceLogs {
        pub resource: Option<Resource>,
        #[serde(default, deserialize_with = "null_as_default")]
        pub scope_logs: Vec<ScopeLogs>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ScopeLogs {
        pub scope: Option<InstrumentationScope>,
        #[serde(default, deserialize_with = "null_as_default")]
        pub log_records: Vec<LogRecord>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct LogRecord {
        pub time_unix_nano: Option<JsonNumber>,
        pub severity_text: Option<String>,
        pub body: Option<AnyValue>,
        pub attributes: Option<Vec<KeyValue>>,
    }
}
