//! Log flattening: one event row per log record

use super::attributes::{merge_into, resolve};
use super::model::otlp_json::{ExportLogsServiceRequest, JsonNumber, LogRecord};
use super::model::EventRow;
use super::projection::{Projection, EVENT_COLUMNS};
use crate::clock::{instant_or_now, Clock};

/// Event name used when neither the body nor `event.name` supplies one
pub const UNKNOWN_EVENT: &str = "unknown_event";

/// Flatten a logs export into event rows, in resource → scope → record order
pub fn flatten_logs(request: &ExportLogsServiceRequest, clock: &dyn Clock) -> Vec<EventRow> {
    let mut rows = Vec::new();

    for resource_logs in &request.resource_logs {
        let resource_attrs = resolve([resource_logs
            .resource
            .as_ref()
            .and_then(|r| r.attributes.as_deref())]);

        for scope_logs in &resource_logs.scope_logs {
            let mut scope_attrs = resource_attrs.clone();
            merge_into(
                &mut scope_attrs,
                scope_logs.scope.as_ref().and_then(|s| s.attributes.as_deref()),
            );

            for record in &scope_logs.log_records {
                let mut merged = scope_attrs.clone();
                merge_into(&mut merged, record.attributes.as_deref());

                let timestamp = instant_or_now(
                    record.time_unix_nano.as_ref().and_then(JsonNumber::as_i64),
                    clock,
                );
                let projection = EVENT_COLUMNS.project(merged);
                let event_name = event_name(record, &projection);

                rows.push(EventRow {
                    timestamp,
                    identity: projection.identity(),
                    event_name,
                    prompt: projection.text("prompt"),
                    prompt_length: projection.integer("prompt_length"),
                    tool_name: projection.text("tool_name"),
                    success: projection.text("success"),
                    duration_ms: projection.integer("duration_ms"),
                    error: projection.text("error"),
                    decision: projection.text("decision"),
                    source: projection.text("source"),
                    tool_parameters: projection.text("tool_parameters"),
                    model: projection.text("model"),
                    cost_usd: projection.real("cost_usd"),
                    input_tokens: projection.integer("input_tokens"),
                    output_tokens: projection.integer("output_tokens"),
                    cache_read_tokens: projection.integer("cache_read_tokens"),
                    cache_creation_tokens: projection.integer("cache_creation_tokens"),
                    status_code: projection.integer("status_code"),
                    attempt: projection.integer("attempt"),
                    custom_attributes: projection.residual_json(),
                });
            }
        }
    }

    rows
}

/// Body string, else the `event.name` attribute, else [`UNKNOWN_EVENT`].
/// Empty strings count as missing.
fn event_name(record: &LogRecord, projection: &Projection) -> String {
    record
        .body
        .as_ref()
        .and_then(|body| body.as_string())
        .map(str::to_string)
        .filter(|name| !name.is_empty())
        .or_else(|| projection.text("event_name").filter(|name| !name.is_empty()))
        .unwrap_or_else(|| UNKNOWN_EVENT.to_string())
}
