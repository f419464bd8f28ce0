//! Metric flattening: one row per (metric, data point)

use super::attributes::{merge_into, resolve, MergedAttributes};
use super::model::otlp_json::{DataPoint, ExportMetricsServiceRequest, JsonNumber, Metric};
use super::model::MetricRow;
use super::projection::METRIC_COLUMNS;
use crate::clock::{instant_or_now, Clock};

/// Flatten a metrics export into rows, in resource → scope → metric → point order.
///
/// Metrics without a `sum`, `gauge` or `histogram` family yield no rows.
pub fn flatten_metrics(request: &ExportMetricsServiceRequest, clock: &dyn Clock) -> Vec<MetricRow> {
    let mut rows = Vec::new();

    for resource_metrics in &request.resource_metrics {
        let resource_attrs = resolve([resource_metrics
            .resource
            .as_ref()
            .and_then(|r| r.attributes.as_deref())]);

        for scope_metrics in &resource_metrics.scope_metrics {
            let mut scope_attrs = resource_attrs.clone();
            merge_into(
                &mut scope_attrs,
                scope_metrics
                    .scope
                    .as_ref()
                    .and_then(|s| s.attributes.as_deref()),
            );

            for metric in &scope_metrics.metrics {
                let Some(points) = metric.data_points() else {
                    continue;
                };
                if metric.name.is_empty() {
                    tracing::warn!("Skipping {} data points of unnamed metric", points.len());
                    continue;
                }

                for point in points {
                    let mut merged = scope_attrs.clone();
                    merge_into(&mut merged, point.attributes.as_deref());
                    rows.push(build_row(metric, point, merged, clock));
                }
            }
        }
    }

    rows
}

fn build_row(
    metric: &Metric,
    point: &DataPoint,
    merged: MergedAttributes,
    clock: &dyn Clock,
) -> MetricRow {
    let timestamp = instant_or_now(
        point.time_unix_nano.as_ref().and_then(JsonNumber::as_i64),
        clock,
    );
    let projection = METRIC_COLUMNS.project(merged);

    MetricRow {
        timestamp,
        identity: projection.identity(),
        metric_name: metric.name.clone(),
        metric_value: point.value(),
        metric_unit: metric.unit.clone(),
        model: projection.text("model"),
        metric_type: projection.text("type"),
        tool: projection.text("tool"),
        decision: projection.text("decision"),
        language: projection.text("language"),
        custom_attributes: projection.residual_json(),
    }
}
