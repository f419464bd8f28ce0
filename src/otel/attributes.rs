//! Attribute resolution: merging OTLP attribute bags into a single mapping

use std::collections::HashMap;

use super::model::otlp_json::{AnyValue, KeyValue};
use crate::data::AttributeValue;

/// Attributes merged from one resource/scope/point chain
pub type MergedAttributes = HashMap<String, AttributeValue>;

/// Decode a tagged OTLP value, checking string, int, double, then bool.
///
/// A tag whose payload has the wrong JSON type is skipped. A value carrying
/// no usable tag decodes to the JSON text of the raw value object.
pub fn decode_value(value: &AnyValue) -> AttributeValue {
    if let Some(s) = value.as_string() {
        return AttributeValue::String(s.to_string());
    }
    if let Some(i) = value.as_int() {
        return AttributeValue::Int(i);
    }
    if let Some(d) = value.as_double() {
        return AttributeValue::Float(d);
    }
    if let Some(b) = value.as_bool() {
        return AttributeValue::Bool(b);
    }
    AttributeValue::String(value.to_json().to_string())
}

/// Merge one bag into `target`, overwriting existing keys
pub fn merge_into(target: &mut MergedAttributes, bag: Option<&[KeyValue]>) {
    for kv in bag.unwrap_or_default() {
        target.insert(kv.key.clone(), decode_value(&kv.value));
    }
}

/// Merge bags in order; later bags win. Absent bags are skipped.
pub fn resolve<'a, I>(bags: I) -> MergedAttributes
where
    I: IntoIterator<Item = Option<&'a [KeyValue]>>,
{
    let mut merged = MergedAttributes::new();
    for bag in bags {
        merge_into(&mut merged, bag);
    }
    merged
}
