//! Utility functions for value normalization and conversion

use std::collections::HashMap;

use stratus_core::resource::Value;

/// Normalize an Azure region (e.g., "West Europe" -> "westeurope")
pub fn normalize_location(s: &str) -> String {
    s.replace(' ', "").to_lowercase()
}

/// Schema equivalence for location attributes: "West Europe" equals "westeurope"
pub fn location_equivalent(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(a), Value::String(b)) => normalize_location(a) == normalize_location(b),
        _ => false,
    }
}

/// Case-insensitive equivalence for string attributes the API re-cases
pub fn ignore_case_equivalent(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(a), Value::String(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

/// Convert configuration tags into the ARM `tags` object
pub fn expand_tags(tags: &HashMap<String, String>) -> serde_json::Value {
    serde_json::Value::Object(
        tags.iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect(),
    )
}

/// Convert an ARM `tags` object into configuration tags; non-string values are skipped
pub fn flatten_tags(tags: Option<&serde_json::Value>) -> HashMap<String, String> {
    tags.and_then(|t| t.as_object())
        .map(|object| {
            object
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}
