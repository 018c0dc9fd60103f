//! Query-by-example matching over JSON payloads.
//!
//! A prototype object is serialized and compared field by field against stored
//! payloads. Fields left at an "empty" value (`null`, `0`, `false`, `""`, `[]`,
//! `{}`) are wildcards; every populated field must match. Collections match by
//! containment: each populated element of the prototype's list must appear in
//! the candidate's list.

use serde_json::Value as JsonValue;

/// True if `value` leaves its field unconstrained.
pub fn is_wildcard(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Bool(b) => !b,
        JsonValue::Number(n) => n.as_f64() == Some(0.0),
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        JsonValue::Object(fields) => fields.values().all(is_wildcard),
    }
}

/// Whether `candidate` matches every populated field of `example`.
pub fn matches_example(example: &JsonValue, candidate: &JsonValue) -> bool {
    if is_wildcard(example) {
        return true;
    }

    match (example, candidate) {
        (JsonValue::Object(wanted), JsonValue::Object(actual)) => wanted
            .iter()
            .filter(|(_, v)| !is_wildcard(v))
            .all(|(k, v)| actual.get(k).is_some_and(|a| matches_example(v, a))),
        (JsonValue::Array(wanted), JsonValue::Array(actual)) => wanted
            .iter()
            .filter(|v| !is_wildcard(v))
            .all(|v| actual.iter().any(|a| matches_example(v, a))),
        _ => example == candidate,
    }
}
