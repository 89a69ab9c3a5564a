// src/normalize.rs
//! Result normalizer: classifies a raw adapter payload into Success / Empty / Failure.
//!
//! Rules are structural only (key presence, emptiness), never semantic:
//! - an `"error"` key → Failure
//! - a `"message"` key, an empty sequence/mapping, or null → Empty
//! - a scalar, or a sequence holding one → Failure (malformed)
//! - anything else → Success, a single object becoming a one-element sequence

use serde_json::Value;

use crate::sources::SourceError;
use crate::types::{Item, SourceOutcome};

pub const ERROR_KEY: &str = "error";
pub const MESSAGE_KEY: &str = "message";

const NO_RESULTS: &str = "no results";
pub const MALFORMED: &str = "malformed response: expected mapping or sequence";

/// Normalize whatever an adapter produced, including its transport error.
pub fn normalize_result(raw: Result<Value, SourceError>) -> SourceOutcome {
    match raw {
        Ok(v) => normalize(v),
        Err(e) => SourceOutcome::Failure {
            error: e.to_string(),
        },
    }
}

pub fn normalize(raw: Value) -> SourceOutcome {
    match raw {
        Value::Null => empty(NO_RESULTS),
        Value::Object(map) => classify_object(map),
        Value::Array(items) => classify_sequence(items),
        _ => malformed(),
    }
}

fn classify_object(map: Item) -> SourceOutcome {
    if let Some(err) = map.get(ERROR_KEY) {
        return SourceOutcome::Failure {
            error: describe(err),
        };
    }
    if let Some(msg) = map.get(MESSAGE_KEY) {
        return empty(&describe(msg));
    }
    if map.is_empty() {
        return empty(NO_RESULTS);
    }
    SourceOutcome::Success { items: vec![map] }
}

fn classify_sequence(items: Vec<Value>) -> SourceOutcome {
    if items.is_empty() {
        return empty(NO_RESULTS);
    }

    // Any error-flagged element marks the whole payload as failed.
    if let Some(err) = items
        .iter()
        .filter_map(Value::as_object)
        .find_map(|m| m.get(ERROR_KEY))
    {
        return SourceOutcome::Failure {
            error: describe(err),
        };
    }

    // Items must be mappings; a stray string is usually an error page.
    if items.iter().any(|v| !matches!(v, Value::Object(_) | Value::Null)) {
        return malformed();
    }

    let mut out = Vec::with_capacity(items.len());
    let mut first_message: Option<String> = None;
    for v in items {
        match v {
            Value::Object(m) if m.contains_key(MESSAGE_KEY) => {
                if first_message.is_none() {
                    first_message = m.get(MESSAGE_KEY).map(describe);
                }
            }
            Value::Object(m) if m.is_empty() => {}
            Value::Object(m) => out.push(m),
            _ => {}
        }
    }

    if out.is_empty() {
        return empty(first_message.as_deref().unwrap_or(NO_RESULTS));
    }
    SourceOutcome::Success { items: out }
}

fn malformed() -> SourceOutcome {
    SourceOutcome::Failure {
        error: MALFORMED.to_string(),
    }
}

fn describe(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "unspecified".to_string(),
        other => other.to_string(),
    }
}

fn empty(reason: &str) -> SourceOutcome {
    SourceOutcome::Empty {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_key_is_failure_with_reason() {
        let out = normalize(json!({"error": "X"}));
        assert_eq!(out, SourceOutcome::Failure { error: "X".into() });
    }

    #[test]
    fn error_inside_sequence_is_failure() {
        let out = normalize(json!([{"error": "ArXiv search failed: boom"}]));
        assert!(matches!(out, SourceOutcome::Failure { ref error } if error.contains("boom")));
    }

    #[test]
    fn message_and_empties_are_empty() {
        assert!(matches!(normalize(json!([])), SourceOutcome::Empty { .. }));
        assert!(matches!(normalize(json!({})), SourceOutcome::Empty { .. }));
        assert!(matches!(normalize(Value::Null), SourceOutcome::Empty { .. }));
        let out = normalize(json!({"exists": false, "message": "No article"}));
        assert_eq!(
            out,
            SourceOutcome::Empty {
                reason: "No article".into()
            }
        );
        let out = normalize(json!([{"message": "No web results found"}]));
        assert_eq!(
            out,
            SourceOutcome::Empty {
                reason: "No web results found".into()
            }
        );
    }

    #[test]
    fn single_object_becomes_one_item() {
        let out = normalize(json!({"temperature_c": "12", "location": "Paris"}));
        match out {
            SourceOutcome::Success { items } => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0]["location"], "Paris");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn sequence_keeps_order_and_skips_nulls() {
        let out = normalize(json!([{"title": "a"}, null, {"title": "c"}]));
        match out {
            SourceOutcome::Success { items } => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0]["title"], "a");
                assert_eq!(items[1]["title"], "c");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn scalar_payloads_are_malformed() {
        let malformed = SourceOutcome::Failure {
            error: MALFORMED.into(),
        };
        assert_eq!(normalize(json!("rate limited")), malformed);
        assert_eq!(normalize(json!(42)), malformed);
        assert_eq!(normalize(json!(true)), malformed);
        assert_eq!(normalize(json!(["<html>oops</html>"])), malformed);
        assert_eq!(normalize(json!([{"title": "a"}, "b"])), malformed);
    }

    #[test]
    fn transport_error_is_failure() {
        let out = normalize_result(Err(SourceError::Status(503)));
        assert!(out.is_failure());
    }
}
