//! # Response Extraction
//!
//! Converts one opaque model response into an [`ExtractedRecord`]. The model's
//! output conventions vary wildly (a bare JSON object, a Responses-API
//! envelope, a chat-completions envelope, free text with an embedded JSON
//! blob, or "Key: value" lines), so extraction runs as a cascade of fallback
//! levels and never fails: undetermined fields hold the [`UNKNOWN`] sentinel.
//!
//! Levels, attempted in order until one recognizes at least one field:
//!
//! 1. Direct object extraction: exact key match on a JSON object response.
//! 2. Nested-content extraction: rebuild a text blob from the known envelope
//!    shapes and hand it to levels 3 and 4.
//! 3. Embedded-JSON extraction: parse the whole blob, then the widest `{...}`
//!    span inside it.
//! 4. Line-pattern extraction: split "Key: value" lines through a synonym
//!    table, later lines overriding earlier ones.

use crate::types::{ExtractedRecord, RawModelResponse, FIELD_NAMES, UNKNOWN};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

/// Extracts the canonical field record from a raw model response.
///
/// Pure transformation: identical inputs always produce identical records,
/// and the returned record is always fully populated.
pub fn extract_record(response: &RawModelResponse) -> ExtractedRecord {
    let mut record = ExtractedRecord::unknown();

    // Level 1: the response is already the object we asked the model for.
    if let RawModelResponse::Json(Value::Object(map)) = response {
        if extract_from_object(map, &mut record) > 0 {
            return record;
        }
    }

    // Level 2: reconstruct a text blob from the envelope.
    let text = match response {
        RawModelResponse::Json(value) => collect_response_text(value),
        RawModelResponse::Text(text) => text.clone(),
    };
    debug!(blob_len = text.len(), "Extraction candidate text assembled");

    // Level 3: the blob itself, or its widest brace span, may be JSON.
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text) {
        if extract_embedded_object(&map, &mut record) > 0 {
            return record;
        }
    }
    if let Some(span) = widest_json_object(&text) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(span) {
            if extract_embedded_object(&map, &mut record) > 0 {
                return record;
            }
        }
    }

    // Level 4: "Key: value" lines.
    extract_from_lines(&text, &mut record);
    record
}

/// Pulls canonical fields out of a JSON object by exact key match.
/// Returns how many fields were recognized.
fn extract_from_object(map: &Map<String, Value>, record: &mut ExtractedRecord) -> usize {
    let mut recognized = 0;
    for name in FIELD_NAMES {
        if let Some(value) = map.get(name).and_then(scalar_value) {
            record.set(name, value);
            recognized += 1;
        }
    }
    recognized
}

/// Level-3 variant of object extraction: when the top-level keys do not
/// match, the fields may sit one level down inside a single wrapper key.
fn extract_embedded_object(map: &Map<String, Value>, record: &mut ExtractedRecord) -> usize {
    let recognized = extract_from_object(map, record);
    if recognized > 0 {
        return recognized;
    }
    for value in map.values() {
        if let Value::Object(inner) = value {
            let recognized = extract_from_object(inner, record);
            if recognized > 0 {
                return recognized;
            }
        }
    }
    0
}

/// Normalizes a JSON value into a usable field string. Empty strings and the
/// sentinel itself count as undetermined. Arrays of scalars are joined with
/// `", "` since analogs frequently arrive as a list.
fn scalar_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };
    if text.is_empty() || text == UNKNOWN {
        None
    } else {
        Some(text)
    }
}

/// Rebuilds a single text blob from the closed set of envelope shapes this
/// system supports. Fragments are joined with newlines in encounter order;
/// an unrecognized shape falls back to its serialized form.
fn collect_response_text(value: &Value) -> String {
    if let Value::Object(map) = value {
        // Responses API convenience field.
        if let Some(Value::String(text)) = map.get("output_text") {
            return text.clone();
        }

        let envelope = map
            .get("output")
            .or_else(|| map.get("outputs"))
            .or_else(|| map.get("choices"));
        if let Some(Value::Array(entries)) = envelope {
            if let Some(Value::Object(first)) = entries.first() {
                let mut parts: Vec<&str> = Vec::new();

                // A `content` list of typed parts carrying text.
                if let Some(Value::Array(content)) = first.get("content") {
                    for part in content {
                        let Value::Object(part) = part else { continue };
                        if matches!(
                            part.get("type").and_then(Value::as_str),
                            Some("output_text") | Some("text")
                        ) {
                            if let Some(text) = part
                                .get("text")
                                .and_then(Value::as_str)
                                .or_else(|| part.get("content").and_then(Value::as_str))
                            {
                                parts.push(text);
                            }
                        }
                    }
                }

                // A chat-style `message.content`, either a string or a list
                // of `{text}` elements.
                if parts.is_empty() {
                    if let Some(Value::Object(message)) = first.get("message") {
                        match message.get("content") {
                            Some(Value::String(text)) => parts.push(text),
                            Some(Value::Array(elements)) => {
                                for element in elements {
                                    if let Some(text) = element.get("text").and_then(Value::as_str)
                                    {
                                        parts.push(text);
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                }

                // A flat `text` field on the first entry.
                if parts.is_empty() {
                    if let Some(text) = first.get("text").and_then(Value::as_str) {
                        parts.push(text);
                    }
                }

                if !parts.is_empty() {
                    return parts.join("\n");
                }
            }
        }
    }

    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Finds the widest `{...}` span in the text. The match must be greedy:
/// the models nest objects, so a non-greedy match would truncate at the
/// first closing brace.
fn widest_json_object(text: &str) -> Option<&str> {
    let re = Regex::new(r"\{[\s\S]*\}").ok()?;
    re.find(text).map(|m| m.as_str())
}

/// Mines "Key: value" lines. Within this level later lines override earlier
/// ones, but a value recognized by a more-structured level is kept unless it
/// is still the sentinel.
fn extract_from_lines(text: &str, record: &mut ExtractedRecord) -> usize {
    let mut written: Vec<&'static str> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((raw_key, raw_value)) = line.split_once(':') else {
            continue;
        };
        let Some(field) = canonical_field(raw_key) else {
            continue;
        };
        let value = raw_value.trim();
        if value.is_empty() || value == UNKNOWN {
            continue;
        }
        let determined_earlier =
            record.get(field).is_some_and(|v| v != UNKNOWN) && !written.contains(&field);
        if determined_earlier {
            continue;
        }
        record.set(field, value);
        if !written.contains(&field) {
            written.push(field);
        }
    }
    written.len()
}

/// Maps a free-form line key onto a canonical field name.
fn canonical_field(raw_key: &str) -> Option<&'static str> {
    let key = raw_key.trim().to_lowercase();
    if key.contains("catalog") && key.contains("number") {
        Some("catalog_number")
    } else if key.starts_with("description") {
        Some("description")
    } else if key.contains("manufacturer") || key.contains("maker") {
        Some("manufacturer")
    } else if key.contains("analog") {
        Some("analogs")
    } else if key.contains("machine type") {
        Some("machine_type")
    } else if key.contains("model") {
        Some("machine_model")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_field_synonyms() {
        assert_eq!(canonical_field("Catalog Number"), Some("catalog_number"));
        assert_eq!(canonical_field("catalogue number"), Some("catalog_number"));
        assert_eq!(canonical_field("Description (short)"), Some("description"));
        assert_eq!(canonical_field("Maker"), Some("manufacturer"));
        assert_eq!(canonical_field("Analogs"), Some("analogs"));
        assert_eq!(canonical_field("Machine Type"), Some("machine_type"));
        assert_eq!(canonical_field("Machine Model"), Some("machine_model"));
        assert_eq!(canonical_field("Model"), Some("machine_model"));
        assert_eq!(canonical_field("Notes"), None);
    }

    #[test]
    fn widest_span_is_greedy() {
        let text = r#"noise {"a": {"b": 1}} trailing {"c": 2} end"#;
        assert_eq!(
            widest_json_object(text),
            Some(r#"{"a": {"b": 1}} trailing {"c": 2}"#)
        );
    }
}
