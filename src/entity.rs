//! Entity-level helpers for JSON-LD graph nodes
//!
//! An entity is a JSON object carrying `@id`, `@type` and domain
//! properties. Values are kept as `serde_json::Value` throughout; these
//! helpers give the rest of the crate a uniform, tolerant view of them.

use serde_json::Value;

/// A property value that is either literal text or a reference to another
/// entity in the graph.
///
/// JSON-LD encodes references as `{"@id": "..."}` objects; plain strings
/// are used interchangeably in hand-edited crates. Modeling the two cases
/// explicitly keeps resolution logic in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkValue {
    /// A literal string value, displayed as-is
    Text(String),
    /// A reference to the entity with this `@id`
    Reference(String),
}

impl LinkValue {
    /// Parse a JSON value into a link. Returns `None` for values that are
    /// neither strings nor reference objects (callers fall back to
    /// defensive stringification).
    pub fn parse(value: &Value) -> Option<LinkValue> {
        match value {
            Value::String(s) => Some(LinkValue::Text(s.clone())),
            Value::Object(obj) => obj
                .get("@id")
                .and_then(Value::as_str)
                .map(|id| LinkValue::Reference(id.to_string())),
            _ => None,
        }
    }
}

/// Extract @id from an entity
pub fn extract_id(entity: &Value) -> Option<&str> {
    entity.get("@id").and_then(Value::as_str)
}

/// Extract @type as a list of type names
///
/// `@type` may be a single string or an array of strings; anything else
/// yields an empty list.
pub fn extract_types(entity: &Value) -> Vec<String> {
    match entity.get("@type") {
        Some(Value::String(t)) => vec![t.clone()],
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        _ => vec![],
    }
}

/// Normalize a single-or-sequence property into a slice of values.
///
/// Missing properties and scalar values both come back as a vec so callers
/// never branch on the JSON shape.
pub fn as_sequence(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(arr)) => arr.iter().collect(),
        Some(Value::Null) | None => vec![],
        Some(v) => vec![v],
    }
}

/// Get a string property from an entity, ignoring non-string values
pub fn string_property<'a>(entity: &'a Value, key: &str) -> Option<&'a str> {
    entity.get(key).and_then(Value::as_str)
}

/// Defensive conversion of an arbitrary JSON value to display text.
///
/// Strings pass through unchanged; everything else is stringified rather
/// than rejected, since projections must render something for malformed
/// crates.
pub fn display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Last path segment of an id, used as a display-name fallback
/// (`ark:59852/dataset-cells-2024` -> `dataset-cells-2024`)
pub fn last_segment(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_types() {
        let single = json!({"@type": "Person"});
        assert_eq!(extract_types(&single), vec!["Person"]);

        let multiple = json!({"@type": ["Dataset", "https://w3id.org/EVI#ROCrate"]});
        assert_eq!(
            extract_types(&multiple),
            vec!["Dataset", "https://w3id.org/EVI#ROCrate"]
        );

        let missing = json!({"name": "no types"});
        assert!(extract_types(&missing).is_empty());
    }

    #[test]
    fn test_link_value_parse() {
        assert_eq!(
            LinkValue::parse(&json!("plain text")),
            Some(LinkValue::Text("plain text".to_string()))
        );
        assert_eq!(
            LinkValue::parse(&json!({"@id": "ark:59852/x"})),
            Some(LinkValue::Reference("ark:59852/x".to_string()))
        );
        assert_eq!(LinkValue::parse(&json!(42)), None);
        assert_eq!(LinkValue::parse(&json!({"name": "no id"})), None);
    }

    #[test]
    fn test_as_sequence() {
        let entity = json!({
            "hasPart": [{"@id": "ark:1"}, {"@id": "ark:2"}],
            "author": "Alice"
        });
        assert_eq!(as_sequence(entity.get("hasPart")).len(), 2);
        assert_eq!(as_sequence(entity.get("author")).len(), 1);
        assert!(as_sequence(entity.get("missing")).is_empty());
    }

    #[test]
    fn test_display_string() {
        assert_eq!(display_string(&json!("text")), "text");
        assert_eq!(display_string(&json!(12)), "12");
        assert_eq!(display_string(&json!(true)), "true");
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("ark:59852/dataset-cells"), "dataset-cells");
        assert_eq!(last_segment("no-slashes"), "no-slashes");
    }
}
