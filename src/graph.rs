//! Graph container and root/reference resolution
//!
//! The graph container is the in-memory form of `ro-crate-metadata.json`:
//! the `@context` plus the ordered `@graph` entity sequence. Entities are
//! appended, never reordered or mutated in place.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;

use crate::entity::{display_string, extract_id, extract_types, LinkValue};
use crate::error::CrateError;
use crate::vocab::{METADATA_DESCRIPTOR_ID, ROCRATE_TYPE};

/// An RO-Crate metadata document: `@context` plus the `@graph` array
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphContainer {
    #[serde(rename = "@context", default)]
    pub context: Value,
    #[serde(rename = "@graph", default)]
    pub graph: Vec<Value>,
}

impl GraphContainer {
    /// Create an empty container with the given context
    pub fn new(context: Value) -> Self {
        GraphContainer {
            context,
            graph: Vec::new(),
        }
    }

    /// Parse a metadata document, validating structural invariants at the
    /// read boundary: non-descriptor `@id` values must be unique.
    pub fn from_document(document: Value) -> Result<Self, CrateError> {
        let container: GraphContainer = serde_json::from_value(document)?;

        let mut seen = HashSet::new();
        for entity in &container.graph {
            if is_metadata_descriptor(entity) {
                continue;
            }
            if let Some(id) = extract_id(entity) {
                if !seen.insert(id.to_string()) {
                    return Err(CrateError::InvalidStructure(format!(
                        "duplicate @id '{}' in @graph",
                        id
                    )));
                }
            }
        }

        Ok(container)
    }

    /// Serialize back to the JSON-LD document shape
    pub fn to_document(&self) -> Value {
        json!({
            "@context": self.context,
            "@graph": self.graph,
        })
    }

    /// Look up an entity by exact `@id`
    pub fn find_entity(&self, id: &str) -> Option<&Value> {
        find_entity(&self.graph, id)
    }

    /// Locate the crate's root entity (see [`find_root_entity`])
    pub fn root_entity(&self) -> Option<&Value> {
        find_root_entity(&self.graph)
    }

    /// Append an entity to the end of `@graph`
    pub fn append(&mut self, entity: Value) {
        self.graph.push(entity);
    }
}

/// Check if an entity is the metadata descriptor: `@id` is either the
/// literal `ro-crate-metadata.json` or JSON null
pub fn is_metadata_descriptor(entity: &Value) -> bool {
    match entity.get("@id") {
        Some(Value::Null) => true,
        Some(Value::String(id)) => id == METADATA_DESCRIPTOR_ID,
        _ => false,
    }
}

/// Look up an entity by exact `@id` within a graph slice
pub fn find_entity<'a>(graph: &'a [Value], id: &str) -> Option<&'a Value> {
    graph.iter().find(|e| extract_id(e) == Some(id))
}

/// Locate the crate's root entity.
///
/// The metadata descriptor's `about.@id` names the root. If the descriptor
/// is missing or its reference does not resolve, fall back to the first
/// entity typed `https://w3id.org/EVI#ROCrate`. A `None` result is a valid
/// outcome for callers, not an error.
pub fn find_root_entity(graph: &[Value]) -> Option<&Value> {
    let descriptor = graph.iter().find(|e| is_metadata_descriptor(e));

    if let Some(root_id) = descriptor
        .and_then(|d| d.get("about"))
        .and_then(|about| about.get("@id"))
        .and_then(Value::as_str)
    {
        if let Some(root) = find_entity(graph, root_id) {
            return Some(root);
        }
    }

    graph
        .iter()
        .find(|e| extract_types(e).iter().any(|t| t == ROCRATE_TYPE))
}

/// Resolve a property value to a displayable string.
///
/// Plain strings pass through unchanged. Reference objects are looked up in
/// the graph and rendered as the target's `name` (or `label`); a dangling
/// reference degrades to the raw `@id`. Anything else is stringified
/// defensively. Never fails.
pub fn resolve_link(value: &Value, graph: &[Value]) -> String {
    match LinkValue::parse(value) {
        Some(LinkValue::Text(s)) => s,
        Some(LinkValue::Reference(id)) => match find_entity(graph, &id) {
            Some(target) => target
                .get("name")
                .or_else(|| target.get("label"))
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or(id),
            None => id,
        },
        None => display_string(value),
    }
}
