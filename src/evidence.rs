//! Provenance evidence: support traversal and evidence graph generation
//!
//! Two views of the same relationship structure. [`collect_support`] walks
//! outward from one entity and buckets everything reachable through the
//! provenance keys by category. [`generate_evidence_graphs`] materializes a
//! per-entity `EVI:EvidenceGraph` entity with the provenance chain expanded
//! inline, mirroring what downstream repositories expect to ingest.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::classify::{classify, Category};
use crate::entity::{as_sequence, extract_id, extract_types, string_property, LinkValue};
use crate::graph::{find_entity, is_metadata_descriptor, GraphContainer};
use crate::vocab::{COMPUTATION_TYPE, EVIDENCE_GRAPH_TYPE, RELATIONSHIP_KEYS};

/// Keys expanded inline when materializing an evidence graph
const EXPAND_KEYS: [&str; 3] = ["generatedBy", "usedDataset", "usedSoftware"];

/// One entity reached by the support traversal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportRecord {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type", skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Entities supporting a node, bucketed by category
#[derive(Debug, Clone, Default, Serialize)]
pub struct SupportBuckets {
    pub datasets: Vec<SupportRecord>,
    pub software: Vec<SupportRecord>,
    pub computations: Vec<SupportRecord>,
    pub samples: Vec<SupportRecord>,
    pub experiments: Vec<SupportRecord>,
    pub instruments: Vec<SupportRecord>,
}

impl SupportBuckets {
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
            && self.software.is_empty()
            && self.computations.is_empty()
            && self.samples.is_empty()
            && self.experiments.is_empty()
            && self.instruments.is_empty()
    }
}

/// Collect every entity transitively reachable from `node` through the
/// provenance relationship keys, deduplicated by `@id`. Returns `None` when
/// nothing is reachable, so callers can distinguish "no evidence" from
/// empty buckets.
pub fn collect_support(node: &Value, graph: &[Value]) -> Option<SupportBuckets> {
    let mut buckets = SupportBuckets::default();
    let mut seen = HashSet::new();
    if let Some(id) = extract_id(node) {
        seen.insert(id.to_string());
    }
    walk_support(node, graph, &mut seen, &mut buckets);

    if buckets.is_empty() {
        None
    } else {
        Some(buckets)
    }
}

fn walk_support(
    node: &Value,
    graph: &[Value],
    seen: &mut HashSet<String>,
    buckets: &mut SupportBuckets,
) {
    for key in RELATIONSHIP_KEYS {
        for value in as_sequence(node.get(key)) {
            let id = match LinkValue::parse(value) {
                Some(LinkValue::Text(id)) | Some(LinkValue::Reference(id)) => id,
                None => continue,
            };
            if !seen.insert(id.clone()) {
                continue;
            }
            let entity = match find_entity(graph, &id) {
                Some(entity) => entity,
                None => continue,
            };

            let record = SupportRecord {
                id,
                entity_type: extract_types(entity).into_iter().next(),
                name: string_property(entity, "name").map(String::from),
                description: string_property(entity, "description").map(String::from),
            };
            match classify(entity) {
                Category::Dataset => buckets.datasets.push(record),
                Category::Software => buckets.software.push(record),
                Category::Computation => buckets.computations.push(record),
                Category::Sample => buckets.samples.push(record),
                Category::Experiment => buckets.experiments.push(record),
                Category::Instrument => buckets.instruments.push(record),
                _ => {}
            }
            walk_support(entity, graph, seen, buckets);
        }
    }
}

/// Leading `ark:<naan>` of an id, or the default authority when the id is
/// not in ark form
fn ark_prefix(id: &str) -> &str {
    if let Some(pos) = id.find('/') {
        let prefix = &id[..pos];
        if let Some(naan) = prefix.strip_prefix("ark:") {
            if !naan.is_empty() && naan.chars().all(|c| c.is_ascii_digit()) {
                return prefix;
            }
        }
    }
    "ark:59852"
}

/// Evidence graph id for an entity: same ark authority, `evidence-graph-`
/// prefixed base name
fn evidence_graph_id(entity_id: &str) -> String {
    let prefix = ark_prefix(entity_id);
    let base = entity_id
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(entity_id);
    format!("{}/evidence-graph-{}", prefix, base)
}

fn reference_id(value: &Value) -> Option<String> {
    match LinkValue::parse(value) {
        Some(LinkValue::Text(id)) | Some(LinkValue::Reference(id)) => Some(id),
        None => None,
    }
}

/// Recursively inline referenced entities. Each sibling list shares one
/// visited set; nested expansions get their own copy, so an id may appear
/// expanded on one branch and as a bare reference on another. A revisited
/// or unresolvable id degrades to a `{"@id": ...}` stub, which is what
/// terminates cycles.
fn expand_references(
    index: &HashMap<String, Value>,
    refs: &[Value],
    visited: &mut HashSet<String>,
) -> Vec<Value> {
    refs.iter()
        .map(|reference| {
            let id = match reference_id(reference) {
                Some(id) => id,
                None => return reference.clone(),
            };
            if !visited.insert(id.clone()) {
                return json!({ "@id": id });
            }
            let mut expanded = match index.get(&id) {
                Some(entity) => entity.clone(),
                None => return json!({ "@id": id }),
            };

            for key in EXPAND_KEYS {
                let nested: Vec<Value> = as_sequence(expanded.get(key))
                    .into_iter()
                    .cloned()
                    .collect();
                if nested.is_empty() {
                    continue;
                }
                let mut branch = visited.clone();
                let inlined = expand_references(index, &nested, &mut branch);
                if let Some(obj) = expanded.as_object_mut() {
                    obj.insert(key.to_string(), Value::Array(inlined));
                }
            }
            expanded
        })
        .collect()
}

/// Generate an evidence graph entity for every member entity in the crate.
///
/// Datasets named in a computation's `generated` list first get a
/// `generatedBy` back-reference if they lack one. Each entity (the metadata
/// descriptor excluded) then gets a companion `EVI:EvidenceGraph` entity
/// with its provenance chain expanded inline and a `hasEvidenceGraph` link
/// pointing at it. The evidence graph entities are appended to `@graph`.
pub fn generate_evidence_graphs(container: &mut GraphContainer) {
    // derive generatedBy back-references from computations
    let mut back_references: Vec<(String, String)> = Vec::new();
    for entity in &container.graph {
        let is_computation = extract_types(entity).iter().any(|t| t == COMPUTATION_TYPE);
        if !is_computation {
            continue;
        }
        let computation_id = match extract_id(entity) {
            Some(id) => id.to_string(),
            None => continue,
        };
        for generated in as_sequence(entity.get("generated")) {
            if let Some(dataset_id) = reference_id(generated) {
                back_references.push((dataset_id, computation_id.clone()));
            }
        }
    }
    for (dataset_id, computation_id) in back_references {
        let target = container
            .graph
            .iter_mut()
            .find(|e| extract_id(e) == Some(dataset_id.as_str()));
        if let Some(target) = target {
            if target.get("generatedBy").is_none() {
                if let Some(obj) = target.as_object_mut() {
                    obj.insert("generatedBy".to_string(), json!({ "@id": computation_id }));
                }
            }
        }
    }

    let index: HashMap<String, Value> = container
        .graph
        .iter()
        .filter_map(|e| extract_id(e).map(|id| (id.to_string(), e.clone())))
        .collect();

    let mut evidence_graphs = Vec::new();
    for entity in container.graph.iter_mut() {
        if is_metadata_descriptor(entity) {
            continue;
        }
        let entity_id = match extract_id(entity) {
            Some(id) => id.to_string(),
            None => continue,
        };
        let graph_id = evidence_graph_id(&entity_id);
        let display_name = string_property(entity, "name")
            .unwrap_or(&entity_id)
            .to_string();

        let mut evidence = serde_json::Map::new();
        for key in EXPAND_KEYS {
            let refs: Vec<Value> = as_sequence(entity.get(key)).into_iter().cloned().collect();
            if refs.is_empty() {
                continue;
            }
            let mut visited = HashSet::new();
            visited.insert(entity_id.clone());
            evidence.insert(
                key.to_string(),
                Value::Array(expand_references(&index, &refs, &mut visited)),
            );
        }

        evidence_graphs.push(json!({
            "@id": graph_id,
            "@type": EVIDENCE_GRAPH_TYPE,
            "name": format!("Evidence Graph: {}", entity_id),
            "description": format!("Evidence graph for {}", display_name),
            "evidence": Value::Object(evidence),
        }));

        if let Some(obj) = entity.as_object_mut() {
            obj.insert("hasEvidenceGraph".to_string(), json!(graph_id));
        }
    }

    debug!(count = evidence_graphs.len(), "generated evidence graphs");
    container.graph.extend(evidence_graphs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provenance_graph() -> Vec<Value> {
        vec![
            json!({
                "@id": "ark:59852/dataset-out",
                "@type": "https://w3id.org/EVI#Dataset",
                "name": "Output",
                "generatedBy": {"@id": "ark:59852/computation-run"}
            }),
            json!({
                "@id": "ark:59852/computation-run",
                "@type": "https://w3id.org/EVI#Computation",
                "name": "Run",
                "usedDataset": [{"@id": "ark:59852/dataset-in"}],
                "usedSoftware": [{"@id": "ark:59852/software-tool"}]
            }),
            json!({
                "@id": "ark:59852/dataset-in",
                "@type": "https://w3id.org/EVI#Dataset",
                "name": "Input"
            }),
            json!({
                "@id": "ark:59852/software-tool",
                "@type": "https://w3id.org/EVI#Software",
                "name": "Tool"
            }),
        ]
    }

    #[test]
    fn test_collect_support_buckets() {
        let graph = provenance_graph();
        let buckets = collect_support(&graph[0], &graph).unwrap();
        assert_eq!(buckets.computations.len(), 1);
        assert_eq!(buckets.datasets.len(), 1);
        assert_eq!(buckets.datasets[0].name.as_deref(), Some("Input"));
        assert_eq!(buckets.software.len(), 1);
        assert!(buckets.samples.is_empty());
    }

    #[test]
    fn test_collect_support_none_when_isolated() {
        let graph = provenance_graph();
        assert!(collect_support(&graph[3], &graph).is_none());
    }

    #[test]
    fn test_collect_support_terminates_on_cycle() {
        let graph = vec![
            json!({
                "@id": "ark:a",
                "@type": "https://w3id.org/EVI#Dataset",
                "generatedBy": {"@id": "ark:b"}
            }),
            json!({
                "@id": "ark:b",
                "@type": "https://w3id.org/EVI#Computation",
                "usedDataset": [{"@id": "ark:a"}]
            }),
        ];
        let buckets = collect_support(&graph[0], &graph).unwrap();
        // the cycle back to ark:a is not revisited
        assert_eq!(buckets.computations.len(), 1);
        assert!(buckets.datasets.is_empty());
    }

    #[test]
    fn test_collect_support_skips_dangling_references() {
        let graph = vec![json!({
            "@id": "ark:a",
            "@type": "https://w3id.org/EVI#Dataset",
            "generatedBy": {"@id": "ark:nowhere"}
        })];
        assert!(collect_support(&graph[0], &graph).is_none());
    }

    #[test]
    fn test_evidence_graph_id() {
        assert_eq!(
            evidence_graph_id("ark:59852/dataset-out"),
            "ark:59852/evidence-graph-dataset-out"
        );
        assert_eq!(
            evidence_graph_id("ark:12345/thing"),
            "ark:12345/evidence-graph-thing"
        );
        assert_eq!(
            evidence_graph_id("plain-id"),
            "ark:59852/evidence-graph-plain-id"
        );
    }

    #[test]
    fn test_generate_evidence_graphs() {
        let mut container = GraphContainer::new(json!("ctx"));
        for entity in provenance_graph() {
            container.append(entity);
        }
        generate_evidence_graphs(&mut container);

        // 4 member entities, 4 evidence graphs
        assert_eq!(container.graph.len(), 8);

        let output = container.find_entity("ark:59852/dataset-out").unwrap();
        assert_eq!(
            output["hasEvidenceGraph"],
            "ark:59852/evidence-graph-dataset-out"
        );

        let evidence_graph = container
            .find_entity("ark:59852/evidence-graph-dataset-out")
            .unwrap();
        assert_eq!(evidence_graph["@type"], "EVI:EvidenceGraph");
        // the computation is inlined, with its own inputs inlined below it
        let generated_by = &evidence_graph["evidence"]["generatedBy"][0];
        assert_eq!(generated_by["@id"], "ark:59852/computation-run");
        assert_eq!(generated_by["usedDataset"][0]["name"], "Input");
        assert_eq!(generated_by["usedSoftware"][0]["name"], "Tool");
    }

    #[test]
    fn test_generate_adds_generated_by_back_reference() {
        let mut container = GraphContainer::new(json!("ctx"));
        container.append(json!({
            "@id": "ark:59852/computation-run",
            "@type": "https://w3id.org/EVI#Computation",
            "generated": [{"@id": "ark:59852/dataset-out"}]
        }));
        container.append(json!({
            "@id": "ark:59852/dataset-out",
            "@type": "https://w3id.org/EVI#Dataset"
        }));
        generate_evidence_graphs(&mut container);

        let dataset = container.find_entity("ark:59852/dataset-out").unwrap();
        assert_eq!(dataset["generatedBy"]["@id"], "ark:59852/computation-run");
    }

    #[test]
    fn test_generate_terminates_on_circular_references() {
        let mut container = GraphContainer::new(json!("ctx"));
        container.append(json!({
            "@id": "ark:a",
            "@type": "https://w3id.org/EVI#Dataset",
            "generatedBy": {"@id": "ark:b"}
        }));
        container.append(json!({
            "@id": "ark:b",
            "@type": "https://w3id.org/EVI#Computation",
            "usedDataset": [{"@id": "ark:a"}]
        }));
        generate_evidence_graphs(&mut container);

        let evidence_graph = container.find_entity("ark:59852/evidence-graph-a").unwrap();
        let computation = &evidence_graph["evidence"]["generatedBy"][0];
        assert_eq!(computation["@id"], "ark:b");
        // the cycle back to ark:a collapses into a bare reference
        assert_eq!(computation["usedDataset"][0], json!({"@id": "ark:a"}));
    }

    #[test]
    fn test_generate_skips_descriptor() {
        let mut container = GraphContainer::new(json!("ctx"));
        container.append(json!({
            "@id": "ro-crate-metadata.json",
            "@type": "CreativeWork",
            "about": {"@id": "ark:r"}
        }));
        container.append(json!({
            "@id": "ark:r",
            "@type": ["https://w3id.org/EVI#ROCrate"],
            "name": "Root"
        }));
        generate_evidence_graphs(&mut container);

        assert_eq!(container.graph.len(), 3);
        let descriptor = &container.graph[0];
        assert!(descriptor.get("hasEvidenceGraph").is_none());
    }
}
