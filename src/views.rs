//! View projections over crate metadata
//!
//! Pure functions deriving flat, display-ready records from a raw metadata
//! document. All projections are tolerant: absent or malformed fields are
//! omitted from the result, never errors. Consumers are presentation
//! layers that render these records as-is.

use serde::Serialize;
use serde_json::Value;

use crate::classify::{classify, has_rocrate_type, is_rocrate_type, Category};
use crate::entity::{
    as_sequence, display_string, extract_id, extract_types, last_segment, string_property,
    LinkValue,
};
use crate::graph::{find_entity, find_root_entity, is_metadata_descriptor, resolve_link};

/// The entity sequence of a metadata document, or empty when `@graph` is
/// absent or malformed
pub fn graph_of(metadata: &Value) -> &[Value] {
    metadata
        .get("@graph")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn optional_string(entity: &Value, key: &str) -> Option<String> {
    string_property(entity, key).map(String::from)
}

/// DOI extracted from `identifier` when it matches a DOI pattern
fn extract_doi(root: &Value) -> Option<String> {
    let identifier = string_property(root, "identifier")?;
    if identifier.starts_with("https://doi.org/") || identifier.starts_with("doi:") {
        Some(identifier.to_string())
    } else {
        None
    }
}

/// License as a string: either a literal or the `@id` of a license object
fn license_value(root: &Value) -> Option<String> {
    match root.get("license") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(obj)) => obj.get("@id").and_then(Value::as_str).map(String::from),
        _ => None,
    }
}

/// Author display string: `author` values joined with `"; "`, falling back
/// to link-resolved `creator` values joined with `", "`
fn authors_of(root: &Value, graph: &[Value]) -> Option<String> {
    if let Some(author) = root.get("author") {
        let joined = match author {
            Value::Array(arr) => arr
                .iter()
                .map(display_string)
                .collect::<Vec<_>>()
                .join("; "),
            other => display_string(other),
        };
        if !joined.is_empty() {
            return Some(joined);
        }
    }

    if let Some(creator) = root.get("creator") {
        let joined = as_sequence(Some(creator))
            .iter()
            .map(|c| resolve_link(c, graph))
            .collect::<Vec<_>>()
            .join(", ");
        if !joined.is_empty() {
            return Some(joined);
        }
    }

    None
}

/// Keywords normalized to a sequence: a single string becomes a one-element
/// list, arrays keep their string entries
fn keywords_of(entity: &Value) -> Vec<String> {
    match entity.get("keywords") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        _ => vec![],
    }
}

/// `associatedPublication` normalized to a sequence of display strings
fn related_publications_of(entity: &Value, graph: &[Value]) -> Vec<String> {
    as_sequence(entity.get("associatedPublication"))
        .iter()
        .map(|p| resolve_link(p, graph))
        .collect()
}

/// Pull a value out of the `additionalProperty` side table by exact name
fn additional_property(root: &Value, name: &str) -> Option<String> {
    root.get("additionalProperty")?
        .as_array()?
        .iter()
        .find(|p| string_property(p, "name") == Some(name))
        .and_then(|p| p.get("value"))
        .map(display_string)
}

/// Overview projection of a crate's root entity
#[derive(Debug, Clone, Default, Serialize)]
pub struct OverviewData {
    pub title: String,
    pub id_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_investigator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidentiality_level: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completeness: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_publications: Vec<String>,
}

/// Derive the overview record from a metadata document. Returns an empty
/// record when no root entity can be located.
pub fn process_overview(metadata: &Value) -> OverviewData {
    let graph = graph_of(metadata);
    let root = match find_root_entity(graph) {
        Some(root) => root,
        None => return OverviewData::default(),
    };

    let publisher = root.get("publisher").map(|p| resolve_link(p, graph));

    OverviewData {
        title: optional_string(root, "name").unwrap_or_else(|| "Untitled".to_string()),
        id_value: extract_id(root)
            .map(String::from)
            .unwrap_or_else(|| "N/A".to_string()),
        version: optional_string(root, "version"),
        doi: extract_doi(root),
        release_date: optional_string(root, "datePublished"),
        content_size: optional_string(root, "contentSize"),
        description: optional_string(root, "description"),
        authors: authors_of(root, graph),
        publisher,
        principal_investigator: optional_string(root, "principalInvestigator"),
        contact_email: optional_string(root, "contactEmail"),
        license_value: license_value(root),
        confidentiality_level: optional_string(root, "confidentialityLevel"),
        keywords: keywords_of(root),
        citation: optional_string(root, "citation"),
        human_subject: additional_property(root, "Human Subject"),
        funding: root.get("funder").map(|f| resolve_link(f, graph)),
        completeness: additional_property(root, "Completeness"),
        related_publications: related_publications_of(root, graph),
    }
}

/// Use-case projection, fed from the `additionalProperty` side table
#[derive(Debug, Clone, Default, Serialize)]
pub struct UseCasesData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intended_uses: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limitations: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prohibited_uses: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_plan: Option<String>,
}

pub fn process_use_cases(metadata: &Value) -> UseCasesData {
    let graph = graph_of(metadata);
    let root = match find_root_entity(graph) {
        Some(root) => root,
        None => return UseCasesData::default(),
    };

    UseCasesData {
        intended_uses: additional_property(root, "Intended Use")
            .or_else(|| optional_string(root, "usageInfo")),
        limitations: additional_property(root, "Limitations"),
        prohibited_uses: additional_property(root, "Prohibited Uses"),
        maintenance_plan: additional_property(root, "Maintenance Plan"),
    }
}

/// Distribution projection: where and under what terms the crate is hosted
#[derive(Debug, Clone, Default, Serialize)]
pub struct DistributionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

pub fn process_distribution(metadata: &Value) -> DistributionData {
    let graph = graph_of(metadata);
    let root = match find_root_entity(graph) {
        Some(root) => root,
        None => return DistributionData::default(),
    };

    DistributionData {
        publisher: root.get("publisher").map(|p| resolve_link(p, graph)),
        host: optional_string(root, "distributionHost"),
        license_value: license_value(root),
        doi: extract_doi(root),
        release_date: optional_string(root, "datePublished"),
        version: optional_string(root, "version"),
    }
}

/// Summary of one sub-crate referenced from the root's `hasPart`
#[derive(Debug, Clone, Serialize)]
pub struct SubcrateSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funder: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_publications: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

/// Composition projection: the sub-crates making up a release
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompositionData {
    pub subcrates: Vec<SubcrateSummary>,
}

/// Derive sub-crate summaries from the root's `hasPart` references.
/// References that do not resolve within the graph are silently dropped.
pub fn process_composition(metadata: &Value) -> CompositionData {
    let graph = graph_of(metadata);
    let root = match find_root_entity(graph) {
        Some(root) => root,
        None => return CompositionData::default(),
    };

    let subcrates = as_sequence(root.get("hasPart"))
        .iter()
        .filter_map(|part| match LinkValue::parse(part) {
            Some(LinkValue::Reference(id)) => find_entity(graph, &id),
            _ => None,
        })
        .map(|part| subcrate_summary(part, graph))
        .collect();

    CompositionData { subcrates }
}

fn subcrate_summary(part: &Value, graph: &[Value]) -> SubcrateSummary {
    let id = extract_id(part).unwrap_or_default().to_string();
    let name = optional_string(part, "name")
        .or_else(|| {
            let segment = last_segment(&id);
            if segment.is_empty() {
                None
            } else {
                Some(segment.to_string())
            }
        })
        .unwrap_or_else(|| id.clone());

    let metadata_path = optional_string(part, "ro-crate-metadata");
    let preview_url = metadata_path.as_deref().map(|path| {
        let base = path.rfind('/').map(|pos| &path[..pos]).unwrap_or("");
        format!("/data/{}/ro-crate-preview.html", base)
    });

    SubcrateSummary {
        id,
        name,
        description: optional_string(part, "description"),
        authors: authors_of(part, graph),
        date: optional_string(part, "datePublished"),
        size: optional_string(part, "contentSize"),
        doi: part.get("identifier").map(display_string),
        contact: optional_string(part, "contactEmail"),
        license: part.get("license").map(|l| resolve_link(l, graph)),
        keywords: keywords_of(part),
        funder: part.get("funder").map(|f| resolve_link(f, graph)),
        related_publications: related_publications_of(part, graph),
        metadata_path,
        preview_url,
    }
}

/// One entity row in a per-category listing
#[derive(Debug, Clone, Serialize)]
pub struct EntityItem {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub date: String,
    pub content_status: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
}

/// Per-category entity listings for a crate's member entities
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityLists {
    pub datasets: Vec<EntityItem>,
    pub software: Vec<EntityItem>,
    pub computations: Vec<EntityItem>,
    pub samples: Vec<EntityItem>,
    pub experiments: Vec<EntityItem>,
    pub instruments: Vec<EntityItem>,
    pub other: Vec<EntityItem>,
}

/// Bucket every member entity (root and descriptor excluded, nameless and
/// descriptionless entries skipped) by classified category
pub fn categorize_entities(metadata: &Value) -> EntityLists {
    let graph = graph_of(metadata);
    let root = match find_root_entity(graph) {
        Some(root) => root,
        None => return EntityLists::default(),
    };
    let root_id = extract_id(root).map(String::from);

    let mut lists = EntityLists::default();

    for entity in graph {
        if is_metadata_descriptor(entity) {
            continue;
        }
        if extract_id(entity).map(String::from) == root_id {
            continue;
        }
        if entity.get("name").is_none() && entity.get("description").is_none() {
            continue;
        }

        let id = extract_id(entity).unwrap_or_default().to_string();
        let name = optional_string(entity, "name")
            .unwrap_or_else(|| last_segment(&id).to_string());
        let description = optional_string(entity, "description").unwrap_or_default();
        let date = optional_string(entity, "datePublished")
            .or_else(|| optional_string(entity, "dateCreated"))
            .or_else(|| optional_string(entity, "dateModified"))
            .unwrap_or_default();

        let content_status = match string_property(entity, "contentUrl") {
            Some("Embargoed") => "Embargoed",
            Some(_) => "Download",
            None => "Available",
        }
        .to_string();

        let mut item = EntityItem {
            id,
            name,
            description,
            date,
            content_status,
            entity_type: None,
        };

        match classify(entity) {
            Category::Dataset => lists.datasets.push(item),
            Category::Software => lists.software.push(item),
            Category::Computation => lists.computations.push(item),
            Category::Sample => lists.samples.push(item),
            Category::Experiment => lists.experiments.push(item),
            Category::Instrument => lists.instruments.push(item),
            _ => {
                item.entity_type =
                    Some(extract_types(entity).into_iter().next().unwrap_or_else(|| {
                        "Unknown".to_string()
                    }));
                lists.other.push(item);
            }
        }
    }

    lists
}

/// Determine the release-level category of a metadata document.
///
/// A graph-less document (a bare entity with no `@graph`) is treated as its
/// own root. An ROCrate-typed root whose `hasPart` resolves to more than
/// one ROCrate-typed entity is a Release; with zero or one such part it is
/// a plain ROCrate. Non-ROCrate roots fall through to ordinary
/// classification.
pub fn determine_release_type(metadata: &Value) -> Category {
    let graph = graph_of(metadata);
    let has_graph = !graph.is_empty();

    let root = if has_graph {
        match find_root_entity(graph) {
            Some(root) => root,
            None => return Category::Other("Unknown".to_string()),
        }
    } else {
        metadata
    };

    let is_rocrate = extract_types(root).iter().any(|t| is_rocrate_type(t));

    if is_rocrate {
        let rocrate_parts = as_sequence(root.get("hasPart"))
            .iter()
            .filter_map(|part| match LinkValue::parse(part) {
                Some(LinkValue::Reference(id)) => find_entity(graph, &id),
                _ => None,
            })
            .filter(|part| has_rocrate_type(part))
            .count();

        if rocrate_parts > 1 {
            Category::Release
        } else {
            Category::ROCrate
        }
    } else {
        classify(root)
    }
}
