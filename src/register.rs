//! Builders for initializing crates and registering provenance entities
//!
//! Each builder is a read-modify-write sequence over a crate's metadata
//! file: read the graph, append the new entity, link it from the root, and
//! write the document back atomically. Unlike the projections, builders are
//! fail-fast: any failure surfaces as an operation-prefixed error.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::entity::extract_id;
use crate::error::CrateError;
use crate::graph::GraphContainer;
use crate::storage::{copy_to_crate, read_crate, write_crate};
use crate::vocab::{
    default_context, organization_id, project_id, COMPUTATION_TYPE, DATASET_TYPE,
    METADATA_DESCRIPTOR_ID, NAAN, ROCRATE_CONFORMS_TO, ROCRATE_TYPE, SOFTWARE_TYPE,
};

/// Highest timestamp handed out so far, so ids minted within the same
/// second still come out distinct
static LAST_TIMESTAMP: Mutex<u64> = Mutex::new(0);

/// Lowercase a name and collapse whitespace runs into single hyphens
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

fn next_timestamp() -> u64 {
    let now: u64 = Utc::now()
        .format("%Y%m%d%H%M%S")
        .to_string()
        .parse()
        .unwrap_or(0);
    let mut last = LAST_TIMESTAMP.lock().unwrap_or_else(|p| p.into_inner());
    let ts = now.max(*last + 1);
    *last = ts;
    ts
}

/// Mint a fresh ark identifier: `ark:59852/<kind>-<slug>-<14-digit UTC
/// timestamp>`. Guaranteed unique within the process even when called
/// repeatedly in the same second.
pub fn mint_guid(kind: &str, name: &str) -> String {
    format!(
        "ark:{}/{}-{}-{:014}",
        NAAN,
        kind,
        slugify(name),
        next_timestamp()
    )
}

/// Split a comma-separated keyword string, trimming entries and dropping
/// empty ones
pub fn normalize_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn reference(id: &str) -> Value {
    json!({ "@id": id })
}

fn references(ids: &[String]) -> Value {
    Value::Array(ids.iter().map(|id| reference(id)).collect())
}

fn insert_optional(entity: &mut Map<String, Value>, key: &str, value: Option<&String>) {
    if let Some(v) = value {
        entity.insert(key.to_string(), json!(v));
    }
}

fn insert_references(entity: &mut Map<String, Value>, key: &str, ids: &[String]) {
    if !ids.is_empty() {
        entity.insert(key.to_string(), references(ids));
    }
}

/// Fields for registering a dataset
#[derive(Debug, Clone, Default)]
pub struct DatasetParams {
    pub name: String,
    pub author: String,
    pub version: String,
    pub date_published: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub data_format: String,
    pub url: Option<String>,
    pub schema: Option<String>,
    pub derived_from: Vec<String>,
    pub used_by: Vec<String>,
    pub associated_publication: Option<String>,
    pub additional_documentation: Option<String>,
    pub filepath: Option<String>,
    pub guid: Option<String>,
}

/// Fields for registering a software entity
#[derive(Debug, Clone, Default)]
pub struct SoftwareParams {
    pub name: String,
    pub author: String,
    pub version: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub file_format: String,
    pub url: Option<String>,
    pub date_modified: Option<String>,
    pub used_by_computation: Vec<String>,
    pub associated_publication: Option<String>,
    pub additional_documentation: Option<String>,
    pub filepath: Option<String>,
    pub guid: Option<String>,
}

/// Fields for registering a computation
#[derive(Debug, Clone, Default)]
pub struct ComputationParams {
    pub name: String,
    pub run_by: String,
    pub date_created: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub command: Option<String>,
    pub used_software: Vec<String>,
    pub used_dataset: Vec<String>,
    pub generated: Vec<String>,
    pub guid: Option<String>,
}

/// Fields for initializing a new crate
#[derive(Debug, Clone, Default)]
pub struct CrateInitParams {
    pub name: String,
    pub organization: Option<String>,
    pub project: Option<String>,
    pub description: String,
    pub keywords: Vec<String>,
    pub guid: Option<String>,
}

fn content_url(filepath: Option<&String>) -> Option<String> {
    filepath.map(|p| format!("file://{}", p))
}

fn build_dataset_entity(params: &DatasetParams) -> Value {
    let guid = params
        .guid
        .clone()
        .unwrap_or_else(|| mint_guid("dataset", &params.name));

    let mut entity = Map::new();
    entity.insert("@id".to_string(), json!(guid));
    entity.insert("@type".to_string(), json!(DATASET_TYPE));
    entity.insert("name".to_string(), json!(params.name));
    entity.insert("author".to_string(), json!(params.author));
    entity.insert("datePublished".to_string(), json!(params.date_published));
    entity.insert("version".to_string(), json!(params.version));
    entity.insert("description".to_string(), json!(params.description));
    entity.insert("keywords".to_string(), json!(params.keywords));
    entity.insert("format".to_string(), json!(params.data_format));
    insert_optional(&mut entity, "url", params.url.as_ref());
    if let Some(schema) = &params.schema {
        entity.insert("schema".to_string(), reference(schema));
    }
    insert_references(&mut entity, "derivedFrom", &params.derived_from);
    insert_references(&mut entity, "usedBy", &params.used_by);
    insert_optional(
        &mut entity,
        "associatedPublication",
        params.associated_publication.as_ref(),
    );
    insert_optional(
        &mut entity,
        "additionalDocumentation",
        params.additional_documentation.as_ref(),
    );
    if let Some(url) = content_url(params.filepath.as_ref()) {
        entity.insert("contentUrl".to_string(), json!(url));
    }
    Value::Object(entity)
}

fn build_software_entity(params: &SoftwareParams) -> Value {
    let guid = params
        .guid
        .clone()
        .unwrap_or_else(|| mint_guid("software", &params.name));

    let mut entity = Map::new();
    entity.insert("@id".to_string(), json!(guid));
    entity.insert("@type".to_string(), json!(SOFTWARE_TYPE));
    entity.insert("name".to_string(), json!(params.name));
    entity.insert("author".to_string(), json!(params.author));
    entity.insert("version".to_string(), json!(params.version));
    entity.insert("description".to_string(), json!(params.description));
    entity.insert("keywords".to_string(), json!(params.keywords));
    entity.insert("format".to_string(), json!(params.file_format));
    insert_optional(&mut entity, "url", params.url.as_ref());
    insert_optional(&mut entity, "dateModified", params.date_modified.as_ref());
    insert_references(&mut entity, "usedByComputation", &params.used_by_computation);
    insert_optional(
        &mut entity,
        "associatedPublication",
        params.associated_publication.as_ref(),
    );
    insert_optional(
        &mut entity,
        "additionalDocumentation",
        params.additional_documentation.as_ref(),
    );
    if let Some(url) = content_url(params.filepath.as_ref()) {
        entity.insert("contentUrl".to_string(), json!(url));
    }
    Value::Object(entity)
}

fn build_computation_entity(params: &ComputationParams) -> Value {
    let guid = params
        .guid
        .clone()
        .unwrap_or_else(|| mint_guid("computation", &params.name));

    let mut entity = Map::new();
    entity.insert("@id".to_string(), json!(guid));
    entity.insert("@type".to_string(), json!(COMPUTATION_TYPE));
    entity.insert("name".to_string(), json!(params.name));
    entity.insert("runBy".to_string(), json!(params.run_by));
    entity.insert("dateCreated".to_string(), json!(params.date_created));
    entity.insert("description".to_string(), json!(params.description));
    entity.insert("keywords".to_string(), json!(params.keywords));
    insert_optional(&mut entity, "command", params.command.as_ref());
    insert_references(&mut entity, "usedSoftware", &params.used_software);
    insert_references(&mut entity, "usedDataset", &params.used_dataset);
    insert_references(&mut entity, "generated", &params.generated);
    Value::Object(entity)
}

/// Add a reference to the newly registered entity on the root's `hasPart`
fn link_into_root(container: &mut GraphContainer, guid: &str) {
    let root_id = match container.root_entity().and_then(extract_id) {
        Some(id) => id.to_string(),
        None => return,
    };
    let root = container
        .graph
        .iter_mut()
        .find(|e| extract_id(e) == Some(root_id.as_str()));
    if let Some(root) = root {
        match root.get_mut("hasPart") {
            Some(Value::Array(parts)) => parts.push(reference(guid)),
            Some(existing) => {
                let previous = existing.take();
                *existing = json!([previous, reference(guid)]);
            }
            None => {
                if let Some(obj) = root.as_object_mut() {
                    obj.insert("hasPart".to_string(), json!([reference(guid)]));
                }
            }
        }
    }
}

fn append_entity(crate_path: &Path, entity: Value) -> Result<String, CrateError> {
    let guid = extract_id(&entity).unwrap_or_default().to_string();
    let mut container = read_crate(crate_path)?;
    link_into_root(&mut container, &guid);
    container.append(entity);
    write_crate(crate_path, &container)?;
    Ok(guid)
}

/// Register a dataset entity in an existing crate, returning its minted id
pub fn register_dataset(crate_path: &Path, params: &DatasetParams) -> Result<String, CrateError> {
    info!(name = %params.name, "registering dataset");
    append_entity(crate_path, build_dataset_entity(params))
        .map_err(|e| CrateError::register("registering dataset", e))
}

/// Register a software entity in an existing crate, returning its minted id
pub fn register_software(crate_path: &Path, params: &SoftwareParams) -> Result<String, CrateError> {
    info!(name = %params.name, "registering software");
    append_entity(crate_path, build_software_entity(params))
        .map_err(|e| CrateError::register("registering software", e))
}

/// Register a computation entity in an existing crate, returning its minted id
pub fn register_computation(
    crate_path: &Path,
    params: &ComputationParams,
) -> Result<String, CrateError> {
    info!(name = %params.name, "registering computation");
    append_entity(crate_path, build_computation_entity(params))
        .map_err(|e| CrateError::register("registering computation", e))
}

/// Copy a payload file into the crate directory, then register it as a
/// dataset with `contentUrl` pointing at the copied file
pub fn add_dataset(
    crate_dir: &Path,
    params: &DatasetParams,
    source: &Path,
) -> Result<String, CrateError> {
    let run = || -> Result<String, CrateError> {
        let destination = copy_to_crate(source, crate_dir)?;
        let mut params = params.clone();
        params.filepath = Some(destination.display().to_string());
        append_entity(crate_dir, build_dataset_entity(&params))
    };
    info!(name = %params.name, source = %source.display(), "adding dataset");
    run().map_err(|e| CrateError::register("adding dataset", e))
}

/// Copy a payload file into the crate directory, then register it as
/// software with `contentUrl` pointing at the copied file
pub fn add_software(
    crate_dir: &Path,
    params: &SoftwareParams,
    source: &Path,
) -> Result<String, CrateError> {
    let run = || -> Result<String, CrateError> {
        let destination = copy_to_crate(source, crate_dir)?;
        let mut params = params.clone();
        params.filepath = Some(destination.display().to_string());
        append_entity(crate_dir, build_software_entity(&params))
    };
    info!(name = %params.name, source = %source.display(), "adding software");
    run().map_err(|e| CrateError::register("adding software", e))
}

/// Initialize a new crate at the given directory, writing a fresh metadata
/// document with the descriptor and a typed root entity. Returns the root's
/// minted id.
pub fn rocrate_create(crate_dir: &Path, params: &CrateInitParams) -> Result<String, CrateError> {
    fs::create_dir_all(crate_dir)?;

    let guid = params
        .guid
        .clone()
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| mint_guid("rocrate", &params.name));

    let mut is_part_of = Vec::new();
    if let Some(org) = params.organization.as_deref().and_then(organization_id) {
        is_part_of.push(reference(org));
    }
    if let Some(project) = params.project.as_deref().and_then(project_id) {
        is_part_of.push(reference(project));
    }

    let descriptor = json!({
        "@id": METADATA_DESCRIPTOR_ID,
        "@type": "CreativeWork",
        "conformsTo": { "@id": ROCRATE_CONFORMS_TO },
        "about": { "@id": guid }
    });

    let mut root = Map::new();
    root.insert("@id".to_string(), json!(guid));
    root.insert("@type".to_string(), json!(["Dataset", ROCRATE_TYPE]));
    root.insert("name".to_string(), json!(params.name));
    root.insert("description".to_string(), json!(params.description));
    root.insert("keywords".to_string(), json!(params.keywords));
    if !is_part_of.is_empty() {
        root.insert("isPartOf".to_string(), Value::Array(is_part_of));
    }
    root.insert("hasPart".to_string(), json!([]));

    let mut container = GraphContainer::new(default_context());
    container.append(descriptor);
    container.append(Value::Object(root));
    write_crate(crate_dir, &container)?;

    info!(path = %crate_dir.display(), guid = %guid, "initialized crate");
    Ok(guid)
}

/// Initialize a crate in the current working directory
pub fn rocrate_init(params: &CrateInitParams) -> Result<String, CrateError> {
    let cwd = std::env::current_dir()?;
    rocrate_create(&cwd, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Category;
    use crate::views::determine_release_type;
    use tempfile::tempdir;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Cool Dataset"), "my-cool-dataset");
        assert_eq!(slugify("  spaced \t out  "), "spaced-out");
        assert_eq!(slugify("lower"), "lower");
    }

    #[test]
    fn test_normalize_keywords() {
        assert_eq!(
            normalize_keywords("cells, imaging , ,ai"),
            vec!["cells", "imaging", "ai"]
        );
        assert!(normalize_keywords("").is_empty());
        assert!(normalize_keywords(" , ,").is_empty());
    }

    #[test]
    fn test_mint_guid_format() {
        let guid = mint_guid("dataset", "My Data");
        let suffix = guid.rsplit('-').next().unwrap();
        assert!(guid.starts_with("ark:59852/dataset-my-data-"));
        assert_eq!(suffix.len(), 14);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_mint_guid_unique_within_same_second() {
        let a = mint_guid("dataset", "x");
        let b = mint_guid("dataset", "x");
        let c = mint_guid("dataset", "x");
        assert_ne!(a, b);
        assert_ne!(b, c);

        let ts = |guid: &str| guid.rsplit('-').next().unwrap().parse::<u64>().unwrap();
        assert!(ts(&a) < ts(&b));
        assert!(ts(&b) < ts(&c));
    }

    #[test]
    fn test_rocrate_create_shape() {
        let dir = tempdir().unwrap();
        let guid = rocrate_create(
            dir.path(),
            &CrateInitParams {
                name: "Test Crate".to_string(),
                organization: Some("UVA".to_string()),
                project: Some("CM4AI".to_string()),
                description: "d".to_string(),
                keywords: vec!["k".to_string()],
                guid: None,
            },
        )
        .unwrap();
        assert!(guid.starts_with("ark:59852/rocrate-test-crate-"));

        let container = read_crate(dir.path()).unwrap();
        assert_eq!(container.graph.len(), 2);
        let root = container.root_entity().unwrap();
        assert_eq!(root["@id"], guid.as_str());
        assert_eq!(root["name"], "Test Crate");
        assert_eq!(root["isPartOf"][0]["@id"], "ark:59852/organization-uva");
        assert_eq!(root["isPartOf"][1]["@id"], "ark:59852/project-cm4ai");

        let release = determine_release_type(&container.to_document());
        assert_eq!(release, Category::ROCrate);
    }

    #[test]
    fn test_register_dataset_appends_and_links() {
        let dir = tempdir().unwrap();
        rocrate_create(
            dir.path(),
            &CrateInitParams {
                name: "Parent".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        let params = DatasetParams {
            name: "Cell Counts".to_string(),
            author: "Alice".to_string(),
            version: "0.1".to_string(),
            date_published: "2024-01-01".to_string(),
            description: "counts".to_string(),
            keywords: vec!["cells".to_string()],
            data_format: "csv".to_string(),
            ..Default::default()
        };
        let guid = register_dataset(dir.path(), &params).unwrap();
        assert!(guid.starts_with("ark:59852/dataset-cell-counts-"));

        let container = read_crate(dir.path()).unwrap();
        assert_eq!(container.graph.len(), 3);
        let dataset = container.find_entity(&guid).unwrap();
        assert_eq!(dataset["@type"], "https://w3id.org/EVI#Dataset");
        assert_eq!(dataset["format"], "csv");

        let root = container.root_entity().unwrap();
        let parts = root["hasPart"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0]["@id"], guid.as_str());
    }

    #[test]
    fn test_register_computation_references() {
        let dir = tempdir().unwrap();
        rocrate_create(
            dir.path(),
            &CrateInitParams {
                name: "Parent".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        let params = ComputationParams {
            name: "Run 1".to_string(),
            run_by: "Bob".to_string(),
            date_created: "2024-03-03".to_string(),
            description: "analysis".to_string(),
            keywords: vec![],
            command: Some("python run.py".to_string()),
            used_dataset: vec!["ark:59852/dataset-a".to_string()],
            used_software: vec!["ark:59852/software-b".to_string()],
            generated: vec!["ark:59852/dataset-out".to_string()],
            guid: None,
        };
        let guid = register_computation(dir.path(), &params).unwrap();

        let container = read_crate(dir.path()).unwrap();
        let computation = container.find_entity(&guid).unwrap();
        assert_eq!(computation["usedDataset"][0]["@id"], "ark:59852/dataset-a");
        assert_eq!(computation["generated"][0]["@id"], "ark:59852/dataset-out");
        assert_eq!(computation["command"], "python run.py");
    }

    #[test]
    fn test_register_missing_crate_is_prefixed_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = register_dataset(
            &missing,
            &DatasetParams {
                name: "x".to_string(),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("Error registering dataset:"));
    }

    #[test]
    fn test_add_dataset_copies_payload() {
        let dir = tempdir().unwrap();
        let source_dir = tempdir().unwrap();
        rocrate_create(
            dir.path(),
            &CrateInitParams {
                name: "Parent".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        let source = source_dir.path().join("counts.csv");
        fs::write(&source, "a,b\n").unwrap();

        let guid = add_dataset(
            dir.path(),
            &DatasetParams {
                name: "Counts".to_string(),
                ..Default::default()
            },
            &source,
        )
        .unwrap();

        assert!(dir.path().join("counts.csv").is_file());
        let container = read_crate(dir.path()).unwrap();
        let dataset = container.find_entity(&guid).unwrap();
        let content_url = dataset["contentUrl"].as_str().unwrap();
        assert!(content_url.starts_with("file://"));
        assert!(content_url.ends_with("counts.csv"));
    }
}
