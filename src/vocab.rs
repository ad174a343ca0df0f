//! Vocabulary definitions for EVI RO-Crates
//!
//! Type URIs from the Fairscape EVI extension of schema.org, the
//! well-known descriptor/root conventions, and the identifier scheme
//! used for minted ids.

/// Base namespace of the EVI vocabulary
pub const EVI_NS: &str = "https://w3id.org/EVI#";

/// EVI Dataset type
pub const DATASET_TYPE: &str = "https://w3id.org/EVI#Dataset";

/// EVI Software type
pub const SOFTWARE_TYPE: &str = "https://w3id.org/EVI#Software";

/// EVI Computation type
pub const COMPUTATION_TYPE: &str = "https://w3id.org/EVI#Computation";

/// EVI Sample type
pub const SAMPLE_TYPE: &str = "https://w3id.org/EVI#Sample";

/// EVI Experiment type
pub const EXPERIMENT_TYPE: &str = "https://w3id.org/EVI#Experiment";

/// EVI Instrument type
pub const INSTRUMENT_TYPE: &str = "https://w3id.org/EVI#Instrument";

/// EVI ROCrate type, carried by every crate root entity
pub const ROCRATE_TYPE: &str = "https://w3id.org/EVI#ROCrate";

/// Type used for generated evidence graph entities
pub const EVIDENCE_GRAPH_TYPE: &str = "EVI:EvidenceGraph";

/// Standard metadata descriptor filename (also its `@id` in the graph)
pub const METADATA_DESCRIPTOR_ID: &str = "ro-crate-metadata.json";

/// RO-Crate context URL for newly initialized crates
pub const ROCRATE_CONTEXT: &str = "https://w3id.org/ro/crate/1.1/context";

/// RO-Crate conformance URL written into the descriptor
pub const ROCRATE_CONFORMS_TO: &str = "https://w3id.org/ro/crate/1.1";

/// Name Assigning Authority Number for all minted ark ids
pub const NAAN: &str = "59852";

/// Relationship properties walked by the evidence traversal
pub const RELATIONSHIP_KEYS: [&str; 6] = [
    "generatedBy",
    "usedDataset",
    "usedSoftware",
    "usedSample",
    "usedInstrument",
    "hasPart",
];

/// Known organizations selectable when initializing a crate, with their
/// registered ark identifiers
pub const ORGANIZATIONS: [(&str, &str); 4] = [
    ("UVA", "ark:59852/organization-uva"),
    ("UCSB", "ark:59852/organization-ucsb"),
    ("Stanford", "ark:59852/organization-stanford"),
    ("USF", "ark:59852/organization-usf"),
];

/// Known projects selectable when initializing a crate
pub const PROJECTS: [(&str, &str); 3] = [
    ("CM4AI", "ark:59852/project-cm4ai"),
    ("Chorus", "ark:59852/project-chorus"),
    ("PreMo", "ark:59852/project-premo"),
];

/// Context for newly initialized crates: the RO-Crate 1.1 context plus the
/// EVI prefix mapping
pub fn default_context() -> serde_json::Value {
    serde_json::json!([ROCRATE_CONTEXT, { "EVI": EVI_NS }])
}

/// Look up an organization's ark id by name (case-insensitive)
pub fn organization_id(name: &str) -> Option<&'static str> {
    ORGANIZATIONS
        .iter()
        .find(|(org, _)| org.eq_ignore_ascii_case(name))
        .map(|(_, id)| *id)
}

/// Look up a project's ark id by name (case-insensitive)
pub fn project_id(name: &str) -> Option<&'static str> {
    PROJECTS
        .iter()
        .find(|(project, _)| project.eq_ignore_ascii_case(name))
        .map(|(_, id)| *id)
}
