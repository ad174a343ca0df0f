//! Type-based entity classification
//!
//! Maps an entity's `@type` set to one semantic category. Classification
//! is pure and total: every entity, however malformed, yields exactly one
//! category.

use serde_json::Value;
use std::fmt;

use crate::entity::extract_types;
use crate::vocab::{
    COMPUTATION_TYPE, DATASET_TYPE, EXPERIMENT_TYPE, INSTRUMENT_TYPE, ROCRATE_TYPE, SAMPLE_TYPE,
    SOFTWARE_TYPE,
};

/// Semantic category derived from an entity's `@type`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    Dataset,
    Software,
    Computation,
    Sample,
    Experiment,
    Instrument,
    Schema,
    ROCrate,
    /// An ROCrate whose parts are themselves multiple ROCrates; only
    /// produced by release-type determination, never by [`classify`]
    Release,
    /// Unmatched entity, carrying the first raw type string for display
    /// (`"Unknown"` when `@type` is absent)
    Other(String),
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Dataset => write!(f, "dataset"),
            Category::Software => write!(f, "software"),
            Category::Computation => write!(f, "computation"),
            Category::Sample => write!(f, "sample"),
            Category::Experiment => write!(f, "experiment"),
            Category::Instrument => write!(f, "instrument"),
            Category::Schema => write!(f, "schema"),
            Category::ROCrate => write!(f, "rocrate"),
            Category::Release => write!(f, "release"),
            Category::Other(raw) => {
                let short = type_suffix(raw).to_ascii_lowercase();
                if short.is_empty() {
                    write!(f, "unknown")
                } else {
                    write!(f, "{}", short)
                }
            }
        }
    }
}

/// Last segment of a type URI or CURIE (`https://w3id.org/EVI#Dataset`,
/// `EVI:Dataset` and `Dataset` all yield `Dataset`)
fn type_suffix(type_name: &str) -> &str {
    type_name
        .rsplit(['#', '/', ':'])
        .next()
        .unwrap_or(type_name)
}

/// Check whether a single type string names the given EVI kind, matching
/// the full URI, the bare name, or any `#`/`/`/`:` suffixed form
fn matches_type(type_name: &str, uri: &str, short: &str) -> bool {
    type_name == uri || type_name == short || type_suffix(type_name) == short
}

fn is_dataset_type(t: &str) -> bool {
    matches_type(t, DATASET_TYPE, "Dataset")
}

fn is_software_type(t: &str) -> bool {
    matches_type(t, SOFTWARE_TYPE, "Software")
        || type_suffix(t) == "SoftwareApplication"
        || type_suffix(t) == "SoftwareSourceCode"
}

fn is_computation_type(t: &str) -> bool {
    matches_type(t, COMPUTATION_TYPE, "Computation")
        || type_suffix(t) == "ComputationalWorkflow"
        || type_suffix(t) == "HowTo"
}

fn is_schema_type(t: &str) -> bool {
    type_suffix(t) == "Schema"
}

/// Check whether a type string names the ROCrate type, in URI form or any
/// spelling containing "rocrate"
pub fn is_rocrate_type(t: &str) -> bool {
    t == ROCRATE_TYPE || t.to_ascii_lowercase().contains("rocrate")
}

/// Check if any of an entity's types names the ROCrate type
pub fn has_rocrate_type(entity: &Value) -> bool {
    extract_types(entity).iter().any(|t| is_rocrate_type(t))
}

/// Classify an entity by its `@type` set.
///
/// Types are tested against a fixed priority order (Dataset, Software,
/// Computation, Sample, Experiment, Instrument, Schema, ROCrate); an entity
/// matching several patterns takes the first matching category. Everything
/// else is `Other` with the first raw type string, or `Other("Unknown")`
/// when `@type` is absent.
pub fn classify(entity: &Value) -> Category {
    let types = extract_types(entity);
    if types.is_empty() {
        return Category::Other("Unknown".to_string());
    }

    let any = |pred: fn(&str) -> bool| types.iter().any(|t| pred(t));

    if any(is_dataset_type) {
        Category::Dataset
    } else if any(is_software_type) {
        Category::Software
    } else if any(is_computation_type) {
        Category::Computation
    } else if types.iter().any(|t| matches_type(t, SAMPLE_TYPE, "Sample")) {
        Category::Sample
    } else if types
        .iter()
        .any(|t| matches_type(t, EXPERIMENT_TYPE, "Experiment"))
    {
        Category::Experiment
    } else if types
        .iter()
        .any(|t| matches_type(t, INSTRUMENT_TYPE, "Instrument"))
    {
        Category::Instrument
    } else if any(is_schema_type) {
        Category::Schema
    } else if any(is_rocrate_type) {
        Category::ROCrate
    } else {
        Category::Other(types[0].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_dataset() {
        assert_eq!(
            classify(&json!({"@type": "https://w3id.org/EVI#Dataset"})),
            Category::Dataset
        );
        assert_eq!(classify(&json!({"@type": "Dataset"})), Category::Dataset);
        assert_eq!(
            classify(&json!({"@type": "EVI:Dataset"})),
            Category::Dataset
        );
    }

    #[test]
    fn test_classify_software_aliases() {
        assert_eq!(
            classify(&json!({"@type": "SoftwareSourceCode"})),
            Category::Software
        );
        assert_eq!(
            classify(&json!({"@type": "SoftwareApplication"})),
            Category::Software
        );
    }

    #[test]
    fn test_classify_computation_aliases() {
        assert_eq!(
            classify(&json!({"@type": "ComputationalWorkflow"})),
            Category::Computation
        );
        assert_eq!(classify(&json!({"@type": "HowTo"})), Category::Computation);
    }

    #[test]
    fn test_classify_priority_order() {
        // Dataset wins over ROCrate when both types are present
        let entity = json!({"@type": ["Dataset", "https://w3id.org/EVI#ROCrate"]});
        assert_eq!(classify(&entity), Category::Dataset);

        // Software wins over Sample
        let entity = json!({"@type": ["https://w3id.org/EVI#Sample", "Software"]});
        assert_eq!(classify(&entity), Category::Software);
    }

    #[test]
    fn test_classify_is_pure() {
        let entity = json!({"@type": "https://w3id.org/EVI#Experiment", "name": "e1"});
        assert_eq!(classify(&entity), classify(&entity));
        assert_eq!(classify(&entity), Category::Experiment);
    }

    #[test]
    fn test_classify_missing_type() {
        assert_eq!(
            classify(&json!({"name": "typeless"})),
            Category::Other("Unknown".to_string())
        );
    }

    #[test]
    fn test_classify_other_carries_raw_type() {
        assert_eq!(
            classify(&json!({"@type": "Person"})),
            Category::Other("Person".to_string())
        );
    }

    #[test]
    fn test_display_strings() {
        assert_eq!(Category::Dataset.to_string(), "dataset");
        assert_eq!(Category::ROCrate.to_string(), "rocrate");
        assert_eq!(Category::Release.to_string(), "release");
        assert_eq!(
            Category::Other("EvidenceGraph".to_string()).to_string(),
            "evidencegraph"
        );
        assert_eq!(
            Category::Other("https://schema.org/Person".to_string()).to_string(),
            "person"
        );
        assert_eq!(Category::Other(String::new()).to_string(), "unknown");
    }

    #[test]
    fn test_is_rocrate_type() {
        assert!(is_rocrate_type("https://w3id.org/EVI#ROCrate"));
        assert!(is_rocrate_type("EVI:ROCrate"));
        assert!(!is_rocrate_type("Dataset"));
    }
}
