//! EVI RO-Crate Toolkit
//!
//! This library builds, inspects and packages RO-Crates annotated with the
//! EVI provenance vocabulary. A crate is a directory holding an
//! `ro-crate-metadata.json` document: a JSON-LD `@context` plus a flat
//! `@graph` of entities (datasets, software, computations, samples,
//! experiments, instruments) linked by `@id` references.
//!
//! # Overview
//!
//! The toolkit splits into two halves with different error regimes:
//!
//! 1. Builders ([`register`]) initialize crates, mint ark identifiers and
//!    append provenance entities. They are fail-fast: any filesystem or
//!    structural failure surfaces as an operation-prefixed [`CrateError`].
//! 2. Projections ([`views`], [`classify`], [`evidence`]) derive
//!    display-ready records from a metadata document. They are total:
//!    missing or malformed fields are omitted, never errors.
//!
//! # Usage
//!
//! ```ignore
//! use evi_rocrate::register::{rocrate_create, register_dataset, CrateInitParams, DatasetParams};
//! use evi_rocrate::storage::read_crate;
//! use evi_rocrate::views::process_overview;
//!
//! let guid = rocrate_create(&crate_dir, &CrateInitParams {
//!     name: "My Crate".to_string(),
//!     ..Default::default()
//! })?;
//!
//! register_dataset(&crate_dir, &DatasetParams {
//!     name: "Cell Counts".to_string(),
//!     ..Default::default()
//! })?;
//!
//! let container = read_crate(&crate_dir)?;
//! let overview = process_overview(&container.to_document());
//! ```

pub mod classify;
pub mod entity;
pub mod error;
pub mod evidence;
pub mod graph;
pub mod package;
pub mod register;
pub mod storage;
pub mod views;
pub mod vocab;

// Re-export main types for convenience
pub use crate::classify::{classify, Category};
pub use crate::error::CrateError;
pub use crate::evidence::{collect_support, generate_evidence_graphs, SupportBuckets};
pub use crate::graph::{find_root_entity, resolve_link, GraphContainer};
pub use crate::package::{package_crate, read_crate_from_zip};
pub use crate::register::{
    add_dataset, add_software, mint_guid, register_computation, register_dataset,
    register_software, rocrate_create, rocrate_init, ComputationParams, CrateInitParams,
    DatasetParams, SoftwareParams,
};
pub use crate::storage::{find_metadata_file, read_crate, write_crate};
pub use crate::views::{
    categorize_entities, determine_release_type, process_composition, process_distribution,
    process_overview, process_use_cases,
};
