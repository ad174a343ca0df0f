//! Filesystem access for crate metadata
//!
//! Locating, reading and atomically rewriting `ro-crate-metadata.json`.
//! Writes go through a temp file in the same directory followed by a
//! rename, so a crash mid-write never leaves a truncated document behind.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::CrateError;
use crate::graph::GraphContainer;
use crate::vocab::METADATA_DESCRIPTOR_ID;

/// Locate the metadata file inside a crate directory.
///
/// The standard name `ro-crate-metadata.json` wins; otherwise any file
/// ending in `-ro-crate-metadata.json` is accepted, since some producers
/// prefix the filename with the crate name.
pub fn find_metadata_file(crate_dir: &Path) -> Option<PathBuf> {
    let standard = crate_dir.join(METADATA_DESCRIPTOR_ID);
    if standard.is_file() {
        return Some(standard);
    }

    let entries = fs::read_dir(crate_dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with("-ro-crate-metadata.json") && path.is_file() {
                return Some(path);
            }
        }
    }
    None
}

/// Read and parse crate metadata.
///
/// `path` may be either the metadata file itself or a crate directory; in
/// the directory case the metadata file is located first. Any failure is
/// reported as a load error carrying the attempted path.
pub fn read_crate(path: &Path) -> Result<GraphContainer, CrateError> {
    let metadata_path = if path.is_dir() {
        find_metadata_file(path).ok_or_else(|| CrateError::LoadError {
            path: path.display().to_string(),
            reason: "no ro-crate-metadata.json found".to_string(),
        })?
    } else {
        path.to_path_buf()
    };

    debug!(path = %metadata_path.display(), "reading crate metadata");

    let content = fs::read_to_string(&metadata_path).map_err(|e| CrateError::LoadError {
        path: metadata_path.display().to_string(),
        reason: e.to_string(),
    })?;
    let document: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| CrateError::LoadError {
            path: metadata_path.display().to_string(),
            reason: e.to_string(),
        })?;

    GraphContainer::from_document(document)
}

/// Write crate metadata atomically: serialize to a temp file in the target
/// directory, then rename over the destination.
pub fn write_crate(path: &Path, container: &GraphContainer) -> Result<(), CrateError> {
    let metadata_path = if path.is_dir() {
        path.join(METADATA_DESCRIPTOR_ID)
    } else {
        path.to_path_buf()
    };
    let dir = metadata_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut temp, &container.to_document())?;
    temp.persist(&metadata_path)
        .map_err(|e| CrateError::Io(e.error))?;

    debug!(path = %metadata_path.display(), entities = container.graph.len(), "wrote crate metadata");
    Ok(())
}

/// Copy a payload file into a crate directory, keeping its filename.
/// Returns the destination path.
pub fn copy_to_crate(source: &Path, crate_dir: &Path) -> Result<PathBuf, CrateError> {
    let file_name = source
        .file_name()
        .ok_or_else(|| CrateError::InvalidPath(source.to_path_buf()))?;
    let destination = crate_dir.join(file_name);
    fs::copy(source, &destination)?;
    debug!(source = %source.display(), destination = %destination.display(), "copied file into crate");
    Ok(destination)
}
