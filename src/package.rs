//! Zip packaging for crate directories
//!
//! A packaged crate is the crate directory zipped with relative paths, the
//! metadata file included like any other entry. Reading goes the other
//! way: the metadata document is parsed straight out of an archive without
//! extracting it.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::CrateError;
use crate::graph::GraphContainer;
use crate::vocab::METADATA_DESCRIPTOR_ID;

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), CrateError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// Package a crate directory into a zip archive at `output`. Entry names
/// are relative to the crate directory, with forward slashes. Returns the
/// number of files written.
pub fn package_crate(crate_dir: &Path, output: &Path) -> Result<u64, CrateError> {
    if !crate_dir.is_dir() {
        return Err(CrateError::InvalidPath(crate_dir.to_path_buf()));
    }

    let mut files = Vec::new();
    collect_files(crate_dir, &mut files)?;
    files.sort();

    let mut writer = ZipWriter::new(File::create(output)?);
    let options = SimpleFileOptions::default();
    let mut count = 0u64;

    for path in files {
        // the archive itself may sit inside the directory being packaged
        if path == output {
            continue;
        }
        let relative = path
            .strip_prefix(crate_dir)
            .map_err(|_| CrateError::InvalidPath(path.clone()))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        debug!(entry = %name, "adding archive entry");
        writer.start_file(name.as_str(), options)?;
        let mut source = File::open(&path)?;
        io::copy(&mut source, &mut writer)?;
        count += 1;
    }

    writer.finish()?;
    info!(output = %output.display(), files = count, "packaged crate");
    Ok(count)
}

/// Locate the metadata entry in an archive: the shallowest entry named
/// `ro-crate-metadata.json` (or a `-ro-crate-metadata.json` variant)
fn find_metadata_entry(archive: &mut ZipArchive<File>) -> Option<String> {
    let mut best: Option<String> = None;
    for name in archive.file_names() {
        let file_name = name.rsplit('/').next().unwrap_or(name);
        if file_name != METADATA_DESCRIPTOR_ID
            && !file_name.ends_with("-ro-crate-metadata.json")
        {
            continue;
        }
        let depth = name.matches('/').count();
        let best_depth = best.as_deref().map(|b| b.matches('/').count());
        if best_depth.map_or(true, |d| depth < d) {
            best = Some(name.to_string());
        }
    }
    best
}

/// Read crate metadata out of a packaged crate without extracting it
pub fn read_crate_from_zip(path: &Path) -> Result<GraphContainer, CrateError> {
    let file = File::open(path).map_err(|e| CrateError::LoadError {
        path: path.display().to_string(),
        reason: format!("Failed to open zip file: {}", e),
    })?;
    let mut archive = ZipArchive::new(file).map_err(|e| CrateError::LoadError {
        path: path.display().to_string(),
        reason: format!("Failed to read zip archive: {}", e),
    })?;

    let entry_name = find_metadata_entry(&mut archive).ok_or_else(|| CrateError::LoadError {
        path: path.display().to_string(),
        reason: "no ro-crate-metadata.json found in archive".to_string(),
    })?;

    let mut content = String::new();
    archive
        .by_name(&entry_name)
        .map_err(|e| CrateError::LoadError {
            path: path.display().to_string(),
            reason: format!("Failed to read archive entry {}: {}", entry_name, e),
        })?
        .read_to_string(&mut content)?;

    let document: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| CrateError::LoadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    GraphContainer::from_document(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::{rocrate_create, CrateInitParams};
    use tempfile::tempdir;

    #[test]
    fn test_package_and_read_back() {
        let crate_dir = tempdir().unwrap();
        let out_dir = tempdir().unwrap();
        rocrate_create(
            crate_dir.path(),
            &CrateInitParams {
                name: "Packaged".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        fs::write(crate_dir.path().join("data.csv"), "a,b\n").unwrap();
        fs::create_dir(crate_dir.path().join("nested")).unwrap();
        fs::write(crate_dir.path().join("nested/more.txt"), "x").unwrap();

        let archive_path = out_dir.path().join("crate.zip");
        let count = package_crate(crate_dir.path(), &archive_path).unwrap();
        assert_eq!(count, 3);

        let container = read_crate_from_zip(&archive_path).unwrap();
        assert_eq!(container.root_entity().unwrap()["name"], "Packaged");
    }

    #[test]
    fn test_package_missing_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = package_crate(&missing, &dir.path().join("out.zip")).unwrap_err();
        assert!(matches!(err, CrateError::InvalidPath(_)));
    }

    #[test]
    fn test_read_zip_without_metadata() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("empty.zip");
        let mut writer = ZipWriter::new(File::create(&archive_path).unwrap());
        writer
            .start_file("readme.txt", SimpleFileOptions::default())
            .unwrap();
        writer.finish().unwrap();

        let err = read_crate_from_zip(&archive_path).unwrap_err();
        assert!(matches!(err, CrateError::LoadError { .. }));
    }

    #[test]
    fn test_read_zip_prefers_shallowest_metadata() {
        let crate_dir = tempdir().unwrap();
        let out_dir = tempdir().unwrap();
        rocrate_create(
            crate_dir.path(),
            &CrateInitParams {
                name: "Top".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        let sub = crate_dir.path().join("subcrate");
        rocrate_create(
            &sub,
            &CrateInitParams {
                name: "Sub".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        let archive_path = out_dir.path().join("crate.zip");
        package_crate(crate_dir.path(), &archive_path).unwrap();

        let container = read_crate_from_zip(&archive_path).unwrap();
        assert_eq!(container.root_entity().unwrap()["name"], "Top");
    }
}
