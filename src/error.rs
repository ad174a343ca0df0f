//! Error types for EVI RO-Crate operations

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrateError {
    #[error("Failed to load crate from {path}: {reason}")]
    LoadError { path: String, reason: String },

    #[error("Invalid crate structure: {0}")]
    InvalidStructure(String),

    #[error("Error {operation}: {reason}")]
    Register { operation: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),
}

impl CrateError {
    /// Wrap any failure from a builder's read-modify-write sequence into the
    /// operation-prefixed form surfaced to end users, e.g.
    /// "Error registering dataset: <cause>"
    pub fn register(operation: &str, cause: impl std::fmt::Display) -> Self {
        CrateError::Register {
            operation: operation.to_string(),
            reason: cause.to_string(),
        }
    }
}
