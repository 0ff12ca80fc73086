//! Sidecar metadata resources.
//!
//! Every content entry `<path>` in a container is accompanied by
//! `<path>.atom.json` holding the pretty-printed artifact record.

use crate::error::{IngestError, Result};
use crate::model::Artifact;

/// Suffix appended to an entry path to name its metadata resource.
pub const METADATA_SUFFIX: &str = ".atom.json";

pub fn metadata_path(path: &str) -> String {
    format!("{path}{METADATA_SUFFIX}")
}

pub fn is_metadata_path(path: &str) -> bool {
    path.ends_with(METADATA_SUFFIX)
}

/// Entry path a metadata resource belongs to.
pub fn entry_path(metadata_path: &str) -> Option<&str> {
    metadata_path.strip_suffix(METADATA_SUFFIX)
}

pub fn write_metadata(artifact: &Artifact) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(artifact)
        .map_err(|e| IngestError::metadata(format!("Failed to serialize '{}': {e}", artifact.name)))
}

pub fn read_metadata(path: &str, bytes: &[u8]) -> Result<Artifact> {
    serde_json::from_slice(bytes)
        .map_err(|e| IngestError::metadata(format!("Invalid metadata for '{path}': {e}")))
}
