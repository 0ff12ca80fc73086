use std::path::{Path, PathBuf};

use crate::model::Artifact;

/// One path-keyed entry of an [`ArchiveContainer`](super::ArchiveContainer).
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    path: String,
    artifact: Artifact,
    /// Location of the content in the work directory, if the entry has any.
    content_file: Option<PathBuf>,
}

impl ArchiveEntry {
    pub(crate) fn new(path: String, artifact: Artifact, content_file: Option<PathBuf>) -> Self {
        Self {
            path,
            artifact,
            content_file,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn has_content(&self) -> bool {
        self.content_file.is_some()
    }

    pub(crate) fn content_file(&self) -> Option<&Path> {
        self.content_file.as_deref()
    }

    pub(crate) fn set_artifact(&mut self, artifact: Artifact) {
        self.artifact = artifact;
    }

    pub(crate) fn set_content_file(&mut self, file: PathBuf) {
        self.content_file = Some(file);
    }
}
