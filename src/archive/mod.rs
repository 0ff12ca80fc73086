//! Zip archive container with per-entry sidecar metadata.
//!
//! ```text
//! bundle.zip
//! ├── schemas/orders.xsd
//! ├── schemas/orders.xsd.atom.json   ← Artifact record for the entry above
//! ├── docs/readme.txt
//! └── docs/readme.txt.atom.json
//! ```
//!
//! Entries are unpacked into a work directory owned by the container and
//! kept in physical (local header offset) order.

mod entry;
mod metadata;

use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tempfile::TempDir;
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{IngestError, Result};
use crate::model::Artifact;

pub use entry::ArchiveEntry;
pub use metadata::{
    METADATA_SUFFIX, entry_path, is_metadata_path, metadata_path, read_metadata, write_metadata,
};

/// Prefix of every work directory created by this crate.
const WORK_DIR_PREFIX: &str = "artificer-";

/// Create an exclusively owned work directory, under `root` when given.
pub(crate) fn work_dir(root: Option<&Path>) -> Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(WORK_DIR_PREFIX);
    let dir = match root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    };
    dir.map_err(|e| IngestError::resource("Failed to create work directory", e))
}

/// Check an entry path: relative, non-empty segments, no `..`.
pub fn validate_entry_path(path: &str) -> Result<()> {
    let invalid = |why: &str| Err(IngestError::InvalidEntry(format!("{path}: {why}")));
    if path.is_empty() {
        return invalid("empty path");
    }
    if path.starts_with('/') || path.contains('\\') || path.contains(':') {
        return invalid("path must be relative");
    }
    if path.split('/').any(|s| s.is_empty() || s == "." || s == "..") {
        return invalid("path contains an empty, '.' or '..' segment");
    }
    Ok(())
}

// ============================================================================
// ZIP HELPERS
// ============================================================================

/// A file in a zip table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
}

fn open_zip(bytes: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>> {
    ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| IngestError::archive(format!("Failed to open archive: {e}")))
}

/// Archive indices in local header offset order.
fn physical_order<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<usize>> {
    let mut offsets = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let file = archive
            .by_index_raw(index)
            .map_err(|e| IngestError::archive(format!("Failed to read entry {index}: {e}")))?;
        offsets.push((file.header_start(), index));
    }
    offsets.sort_unstable();
    Ok(offsets.into_iter().map(|(_, index)| index).collect())
}

/// Table of contents in physical order, without extracting anything.
pub fn read_toc(bytes: &[u8]) -> Result<Vec<TocEntry>> {
    let mut archive = open_zip(bytes)?;
    let mut toc = Vec::with_capacity(archive.len());
    for index in physical_order(&mut archive)? {
        let file = archive
            .by_index_raw(index)
            .map_err(|e| IngestError::archive(format!("Failed to read entry {index}: {e}")))?;
        toc.push(TocEntry {
            path: file.name().to_string(),
            is_dir: file.is_dir(),
            size: file.size(),
        });
    }
    Ok(toc)
}

/// Extract every file into `dir`, returning file paths in physical order.
///
/// Directory entries are created but not returned. Entries that would
/// land outside `dir` fail the whole extraction.
pub(crate) fn extract(bytes: &[u8], dir: &Path) -> Result<Vec<String>> {
    let mut archive = open_zip(bytes)?;
    let mut paths = Vec::with_capacity(archive.len());
    for index in physical_order(&mut archive)? {
        let mut file = archive
            .by_index(index)
            .map_err(|e| IngestError::archive(format!("Failed to read entry {index}: {e}")))?;
        let Some(relative) = file.enclosed_name() else {
            return Err(IngestError::archive(format!(
                "Entry escapes the archive root: {}",
                file.name()
            )));
        };
        let target = dir.join(&relative);
        if file.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut file, &mut out).map_err(|e| {
            IngestError::archive(format!("Failed to extract '{}': {e}", file.name()))
        })?;

        let path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        paths.push(path);
    }
    Ok(paths)
}

// ============================================================================
// CONTAINER
// ============================================================================

/// Path-keyed archive of artifacts and their content.
///
/// The work directory is deleted by [`close`](Self::close), or quietly on
/// drop. Every operation on a closed container fails.
#[derive(Debug)]
pub struct ArchiveContainer {
    work_dir: Option<TempDir>,
    entries: IndexMap<String, ArchiveEntry>,
}

impl ArchiveContainer {
    /// An empty container.
    pub fn create() -> Result<Self> {
        Self::create_in(None)
    }

    pub fn create_in(root: Option<&Path>) -> Result<Self> {
        Ok(Self {
            work_dir: Some(work_dir(root)?),
            entries: IndexMap::new(),
        })
    }

    /// Unpack a container from zip bytes.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        Self::open_in(bytes, None)
    }

    pub fn open_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            IngestError::resource(format!("Failed to read archive {}", path.display()), e)
        })?;
        Self::open(&bytes)
    }

    pub fn open_in(bytes: &[u8], root: Option<&Path>) -> Result<Self> {
        let mut container = Self::create_in(root)?;
        let dir = container.root()?.to_path_buf();
        let files = extract(bytes, &dir)?;

        // Group content and sidecar by entry path, keeping first-seen order.
        let mut grouped: IndexMap<String, (Option<PathBuf>, Option<Artifact>)> = IndexMap::new();
        for file in files {
            if let Some(entry) = entry_path(&file).map(str::to_string) {
                let artifact = read_metadata(&file, &fs::read(dir.join(&file))?)?;
                fs::remove_file(dir.join(&file))?;
                grouped.entry(entry).or_default().1 = Some(artifact);
            } else {
                let content = dir.join(&file);
                grouped.entry(file).or_default().0 = Some(content);
            }
        }

        for (path, (content, artifact)) in grouped {
            let Some(artifact) = artifact else {
                return Err(IngestError::archive(format!("Missing metadata for entry: {path}")));
            };
            container
                .entries
                .insert(path.clone(), ArchiveEntry::new(path, artifact, content));
        }
        tracing::debug!(entries = container.entries.len(), "opened archive container");
        Ok(container)
    }

    fn root(&self) -> Result<&Path> {
        self.work_dir
            .as_ref()
            .map(TempDir::path)
            .ok_or_else(|| IngestError::archive("Archive container is closed"))
    }

    /// Work directory, while open.
    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_ref().map(TempDir::path)
    }

    pub fn is_closed(&self) -> bool {
        self.work_dir.is_none()
    }

    fn write_content<R: Read>(&self, path: &str, mut content: R) -> Result<PathBuf> {
        let file = self.root()?.join(path);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&file)?;
        io::copy(&mut content, &mut out)?;
        Ok(file)
    }

    /// Add a new entry. Fails if the path is invalid or already present.
    pub fn add_entry<R: Read>(
        &mut self,
        path: &str,
        artifact: &Artifact,
        content: Option<R>,
    ) -> Result<()> {
        validate_entry_path(path)?;
        if is_metadata_path(path) {
            return Err(IngestError::InvalidEntry(format!(
                "{path}: reserved metadata suffix"
            )));
        }
        if self.entries.contains_key(path) {
            return Err(IngestError::DuplicateEntry(path.to_string()));
        }
        let file = content.map(|c| self.write_content(path, c)).transpose()?;
        self.entries.insert(
            path.to_string(),
            ArchiveEntry::new(path.to_string(), artifact.clone(), file),
        );
        Ok(())
    }

    /// Replace an entry's metadata, and its content when given.
    pub fn update_entry<R: Read>(
        &mut self,
        path: &str,
        artifact: &Artifact,
        content: Option<R>,
    ) -> Result<()> {
        if !self.entries.contains_key(path) {
            return Err(IngestError::InvalidEntry(format!("{path}: no such entry")));
        }
        let file = content.map(|c| self.write_content(path, c)).transpose()?;
        if let Some(entry) = self.entries.get_mut(path) {
            entry.set_artifact(artifact.clone());
            if let Some(file) = file {
                entry.set_content_file(file);
            }
        }
        Ok(())
    }

    /// Remove an entry and its content, keeping the order of the rest.
    pub fn remove_entry(&mut self, path: &str) -> Result<ArchiveEntry> {
        self.root()?;
        let entry = self
            .entries
            .shift_remove(path)
            .ok_or_else(|| IngestError::InvalidEntry(format!("{path}: no such entry")))?;
        if let Some(file) = entry.content_file() {
            fs::remove_file(file)?;
        }
        Ok(entry)
    }

    pub fn get_entry(&self, path: &str) -> Option<&ArchiveEntry> {
        self.entries.get(path)
    }

    /// Entries in physical order.
    pub fn entries(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.entries.values()
    }

    /// Open an entry's content for reading. `None` for metadata-only entries.
    pub fn open_content(&self, entry: &ArchiveEntry) -> Result<Option<File>> {
        self.root()?;
        entry
            .content_file()
            .map(File::open)
            .transpose()
            .map_err(IngestError::from)
    }

    /// Read an entry's content fully.
    pub fn read_content(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let Some(entry) = self.get_entry(path) else {
            return Ok(None);
        };
        match self.open_content(entry)? {
            Some(mut file) => {
                let mut bytes = Vec::new();
                file.read_to_end(&mut bytes)?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to zip bytes.
    pub fn pack(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.pack_to(&mut buffer)?;
        Ok(buffer.into_inner())
    }

    /// Write the container as a zip, each entry followed by its metadata.
    pub fn pack_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        self.root()?;
        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for entry in self.entries.values() {
            if let Some(file) = entry.content_file() {
                zip.start_file(entry.path(), options).map_err(|e| {
                    IngestError::archive(format!("Failed to start '{}': {e}", entry.path()))
                })?;
                let mut content = File::open(file)?;
                io::copy(&mut content, &mut zip)?;
            }
            zip.start_file(metadata_path(entry.path()), options)
                .map_err(|e| {
                    IngestError::archive(format!("Failed to start metadata for '{}': {e}", entry.path()))
                })?;
            zip.write_all(&write_metadata(entry.artifact())?)?;
        }

        zip.finish()
            .map_err(|e| IngestError::archive(format!("Failed to finish archive: {e}")))?;
        Ok(())
    }

    /// Delete the work directory. Calling it again does nothing.
    pub fn close(&mut self) -> Result<()> {
        self.entries.clear();
        match self.work_dir.take() {
            Some(dir) => dir
                .close()
                .map_err(|e| IngestError::resource("Failed to delete work directory", e)),
            None => Ok(()),
        }
    }

    /// Close, logging rather than returning any failure.
    pub fn close_quietly(&mut self) {
        if let Err(error) = self.close() {
            tracing::warn!(%error, "failed to close archive container");
        }
    }
}

impl Drop for ArchiveContainer {
    fn drop(&mut self) {
        self.close_quietly();
    }
}
