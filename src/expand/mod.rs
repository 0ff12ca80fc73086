//! Recursive archive expansion.
//!
//! ```text
//! entry (physical order)
//!   → ArtifactFilter::accepts           skip build noise
//!   → DetectorChain::detect_in_archive  classify, admit
//!   → MetaDataFactory::create_metadata  shell artifact
//!   → nested archive?                   recurse with a child context
//! ```
//!
//! Format-specific behaviour is supplied by an [`ExpanderProvider`] chosen
//! by archive type. Each expander, nested ones included, owns the work
//! directory its archive was unpacked into.

pub mod context;

use std::fmt;
use std::path::Path;

use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::archive;
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::model::{
    ARCHIVE_PATH_PROPERTY, Artifact, ArtifactContent, ArtifactType, AuditInfo,
    EXPANDED_FROM_DOCUMENT, base_name,
};
use crate::registry::Registry;

pub use context::ArchiveContext;

/// Separator between a nested archive's path and a path inside it.
pub const NESTED_SEPARATOR: &str = "!/";

// ============================================================================
// CANDIDATES
// ============================================================================

/// An unpacked archive entry before it has been classified.
#[derive(Debug, Clone, Copy)]
pub struct CandidateArtifact<'a> {
    path: &'a str,
    address: &'a str,
    file: &'a Path,
    content: &'a ArtifactContent,
}

impl<'a> CandidateArtifact<'a> {
    pub fn new(path: &'a str, address: &'a str, file: &'a Path, content: &'a ArtifactContent) -> Self {
        Self {
            path,
            address,
            file,
            content,
        }
    }

    /// Path relative to the archive being expanded.
    pub fn path(&self) -> &'a str {
        self.path
    }

    /// Path including the enclosing archives, `outer.jar!/inner.xsd`.
    pub fn address(&self) -> &'a str {
        self.address
    }

    /// Location in the expansion work directory.
    pub fn file(&self) -> &'a Path {
        self.file
    }

    pub fn content(&self) -> &'a ArtifactContent {
        self.content
    }

    pub fn base_name(&self) -> &'a str {
        base_name(self.path)
    }

    pub fn is_directory(&self) -> bool {
        self.path.ends_with('/') || self.file.is_dir()
    }
}

/// An entry produced by expansion.
#[derive(Debug, Clone)]
pub struct ExpandedEntry {
    /// Address of the entry, with `!/` between nested archive levels.
    pub path: String,
    pub artifact: Artifact,
    pub content: ArtifactContent,
    /// UUIDs of the enclosing archives, outermost first.
    pub parent_chain: Vec<Uuid>,
}

impl ExpandedEntry {
    /// Number of archive levels enclosing this entry.
    pub fn depth(&self) -> usize {
        self.path.matches(NESTED_SEPARATOR).count() + 1
    }
}

// ============================================================================
// FILTERS AND METADATA FACTORIES
// ============================================================================

/// Decides which archive entries become artifacts.
pub trait ArtifactFilter: Send + Sync {
    fn accepts(&self, candidate: &CandidateArtifact<'_>, context: &ArchiveContext) -> bool;
}

/// Rejects directories, packaging bookkeeping, hidden files and container
/// sidecars.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultArtifactFilter;

impl DefaultArtifactFilter {
    fn is_noise(path: &str) -> bool {
        let upper = path.to_ascii_uppercase();
        let name = base_name(path);
        upper == "META-INF/MANIFEST.MF"
            || upper.ends_with("INDEX.LIST")
            || (upper.starts_with("META-INF/MAVEN/") && name == "pom.properties")
            || path.split('/').any(|segment| segment.starts_with('.'))
            || archive::is_metadata_path(path)
    }
}

impl ArtifactFilter for DefaultArtifactFilter {
    fn accepts(&self, candidate: &CandidateArtifact<'_>, _context: &ArchiveContext) -> bool {
        !candidate.is_directory() && !Self::is_noise(candidate.path())
    }
}

/// Creates the shell artifact for an accepted entry.
pub trait MetaDataFactory: Send + Sync {
    fn create_metadata(&self, candidate: &CandidateArtifact<'_>, context: &ArchiveContext) -> Artifact;
}

/// Generic shell: base name, archive path and provenance.
///
/// The type is left generic so detection decides it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMetaDataFactory;

impl MetaDataFactory for DefaultMetaDataFactory {
    fn create_metadata(&self, candidate: &CandidateArtifact<'_>, context: &ArchiveContext) -> Artifact {
        let mut artifact = Artifact::new(ArtifactType::document(), candidate.base_name())
            .with_property(ARCHIVE_PATH_PROPERTY, candidate.address());
        if let Some(parent) = context.parent_uuid() {
            artifact.relate(EXPANDED_FROM_DOCUMENT, parent);
        }
        artifact
    }
}

// ============================================================================
// PROVIDERS
// ============================================================================

/// Format-specific expansion behaviour, selected by archive type.
pub trait ExpanderProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Higher values are consulted first.
    fn priority(&self) -> i32 {
        0
    }

    fn accepts(&self, archive_type: &ArtifactType) -> bool;

    /// Type assigned to an archive recognised by [`path_hints`](Self::path_hints).
    fn archive_type(&self) -> Option<ArtifactType> {
        None
    }

    /// Entry paths whose presence identifies this provider's archives.
    fn path_hints(&self) -> &[&'static str] {
        &[]
    }

    fn filter(&self) -> &dyn ArtifactFilter;

    fn metadata_factory(&self) -> &dyn MetaDataFactory;

    /// Fill in custom context before the first entry is visited.
    fn prepare_context(&self, context: &mut ArchiveContext) -> Result<()> {
        let _ = context;
        Ok(())
    }
}

/// Provider used when no format-specific provider accepts an archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExpanderProvider {
    filter: DefaultArtifactFilter,
    factory: DefaultMetaDataFactory,
}

impl ExpanderProvider for DefaultExpanderProvider {
    fn name(&self) -> &'static str {
        "default"
    }

    fn accepts(&self, _archive_type: &ArtifactType) -> bool {
        true
    }

    fn filter(&self) -> &dyn ArtifactFilter {
        &self.filter
    }

    fn metadata_factory(&self) -> &dyn MetaDataFactory {
        &self.factory
    }
}

// ============================================================================
// EXPANDER
// ============================================================================

/// Expands one archive, and recursively the archives inside it.
pub struct ArchiveExpander<'r> {
    registry: &'r Registry,
    config: &'r IngestConfig,
    archive_type: Option<ArtifactType>,
    provider: &'r dyn ExpanderProvider,
    work_dir: Option<TempDir>,
    entries: Vec<String>,
}

impl<'r> ArchiveExpander<'r> {
    /// Unpack the archive into a fresh work directory.
    pub fn open(
        content: &ArtifactContent,
        archive_type: Option<ArtifactType>,
        registry: &'r Registry,
        config: &'r IngestConfig,
    ) -> Result<Self> {
        let work_dir = archive::work_dir(config.temp_dir.as_deref())?;
        let entries = archive::extract(content.bytes(), work_dir.path())
            .map_err(|e| IngestError::expansion(content.filename(), e))?;
        let provider = registry.expander_provider(archive_type.as_ref());
        debug!(
            archive = content.filename(),
            provider = provider.name(),
            entries = entries.len(),
            "opened archive"
        );
        Ok(Self {
            registry,
            config,
            archive_type,
            provider,
            work_dir: Some(work_dir),
            entries,
        })
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Unpacked entry paths in physical order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_closed(&self) -> bool {
        self.work_dir.is_none()
    }

    /// Expand every admitted entry. `parent` is the UUID of the archive
    /// artifact; it becomes the `expandedFromDocument` target of the
    /// top-level entries.
    pub fn expand(&self, parent: Option<Uuid>) -> Result<Vec<ExpandedEntry>> {
        let root = self
            .work_dir
            .as_ref()
            .map(TempDir::path)
            .ok_or_else(|| IngestError::archive("Expander is closed"))?;
        let mut context = ArchiveContext::new(
            self.archive_type.clone(),
            parent,
            root,
            self.entries.clone(),
            self.config.max_nesting_depth,
        );
        self.provider.prepare_context(&mut context)?;

        let mut expanded = Vec::new();
        self.walk(self.provider, &context, "", &mut expanded)?;
        Ok(expanded)
    }

    fn walk(
        &self,
        provider: &dyn ExpanderProvider,
        context: &ArchiveContext,
        prefix: &str,
        expanded: &mut Vec<ExpandedEntry>,
    ) -> Result<()> {
        let detectors = self.registry.detectors();

        for path in context.entries() {
            let address = format!("{prefix}{path}");
            let file = context.work_dir().join(path);
            let bytes = std::fs::read(&file)
                .map_err(|e| IngestError::resource(format!("Failed to read '{address}'"), e))?;
            let content = ArtifactContent::new(address.clone(), bytes);
            let candidate = CandidateArtifact::new(path, &address, &file, &content);

            if !provider.filter().accepts(&candidate, context) {
                debug!(entry = %address, provider = provider.name(), "entry filtered");
                continue;
            }
            let detected = detectors.detect_in_archive(&content, context);
            if !detectors.allow_expansion_from_archive(&content, context) {
                debug!(entry = %address, artifact_type = %detected, "entry not admitted");
                continue;
            }

            let mut artifact = provider.metadata_factory().create_metadata(&candidate, context);
            if artifact.artifact_type.is_generic() {
                artifact.artifact_type = detected;
            }
            artifact.audit = AuditInfo::new(self.config.default_creator.clone());
            debug!(entry = %address, artifact_type = %artifact.artifact_type, "entry expanded");

            let descend = detectors.is_archive(&content)
                && self.config.expand_nested_archives
                && context.can_descend();
            let index = expanded.len();
            let nested = (artifact.uuid(), artifact.artifact_type.clone());
            expanded.push(ExpandedEntry {
                path: address.clone(),
                artifact,
                content: content.clone(),
                parent_chain: context.parent_chain().to_vec(),
            });

            if descend {
                if let Err(error) = self.expand_nested(&content, nested, context, &address, expanded) {
                    if !is_corrupt_archive(&error) {
                        return Err(error);
                    }
                    warn!(entry = %address, %error, "corrupt nested archive kept as opaque document");
                    expanded.truncate(index + 1);
                    if let Some(entry) = expanded.get_mut(index) {
                        entry.artifact.artifact_type = ArtifactType::document();
                    }
                }
            }
        }
        Ok(())
    }

    fn expand_nested(
        &self,
        content: &ArtifactContent,
        (uuid, archive_type): (Uuid, ArtifactType),
        context: &ArchiveContext,
        address: &str,
        expanded: &mut Vec<ExpandedEntry>,
    ) -> Result<()> {
        // Released when this call returns, whatever the outcome.
        let work_dir = archive::work_dir(self.config.temp_dir.as_deref())?;
        let entries = archive::extract(content.bytes(), work_dir.path())?;
        let provider = self.registry.expander_provider(Some(&archive_type));
        let mut child = context.child(uuid, Some(archive_type), work_dir.path(), entries);
        provider.prepare_context(&mut child)?;

        debug!(
            archive = %address,
            depth = child.depth(),
            provider = provider.name(),
            "expanding nested archive"
        );
        self.walk(provider, &child, &format!("{address}{NESTED_SEPARATOR}"), expanded)
    }

    /// Delete the work directory. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        match self.work_dir.take() {
            Some(dir) => dir
                .close()
                .map_err(|e| IngestError::resource("Failed to delete expansion work directory", e)),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ArchiveExpander<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveExpander")
            .field("archive_type", &self.archive_type)
            .field("provider", &self.provider.name())
            .field("work_dir", &self.work_dir.as_ref().map(TempDir::path))
            .field("entries", &self.entries.len())
            .finish()
    }
}

fn is_corrupt_archive(error: &IngestError) -> bool {
    matches!(error, IngestError::ArchiveFormat(_)) || error.is_content_error()
}
