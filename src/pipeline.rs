//! Ingestion entry points.
//!
//! An [`Ingestor`] borrows an immutable [`Registry`] and configuration and
//! owns nothing between calls; every temp directory it touches is scoped
//! to the call that created it.

use std::path::Path;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::archive::ArchiveContainer;
use crate::config::IngestConfig;
use crate::derive::{DerivationBatch, DerivationResult, DerivedPrimary, IngestFailure};
use crate::error::{IngestError, Result};
use crate::expand::ArchiveExpander;
use crate::link::UnresolvedReference;
use crate::model::{Artifact, ArtifactContent, ArtifactType, base_name};
use crate::registry::Registry;

/// Result of [`Ingestor::ingest`] and [`Ingestor::ingest_batch`].
pub type IngestResult = DerivationResult;

/// Uploaded bytes with an optional type override.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub type_hint: Option<ArtifactType>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
            type_hint: None,
        }
    }

    /// Skip detection and ingest as `artifact_type`.
    pub fn with_type_hint(mut self, artifact_type: ArtifactType) -> Self {
        self.type_hint = Some(artifact_type);
        self
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            IngestError::resource(format!("Failed to read {}", path.display()), e)
        })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(filename, bytes))
    }

    pub fn content(&self) -> ArtifactContent {
        ArtifactContent::new(self.filename.clone(), self.bytes.clone())
    }
}

/// Everything produced by [`Ingestor::ingest_archive`].
#[derive(Debug)]
pub struct ArchiveIngest {
    /// Surviving entries with their final metadata and content.
    pub container: ArchiveContainer,
    /// The uploaded archive (or document) itself.
    pub primary: DerivedPrimary,
    /// Expanded entries in physical order.
    pub entries: Vec<DerivedPrimary>,
    pub unresolved: Vec<UnresolvedReference>,
    pub failures: Vec<IngestFailure>,
}

impl ArchiveIngest {
    /// The primary, every entry, and everything derived from them.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        std::iter::once(&self.primary)
            .chain(self.entries.iter())
            .flat_map(|p| std::iter::once(&p.primary).chain(p.derived.iter()))
    }
}

pub struct Ingestor<'r> {
    registry: &'r Registry,
    config: &'r IngestConfig,
}

impl<'r> Ingestor<'r> {
    pub fn new(registry: &'r Registry, config: &'r IngestConfig) -> Self {
        Self { registry, config }
    }

    /// Ingest one upload. A content error on it is returned as an error.
    pub fn ingest(&self, upload: Upload) -> Result<IngestResult> {
        self.ingest_batch(vec![upload])
    }

    /// Run phase 1 for every upload in order, then phase 2 for the batch.
    pub fn ingest_batch(&self, uploads: Vec<Upload>) -> Result<IngestResult> {
        let mut batch = DerivationBatch::new(self.registry.builder_factories(), self.config);
        for upload in uploads {
            let content = upload.content();
            let primary = self.primary_for(&content, upload.type_hint);
            batch.add(primary, Some(&content))?;
        }
        batch.finish()
    }

    /// Detect an upload, or take its type hint, expand it when it is an
    /// archive, derive every entry
    /// in one batch, and collect the surviving entries into a fresh
    /// container.
    pub fn ingest_archive(&self, upload: Upload) -> Result<ArchiveIngest> {
        let content = upload.content();
        let is_archive = match &upload.type_hint {
            Some(hint) => self.registry.is_archive_type(hint),
            None => self.registry.detectors().is_archive(&content),
        };
        let mut primary = self.primary_for(&content, upload.type_hint);
        if !is_archive {
            return self.ingest_document(primary, &content);
        }

        let archive_uuid = primary.uuid();
        let expanded = {
            let mut expander = ArchiveExpander::open(
                &content,
                Some(primary.artifact_type.clone()),
                self.registry,
                self.config,
            )?;
            let expanded = expander.expand(Some(archive_uuid));
            if let Err(error) = expander.close() {
                tracing::warn!(file = content.filename(), %error, "failed to release expansion work directory");
            }
            expanded?
        };
        tracing::info!(
            file = content.filename(),
            artifact_type = %primary.artifact_type,
            entries = expanded.len(),
            "expanded archive"
        );

        let mut batch = DerivationBatch::new(self.registry.builder_factories(), self.config);
        primary.content = Some(content.metadata());
        batch.add(primary, None)?;

        let mut sources: IndexMap<Uuid, (String, ArtifactContent)> = IndexMap::new();
        for entry in expanded {
            let uuid = batch.add(entry.artifact, Some(&entry.content))?;
            sources.insert(uuid, (entry.path, entry.content));
        }
        let mut result = batch.finish()?;

        let Some(index) = result
            .primaries
            .iter()
            .position(|p| p.primary.uuid() == archive_uuid)
        else {
            return Err(IngestError::derive(
                content.filename(),
                IngestError::archive("archive primary missing from batch"),
            ));
        };
        let archive = result.primaries.remove(index);

        let mut container = ArchiveContainer::create_in(self.config.temp_dir.as_deref())?;
        for entry in &result.primaries {
            if let Some((path, source)) = sources.get(&entry.primary.uuid()) {
                container.add_entry(path, &entry.primary, Some(source.bytes()))?;
            }
        }

        Ok(ArchiveIngest {
            container,
            primary: archive,
            entries: result.primaries,
            unresolved: result.unresolved,
            failures: result.failures,
        })
    }

    fn ingest_document(&self, primary: Artifact, content: &ArtifactContent) -> Result<ArchiveIngest> {
        let mut batch = DerivationBatch::new(self.registry.builder_factories(), self.config);
        batch.add(primary, Some(content))?;
        let mut result = batch.finish()?;

        let Some(primary) = result.primaries.pop() else {
            return Err(IngestError::derive(
                content.filename(),
                IngestError::archive("primary missing from batch"),
            ));
        };
        let mut container = ArchiveContainer::create_in(self.config.temp_dir.as_deref())?;
        container.add_entry(content.base_name(), &primary.primary, Some(content.bytes()))?;

        Ok(ArchiveIngest {
            container,
            primary,
            entries: Vec::new(),
            unresolved: result.unresolved,
            failures: result.failures,
        })
    }

    fn primary_for(&self, content: &ArtifactContent, type_hint: Option<ArtifactType>) -> Artifact {
        let artifact_type = type_hint.unwrap_or_else(|| self.registry.detectors().detect(content));
        Artifact::new(artifact_type, base_name(content.filename()))
            .with_creator(self.config.default_creator.clone())
    }
}
