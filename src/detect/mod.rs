//! Content type detection.
//!
//! Detectors are consulted in descending priority order and the first one
//! with an opinion wins. A detector that wants built-in behaviour as a
//! fallback returns `None` instead of delegating.

mod default;

use std::sync::Arc;

use crate::expand::ArchiveContext;
use crate::model::{ArtifactContent, ArtifactType};

pub use default::{DefaultArtifactTypeDetector, archive_types};

/// Classifies raw content into an artifact type.
///
/// Every method defaults to "no opinion".
pub trait ArtifactTypeDetector: Send + Sync {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Higher values are consulted first.
    fn priority(&self) -> i32 {
        0
    }

    /// Classify standalone content.
    fn detect(&self, content: &ArtifactContent) -> Option<ArtifactType> {
        let _ = content;
        None
    }

    /// Classify content found inside an archive.
    fn detect_in_archive(
        &self,
        content: &ArtifactContent,
        context: &ArchiveContext,
    ) -> Option<ArtifactType> {
        let _ = (content, context);
        None
    }

    /// Whether the content is itself an expandable archive.
    fn is_archive(&self, content: &ArtifactContent) -> Option<bool> {
        let _ = content;
        None
    }

    /// Whether an entry found inside an archive should be expanded.
    fn allow_expansion_from_archive(
        &self,
        content: &ArtifactContent,
        context: &ArchiveContext,
    ) -> Option<bool> {
        let _ = (content, context);
        None
    }
}

/// Registered detectors in dispatch order.
#[derive(Clone, Default)]
pub struct DetectorChain {
    detectors: Vec<Arc<dyn ArtifactTypeDetector>>,
}

impl DetectorChain {
    /// Sort detectors by descending priority. Equal priorities keep
    /// registration order.
    pub fn new(mut detectors: Vec<Arc<dyn ArtifactTypeDetector>>) -> Self {
        detectors.sort_by_key(|d| std::cmp::Reverse(d.priority()));
        Self { detectors }
    }

    /// Classify standalone content; falls back to `core/Document`.
    pub fn detect(&self, content: &ArtifactContent) -> ArtifactType {
        for detector in &self.detectors {
            if let Some(found) = detector.detect(content) {
                tracing::debug!(
                    file = content.filename(),
                    detector = detector.name(),
                    artifact_type = %found,
                    "detected artifact type"
                );
                return found;
            }
        }
        ArtifactType::document()
    }

    /// Classify an archive entry. Each detector's archive-aware answer is
    /// preferred over its standalone answer before moving down the chain.
    pub fn detect_in_archive(
        &self,
        content: &ArtifactContent,
        context: &ArchiveContext,
    ) -> ArtifactType {
        for detector in &self.detectors {
            let found = detector
                .detect_in_archive(content, context)
                .or_else(|| detector.detect(content));
            if let Some(found) = found {
                tracing::debug!(
                    file = content.filename(),
                    detector = detector.name(),
                    artifact_type = %found,
                    "detected archive entry type"
                );
                return found;
            }
        }
        ArtifactType::document()
    }

    pub fn is_archive(&self, content: &ArtifactContent) -> bool {
        self.detectors
            .iter()
            .find_map(|d| d.is_archive(content))
            .unwrap_or(false)
    }

    /// Without an opinion, entries are admitted. Whether an admitted archive
    /// is recursed into is the expander's call.
    pub fn allow_expansion_from_archive(
        &self,
        content: &ArtifactContent,
        context: &ArchiveContext,
    ) -> bool {
        self.detectors
            .iter()
            .find_map(|d| d.allow_expansion_from_archive(content, context))
            .unwrap_or(true)
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Detector names in dispatch order.
    pub fn names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }
}

impl std::fmt::Debug for DetectorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
