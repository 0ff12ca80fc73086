//! The explicit registry of pluggable pieces.
//!
//! A [`Registry`] is built once with [`RegistryBuilder`], is immutable
//! afterwards, and is shared by reference with every ingestion entry point.

use std::fmt;
use std::sync::Arc;

use crate::archive::{TocEntry, read_toc};
use crate::config::IngestConfig;
use crate::derive::{ArtifactBuilderFactory, builtin_factories};
use crate::detect::{
    ArtifactTypeDetector, DefaultArtifactTypeDetector, DetectorChain, archive_types,
};
use crate::error::Result;
use crate::expand::{DefaultExpanderProvider, ExpanderProvider};
use crate::integration;
use crate::model::ArtifactType;

/// What an archive looks like before it is expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveInfo {
    /// Type implied by the first provider whose path hints matched.
    pub matched_type: Option<ArtifactType>,
    /// Table of contents in physical order.
    pub toc: Vec<TocEntry>,
}

/// Detectors, builder factories and expander providers in dispatch order.
#[derive(Clone)]
pub struct Registry {
    detectors: DetectorChain,
    factories: Vec<Arc<dyn ArtifactBuilderFactory>>,
    providers: Vec<Arc<dyn ExpanderProvider>>,
    fallback: DefaultExpanderProvider,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// The built-in detector, builders and every integration.
    pub fn with_defaults(config: &IngestConfig) -> Self {
        RegistryBuilder::new().with_defaults(config).build()
    }

    pub fn detectors(&self) -> &DetectorChain {
        &self.detectors
    }

    pub fn builder_factories(&self) -> &[Arc<dyn ArtifactBuilderFactory>] {
        &self.factories
    }

    /// Providers in descending priority.
    pub fn expander_providers(&self) -> &[Arc<dyn ExpanderProvider>] {
        &self.providers
    }

    /// Provider for an archive type; the default provider when none accepts it.
    pub fn expander_provider(&self, archive_type: Option<&ArtifactType>) -> &dyn ExpanderProvider {
        match archive_type.and_then(|t| self.providers.iter().find(|p| p.accepts(t))) {
            Some(provider) => provider.as_ref(),
            None => &self.fallback,
        }
    }

    /// Whether a type names an archive: one of the built-in archive types or
    /// a type some registered provider expands.
    pub fn is_archive_type(&self, artifact_type: &ArtifactType) -> bool {
        archive_types::ARCHIVES
            .iter()
            .any(|name| artifact_type.is_extended_type(name))
            || self.providers.iter().any(|p| p.accepts(artifact_type))
    }

    /// Read an archive's table of contents and match it against provider
    /// path hints, ignoring case.
    pub fn inspect_archive(&self, bytes: &[u8]) -> Result<ArchiveInfo> {
        let toc = read_toc(bytes)?;
        let matched_type = self
            .providers
            .iter()
            .find(|provider| {
                provider.path_hints().iter().any(|hint| {
                    toc.iter()
                        .any(|entry| entry.path.eq_ignore_ascii_case(hint.trim_start_matches('/')))
                })
            })
            .and_then(|provider| provider.archive_type());
        Ok(ArchiveInfo { matched_type, toc })
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("detectors", &self.detectors)
            .field("factories", &self.factories.iter().map(|x| x.name()).collect::<Vec<_>>())
            .field("providers", &self.providers.iter().map(|x| x.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Collects registrations; equal priorities keep registration order.
#[derive(Default)]
pub struct RegistryBuilder {
    detectors: Vec<Arc<dyn ArtifactTypeDetector>>,
    factories: Vec<Arc<dyn ArtifactBuilderFactory>>,
    providers: Vec<Arc<dyn ExpanderProvider>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the built-in detector (with the configured extension hints),
    /// the built-in builders and every integration.
    pub fn with_defaults(mut self, config: &IngestConfig) -> Self {
        self.detectors.extend(integration::detectors());
        self.detectors.push(Arc::new(
            DefaultArtifactTypeDetector::new().with_extension_hints(&config.extension_hints),
        ));
        self.factories.extend(builtin_factories());
        self.factories.extend(integration::builder_factories());
        self.providers.extend(integration::expander_providers());
        self
    }

    pub fn with_detector(mut self, detector: impl ArtifactTypeDetector + 'static) -> Self {
        self.detectors.push(Arc::new(detector));
        self
    }

    pub fn with_builder_factory(mut self, factory: impl ArtifactBuilderFactory + 'static) -> Self {
        self.factories.push(Arc::new(factory));
        self
    }

    pub fn with_expander_provider(mut self, provider: impl ExpanderProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn build(self) -> Registry {
        let mut providers = self.providers;
        providers.sort_by_key(|p| std::cmp::Reverse(p.priority()));
        Registry {
            detectors: DetectorChain::new(self.detectors),
            factories: self.factories,
            providers,
            fallback: DefaultExpanderProvider::default(),
        }
    }
}
