//! Derivation of artifacts from primary document content.
//!
//! Derivation runs in two phases over a batch of primaries:
//!
//! ```text
//! phase 1  build_artifacts       per primary, upload order, local data only
//!            ↓  identity keys registered in the LinkerContext
//! phase 2  build_relationships   per primary, after every phase 1 completed
//! ```
//!
//! Builders are created per primary by the [`ArtifactBuilderFactory`]
//! instances that accept it. Each builder owns the artifacts it derives.

mod batch;
mod collection;
pub mod java;
pub mod policy;
pub mod pom;
pub mod wsdl;
pub mod xml;
pub mod xsd;

use std::fmt;
use std::sync::Arc;

use crate::config::IngestConfig;
use crate::error::Result;
use crate::link::LinkerContext;
use crate::model::{Artifact, ArtifactContent, ArtifactKind, ArtifactType};

pub use batch::{DerivationBatch, DerivationResult, DerivedPrimary, IngestFailure};
pub use collection::DerivedArtifacts;

// ============================================================================
// BUILDER
// ============================================================================

/// Per-primary, stateful two-phase deriver.
pub trait ArtifactBuilder: Send {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Phase 1: parse the content, adjust the primary and collect derived
    /// artifacts. Must not depend on other artifacts in the batch.
    fn build_artifacts(&mut self, primary: &mut Artifact, content: &ArtifactContent)
    -> Result<()>;

    /// Phase 2: resolve relationship targets.
    ///
    /// Targets are looked up in this builder's own derived artifacts first,
    /// then in the batch-wide linker.
    fn build_relationships(&mut self, primary: &mut Artifact, linker: &LinkerContext) -> Result<()> {
        self.derived_artifacts_mut().resolve(primary, linker);
        Ok(())
    }

    fn derived_artifacts(&self) -> &DerivedArtifacts;

    fn derived_artifacts_mut(&mut self) -> &mut DerivedArtifacts;

    /// Move the derived artifacts out of the builder.
    fn take_derived(&mut self) -> Vec<Artifact> {
        self.derived_artifacts_mut().take()
    }
}

/// Builder used when no factory accepts a primary.
#[derive(Debug, Default)]
pub struct NoOpBuilder {
    derived: DerivedArtifacts,
}

impl ArtifactBuilder for NoOpBuilder {
    fn name(&self) -> &'static str {
        "no-op"
    }

    fn build_artifacts(&mut self, _primary: &mut Artifact, _content: &ArtifactContent) -> Result<()> {
        Ok(())
    }

    fn derived_artifacts(&self) -> &DerivedArtifacts {
        &self.derived
    }

    fn derived_artifacts_mut(&mut self) -> &mut DerivedArtifacts {
        &mut self.derived
    }
}

// ============================================================================
// FACTORY
// ============================================================================

/// Creates builders for the primaries it accepts.
pub trait ArtifactBuilderFactory: Send + Sync {
    fn name(&self) -> &'static str;

    /// Higher values build first.
    fn priority(&self) -> i32 {
        0
    }

    fn accepts(&self, primary: &Artifact) -> bool;

    fn create(&self, config: &IngestConfig) -> Box<dyn ArtifactBuilder>;
}

/// Factory backed by plain functions.
///
/// Used for the built-in builders and by integrations; custom factories
/// with state implement [`ArtifactBuilderFactory`] directly.
#[derive(Clone, Copy)]
pub struct BuilderFactory {
    name: &'static str,
    priority: i32,
    accepts: fn(&ArtifactType) -> bool,
    create: fn(&IngestConfig) -> Box<dyn ArtifactBuilder>,
}

impl BuilderFactory {
    pub const fn new(
        name: &'static str,
        accepts: fn(&ArtifactType) -> bool,
        create: fn(&IngestConfig) -> Box<dyn ArtifactBuilder>,
    ) -> Self {
        Self {
            name,
            priority: 0,
            accepts,
            create,
        }
    }

    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl ArtifactBuilderFactory for BuilderFactory {
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn accepts(&self, primary: &Artifact) -> bool {
        (self.accepts)(&primary.artifact_type)
    }

    fn create(&self, config: &IngestConfig) -> Box<dyn ArtifactBuilder> {
        (self.create)(config)
    }
}

impl fmt::Debug for BuilderFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderFactory")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Factories for the document types understood without integrations.
pub fn builtin_factories() -> Vec<Arc<dyn ArtifactBuilderFactory>> {
    vec![
        Arc::new(BuilderFactory::new(
            "xsd",
            |t| t.kind() == Some(ArtifactKind::XsdDocument),
            |config| Box::new(xsd::builder(config)),
        )),
        Arc::new(BuilderFactory::new(
            "wsdl",
            |t| t.kind() == Some(ArtifactKind::WsdlDocument),
            |config| Box::new(wsdl::builder(config)),
        )),
        Arc::new(BuilderFactory::new(
            "ws-policy",
            |t| t.kind() == Some(ArtifactKind::PolicyDocument),
            |config| Box::new(policy::builder(config)),
        )),
        Arc::new(BuilderFactory::new(
            "xml",
            |t| t.kind() == Some(ArtifactKind::XmlDocument),
            |config| Box::new(xml::XmlArtifactBuilder::new(xml::PlainXmlDeriver, config)),
        )),
        Arc::new(BuilderFactory::new(
            "java-bytecode",
            |t| t.extended_type().is_some_and(crate::model::is_java_type),
            |_| Box::new(java::JavaClassBuilder::default()),
        )),
        Arc::new(BuilderFactory::new(
            "maven-pom",
            |t| t.is_extended_type(pom::MAVEN_POM),
            |config| Box::new(pom::builder(config)),
        )),
    ]
}

/// Accepting factories for a primary in build order. Equal priorities
/// keep registration order.
pub(crate) fn accepting<'f>(
    factories: &'f [Arc<dyn ArtifactBuilderFactory>],
    primary: &Artifact,
) -> Vec<&'f Arc<dyn ArtifactBuilderFactory>> {
    let mut accepted: Vec<_> = factories.iter().filter(|f| f.accepts(primary)).collect();
    accepted.sort_by_key(|f| std::cmp::Reverse(f.priority()));
    accepted
}
