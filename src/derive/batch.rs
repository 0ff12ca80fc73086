//! Two-phase derivation over a batch of primaries.

use std::sync::Arc;

use uuid::Uuid;

use super::{ArtifactBuilder, ArtifactBuilderFactory, NoOpBuilder, accepting};
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::link::{LinkerContext, UnresolvedReference, pending_references};
use crate::model::{ARCHIVE_PATH_PROPERTY, Artifact, ArtifactContent, IdentityKey};

/// A primary that could not be derived. It is excluded from the results.
#[derive(Debug)]
pub struct IngestFailure {
    pub artifact: Artifact,
    pub error: IngestError,
}

/// A primary with the artifacts derived from it.
#[derive(Debug, Clone)]
pub struct DerivedPrimary {
    pub primary: Artifact,
    pub derived: Vec<Artifact>,
}

/// Outcome of a completed batch.
#[derive(Debug, Default)]
pub struct DerivationResult {
    /// Surviving primaries in upload order.
    pub primaries: Vec<DerivedPrimary>,
    pub unresolved: Vec<UnresolvedReference>,
    pub failures: Vec<IngestFailure>,
}

impl DerivationResult {
    /// Every primary and derived artifact in derivation order.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.primaries
            .iter()
            .flat_map(|p| std::iter::once(&p.primary).chain(p.derived.iter()))
    }

    pub fn primary(&self, uuid: Uuid) -> Option<&DerivedPrimary> {
        self.primaries.iter().find(|p| p.primary.uuid() == uuid)
    }
}

struct Pending {
    primary: Artifact,
    builders: Vec<Box<dyn ArtifactBuilder>>,
}

/// Drives phase 1 on [`add`](Self::add) and phase 2 on
/// [`finish`](Self::finish). Consuming `finish` makes it impossible to
/// add to a batch whose relationships were already built.
pub struct DerivationBatch<'a> {
    factories: &'a [Arc<dyn ArtifactBuilderFactory>],
    config: &'a IngestConfig,
    linker: LinkerContext,
    pending: Vec<Pending>,
    failures: Vec<IngestFailure>,
}

impl<'a> DerivationBatch<'a> {
    pub fn new(factories: &'a [Arc<dyn ArtifactBuilderFactory>], config: &'a IngestConfig) -> Self {
        Self {
            factories,
            config,
            linker: LinkerContext::new(),
            pending: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Run phase 1 for a primary and register its identity keys.
    ///
    /// Content errors are recorded as failures and the primary is dropped
    /// from the batch; any other error is returned.
    pub fn add(&mut self, mut primary: Artifact, content: Option<&ArtifactContent>) -> Result<Uuid> {
        let uuid = primary.uuid();
        let mut builders = self.builders_for(&primary);

        if let Some(content) = content {
            primary.content = Some(content.metadata());
            if let Err(error) = Self::run_phase_one(&mut builders, &mut primary, content) {
                if !error.is_content_error() {
                    return Err(error);
                }
                tracing::warn!(file = content.filename(), %error, "derivation failed");
                self.failures.push(IngestFailure {
                    artifact: primary,
                    error,
                });
                return Ok(uuid);
            }
        }

        for builder in &mut builders {
            builder.derived_artifacts_mut().ensure_related_document(uuid);
        }

        self.linker.register_artifact(&primary);
        if primary.property(ARCHIVE_PATH_PROPERTY).is_none() {
            if let Some(content) = content {
                self.linker.register(IdentityKey::path(content.filename()), uuid);
            }
        }
        for builder in &builders {
            for derived in builder.derived_artifacts().iter() {
                self.linker.register_artifact(derived);
            }
        }

        tracing::debug!(
            artifact = %primary.name,
            artifact_type = %primary.artifact_type,
            builders = builders.len(),
            derived = builders.iter().map(|b| b.derived_artifacts().len()).sum::<usize>(),
            "phase 1 complete"
        );
        self.pending.push(Pending { primary, builders });
        Ok(uuid)
    }

    fn builders_for(&self, primary: &Artifact) -> Vec<Box<dyn ArtifactBuilder>> {
        let builders: Vec<_> = accepting(self.factories, primary)
            .into_iter()
            .map(|f| f.create(self.config))
            .collect();
        if builders.is_empty() {
            vec![Box::new(NoOpBuilder::default())]
        } else {
            builders
        }
    }

    fn run_phase_one(
        builders: &mut [Box<dyn ArtifactBuilder>],
        primary: &mut Artifact,
        content: &ArtifactContent,
    ) -> Result<()> {
        for builder in builders {
            builder
                .build_artifacts(primary, content)
                .map_err(|e| IngestError::derive(content.filename(), e))?;
        }
        Ok(())
    }

    pub fn linker(&self) -> &LinkerContext {
        &self.linker
    }

    /// Primaries still in the batch.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Run phase 2 for every primary and collect the results.
    ///
    /// When the batch held a single primary and it failed, its error is
    /// returned instead of an empty result.
    pub fn finish(mut self) -> Result<DerivationResult> {
        if self.pending.is_empty() && self.failures.len() == 1 {
            if let Some(failure) = self.failures.pop() {
                return Err(failure.error);
            }
        }

        let mut result = DerivationResult {
            failures: std::mem::take(&mut self.failures),
            ..Default::default()
        };
        for Pending {
            mut primary,
            mut builders,
        } in self.pending
        {
            for builder in &mut builders {
                builder
                    .build_relationships(&mut primary, &self.linker)
                    .map_err(|e| IngestError::derive(primary.name.clone(), e))?;
            }
            let derived: Vec<Artifact> = builders.iter_mut().flat_map(|b| b.take_derived()).collect();

            result.unresolved.extend(pending_references(&primary));
            for artifact in &derived {
                result.unresolved.extend(pending_references(artifact));
            }
            result.primaries.push(DerivedPrimary { primary, derived });
        }

        if !result.unresolved.is_empty() {
            tracing::debug!(count = result.unresolved.len(), "unresolved references");
        }
        Ok(result)
    }
}
