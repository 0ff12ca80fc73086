//! Derived artifacts indexed by identity key.

use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::link::{LinkerContext, resolve_artifact};
use crate::model::{Artifact, IdentityKey, RELATED_DOCUMENT};

/// Artifacts derived from one primary document.
///
/// Keys of pushed artifacts are indexed so references inside the same
/// document resolve to this document's artifacts before the batch-wide
/// linker is consulted.
#[derive(Debug, Default)]
pub struct DerivedArtifacts {
    artifacts: Vec<Artifact>,
    index: FxHashMap<IdentityKey, Uuid>,
}

impl DerivedArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an artifact and index its identity keys. Returns its UUID.
    pub fn push(&mut self, artifact: Artifact) -> Uuid {
        let uuid = artifact.uuid();
        for key in IdentityKey::for_artifact(&artifact) {
            self.index.insert(key, uuid);
        }
        self.artifacts.push(artifact);
        uuid
    }

    pub fn lookup(&self, key: &IdentityKey) -> Option<Uuid> {
        self.index.get(key).copied()
    }

    pub fn get(&self, uuid: Uuid) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.uuid() == uuid)
    }

    pub fn get_mut(&mut self, uuid: Uuid) -> Option<&mut Artifact> {
        self.artifacts.iter_mut().find(|a| a.uuid() == uuid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Give every artifact lacking one a `relatedDocument` edge to `primary`.
    pub fn ensure_related_document(&mut self, primary: Uuid) {
        for artifact in &mut self.artifacts {
            if !artifact.has_relationship(RELATED_DOCUMENT) {
                artifact.relate(RELATED_DOCUMENT, primary);
            }
        }
    }

    /// Resolve pending targets on the primary and on every derived artifact,
    /// looking in this collection first and in the batch linker second.
    pub fn resolve(&mut self, primary: &mut Artifact, linker: &LinkerContext) {
        let index = &self.index;
        let lookup = |key: &IdentityKey| index.get(key).copied().or_else(|| linker.lookup(key));
        resolve_artifact(primary, lookup);
        for artifact in &mut self.artifacts {
            resolve_artifact(artifact, lookup);
        }
    }

    pub fn take(&mut self) -> Vec<Artifact> {
        self.index.clear();
        std::mem::take(&mut self.artifacts)
    }
}
