//! Relationship linking.
//!
//! The [`LinkerContext`] is a per-batch index from [`IdentityKey`] to the
//! UUID of the artifact that last registered it. It is filled while phase 1
//! runs over the batch in upload order and is read-only during phase 2.

use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

pub use crate::model::{IdentityKey, QNameKind};
use crate::model::{Artifact, RelationshipTarget};

/// A relationship target that could not be resolved within the batch.
///
/// This is a diagnostic, not a failure: the reference may legitimately
/// point outside the batch.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Unresolved '{relationship_type}' reference from {artifact_name} ({artifact}) to {key}")]
pub struct UnresolvedReference {
    pub artifact: Uuid,
    pub artifact_name: String,
    pub relationship_type: String,
    pub key: IdentityKey,
}

/// Batch-wide identity index. Last write wins.
#[derive(Debug, Clone, Default)]
pub struct LinkerContext {
    index: IndexMap<IdentityKey, Uuid>,
}

impl LinkerContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key. An existing entry is replaced and moves to the end,
    /// so iteration order follows derivation order.
    pub fn register(&mut self, key: IdentityKey, uuid: Uuid) {
        if let Some(previous) = self.index.shift_remove(&key) {
            if previous != uuid {
                tracing::trace!(%key, %previous, %uuid, "identity key overwritten");
            }
        }
        self.index.insert(key, uuid);
    }

    /// Register every key the artifact is addressable by.
    pub fn register_artifact(&mut self, artifact: &Artifact) {
        for key in IdentityKey::for_artifact(artifact) {
            self.register(key, artifact.uuid());
        }
    }

    pub fn lookup(&self, key: &IdentityKey) -> Option<Uuid> {
        self.index.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &IdentityKey> {
        self.index.keys()
    }
}

/// Resolve an artifact's unresolved targets with `resolve`, returning
/// diagnostics for those still unresolved afterwards.
pub fn resolve_artifact(
    artifact: &mut Artifact,
    mut resolve: impl FnMut(&IdentityKey) -> Option<Uuid>,
) -> Vec<UnresolvedReference> {
    let mut unresolved = Vec::new();
    for relationship in &mut artifact.relationships {
        if let RelationshipTarget::Unresolved(key) = &relationship.target {
            match resolve(key) {
                Some(uuid) => relationship.target = RelationshipTarget::Resolved(uuid),
                None => unresolved.push((relationship.relationship_type.clone(), key.clone())),
            }
        }
    }
    unresolved
        .into_iter()
        .map(|(relationship_type, key)| UnresolvedReference {
            artifact: artifact.uuid(),
            artifact_name: artifact.name.clone(),
            relationship_type,
            key,
        })
        .collect()
}

/// Diagnostics for every target still awaiting resolution.
pub fn pending_references(artifact: &Artifact) -> Vec<UnresolvedReference> {
    artifact
        .unresolved()
        .filter_map(|r| match &r.target {
            RelationshipTarget::Unresolved(key) => Some(UnresolvedReference {
                artifact: artifact.uuid(),
                artifact_name: artifact.name.clone(),
                relationship_type: r.relationship_type.clone(),
                key: key.clone(),
            }),
            RelationshipTarget::Resolved(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ArtifactKind;

    #[test]
    fn test_last_write_wins() {
        let mut ctx = LinkerContext::new();
        let key = IdentityKey::XsdDocument("urn:orders".into());
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let other = IdentityKey::JavaClass("a.B".into());

        ctx.register(key.clone(), first);
        ctx.register(other.clone(), Uuid::new_v4());
        ctx.register(key.clone(), second);

        assert_eq!(ctx.lookup(&key), Some(second));
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.keys().last(), Some(&key));
    }

    #[test]
    fn test_resolve_artifact_reports_unresolved() {
        let target = Uuid::new_v4();
        let known = IdentityKey::qname(QNameKind::Element, "urn:t", "a");
        let unknown = IdentityKey::qname(QNameKind::Element, "urn:t", "missing");

        let mut artifact = Artifact::new(ArtifactKind::Part.into(), "p");
        artifact.relate_by_key("element", known.clone());
        artifact.relate_by_key("element", unknown.clone());

        let diagnostics = resolve_artifact(&mut artifact, |k| (k == &known).then_some(target));

        assert_eq!(artifact.targets_of("element"), vec![target]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].key, unknown);
        assert!(diagnostics[0].to_string().contains("missing"));
    }
}
