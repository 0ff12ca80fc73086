//! Artifacts and relationship edges.

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::artifact_type::ArtifactType;
use super::content::ContentMetadata;
use super::identity::IdentityKey;
use crate::config::DEFAULT_CREATOR;

/// Relationship from a derived artifact to the document it came from.
pub const RELATED_DOCUMENT: &str = "relatedDocument";

/// Relationship from an archive entry to the archive it was expanded from.
pub const EXPANDED_FROM_DOCUMENT: &str = "expandedFromDocument";

// ============================================================================
// RELATIONSHIPS
// ============================================================================

/// Target of a relationship edge.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipTarget {
    /// The target artifact is known.
    Resolved(Uuid),
    /// Awaiting resolution by identity key during linking.
    Unresolved(IdentityKey),
}

impl RelationshipTarget {
    pub fn uuid(&self) -> Option<Uuid> {
        match self {
            Self::Resolved(uuid) => Some(*uuid),
            Self::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// A typed edge from one artifact to another.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub relationship_type: String,
    pub target: RelationshipTarget,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub other_attributes: IndexMap<String, String>,
}

impl Relationship {
    pub fn new(relationship_type: impl Into<String>, target: RelationshipTarget) -> Self {
        Self {
            relationship_type: relationship_type.into(),
            target,
            other_attributes: IndexMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.other_attributes.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// AUDIT
// ============================================================================

/// Creation and modification stamps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditInfo {
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub last_modified_by: String,
    pub last_modified_at: DateTime<Utc>,
}

impl AuditInfo {
    pub fn new(creator: impl Into<String>) -> Self {
        let creator = creator.into();
        let now = Utc::now();
        Self {
            last_modified_by: creator.clone(),
            created_by: creator,
            created_at: now,
            last_modified_at: now,
        }
    }

    pub fn touch(&mut self, by: impl Into<String>) {
        self.last_modified_by = by.into();
        self.last_modified_at = Utc::now();
    }
}

impl Default for AuditInfo {
    fn default() -> Self {
        Self::new(DEFAULT_CREATOR)
    }
}

// ============================================================================
// ARTIFACT
// ============================================================================

/// A primary or derived artifact.
///
/// The UUID is fixed at construction; there is no setter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    uuid: Uuid,
    pub artifact_type: ArtifactType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Namespace of a qualified component, or a document's target namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Local part of a qualified component name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nc_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentMetadata>,
    #[serde(default)]
    pub audit: AuditInfo,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    pub classifications: IndexSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,
}

impl Artifact {
    /// Create an artifact with a fresh random UUID.
    pub fn new(artifact_type: ArtifactType, name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            artifact_type,
            name: name.into(),
            description: None,
            version: None,
            namespace: None,
            nc_name: None,
            content: None,
            audit: AuditInfo::default(),
            properties: IndexMap::new(),
            classifications: IndexSet::new(),
            relationships: Vec::new(),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_nc_name(mut self, nc_name: impl Into<String>) -> Self {
        self.nc_name = Some(nc_name.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.audit = AuditInfo::new(creator);
        self
    }

    // ------------------------------------------------------------------------
    // Properties and classifications
    // ------------------------------------------------------------------------

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Set a property only when the value is present and non-empty.
    pub fn set_property_opt(&mut self, key: impl Into<String>, value: Option<&str>) {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.set_property(key, value);
        }
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn remove_property(&mut self, key: &str) -> Option<String> {
        self.properties.shift_remove(key)
    }

    pub fn classify(&mut self, uri: impl Into<String>) {
        self.classifications.insert(uri.into());
    }

    // ------------------------------------------------------------------------
    // Relationships
    // ------------------------------------------------------------------------

    /// Add an edge to a known artifact.
    pub fn relate(&mut self, relationship_type: impl Into<String>, target: Uuid) {
        self.relationships.push(Relationship::new(
            relationship_type,
            RelationshipTarget::Resolved(target),
        ));
    }

    /// Add an edge awaiting resolution by identity key.
    pub fn relate_by_key(&mut self, relationship_type: impl Into<String>, key: IdentityKey) {
        self.relationships.push(Relationship::new(
            relationship_type,
            RelationshipTarget::Unresolved(key),
        ));
    }

    pub fn relationships_of<'a>(
        &'a self,
        relationship_type: &'a str,
    ) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.relationships
            .iter()
            .filter(move |r| r.relationship_type == relationship_type)
    }

    pub fn has_relationship(&self, relationship_type: &str) -> bool {
        self.relationships_of(relationship_type).next().is_some()
    }

    /// Resolved targets of the given relationship type.
    pub fn targets_of(&self, relationship_type: &str) -> Vec<Uuid> {
        self.relationships_of(relationship_type)
            .filter_map(|r| r.target.uuid())
            .collect()
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter().filter(|r| !r.target.is_resolved())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ArtifactKind;

    #[test]
    fn test_new_artifacts_get_distinct_uuids() {
        let a = Artifact::new(ArtifactType::document(), "a.txt");
        let b = Artifact::new(ArtifactType::document(), "a.txt");
        assert_ne!(a.uuid(), b.uuid());
    }

    #[test]
    fn test_properties_overwrite_by_key() {
        let mut artifact = Artifact::new(ArtifactType::document(), "a.txt")
            .with_property("color", "red")
            .with_property("size", "L");
        artifact.set_property("color", "blue");
        assert_eq!(artifact.properties.len(), 2);
        assert_eq!(artifact.property("color"), Some("blue"));

        artifact.set_property_opt("empty", Some(""));
        artifact.set_property_opt("missing", None);
        assert_eq!(artifact.properties.len(), 2);
    }

    #[test]
    fn test_relationship_queries() {
        let target = Uuid::new_v4();
        let mut artifact = Artifact::new(ArtifactKind::ElementDeclaration.into(), "order");
        artifact.relate(RELATED_DOCUMENT, target);
        artifact.relate_by_key("type", IdentityKey::XsdDocument("urn:x".into()));

        assert!(artifact.has_relationship(RELATED_DOCUMENT));
        assert_eq!(artifact.targets_of(RELATED_DOCUMENT), vec![target]);
        assert_eq!(artifact.unresolved().count(), 1);
    }

    #[test]
    fn test_serde_preserves_uuid() {
        let artifact = Artifact::new(ArtifactType::extended_document("JavaClass"), "a.b.C")
            .with_property("packageName", "a.b");
        let json = serde_json::to_string(&artifact).unwrap();
        let back: Artifact = serde_json::from_str(&json).unwrap();
        assert_eq!(back, artifact);
        assert!(!json.contains("description"));
    }
}
