//! Artifact data model.
//!
//! ```text
//! Artifact
//! ├── uuid (immutable)
//! ├── artifact_type: ArtifactType  (Core(ArtifactKind) | Extended { .. })
//! ├── properties: IndexMap<String, String>
//! ├── classifications: IndexSet<String>
//! └── relationships: Vec<Relationship>  (Resolved(uuid) | Unresolved(IdentityKey))
//! ```

mod artifact;
mod artifact_type;
mod content;
mod identity;

pub use artifact::{
    Artifact, AuditInfo, EXPANDED_FROM_DOCUMENT, RELATED_DOCUMENT, Relationship,
    RelationshipTarget,
};
pub use artifact_type::{ArtifactKind, ArtifactType, EXTENDED_MODEL};
pub use content::{ArtifactContent, ContentMetadata, base_name};
pub use identity::{ARCHIVE_PATH_PROPERTY, IdentityKey, QNameKind, is_java_type};
