//! Identity keys: symbolic names used to resolve relationships before
//! target UUIDs are known.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::artifact::Artifact;
use super::artifact_type::{ArtifactKind, ArtifactType};

/// Custom property holding an entry's path inside its source archive.
pub const ARCHIVE_PATH_PROPERTY: &str = "batch.archive-path";

/// What a qualified name refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QNameKind {
    Element,
    Attribute,
    Type,
    Message,
    PortType,
    Binding,
    Service,
}

impl QNameKind {
    /// The kind a built-in artifact kind is addressable by.
    pub fn of(kind: ArtifactKind) -> Option<Self> {
        match kind {
            ArtifactKind::ElementDeclaration => Some(Self::Element),
            ArtifactKind::AttributeDeclaration => Some(Self::Attribute),
            ArtifactKind::SimpleTypeDeclaration | ArtifactKind::ComplexTypeDeclaration => {
                Some(Self::Type)
            }
            ArtifactKind::Message => Some(Self::Message),
            ArtifactKind::PortType => Some(Self::PortType),
            ArtifactKind::Binding => Some(Self::Binding),
            ArtifactKind::WsdlService => Some(Self::Service),
            _ => None,
        }
    }
}

/// Format-specific symbolic name of an artifact.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentityKey {
    /// Namespace + local name of a schema or WSDL component.
    QName {
        kind: QNameKind,
        namespace: String,
        local_name: String,
    },
    /// XML Schema document by target namespace.
    XsdDocument(String),
    /// WSDL document by target namespace.
    WsdlDocument(String),
    /// Java type by fully qualified class name.
    JavaClass(String),
    /// Archive entry by path.
    Path(String),
    /// Extended artifact by sub-type and name.
    Named { extended_type: String, name: String },
}

impl IdentityKey {
    pub fn qname(
        kind: QNameKind,
        namespace: impl Into<String>,
        local_name: impl Into<String>,
    ) -> Self {
        Self::QName {
            kind,
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }

    pub fn named(extended_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Named {
            extended_type: extended_type.into(),
            name: name.into(),
        }
    }

    /// Archive paths are normalized without a leading slash.
    pub fn path(path: impl AsRef<str>) -> Self {
        Self::Path(path.as_ref().trim_start_matches('/').to_string())
    }

    /// Every key under which the artifact can be found.
    pub fn for_artifact(artifact: &Artifact) -> Vec<IdentityKey> {
        let mut keys = Vec::new();
        let namespace = artifact.namespace.clone().unwrap_or_default();

        match &artifact.artifact_type {
            ArtifactType::Core(ArtifactKind::XsdDocument) => {
                keys.push(Self::XsdDocument(namespace));
            }
            ArtifactType::Core(ArtifactKind::WsdlDocument) => {
                keys.push(Self::WsdlDocument(namespace));
            }
            ArtifactType::Core(kind) => {
                if let (Some(qkind), Some(local)) = (QNameKind::of(*kind), &artifact.nc_name) {
                    keys.push(Self::qname(qkind, namespace, local.clone()));
                }
            }
            ArtifactType::Extended { extended_type, .. } => {
                if is_java_type(extended_type) {
                    keys.push(Self::JavaClass(artifact.name.clone()));
                } else if !artifact.name.is_empty() {
                    keys.push(Self::named(extended_type.clone(), artifact.name.clone()));
                }
            }
        }

        if let Some(path) = artifact.property(ARCHIVE_PATH_PROPERTY) {
            keys.push(Self::path(path));
        }
        keys
    }
}

/// Extended types that denote a Java class file.
pub fn is_java_type(extended_type: &str) -> bool {
    matches!(extended_type, "JavaClass" | "JavaInterface" | "JavaEnum")
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QName {
                kind,
                namespace,
                local_name,
            } => write!(f, "{kind:?} {{{namespace}}}{local_name}"),
            Self::XsdDocument(ns) => write!(f, "XsdDocument {{{ns}}}"),
            Self::WsdlDocument(ns) => write!(f, "WsdlDocument {{{ns}}}"),
            Self::JavaClass(name) => write!(f, "JavaClass {name}"),
            Self::Path(path) => write!(f, "Path {path}"),
            Self::Named {
                extended_type,
                name,
            } => write!(f, "{extended_type} {name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_declaration_key() {
        let artifact = Artifact::new(ArtifactKind::ElementDeclaration.into(), "order")
            .with_namespace("urn:orders")
            .with_nc_name("order");
        assert_eq!(
            IdentityKey::for_artifact(&artifact),
            vec![IdentityKey::qname(QNameKind::Element, "urn:orders", "order")]
        );
    }

    #[test]
    fn test_java_class_and_path_keys() {
        let artifact = Artifact::new(ArtifactType::extended_document("JavaClass"), "com.example.MyClass")
            .with_property(ARCHIVE_PATH_PROPERTY, "/com/example/MyClass.class");
        let keys = IdentityKey::for_artifact(&artifact);
        assert_eq!(keys[0], IdentityKey::JavaClass("com.example.MyClass".into()));
        assert_eq!(keys[1], IdentityKey::Path("com/example/MyClass.class".into()));
    }

    #[test]
    fn test_document_without_namespace_keys_on_empty() {
        let artifact = Artifact::new(ArtifactKind::XsdDocument.into(), "a.xsd");
        assert_eq!(
            IdentityKey::for_artifact(&artifact),
            vec![IdentityKey::XsdDocument(String::new())]
        );
    }
}
