//! Built-in extension and root-element based detection.

use indexmap::IndexMap;

use super::ArtifactTypeDetector;
use crate::model::{ArtifactContent, ArtifactKind, ArtifactType};
use crate::xml::{ns, sniff_root};

/// Extended type names assigned by the built-in detector.
pub mod archive_types {
    pub const JAVA_ARCHIVE: &str = "JavaArchive";
    pub const JAVA_WEB_APPLICATION: &str = "JavaWebApplication";
    pub const JAVA_ENTERPRISE_APPLICATION: &str = "JavaEnterpriseApplication";
    pub const ZIP_ARCHIVE: &str = "ZipArchive";
    pub const JAVA_CLASS: &str = "JavaClass";
    pub const JAVA_SOURCE: &str = "JavaSource";
    pub const MAVEN_POM: &str = "MavenPom";

    /// Types the built-in detector gives to zip-based archives.
    pub const ARCHIVES: &[&str] = &[
        JAVA_ARCHIVE,
        JAVA_WEB_APPLICATION,
        JAVA_ENTERPRISE_APPLICATION,
        ZIP_ARCHIVE,
    ];
}

use archive_types::*;

/// Extensions that denote a zip-based archive.
const ARCHIVE_EXTENSIONS: &[&str] = &["jar", "war", "ear", "zip", "sar", "rar", "kjar", "vdb"];

/// Classifies by extension, then by XML root element.
#[derive(Debug, Clone, Default)]
pub struct DefaultArtifactTypeDetector {
    extension_hints: IndexMap<String, String>,
}

impl DefaultArtifactTypeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configured `extension -> extended type` hints, consulted before the
    /// built-in table.
    pub fn with_extension_hints(mut self, hints: &IndexMap<String, String>) -> Self {
        for (ext, extended_type) in hints {
            self.extension_hints
                .insert(ext.to_ascii_lowercase(), extended_type.clone());
        }
        self
    }

    fn sniff_xml(content: &ArtifactContent) -> Option<ArtifactType> {
        let (namespace, local) = sniff_root(content.bytes())?;
        let kind = match (namespace.as_str(), local.as_str()) {
            (ns::XSD, "schema") => ArtifactKind::XsdDocument,
            (ns::WSDL, "definitions") => ArtifactKind::WsdlDocument,
            (ns::POLICY | ns::POLICY_2004, "Policy") => ArtifactKind::PolicyDocument,
            (ns::MAVEN_POM | "", "project") if content.base_name() == "pom.xml" => {
                return Some(ArtifactType::extended_document(MAVEN_POM));
            }
            _ => ArtifactKind::XmlDocument,
        };
        Some(kind.into())
    }
}

impl ArtifactTypeDetector for DefaultArtifactTypeDetector {
    fn name(&self) -> &'static str {
        "default"
    }

    fn detect(&self, content: &ArtifactContent) -> Option<ArtifactType> {
        let extension = content.extension();

        if let Some(hint) = extension.as_deref().and_then(|e| self.extension_hints.get(e)) {
            return Some(ArtifactType::extended_document(hint.clone()));
        }
        if content.base_name() == "pom.xml" || extension.as_deref() == Some("pom") {
            return Some(ArtifactType::extended_document(MAVEN_POM));
        }

        let extended = |name: &str| Some(ArtifactType::extended_document(name));
        match extension.as_deref() {
            Some("xsd") => Some(ArtifactKind::XsdDocument.into()),
            Some("wsdl") => Some(ArtifactKind::WsdlDocument.into()),
            Some("wspolicy") => Some(ArtifactKind::PolicyDocument.into()),
            Some("class") => extended(JAVA_CLASS),
            Some("java") => extended(JAVA_SOURCE),
            Some("jar") => extended(JAVA_ARCHIVE),
            Some("war") => extended(JAVA_WEB_APPLICATION),
            Some("ear") => extended(JAVA_ENTERPRISE_APPLICATION),
            Some("zip") => extended(ZIP_ARCHIVE),
            Some("xml") => Self::sniff_xml(content).or(Some(ArtifactKind::XmlDocument.into())),
            _ if content.looks_like_xml() => Self::sniff_xml(content),
            _ => None,
        }
    }

    fn is_archive(&self, content: &ArtifactContent) -> Option<bool> {
        let known = content
            .extension()
            .is_some_and(|e| ARCHIVE_EXTENSIONS.contains(&e.as_str()));
        (known && content.is_zip()).then_some(true)
    }

    fn allow_expansion_from_archive(
        &self,
        content: &ArtifactContent,
        _context: &crate::expand::ArchiveContext,
    ) -> Option<bool> {
        // Class files are only kept when an integration asks for them.
        content.has_extension("class").then_some(false)
    }
}
