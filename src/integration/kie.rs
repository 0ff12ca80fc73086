//! Kie (Drools/jBPM) knowledge archives.

use super::{INTEGRATION_PRIORITY, zip_contains};
use crate::detect::ArtifactTypeDetector;
use crate::expand::{
    ArchiveContext, ArtifactFilter, CandidateArtifact, DefaultMetaDataFactory, ExpanderProvider,
    MetaDataFactory,
};
use crate::model::{Artifact, ArtifactContent, ArtifactType, base_name};

pub const KIE_JAR_ARCHIVE: &str = "KieJarArchive";
pub const KIE_XML_DOCUMENT: &str = "KieXmlDocument";
pub const BPMN_DOCUMENT: &str = "BpmnDocument";
pub const DROOLS_DOCUMENT: &str = "DroolsDocument";

/// Descriptor that marks a jar as a Kie module.
pub const KMODULE_PATH: &str = "META-INF/kmodule.xml";

const BPMN_EXTENSIONS: &[&str] = &["bpmn", "bpmn2"];
const DROOLS_EXTENSIONS: &[&str] = &["drl", "rdrl", "dsl"];

/// Extended type of a Kie resource, by name.
fn classify(path: &str) -> Option<&'static str> {
    let name = base_name(path);
    let extension = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        _ if name == "kmodule.xml" => Some(KIE_XML_DOCUMENT),
        Some(ext) if BPMN_EXTENSIONS.contains(&ext) => Some(BPMN_DOCUMENT),
        Some(ext) if DROOLS_EXTENSIONS.contains(&ext) => Some(DROOLS_DOCUMENT),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KieDetector;

impl ArtifactTypeDetector for KieDetector {
    fn name(&self) -> &'static str {
        "kie"
    }

    fn priority(&self) -> i32 {
        INTEGRATION_PRIORITY
    }

    fn detect(&self, content: &ArtifactContent) -> Option<ArtifactType> {
        if let Some(kind) = classify(content.filename()) {
            return Some(ArtifactType::extended_document(kind));
        }
        zip_contains(content, KMODULE_PATH).then(|| ArtifactType::extended_document(KIE_JAR_ARCHIVE))
    }
}

/// Keeps the module descriptor, processes, rules and the POM.
#[derive(Debug, Clone, Copy, Default)]
pub struct KieArtifactFilter;

impl ArtifactFilter for KieArtifactFilter {
    fn accepts(&self, candidate: &CandidateArtifact<'_>, _context: &ArchiveContext) -> bool {
        if candidate.is_directory() {
            return false;
        }
        let path = candidate.path();
        path.eq_ignore_ascii_case(KMODULE_PATH)
            || candidate.base_name() == "pom.xml"
            || classify(path).is_some_and(|kind| kind != KIE_XML_DOCUMENT)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KieMetaDataFactory {
    inner: DefaultMetaDataFactory,
}

impl MetaDataFactory for KieMetaDataFactory {
    fn create_metadata(&self, candidate: &CandidateArtifact<'_>, context: &ArchiveContext) -> Artifact {
        let mut artifact = self.inner.create_metadata(candidate, context);
        if let Some(kind) = classify(candidate.path()) {
            artifact.artifact_type = ArtifactType::extended_document(kind);
        }
        artifact
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KieExpanderProvider {
    filter: KieArtifactFilter,
    factory: KieMetaDataFactory,
}

impl ExpanderProvider for KieExpanderProvider {
    fn name(&self) -> &'static str {
        "kie"
    }

    fn priority(&self) -> i32 {
        INTEGRATION_PRIORITY
    }

    fn accepts(&self, archive_type: &ArtifactType) -> bool {
        archive_type.is_extended_type(KIE_JAR_ARCHIVE)
    }

    fn archive_type(&self) -> Option<ArtifactType> {
        Some(ArtifactType::extended_document(KIE_JAR_ARCHIVE))
    }

    fn path_hints(&self) -> &[&'static str] {
        &[KMODULE_PATH]
    }

    fn filter(&self) -> &dyn ArtifactFilter {
        &self.filter
    }

    fn metadata_factory(&self) -> &dyn MetaDataFactory {
        &self.factory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;
    use crate::expand::ArchiveExpander;
    use crate::integration::fixtures::zip;
    use crate::registry::Registry;
    use rstest::rstest;

    #[rstest]
    #[case("META-INF/kmodule.xml", Some(KIE_XML_DOCUMENT))]
    #[case("processes/order.bpmn2", Some(BPMN_DOCUMENT))]
    #[case("process.BPMN", Some(BPMN_DOCUMENT))]
    #[case("rules/discount.drl", Some(DROOLS_DOCUMENT))]
    #[case("rules/discount.rdrl", Some(DROOLS_DOCUMENT))]
    #[case("rules/lang.dsl", Some(DROOLS_DOCUMENT))]
    #[case("pom.xml", None)]
    #[case("com/example/Rule.class", None)]
    fn test_classify(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(classify(path), expected);
    }

    #[test]
    fn test_detects_kjar_by_descriptor() {
        let bytes = zip(&[(KMODULE_PATH, b"<kmodule/>")]);
        let detected = KieDetector.detect(&ArtifactContent::new("rules.jar", bytes));
        assert_eq!(detected, Some(ArtifactType::extended_document(KIE_JAR_ARCHIVE)));

        let plain = zip(&[("a.txt", b"a")]);
        assert_eq!(KieDetector.detect(&ArtifactContent::new("plain.jar", plain)), None);
    }

    #[test]
    fn test_expansion_keeps_kie_resources() {
        let bytes = zip(&[
            (KMODULE_PATH, b"<kmodule xmlns=\"http://www.drools.org/xsd/kmodule\"/>"),
            ("META-INF/maven/org.example/rules/pom.xml", b"<project/>"),
            ("META-INF/maven/org.example/rules/pom.properties", b"version=1"),
            ("processes/order.bpmn2", b"<definitions/>"),
            ("rules/discount.drl", b"rule \"discount\" end"),
            ("com/example/Fact.class", b"\xca\xfe\xba\xbe"),
            ("readme.txt", b"notes"),
        ]);
        let config = IngestConfig::default();
        let registry = Registry::with_defaults(&config);
        let content = ArtifactContent::new("rules.jar", bytes);
        let archive_type = registry.detectors().detect(&content);
        assert!(archive_type.is_extended_type(KIE_JAR_ARCHIVE));

        let expander = ArchiveExpander::open(&content, Some(archive_type), &registry, &config).unwrap();
        assert_eq!(expander.provider_name(), "kie");
        let entries = expander.expand(None).unwrap();

        let types: Vec<_> = entries
            .iter()
            .map(|e| (e.path.as_str(), e.artifact.artifact_type.type_name().to_string()))
            .collect();
        assert_eq!(
            types,
            vec![
                (KMODULE_PATH, KIE_XML_DOCUMENT.to_string()),
                ("META-INF/maven/org.example/rules/pom.xml", "MavenPom".to_string()),
                ("processes/order.bpmn2", BPMN_DOCUMENT.to_string()),
                ("rules/discount.drl", DROOLS_DOCUMENT.to_string()),
            ]
        );
    }
}
