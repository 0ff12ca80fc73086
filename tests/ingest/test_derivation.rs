//! Two-phase derivation across uploads in one batch.

use artificer::derive::{java, pom, xsd};
use artificer::model::RELATED_DOCUMENT;
use artificer::{ArtifactKind, ArtifactType, IdentityKey, Ingestor, Upload};
use rstest::rstest;

use crate::helpers::{COMMON_XSD, ORDERS_XSD, POM, class_file, registry, scoped_config};

#[test]
fn test_import_resolves_across_uploads() {
    let (_root, config) = scoped_config();
    let registry = registry(&config);
    let result = Ingestor::new(&registry, &config)
        .ingest_batch(vec![
            Upload::new("orders.xsd", ORDERS_XSD),
            Upload::new("common.xsd", COMMON_XSD),
        ])
        .unwrap();

    let orders = &result.primaries[0].primary;
    let common = &result.primaries[1].primary;
    assert_eq!(orders.targets_of(xsd::IMPORTED_XSDS), vec![common.uuid()]);
    assert!(result.unresolved.is_empty());
}

#[test]
fn test_unresolved_import_is_reported() {
    let (_root, config) = scoped_config();
    let registry = registry(&config);
    let result = Ingestor::new(&registry, &config)
        .ingest(Upload::new("orders.xsd", ORDERS_XSD))
        .unwrap();

    assert_eq!(result.unresolved.len(), 1);
    let reference = &result.unresolved[0];
    assert_eq!(reference.relationship_type, xsd::IMPORTED_XSDS);
    assert_eq!(reference.key, IdentityKey::XsdDocument("urn:common".to_string()));
    assert_eq!(reference.artifact_name, "orders.xsd");
}

#[test]
fn test_duplicate_namespace_last_write_wins() {
    let (_root, config) = scoped_config();
    let registry = registry(&config);
    let result = Ingestor::new(&registry, &config)
        .ingest_batch(vec![
            Upload::new("common-v1.xsd", COMMON_XSD),
            Upload::new("orders.xsd", ORDERS_XSD),
            Upload::new("common-v2.xsd", COMMON_XSD),
        ])
        .unwrap();

    let orders = &result.primaries[1].primary;
    let latest = &result.primaries[2].primary;
    assert_eq!(orders.targets_of(xsd::IMPORTED_XSDS), vec![latest.uuid()]);

    for index in [0, 2] {
        let upload = &result.primaries[index];
        assert_eq!(
            upload.derived[0].targets_of(RELATED_DOCUMENT),
            vec![upload.primary.uuid()]
        );
    }
}

#[test]
fn test_every_derived_artifact_relates_to_its_document_once() {
    let (_root, config) = scoped_config();
    let registry = registry(&config);
    let result = Ingestor::new(&registry, &config)
        .ingest(Upload::new("orders.xsd", ORDERS_XSD))
        .unwrap();

    let primary = &result.primaries[0];
    assert_eq!(primary.derived.len(), 2);
    for derived in &primary.derived {
        assert_eq!(derived.targets_of(RELATED_DOCUMENT), vec![primary.primary.uuid()]);
        assert_eq!(derived.namespace.as_deref(), Some("urn:orders"));
    }
    let kinds: Vec<_> = primary.derived.iter().map(|a| a.artifact_type.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            Some(ArtifactKind::ElementDeclaration),
            Some(ArtifactKind::ComplexTypeDeclaration)
        ]
    );
}

#[rstest]
#[case(0x0021, java::JAVA_CLASS)]
#[case(0x0601, java::JAVA_INTERFACE)]
#[case(0x4031, java::JAVA_ENUM)]
fn test_bytecode_is_named_from_header(#[case] flags: u16, #[case] expected: &str) {
    let (_root, config) = scoped_config();
    let registry = registry(&config);
    let bytes = class_file("org/example/orders/Order", flags);
    let result = Ingestor::new(&registry, &config)
        .ingest(Upload::new("Order.class", bytes))
        .unwrap();

    let primary = &result.primaries[0].primary;
    assert_eq!(primary.name, "org.example.orders.Order");
    assert!(primary.artifact_type.is_extended_type(expected));
    assert_eq!(primary.property(java::PACKAGE_NAME), Some("org.example.orders"));
    assert_eq!(primary.property(java::CLASS_NAME), Some("Order"));
}

#[test]
fn test_truncated_bytecode_fails() {
    let (_root, config) = scoped_config();
    let registry = registry(&config);
    let error = Ingestor::new(&registry, &config)
        .ingest(Upload::new("Order.class", b"\xca\xfe\xba\xbe\x00".to_vec()))
        .unwrap_err();
    assert!(error.is_content_error());
}

#[test]
fn test_pom_inherits_from_parent() {
    let (_root, config) = scoped_config();
    let registry = registry(&config);
    let result = Ingestor::new(&registry, &config)
        .ingest(Upload::new("pom.xml", POM))
        .unwrap();

    let primary = &result.primaries[0].primary;
    assert!(primary.artifact_type.is_extended_type(pom::MAVEN_POM));
    assert_eq!(primary.name, "Order Service");
    assert_eq!(primary.version.as_deref(), Some("1.4.0"));
    assert_eq!(primary.property(pom::GROUP_ID), Some("org.example"));
    assert_eq!(primary.property(pom::ARTIFACT_ID), Some("orders"));
    assert_eq!(primary.property(pom::PARENT_ARTIFACT_ID), Some("parent"));
    assert_eq!(primary.property("maven.property.java.version"), Some("17"));
}

#[test]
fn test_type_hint_selects_builders() {
    let (_root, config) = scoped_config();
    let registry = registry(&config);
    let upload = Upload::new("schema.txt", COMMON_XSD).with_type_hint(ArtifactKind::XsdDocument.into());
    let result = Ingestor::new(&registry, &config).ingest(upload).unwrap();

    let primary = &result.primaries[0];
    assert_eq!(primary.primary.namespace.as_deref(), Some("urn:common"));
    assert_eq!(primary.derived.len(), 1);
    assert_eq!(
        primary.derived[0].artifact_type,
        ArtifactType::from(ArtifactKind::SimpleTypeDeclaration)
    );
}
