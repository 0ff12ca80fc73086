//! Recursive archive expansion through the public API.

use artificer::model::{ARCHIVE_PATH_PROPERTY, EXPANDED_FROM_DOCUMENT};
use artificer::{ArchiveExpander, ArtifactContent, ArtifactKind, IngestConfig, IngestError};
use rstest::rstest;
use uuid::Uuid;

use crate::helpers::{ORDERS_XSD, class_file, files_under, registry, scoped_config, zip};

fn nested_application() -> Vec<u8> {
    let deep = zip(&[("deep/notes.txt", b"deep")]);
    let inner = zip(&[("schemas/orders.xsd", ORDERS_XSD.as_bytes()), ("deep.jar", &deep)]);
    zip(&[
        ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0"),
        ("readme.txt", b"top"),
        ("lib/inner.jar", &inner),
        ("org/example/Order.class", &class_file("org/example/Order", 0x0021)),
    ])
}

fn expand(config: &IngestConfig, bytes: Vec<u8>) -> Vec<(String, Vec<Uuid>)> {
    let registry = registry(config);
    let content = ArtifactContent::new("app.jar", bytes);
    let archive_type = registry.detectors().detect(&content);
    let parent = Uuid::new_v4();
    let mut expander = ArchiveExpander::open(&content, Some(archive_type), &registry, config).unwrap();
    let entries = expander.expand(Some(parent)).unwrap();
    expander.close().unwrap();
    entries
        .into_iter()
        .map(|e| {
            assert_eq!(e.parent_chain[0], parent);
            (e.path, e.parent_chain)
        })
        .collect()
}

#[test]
fn test_nested_archives_are_addressed_by_chain() {
    let (_root, config) = scoped_config();
    let paths: Vec<_> = expand(&config, nested_application())
        .into_iter()
        .map(|(path, chain)| (path, chain.len()))
        .collect();
    assert_eq!(
        paths,
        vec![
            ("readme.txt".to_string(), 1),
            ("lib/inner.jar".to_string(), 1),
            ("lib/inner.jar!/schemas/orders.xsd".to_string(), 2),
            ("lib/inner.jar!/deep.jar".to_string(), 2),
            ("lib/inner.jar!/deep.jar!/deep/notes.txt".to_string(), 3),
        ]
    );
}

#[rstest]
#[case(1, 2)]
#[case(2, 4)]
#[case(3, 5)]
fn test_nesting_depth_is_bounded(#[case] max_depth: usize, #[case] expected: usize) {
    let (_root, config) = scoped_config();
    let config = config.with_max_nesting_depth(max_depth);
    assert_eq!(expand(&config, nested_application()).len(), expected);
}

#[test]
fn test_entries_carry_provenance() {
    let (_root, config) = scoped_config();
    let registry = registry(&config);
    let content = ArtifactContent::new("app.jar", nested_application());
    let archive_type = registry.detectors().detect(&content);
    let parent = Uuid::new_v4();
    let expander = ArchiveExpander::open(&content, Some(archive_type), &registry, &config).unwrap();
    let entries = expander.expand(Some(parent)).unwrap();

    let inner = entries.iter().find(|e| e.path == "lib/inner.jar").unwrap();
    let schema = entries
        .iter()
        .find(|e| e.path == "lib/inner.jar!/schemas/orders.xsd")
        .unwrap();
    assert_eq!(schema.artifact.artifact_type.kind(), Some(ArtifactKind::XsdDocument));
    assert_eq!(schema.artifact.name, "orders.xsd");
    assert_eq!(
        schema.artifact.property(ARCHIVE_PATH_PROPERTY),
        Some("lib/inner.jar!/schemas/orders.xsd")
    );
    assert_eq!(
        schema.artifact.targets_of(EXPANDED_FROM_DOCUMENT),
        vec![inner.artifact.uuid()]
    );
    assert_eq!(inner.artifact.targets_of(EXPANDED_FROM_DOCUMENT), vec![parent]);
    assert_eq!(schema.parent_chain, vec![parent, inner.artifact.uuid()]);
    assert_eq!(schema.depth(), 2);
}

#[test]
fn test_work_directories_are_released() {
    let (root, config) = scoped_config();
    let registry = registry(&config);
    let content = ArtifactContent::new("app.jar", nested_application());
    let archive_type = registry.detectors().detect(&content);
    let mut expander = ArchiveExpander::open(&content, Some(archive_type), &registry, &config).unwrap();
    assert!(!files_under(root.path()).is_empty());

    expander.expand(None).unwrap();
    expander.close().unwrap();
    expander.close().unwrap();
    assert!(expander.is_closed());
    assert!(files_under(root.path()).is_empty());
}

#[test]
fn test_corrupt_top_level_archive() {
    let (root, config) = scoped_config();
    let registry = registry(&config);
    let content = ArtifactContent::new("broken.jar", b"PK\x03\x04truncated".to_vec());
    let error = ArchiveExpander::open(&content, None, &registry, &config).unwrap_err();
    assert!(matches!(error, IngestError::Expansion { .. }));
    assert!(files_under(root.path()).is_empty());
}

#[test]
fn test_corrupt_nested_archive_is_kept_opaque() {
    let (_root, config) = scoped_config();
    let bytes = zip(&[("lib/broken.jar", b"PK\x03\x04truncated"), ("after.txt", b"after")]);
    let registry = registry(&config);
    let content = ArtifactContent::new("app.jar", bytes);
    let expander = ArchiveExpander::open(&content, None, &registry, &config).unwrap();
    let entries = expander.expand(None).unwrap();

    let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["lib/broken.jar", "after.txt"]);
    assert!(entries[0].artifact.artifact_type.is_generic());
}
