//! Ingestion entry points and resource cleanup.

use artificer::model::{ARCHIVE_PATH_PROPERTY, EXPANDED_FROM_DOCUMENT};
use artificer::{ArchiveContainer, ArtifactKind, IngestConfig, Ingestor, Registry, Upload};

use crate::helpers::{COMMON_XSD, ORDERS_XSD, files_under, registry, scoped_config, zip};

#[test]
fn test_archive_entries_link_within_the_archive() {
    let (_root, config) = scoped_config();
    let registry = registry(&config);
    let bytes = zip(&[
        ("schemas/orders.xsd", ORDERS_XSD.as_bytes()),
        ("schemas/common.xsd", COMMON_XSD.as_bytes()),
    ]);
    let ingest = Ingestor::new(&registry, &config)
        .ingest_archive(Upload::new("schemas.zip", bytes))
        .unwrap();

    let orders = &ingest.entries[0].primary;
    let common = &ingest.entries[1].primary;
    assert_eq!(orders.property(ARCHIVE_PATH_PROPERTY), Some("schemas/orders.xsd"));
    assert_eq!(
        orders.targets_of(artificer::derive::xsd::IMPORTED_XSDS),
        vec![common.uuid()]
    );
    assert!(ingest.unresolved.is_empty());
    assert!(ingest.failures.is_empty());
}

#[test]
fn test_container_round_trips_final_metadata() {
    let (root, config) = scoped_config();
    let registry = registry(&config);
    let bytes = zip(&[("orders.xsd", ORDERS_XSD.as_bytes()), ("notes.txt", b"notes")]);
    let ingest = Ingestor::new(&registry, &config)
        .ingest_archive(Upload::new("bundle.zip", bytes))
        .unwrap();

    let packed = ingest.container.pack().unwrap();
    let reopened = ArchiveContainer::open_in(&packed, Some(root.path())).unwrap();
    let schema = reopened.get_entry("orders.xsd").unwrap().artifact();
    assert_eq!(schema.uuid(), ingest.entries[0].primary.uuid());
    assert_eq!(schema.namespace.as_deref(), Some("urn:orders"));
    assert_eq!(
        schema.targets_of(EXPANDED_FROM_DOCUMENT),
        vec![ingest.primary.primary.uuid()]
    );
    assert!(schema.content.is_some());
    assert_eq!(
        reopened.read_content("orders.xsd").unwrap().as_deref(),
        Some(ORDERS_XSD.as_bytes())
    );
}

#[test]
fn test_nested_entries_are_ingested() {
    let (_root, config) = scoped_config();
    let registry = registry(&config);
    let inner = zip(&[("common.xsd", COMMON_XSD.as_bytes())]);
    let bytes = zip(&[("orders.xsd", ORDERS_XSD.as_bytes()), ("lib/common.jar", &inner)]);
    let ingest = Ingestor::new(&registry, &config)
        .ingest_archive(Upload::new("app.zip", bytes))
        .unwrap();

    let paths: Vec<_> = ingest.container.entries().map(|e| e.path().to_string()).collect();
    assert_eq!(paths, vec!["orders.xsd", "lib/common.jar", "lib/common.jar!/common.xsd"]);

    let jar = &ingest.entries[1].primary;
    let nested = &ingest.entries[2].primary;
    assert_eq!(nested.artifact_type.kind(), Some(ArtifactKind::XsdDocument));
    assert_eq!(nested.targets_of(EXPANDED_FROM_DOCUMENT), vec![jar.uuid()]);
    assert_eq!(
        ingest.entries[0].primary.targets_of(artificer::derive::xsd::IMPORTED_XSDS),
        vec![nested.uuid()]
    );
}

#[test]
fn test_nested_archive_at_depth_limit_is_kept_unexpanded() {
    let (_root, config) = scoped_config();
    let config = config.with_max_nesting_depth(1);
    let registry = registry(&config);
    let inner = zip(&[("common.xsd", COMMON_XSD.as_bytes())]);
    let bytes = zip(&[("readme.txt", b"notes"), ("lib/common.jar", &inner)]);
    let ingest = Ingestor::new(&registry, &config)
        .ingest_archive(Upload::new("app.zip", bytes))
        .unwrap();

    let paths: Vec<_> = ingest.container.entries().map(|e| e.path().to_string()).collect();
    assert_eq!(paths, vec!["readme.txt", "lib/common.jar"]);
    assert!(
        ingest.container.read_content("lib/common.jar").unwrap().is_some_and(|b| b == inner)
    );
}

#[test]
fn test_work_directories_are_released_after_ingestion() {
    let (root, config) = scoped_config();
    let registry = registry(&config);
    let inner = zip(&[("common.xsd", COMMON_XSD.as_bytes())]);
    let bytes = zip(&[("lib/common.jar", &inner)]);
    {
        let ingest = Ingestor::new(&registry, &config)
            .ingest_archive(Upload::new("app.zip", bytes))
            .unwrap();
        // Only the container's own work directory survives the call.
        let dirs: Vec<_> = std::fs::read_dir(root.path()).unwrap().collect();
        assert_eq!(dirs.len(), 1);
        assert_eq!(ingest.container.len(), 2);
    }
    assert!(files_under(root.path()).is_empty());
}

#[test]
fn test_failed_ingestion_releases_work_directories() {
    let (root, config) = scoped_config();
    let registry = registry(&config);
    let result = Ingestor::new(&registry, &config)
        .ingest_archive(Upload::new("app.zip", b"PK\x03\x04broken".to_vec()));
    assert!(result.is_err());
    assert!(files_under(root.path()).is_empty());
}

#[test]
fn test_registry_is_shared_across_threads() {
    let config = IngestConfig::default();
    let registry = std::sync::Arc::new(Registry::with_defaults(&config));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let registry = registry.clone();
            let config = config.clone();
            std::thread::spawn(move || {
                let upload = Upload::new(format!("common-{i}.xsd"), COMMON_XSD);
                Ingestor::new(&registry, &config).ingest(upload).unwrap().primaries.len()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 1);
    }
}

#[test]
fn test_upload_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.xsd");
    std::fs::write(&path, ORDERS_XSD).unwrap();

    let upload = Upload::from_file(&path).unwrap();
    assert_eq!(upload.filename, "orders.xsd");
    assert_eq!(upload.bytes, ORDERS_XSD.as_bytes());
    assert!(Upload::from_file(dir.path().join("missing.xsd")).is_err());
}
