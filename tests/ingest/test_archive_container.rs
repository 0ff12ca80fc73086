//! Container packing, reopening and work directory lifetime.

use artificer::archive::{METADATA_SUFFIX, read_toc};
use artificer::{ArchiveContainer, Artifact, ArtifactKind, ArtifactType, IngestError};

use crate::helpers::{files_under, zip};

fn artifact(name: &str) -> Artifact {
    Artifact::new(ArtifactType::document(), name)
        .with_description("fixture")
        .with_property("origin", "test")
}

#[test]
fn test_pack_and_reopen_preserves_entries() {
    let root = tempfile::tempdir().unwrap();
    let mut container = ArchiveContainer::create_in(Some(root.path())).unwrap();
    let readme = artifact("readme.txt");
    let schema = Artifact::new(ArtifactKind::XsdDocument.into(), "orders.xsd").with_namespace("urn:orders");
    let note = artifact("note");
    container.add_entry("docs/readme.txt", &readme, Some(&b"hello"[..])).unwrap();
    container.add_entry("schemas/orders.xsd", &schema, Some(&b"<xs:schema/>"[..])).unwrap();
    container.add_entry::<&[u8]>("notes/note", &note, None).unwrap();

    let bytes = container.pack().unwrap();
    let toc: Vec<_> = read_toc(&bytes).unwrap().into_iter().map(|e| e.path).collect();
    assert_eq!(
        toc,
        vec![
            "docs/readme.txt".to_string(),
            format!("docs/readme.txt{METADATA_SUFFIX}"),
            "schemas/orders.xsd".to_string(),
            format!("schemas/orders.xsd{METADATA_SUFFIX}"),
            format!("notes/note{METADATA_SUFFIX}"),
        ]
    );

    let reopened = ArchiveContainer::open_in(&bytes, Some(root.path())).unwrap();
    let paths: Vec<_> = reopened.entries().map(|e| e.path().to_string()).collect();
    assert_eq!(paths, vec!["docs/readme.txt", "schemas/orders.xsd", "notes/note"]);

    let restored = reopened.get_entry("schemas/orders.xsd").unwrap().artifact();
    assert_eq!(restored.uuid(), schema.uuid());
    assert_eq!(restored.artifact_type, schema.artifact_type);
    assert_eq!(restored.namespace.as_deref(), Some("urn:orders"));
    assert_eq!(
        reopened.read_content("docs/readme.txt").unwrap().as_deref(),
        Some(&b"hello"[..])
    );
    let restored_note = reopened.get_entry("notes/note").unwrap();
    assert!(!restored_note.has_content());
    assert_eq!(restored_note.artifact().property("origin"), Some("test"));
}

#[test]
fn test_entry_without_metadata_is_rejected() {
    let bytes = zip(&[("orphan.txt", b"no sidecar")]);
    let error = ArchiveContainer::open(&bytes).unwrap_err();
    assert!(matches!(error, IngestError::ArchiveFormat(_)));
}

#[test]
fn test_duplicate_and_invalid_paths() {
    let mut container = ArchiveContainer::create().unwrap();
    let a = artifact("a");
    container.add_entry("a.txt", &a, Some(&b"a"[..])).unwrap();
    assert!(container.add_entry("a.txt", &a, Some(&b"b"[..])).is_err());
    assert!(container.add_entry("../escape.txt", &a, Some(&b"b"[..])).is_err());
    assert!(container.add_entry("/absolute.txt", &a, Some(&b"b"[..])).is_err());
    assert!(
        container
            .add_entry(&format!("a.txt{METADATA_SUFFIX}"), &a, Some(&b"b"[..]))
            .is_err()
    );
    assert_eq!(container.len(), 1);
}

#[test]
fn test_update_and_remove_keep_order() {
    let mut container = ArchiveContainer::create().unwrap();
    for name in ["one", "two", "three"] {
        container.add_entry(name, &artifact(name), Some(name.as_bytes())).unwrap();
    }
    let renamed = artifact("two").with_version("2.0");
    container.update_entry("two", &renamed, Some(&b"second"[..])).unwrap();
    container.remove_entry("one").unwrap();

    let paths: Vec<_> = container.entries().map(|e| e.path().to_string()).collect();
    assert_eq!(paths, vec!["two", "three"]);
    assert_eq!(
        container.get_entry("two").unwrap().artifact().version.as_deref(),
        Some("2.0")
    );
    assert_eq!(container.read_content("two").unwrap().as_deref(), Some(&b"second"[..]));
    assert!(container.remove_entry("one").is_err());
}

#[test]
fn test_close_is_idempotent_and_removes_work_dir() {
    let root = tempfile::tempdir().unwrap();
    let mut container = ArchiveContainer::create_in(Some(root.path())).unwrap();
    container.add_entry("a.txt", &artifact("a"), Some(&b"a"[..])).unwrap();
    assert!(!files_under(root.path()).is_empty());

    container.close().unwrap();
    container.close().unwrap();
    assert!(container.is_closed());
    assert!(files_under(root.path()).is_empty());
    assert!(container.pack().is_err());
}

#[test]
fn test_drop_removes_work_dir() {
    let root = tempfile::tempdir().unwrap();
    {
        let mut container = ArchiveContainer::create_in(Some(root.path())).unwrap();
        container.add_entry("a/b/c.txt", &artifact("c"), Some(&b"c"[..])).unwrap();
    }
    assert!(files_under(root.path()).is_empty());
}
