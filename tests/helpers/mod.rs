//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use artificer::{IngestConfig, Registry};
use tempfile::TempDir;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

pub const ORDERS_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:orders">
  <xs:import namespace="urn:common" schemaLocation="common.xsd"/>
  <xs:element name="order" type="xs:string"/>
  <xs:complexType name="OrderType">
    <xs:sequence><xs:element name="line" type="xs:string"/></xs:sequence>
  </xs:complexType>
</xs:schema>"#;

pub const COMMON_XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:common">
  <xs:simpleType name="Code"><xs:restriction base="xs:string"/></xs:simpleType>
</xs:schema>"#;

pub const POM: &str = r#"<project xmlns="http://maven.apache.org/POM/4.0.0">
  <parent>
    <groupId>org.example</groupId>
    <artifactId>parent</artifactId>
    <version>1.4.0</version>
  </parent>
  <artifactId>orders</artifactId>
  <name>Order Service</name>
  <properties>
    <java.version>17</java.version>
  </properties>
</project>"#;

/// Build a zip holding the given entries in order.
pub fn zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (path, bytes) in entries {
        writer.start_file(*path, SimpleFileOptions::default()).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Minimal class file with no members, extending `java/lang/Object`.
pub fn class_file(internal_name: &str, access_flags: u16) -> Vec<u8> {
    let utf8 = |bytes: &mut Vec<u8>, s: &str| {
        bytes.push(1);
        bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
        bytes.extend_from_slice(s.as_bytes());
    };

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0xCAFE_BABE_u32.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes());
    bytes.extend_from_slice(&52u16.to_be_bytes());

    // #1 Utf8 name, #2 Class #1, #3 Utf8 super, #4 Class #3
    bytes.extend_from_slice(&5u16.to_be_bytes());
    utf8(&mut bytes, internal_name);
    bytes.push(7);
    bytes.extend_from_slice(&1u16.to_be_bytes());
    utf8(&mut bytes, "java/lang/Object");
    bytes.push(7);
    bytes.extend_from_slice(&3u16.to_be_bytes());

    bytes.extend_from_slice(&access_flags.to_be_bytes());
    bytes.extend_from_slice(&2u16.to_be_bytes());
    bytes.extend_from_slice(&4u16.to_be_bytes());
    bytes.extend_from_slice(&[0; 8]);
    bytes
}

/// A configuration whose work directories live under a fresh temp dir.
pub fn scoped_config() -> (TempDir, IngestConfig) {
    let root = tempfile::tempdir().unwrap();
    let config = IngestConfig::default().with_temp_dir(root.path());
    (root, config)
}

pub fn registry(config: &IngestConfig) -> Registry {
    Registry::with_defaults(config)
}

/// Every file and directory below `root`, excluding `root` itself.
pub fn files_under(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .collect()
}
