//! XML Schema derivation.

use super::xml::{XmlArtifactBuilder, XmlDeriveContext, XmlDeriver};
use crate::config::IngestConfig;
use crate::error::Result;
use crate::model::{ARCHIVE_PATH_PROPERTY, Artifact, ArtifactKind, IdentityKey};
use crate::xml::{Element, NamespaceContext, ns};

pub const IMPORTED_XSDS: &str = "importedXsds";
pub const INCLUDED_XSDS: &str = "includedXsds";
pub const REDEFINED_XSDS: &str = "redefinedXsds";

/// Global declarations turned into derived artifacts.
const DECLARATIONS: &[(&str, ArtifactKind)] = &[
    ("./xsd:element", ArtifactKind::ElementDeclaration),
    ("./xsd:attribute", ArtifactKind::AttributeDeclaration),
    ("./xsd:simpleType", ArtifactKind::SimpleTypeDeclaration),
    ("./xsd:complexType", ArtifactKind::ComplexTypeDeclaration),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct XsdDeriver;

pub fn builder(config: &IngestConfig) -> XmlArtifactBuilder<XsdDeriver> {
    XmlArtifactBuilder::new(XsdDeriver, config)
}

/// Register the `xs` and `xsd` prefixes.
pub fn add_schema_mappings(namespaces: &mut NamespaceContext) {
    namespaces.add_mapping("xs", ns::XSD);
    namespaces.add_mapping("xsd", ns::XSD);
}

impl XmlDeriver for XsdDeriver {
    fn name(&self) -> &'static str {
        "xsd"
    }

    fn configure_namespace_mappings(&self, namespaces: &mut NamespaceContext) {
        add_schema_mappings(namespaces);
    }

    fn derive(&mut self, ctx: &mut XmlDeriveContext<'_>) -> Result<()> {
        let schema = ctx.root();
        if let Some(target) = schema.attribute_non_empty("targetNamespace") {
            ctx.primary.namespace = Some(target.to_string());
        }
        derive_schema(ctx, schema)
    }
}

/// Derive the global declarations of one `xsd:schema` element and record
/// its schema references on the primary.
///
/// Shared with WSDL, whose `wsdl:types` may embed several schemas.
pub fn derive_schema<'a>(ctx: &mut XmlDeriveContext<'a>, schema: Element<'a>) -> Result<()> {
    let target = schema.attribute("targetNamespace").unwrap_or_default();

    for (expr, kind) in DECLARATIONS {
        for node in ctx.elements(schema, expr)? {
            let Some(name) = node.attribute_non_empty("name") else {
                continue;
            };
            ctx.derive(
                Artifact::new((*kind).into(), name)
                    .with_namespace(target)
                    .with_nc_name(name),
            );
        }
    }

    for import in ctx.elements(schema, "./xsd:import")? {
        if let Some(namespace) = import.attribute("namespace") {
            ctx.primary
                .relate_by_key(IMPORTED_XSDS, IdentityKey::XsdDocument(namespace.to_string()));
        }
    }

    let base = document_path(ctx);
    for (expr, relationship) in [("./xsd:include", INCLUDED_XSDS), ("./xsd:redefine", REDEFINED_XSDS)] {
        for node in ctx.elements(schema, expr)? {
            if let Some(location) = node.attribute_non_empty("schemaLocation") {
                ctx.primary
                    .relate_by_key(relationship, IdentityKey::path(resolve_location(&base, location)));
            }
        }
    }
    Ok(())
}

/// Path other documents use to reach the one being derived.
pub(crate) fn document_path(ctx: &XmlDeriveContext<'_>) -> String {
    ctx.primary
        .property(ARCHIVE_PATH_PROPERTY)
        .unwrap_or(ctx.content.filename())
        .to_string()
}

/// Resolve a relative `schemaLocation`/`location` against the referring
/// document's path. Absolute URIs are returned unchanged.
pub(crate) fn resolve_location(base: &str, location: &str) -> String {
    if location.contains("://") || location.starts_with('/') {
        return location.to_string();
    }
    let mut segments: Vec<&str> = base.split('/').collect();
    segments.pop();
    for segment in location.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.retain(|s| !s.is_empty());
    segments.join("/")
}
