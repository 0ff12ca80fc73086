//! Teiid virtual databases: the VDB archive, its `META-INF/vdb.xml`
//! manifest and the XMI models it packages.
//!
//! ```text
//! TeiidVdbManifest ──contains──▶ VdbSchema ──schemaSources──▶ VdbSchemaSource ──sourceTranslator──▶ VdbTranslator
//!                  │                 └──schemaValidationErrors──▶ VdbValidationError
//!                  ├──contains──▶ VdbDataPolicy ──dataPolicyPermissions──▶ VdbPermission
//!                  └──contains──▶ VdbTranslator, VdbEntry, VdbImport
//! ```

use rustc_hash::FxHashMap;
use uuid::Uuid;

use super::{INTEGRATION_PRIORITY, zip_contains};
use crate::derive::BuilderFactory;
use crate::derive::xml::{XmlArtifactBuilder, XmlDeriveContext, XmlDeriver};
use crate::derive::xsd::document_path;
use crate::detect::ArtifactTypeDetector;
use crate::error::{IngestError, Result};
use crate::expand::{
    ArchiveContext, ArtifactFilter, CandidateArtifact, DefaultArtifactFilter,
    DefaultMetaDataFactory, ExpanderProvider, MetaDataFactory,
};
use crate::model::{Artifact, ArtifactContent, ArtifactType, IdentityKey, base_name};
use crate::xml::{Element, sniff_root};

// ============================================================================
// TYPES
// ============================================================================

pub const TEIID_VDB: &str = "TeiidVdb";
pub const VDB_MANIFEST: &str = "TeiidVdbManifest";
pub const TEIID_MODEL: &str = "TeiidModel";

pub const VDB_SCHEMA: &str = "VdbSchema";
pub const VDB_SCHEMA_SOURCE: &str = "VdbSchemaSource";
pub const VDB_TRANSLATOR: &str = "VdbTranslator";
pub const VDB_DATA_POLICY: &str = "VdbDataPolicy";
pub const VDB_PERMISSION: &str = "VdbPermission";
pub const VDB_ENTRY: &str = "VdbEntry";
pub const VDB_IMPORT: &str = "VdbImport";
pub const VDB_VALIDATION_ERROR: &str = "VdbValidationError";

pub const CONTAINS: &str = "contains";
pub const SCHEMA_SOURCES: &str = "schemaSources";
pub const SOURCE_SCHEMA: &str = "sourceSchema";
pub const SOURCE_TRANSLATOR: &str = "sourceTranslator";
pub const TRANSLATOR_SOURCES: &str = "translatorSources";
pub const DATA_POLICY_PERMISSIONS: &str = "dataPolicyPermissions";
pub const PERMISSION_DATA_POLICY: &str = "permissionDataPolicy";
pub const SCHEMA_VALIDATION_ERRORS: &str = "schemaValidationErrors";
pub const VALIDATION_ERROR_SOURCE: &str = "validationErrorSource";
/// From a schema to the model file it describes.
pub const SCHEMA_MODEL: &str = "schemaModel";

/// Location of the manifest inside a VDB.
pub const MANIFEST_PATH: &str = "META-INF/vdb.xml";

const DEFAULT_SCHEMA_TYPE: &str = "PHYSICAL";
const DEFAULT_ERROR_PATH: &str = "/";

fn classify(path: &str) -> Option<&'static str> {
    if path.eq_ignore_ascii_case(MANIFEST_PATH) {
        Some(VDB_MANIFEST)
    } else if path.to_ascii_lowercase().ends_with(".xmi") {
        Some(TEIID_MODEL)
    } else {
        None
    }
}

// ============================================================================
// DETECTION AND EXPANSION
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct TeiidDetector;

impl ArtifactTypeDetector for TeiidDetector {
    fn name(&self) -> &'static str {
        "teiid"
    }

    fn priority(&self) -> i32 {
        INTEGRATION_PRIORITY
    }

    fn detect(&self, content: &ArtifactContent) -> Option<ArtifactType> {
        if content.base_name() == "vdb.xml" {
            return sniff_root(content.bytes())
                .filter(|(_, local)| local == "vdb")
                .map(|_| ArtifactType::extended_document(VDB_MANIFEST));
        }
        if content.has_extension("xmi") {
            return Some(ArtifactType::extended_document(TEIID_MODEL));
        }
        let vdb = (content.has_extension("vdb") && content.is_zip())
            || zip_contains(content, MANIFEST_PATH);
        vdb.then(|| ArtifactType::extended_document(TEIID_VDB))
    }
}

/// Default filtering, plus Teiid's `*.INDEX` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeiidArtifactFilter {
    inner: DefaultArtifactFilter,
}

impl ArtifactFilter for TeiidArtifactFilter {
    fn accepts(&self, candidate: &CandidateArtifact<'_>, context: &ArchiveContext) -> bool {
        self.inner.accepts(candidate, context) && !candidate.path().to_ascii_uppercase().ends_with(".INDEX")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TeiidMetaDataFactory {
    inner: DefaultMetaDataFactory,
}

impl MetaDataFactory for TeiidMetaDataFactory {
    fn create_metadata(&self, candidate: &CandidateArtifact<'_>, context: &ArchiveContext) -> Artifact {
        let mut artifact = self.inner.create_metadata(candidate, context);
        if let Some(kind) = classify(candidate.path()) {
            artifact.artifact_type = ArtifactType::extended_document(kind);
        }
        artifact
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TeiidExpanderProvider {
    filter: TeiidArtifactFilter,
    factory: TeiidMetaDataFactory,
}

impl ExpanderProvider for TeiidExpanderProvider {
    fn name(&self) -> &'static str {
        "teiid"
    }

    fn priority(&self) -> i32 {
        INTEGRATION_PRIORITY
    }

    fn accepts(&self, archive_type: &ArtifactType) -> bool {
        archive_type.is_extended_type(TEIID_VDB)
    }

    fn archive_type(&self) -> Option<ArtifactType> {
        Some(ArtifactType::extended_document(TEIID_VDB))
    }

    fn path_hints(&self) -> &[&'static str] {
        &[MANIFEST_PATH]
    }

    fn filter(&self) -> &dyn ArtifactFilter {
        &self.filter
    }

    fn metadata_factory(&self) -> &dyn MetaDataFactory {
        &self.factory
    }
}

// ============================================================================
// MANIFEST
// ============================================================================

pub fn manifest_factory() -> BuilderFactory {
    BuilderFactory::new(
        "teiid-vdb-manifest",
        |t| t.is_extended_type(VDB_MANIFEST),
        |config| Box::new(XmlArtifactBuilder::new(VdbManifestDeriver, config)),
    )
    .with_priority(INTEGRATION_PRIORITY)
}

/// Derives the components declared by a `vdb.xml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VdbManifestDeriver;

/// Children of `parent` with the given local name.
fn children<'d>(parent: Element<'d>, name: &'d str) -> impl Iterator<Item = Element<'d>> + 'd {
    parent.children().filter(move |c| c.local_name() == name)
}

fn child_text(parent: Element<'_>, name: &str) -> Option<String> {
    parent
        .children()
        .find(|c| c.local_name() == name)
        .map(|c| c.text_content().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Copy `<property name=".." value=".."/>` children onto `artifact`.
fn copy_properties(element: Element<'_>, artifact: &mut Artifact) {
    for property in children(element, "property") {
        if let Some(name) = property.attribute_non_empty("name") {
            artifact.set_property(name, property.attribute("value").unwrap_or_default());
        }
    }
}

fn component(extended_type: &str, element: Element<'_>) -> Artifact {
    let name = element.attribute("name").unwrap_or_default();
    let mut artifact = Artifact::new(ArtifactType::extended_derived(extended_type), name);
    artifact.description = child_text(element, "description")
        .or_else(|| element.attribute_non_empty("description").map(str::to_string));
    copy_properties(element, &mut artifact);
    artifact
}

impl VdbManifestDeriver {
    fn translators(ctx: &mut XmlDeriveContext<'_>, vdb: Element<'_>) -> FxHashMap<String, Uuid> {
        let mut by_name = FxHashMap::default();
        for element in children(vdb, "translator") {
            let mut translator = component(VDB_TRANSLATOR, element);
            translator.set_property_opt("type", element.attribute("type"));
            let name = translator.name.clone();
            let uuid = ctx.derive(translator);
            ctx.primary.relate(CONTAINS, uuid);
            by_name.insert(name, uuid);
        }
        by_name
    }

    fn schemas(
        ctx: &mut XmlDeriveContext<'_>,
        vdb: Element<'_>,
        translators: &FxHashMap<String, Uuid>,
    ) {
        let document = document_path(ctx);
        let prefix = document
            .strip_suffix(MANIFEST_PATH)
            .or_else(|| document.strip_suffix("vdb.xml"))
            .unwrap_or_default()
            .to_string();

        for element in children(vdb, "model") {
            let mut schema = component(VDB_SCHEMA, element);
            schema.set_property(
                "schemaType",
                element.attribute_non_empty("type").unwrap_or(DEFAULT_SCHEMA_TYPE),
            );
            schema.set_property_opt("visible", element.attribute("visible"));
            let path_in_vdb = element.attribute_non_empty("path");
            schema.set_property_opt("pathInVdb", path_in_vdb);
            if let Some(metadata) = children(element, "metadata").next() {
                schema.set_property_opt("metadataType", metadata.attribute("type"));
                let text = metadata.text_content();
                schema.set_property_opt("metadata", Some(text.trim()).filter(|t| !t.is_empty()));
            }
            if let Some(path) = path_in_vdb {
                let model = format!("{prefix}{}", path.trim_start_matches('/'));
                schema.relate_by_key(SCHEMA_MODEL, IdentityKey::path(model));
            }
            let schema_uuid = schema.uuid();

            for error in children(element, "validation-error") {
                let message = error.text_content().trim().to_string();
                let mut artifact =
                    Artifact::new(ArtifactType::extended_derived(VDB_VALIDATION_ERROR), message.clone())
                        .with_property("path", error.attribute_non_empty("path").unwrap_or(DEFAULT_ERROR_PATH))
                        .with_property("message", message);
                artifact.set_property_opt("severity", error.attribute("severity"));
                artifact.relate(VALIDATION_ERROR_SOURCE, schema_uuid);
                schema.relate(SCHEMA_VALIDATION_ERRORS, ctx.derive(artifact));
            }

            for element in children(element, "source") {
                let mut source = component(VDB_SCHEMA_SOURCE, element);
                source.set_property_opt("jndiName", element.attribute("connection-jndi-name"));
                let translator = element.attribute_non_empty("translator-name");
                source.set_property_opt("translatorName", translator);
                source.relate(SOURCE_SCHEMA, schema_uuid);
                let source_uuid = source.uuid();

                if let Some(name) = translator {
                    match translators.get(name) {
                        Some(&uuid) => {
                            source.relate(SOURCE_TRANSLATOR, uuid);
                            if let Some(translator) = ctx.derived.get_mut(uuid) {
                                translator.relate(TRANSLATOR_SOURCES, source_uuid);
                            }
                        }
                        None => source.relate_by_key(SOURCE_TRANSLATOR, IdentityKey::named(VDB_TRANSLATOR, name)),
                    }
                }
                schema.relate(SCHEMA_SOURCES, ctx.derive(source));
            }

            let uuid = ctx.derive(schema);
            ctx.primary.relate(CONTAINS, uuid);
        }
    }

    fn data_policies(ctx: &mut XmlDeriveContext<'_>, vdb: Element<'_>) {
        for element in children(vdb, "data-role") {
            let mut policy = component(VDB_DATA_POLICY, element);
            for attribute in ["any-authenticated", "allow-create-temporary-tables", "grant-all"] {
                policy.set_property_opt(attribute, element.attribute(attribute));
            }
            let roles: Vec<String> = children(element, "mapped-role-name")
                .map(|r| r.text_content().trim().to_string())
                .filter(|r| !r.is_empty())
                .collect();
            if !roles.is_empty() {
                policy.set_property("mappedRoleNames", roles.join(","));
            }
            let policy_uuid = policy.uuid();

            for element in children(element, "permission") {
                let resource = child_text(element, "resource-name").unwrap_or_default();
                let mut permission = Artifact::new(ArtifactType::extended_derived(VDB_PERMISSION), resource);
                for flag in element.children() {
                    let name = flag.local_name();
                    if name.starts_with("allow-") || name == "condition" || name == "mask" {
                        let value = flag.text_content();
                        permission.set_property(name, value.trim());
                    }
                }
                permission.relate(PERMISSION_DATA_POLICY, policy_uuid);
                policy.relate(DATA_POLICY_PERMISSIONS, ctx.derive(permission));
            }

            let uuid = ctx.derive(policy);
            ctx.primary.relate(CONTAINS, uuid);
        }
    }

    fn entries(ctx: &mut XmlDeriveContext<'_>, vdb: Element<'_>) {
        for element in children(vdb, "entry") {
            let path = element.attribute("path").unwrap_or_default();
            let mut entry = Artifact::new(ArtifactType::extended_derived(VDB_ENTRY), path);
            entry.description = child_text(element, "description");
            entry.set_property("path", path);
            copy_properties(element, &mut entry);
            let uuid = ctx.derive(entry);
            ctx.primary.relate(CONTAINS, uuid);
        }
        for element in children(vdb, "import-vdb") {
            let mut import = component(VDB_IMPORT, element);
            import.version = element.attribute_non_empty("version").map(str::to_string);
            import.set_property_opt("importDataPolicies", element.attribute("import-data-policies"));
            let uuid = ctx.derive(import);
            ctx.primary.relate(CONTAINS, uuid);
        }
    }
}

impl XmlDeriver for VdbManifestDeriver {
    fn name(&self) -> &'static str {
        "teiid-vdb-manifest"
    }

    fn derive(&mut self, ctx: &mut XmlDeriveContext<'_>) -> Result<()> {
        let vdb = ctx.root();
        if vdb.local_name() != "vdb" {
            return Err(IngestError::parse(
                ctx.content.filename(),
                format!("expected <vdb> root element, found <{}>", vdb.local_name()),
            ));
        }

        if let Some(name) = vdb.attribute_non_empty("name") {
            if ctx.primary.name == ctx.content.base_name() {
                ctx.primary.name = name.to_string();
            }
        }
        if ctx.primary.description.is_none() {
            ctx.primary.description = child_text(vdb, "description");
        }
        ctx.primary.set_property_opt("vdbVersion", vdb.attribute("version"));
        copy_properties(vdb, ctx.primary);

        let translators = Self::translators(ctx, vdb);
        Self::schemas(ctx, vdb, &translators);
        Self::data_policies(ctx, vdb);
        Self::entries(ctx, vdb);
        Ok(())
    }
}

// ============================================================================
// MODELS
// ============================================================================

pub fn model_factory() -> BuilderFactory {
    BuilderFactory::new(
        "teiid-model",
        |t| t.is_extended_type(TEIID_MODEL),
        |config| Box::new(XmlArtifactBuilder::new(ModelDeriver, config)),
    )
    .with_priority(INTEGRATION_PRIORITY)
}

/// Copies the XMI model annotation onto the model artifact.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelDeriver;

/// `(annotation attribute, property)` pairs copied from the model annotation.
const MODEL_ANNOTATION_PROPERTIES: &[(&str, &str)] = &[
    ("uuid", "mmuuid"),
    ("primaryMetamodelUri", "primaryMetamodelUri"),
    ("modelType", "modelType"),
    ("producerName", "producerName"),
    ("producerVersion", "producerVersion"),
    ("maxSetSize", "maxSetSize"),
    ("nameInSource", "nameInSource"),
    ("description", "description"),
    ("visible", "visible"),
];

impl XmlDeriver for ModelDeriver {
    fn name(&self) -> &'static str {
        "teiid-model"
    }

    fn derive(&mut self, ctx: &mut XmlDeriveContext<'_>) -> Result<()> {
        let root = ctx.root();
        if root.local_name() != "XMI" {
            return Err(IngestError::parse(
                ctx.content.filename(),
                format!("expected <XMI> root element, found <{}>", root.local_name()),
            ));
        }
        let annotation = root
            .descendants()
            .into_iter()
            .find(|e| e.local_name() == "ModelAnnotation")
            .ok_or_else(|| IngestError::parse(ctx.content.filename(), "missing model annotation"))?;

        for (attribute, property) in MODEL_ANNOTATION_PROPERTIES {
            let value = annotation
                .attributes()
                .iter()
                .find(|a| a.local_name == *attribute)
                .map(|a| a.value.as_str());
            ctx.primary.set_property_opt(*property, value);
        }
        tracing::debug!(model = %base_name(ctx.content.filename()), "model annotation copied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;
    use crate::derive::ArtifactBuilder;
    use crate::integration::fixtures::zip;
    use crate::link::LinkerContext;
    use crate::model::ARCHIVE_PATH_PROPERTY;

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<vdb name="Portfolio" version="2">
  <description>Market data</description>
  <property name="UseConnectorMetadata" value="true"/>
  <import-vdb name="Shared" version="1" import-data-policies="true"/>
  <model name="MarketData" type="PHYSICAL" path="/Portfolio/MarketData.xmi">
    <source name="text-connector" translator-name="file" connection-jndi-name="java:/marketdata-file"/>
    <validation-error severity="ERROR" path="Prices">Missing key</validation-error>
  </model>
  <model name="Accounts" path="/Portfolio/Accounts.xmi">
    <source name="h2" translator-name="h2" connection-jndi-name="java:/accounts-ds"/>
  </model>
  <translator name="file" type="file" description="Flat files">
    <property name="Encoding" value="UTF-8"/>
  </translator>
  <data-role name="ReadOnly" any-authenticated="true">
    <description>Read everything</description>
    <permission>
      <resource-name>Accounts</resource-name>
      <allow-read>true</allow-read>
    </permission>
    <mapped-role-name>viewer</mapped-role-name>
    <mapped-role-name>auditor</mapped-role-name>
  </data-role>
  <entry path="/docs/readme.txt"><description>Notes</description></entry>
</vdb>"#;

    fn build() -> (Artifact, Vec<Artifact>) {
        let content = ArtifactContent::new("vdb.xml", MANIFEST.as_bytes().to_vec());
        let mut primary = Artifact::new(ArtifactType::extended_document(VDB_MANIFEST), "vdb.xml")
            .with_property(ARCHIVE_PATH_PROPERTY, MANIFEST_PATH);
        let mut builder = XmlArtifactBuilder::new(VdbManifestDeriver, &IngestConfig::default());
        builder.build_artifacts(&mut primary, &content).unwrap();
        builder.build_relationships(&mut primary, &LinkerContext::new()).unwrap();
        let derived = builder.take_derived();
        (primary, derived)
    }

    fn of_type<'a>(derived: &'a [Artifact], extended_type: &str) -> Vec<&'a Artifact> {
        derived
            .iter()
            .filter(|a| a.artifact_type.is_extended_type(extended_type))
            .collect()
    }

    #[test]
    fn test_manifest_primary() {
        let (primary, _) = build();
        assert_eq!(primary.name, "Portfolio");
        assert_eq!(primary.description.as_deref(), Some("Market data"));
        assert_eq!(primary.property("vdbVersion"), Some("2"));
        assert_eq!(primary.property("UseConnectorMetadata"), Some("true"));
        // Two schemas, a translator, a data policy, an entry and an import.
        assert_eq!(primary.relationships_of(CONTAINS).count(), 6);
    }

    #[test]
    fn test_schemas_sources_and_translators() {
        let (_, derived) = build();
        let schemas = of_type(&derived, VDB_SCHEMA);
        assert_eq!(schemas.len(), 2);
        let market = schemas[0];
        assert_eq!(market.property("schemaType"), Some("PHYSICAL"));
        assert_eq!(schemas[1].property("schemaType"), Some(DEFAULT_SCHEMA_TYPE));
        assert_eq!(market.property("pathInVdb"), Some("/Portfolio/MarketData.xmi"));

        let sources = of_type(&derived, VDB_SCHEMA_SOURCE);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].property("jndiName"), Some("java:/marketdata-file"));
        assert_eq!(market.targets_of(SCHEMA_SOURCES), vec![sources[0].uuid()]);
        assert_eq!(sources[0].targets_of(SOURCE_SCHEMA), vec![market.uuid()]);

        let translator = of_type(&derived, VDB_TRANSLATOR)[0];
        assert_eq!(translator.property("Encoding"), Some("UTF-8"));
        assert_eq!(translator.description.as_deref(), Some("Flat files"));
        assert_eq!(sources[0].targets_of(SOURCE_TRANSLATOR), vec![translator.uuid()]);
        assert_eq!(translator.targets_of(TRANSLATOR_SOURCES), vec![sources[0].uuid()]);
        // The built-in h2 translator is not declared, so the reference stays pending.
        assert_eq!(sources[1].unresolved().count(), 1);

        let error = of_type(&derived, VDB_VALIDATION_ERROR)[0];
        assert_eq!(error.property("severity"), Some("ERROR"));
        assert_eq!(error.property("path"), Some("Prices"));
        assert_eq!(market.targets_of(SCHEMA_VALIDATION_ERRORS), vec![error.uuid()]);
        assert_eq!(error.targets_of(VALIDATION_ERROR_SOURCE), vec![market.uuid()]);

        let model_ref: Vec<_> = market.unresolved().map(|r| r.target.clone()).collect();
        assert_eq!(
            model_ref,
            vec![crate::model::RelationshipTarget::Unresolved(IdentityKey::path(
                "Portfolio/MarketData.xmi"
            ))]
        );
    }

    #[test]
    fn test_data_policies_and_entries() {
        let (_, derived) = build();
        let policy = of_type(&derived, VDB_DATA_POLICY)[0];
        assert_eq!(policy.property("mappedRoleNames"), Some("viewer,auditor"));
        assert_eq!(policy.property("any-authenticated"), Some("true"));
        assert_eq!(policy.description.as_deref(), Some("Read everything"));

        let permission = of_type(&derived, VDB_PERMISSION)[0];
        assert_eq!(permission.name, "Accounts");
        assert_eq!(permission.property("allow-read"), Some("true"));
        assert_eq!(policy.targets_of(DATA_POLICY_PERMISSIONS), vec![permission.uuid()]);
        assert_eq!(permission.targets_of(PERMISSION_DATA_POLICY), vec![policy.uuid()]);

        let entry = of_type(&derived, VDB_ENTRY)[0];
        assert_eq!(entry.property("path"), Some("/docs/readme.txt"));
        let import = of_type(&derived, VDB_IMPORT)[0];
        assert_eq!(import.version.as_deref(), Some("1"));
        assert_eq!(import.property("importDataPolicies"), Some("true"));
    }

    #[test]
    fn test_model_annotation() {
        let xmi = r#"<xmi:XMI xmlns:xmi="http://www.omg.org/XMI" xmlns:mmcore="http://www.metamatrix.com/metamodels/Core">
  <mmcore:ModelAnnotation xmi:uuid="mmuuid:1234" primaryMetamodelUri="http://www.metamatrix.com/metamodels/Relational"
      modelType="PHYSICAL" producerName="Teiid Designer" producerVersion="7.4"/>
</xmi:XMI>"#;
        let content = ArtifactContent::new("MarketData.xmi", xmi.as_bytes().to_vec());
        let mut primary = Artifact::new(ArtifactType::extended_document(TEIID_MODEL), "MarketData.xmi");
        XmlArtifactBuilder::new(ModelDeriver, &IngestConfig::default())
            .build_artifacts(&mut primary, &content)
            .unwrap();
        assert_eq!(primary.property("mmuuid"), Some("mmuuid:1234"));
        assert_eq!(primary.property("modelType"), Some("PHYSICAL"));
        assert_eq!(primary.property("producerVersion"), Some("7.4"));
    }

    #[test]
    fn test_model_without_annotation_fails() {
        let content = ArtifactContent::new("bad.xmi", b"<xmi:XMI xmlns:xmi=\"http://www.omg.org/XMI\"/>".to_vec());
        let mut primary = Artifact::new(ArtifactType::extended_document(TEIID_MODEL), "bad.xmi");
        let err = XmlArtifactBuilder::new(ModelDeriver, &IngestConfig::default())
            .build_artifacts(&mut primary, &content)
            .unwrap_err();
        assert!(err.is_content_error());
    }

    #[test]
    fn test_detection_and_filtering() {
        let bytes = zip(&[(MANIFEST_PATH, MANIFEST.as_bytes()), ("Portfolio/MarketData.INDEX", b"x")]);
        let vdb = ArtifactContent::new("portfolio.zip", bytes);
        assert_eq!(TeiidDetector.detect(&vdb), Some(ArtifactType::extended_document(TEIID_VDB)));

        let manifest = ArtifactContent::new("vdb.xml", MANIFEST.as_bytes().to_vec());
        assert_eq!(
            TeiidDetector.detect(&manifest),
            Some(ArtifactType::extended_document(VDB_MANIFEST))
        );
        let other = ArtifactContent::new("vdb.xml", b"<config/>".to_vec());
        assert_eq!(TeiidDetector.detect(&other), None);

        let context = ArchiveContext::new(None, None, "/work", Vec::new(), 8);
        let file = std::path::PathBuf::from("/work/x");
        let index = ArtifactContent::new("Portfolio/MarketData.INDEX", b"x".to_vec());
        let candidate = CandidateArtifact::new("Portfolio/MarketData.INDEX", "Portfolio/MarketData.INDEX", &file, &index);
        assert!(!TeiidArtifactFilter::default().accepts(&candidate, &context));
    }
}
