//! SwitchYard applications.
//!
//! A SwitchYard application is a jar carrying `META-INF/switchyard.xml`.
//! The descriptor is indexed once per archive; only the Java classes it
//! references are admitted during expansion.

use rustc_hash::{FxHashMap, FxHashSet};
use uuid::Uuid;

use super::{INTEGRATION_PRIORITY, zip_contains};
use crate::derive::BuilderFactory;
use crate::derive::xml::{XmlArtifactBuilder, XmlDeriveContext, XmlDeriver};
use crate::detect::ArtifactTypeDetector;
use crate::error::Result;
use crate::expand::{
    ArchiveContext, ArtifactFilter, CandidateArtifact, DefaultArtifactFilter,
    DefaultMetaDataFactory, ExpanderProvider, MetaDataFactory, NESTED_SEPARATOR,
};
use crate::model::{Artifact, ArtifactContent, ArtifactType, IdentityKey, QNameKind};
use crate::xml::{Document, Element, sniff_root};

pub const SWITCHYARD_APPLICATION: &str = "SwitchYardApplication";
pub const SWITCHYARD_XML: &str = "SwitchYardXmlDocument";

pub const SERVICE: &str = "SwitchYardService";
pub const COMPONENT: &str = "SwitchYardComponent";
pub const COMPONENT_SERVICE: &str = "SwitchYardComponentService";
pub const TRANSFORMER: &str = "SwitchYardTransformer";
pub const VALIDATOR: &str = "SwitchYardValidator";

pub const IMPLEMENTED_BY: &str = "implementedBy";
pub const IMPLEMENTS: &str = "implements";
pub const REFERENCES: &str = "references";
pub const PROMOTES: &str = "promotes";
pub const OFFERS: &str = "offers";
pub const TRANSFORMS_FROM: &str = "transformsFrom";
pub const TRANSFORMS_TO: &str = "transformsTo";
pub const VALIDATES: &str = "validates";

pub const TRANSFORMER_TYPE: &str = "transformerType";
pub const VALIDATE_TYPE: &str = "validateType";

/// Location of the descriptor inside an application.
pub const DESCRIPTOR_PATH: &str = "META-INF/switchyard.xml";

/// Custom context key of the [`SwitchYardIndex`].
pub const INDEX_KEY: &str = "switchyard.index";

const JAVA_PREFIX: &str = "java:";

// ============================================================================
// INDEX
// ============================================================================

/// Java classes referenced by a `switchyard.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchYardIndex {
    classes: FxHashSet<String>,
}

impl SwitchYardIndex {
    pub fn from_xml(bytes: &[u8]) -> Result<Self> {
        let document = Document::parse(bytes)?;
        let mut classes = FxHashSet::default();

        for element in document.root().descendants() {
            match element.local_name() {
                "implementation.bean" => classes.extend(element.attribute_non_empty("class").map(str::to_string)),
                "interface.java" => {
                    classes.extend(element.attribute_non_empty("interface").map(str::to_string));
                }
                "transform.java" | "validate.java" => {
                    for attribute in ["from", "to"] {
                        let java = element
                            .attribute(attribute)
                            .and_then(|v| v.strip_prefix(JAVA_PREFIX));
                        classes.extend(java.map(str::to_string));
                    }
                    for attribute in ["class", "bean"] {
                        classes.extend(element.attribute_non_empty(attribute).map(str::to_string));
                    }
                }
                _ => {}
            }
        }
        Ok(Self { classes })
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.classes.contains(class_name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Fully qualified class name of a `.class` entry.
fn class_name(path: &str) -> Option<String> {
    let inner = path.rsplit(NESTED_SEPARATOR).next().unwrap_or(path);
    inner
        .strip_suffix(".class")
        .map(|name| name.trim_start_matches('/').replace('/', "."))
}

// ============================================================================
// DETECTION AND EXPANSION
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchYardDetector;

impl ArtifactTypeDetector for SwitchYardDetector {
    fn name(&self) -> &'static str {
        "switchyard"
    }

    fn priority(&self) -> i32 {
        INTEGRATION_PRIORITY
    }

    fn detect(&self, content: &ArtifactContent) -> Option<ArtifactType> {
        if content.base_name() == "switchyard.xml" {
            return sniff_root(content.bytes())
                .filter(|(_, local)| local == "switchyard")
                .map(|_| ArtifactType::extended_document(SWITCHYARD_XML));
        }
        zip_contains(content, DESCRIPTOR_PATH)
            .then(|| ArtifactType::extended_document(SWITCHYARD_APPLICATION))
    }

    fn allow_expansion_from_archive(
        &self,
        content: &ArtifactContent,
        context: &ArchiveContext,
    ) -> Option<bool> {
        if !context.is_extended_type_archive(SWITCHYARD_APPLICATION) {
            return None;
        }
        let class = class_name(content.filename())?;
        let admitted = match context.custom::<SwitchYardIndex>(INDEX_KEY) {
            Some(index) => index.contains(&class),
            None => true,
        };
        tracing::debug!(%class, admitted, "switchyard class");
        Some(admitted)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchYardMetaDataFactory {
    inner: DefaultMetaDataFactory,
}

impl MetaDataFactory for SwitchYardMetaDataFactory {
    fn create_metadata(&self, candidate: &CandidateArtifact<'_>, context: &ArchiveContext) -> Artifact {
        let mut artifact = self.inner.create_metadata(candidate, context);
        if candidate.path() == DESCRIPTOR_PATH {
            artifact.artifact_type = ArtifactType::extended_document(SWITCHYARD_XML);
        }
        artifact
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchYardExpanderProvider {
    filter: DefaultArtifactFilter,
    factory: SwitchYardMetaDataFactory,
}

impl ExpanderProvider for SwitchYardExpanderProvider {
    fn name(&self) -> &'static str {
        "switchyard"
    }

    fn priority(&self) -> i32 {
        INTEGRATION_PRIORITY
    }

    fn accepts(&self, archive_type: &ArtifactType) -> bool {
        archive_type.is_extended_type(SWITCHYARD_APPLICATION)
    }

    fn archive_type(&self) -> Option<ArtifactType> {
        Some(ArtifactType::extended_document(SWITCHYARD_APPLICATION))
    }

    fn path_hints(&self) -> &[&'static str] {
        &[DESCRIPTOR_PATH]
    }

    fn filter(&self) -> &dyn ArtifactFilter {
        &self.filter
    }

    fn metadata_factory(&self) -> &dyn MetaDataFactory {
        &self.factory
    }

    /// Index the descriptor. Without a readable descriptor every class is
    /// admitted.
    fn prepare_context(&self, context: &mut ArchiveContext) -> Result<()> {
        let Some(bytes) = context.read_entry(DESCRIPTOR_PATH)? else {
            return Ok(());
        };
        match SwitchYardIndex::from_xml(&bytes) {
            Ok(index) => {
                tracing::debug!(classes = index.len(), "indexed switchyard.xml");
                context.set_custom(INDEX_KEY, index);
            }
            Err(error) => tracing::warn!(%error, "switchyard.xml could not be indexed"),
        }
        Ok(())
    }
}

// ============================================================================
// DESCRIPTOR
// ============================================================================

pub fn factory() -> BuilderFactory {
    BuilderFactory::new(
        "switchyard-xml",
        |t| t.is_extended_type(SWITCHYARD_XML),
        |config| Box::new(XmlArtifactBuilder::new(SwitchYardXmlDeriver, config)),
    )
    .with_priority(INTEGRATION_PRIORITY)
}

/// Derives components, services, transformers and validators.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchYardXmlDeriver;

fn named<'d>(parent: Element<'d>, name: &'d str) -> impl Iterator<Item = Element<'d>> + 'd {
    parent.children().filter(move |c| c.local_name() == name)
}

fn java_interface(element: Element<'_>) -> Option<IdentityKey> {
    named(element, "interface.java")
        .find_map(|i| i.attribute_non_empty("interface"))
        .map(|name| IdentityKey::JavaClass(name.to_string()))
}

/// `{namespace}local` as an element key, anything else as a Java class.
fn type_key(value: &str) -> IdentityKey {
    if let Some((namespace, local)) = value.strip_prefix('{').and_then(|v| v.split_once('}')) {
        return IdentityKey::qname(QNameKind::Element, namespace, local);
    }
    IdentityKey::JavaClass(value.strip_prefix(JAVA_PREFIX).unwrap_or(value).to_string())
}

/// Short display form of a type reference.
fn short_type(value: &str) -> &str {
    if value.starts_with('{') {
        value.rsplit('}').next().unwrap_or(value)
    } else if let Some(class) = value.strip_prefix(JAVA_PREFIX) {
        class.rsplit('.').next().unwrap_or(class)
    } else {
        value
    }
}

/// `transform.java` → `java`.
fn kind_suffix(element: Element<'_>) -> &str {
    let local = element.local_name();
    local.rsplit('.').next().unwrap_or(local)
}

impl SwitchYardXmlDeriver {
    fn components(ctx: &mut XmlDeriveContext<'_>, composite: Element<'_>) -> FxHashMap<String, Uuid> {
        let mut by_name = FxHashMap::default();
        for element in named(composite, "component") {
            let name = element.attribute("name").unwrap_or_default();
            let mut component = Artifact::new(ArtifactType::extended_derived(COMPONENT), name);

            if let Some(bean) = named(element, "implementation.bean").next() {
                if let Some(class) = bean.attribute_non_empty("class") {
                    component.relate_by_key(IMPLEMENTED_BY, IdentityKey::JavaClass(class.to_string()));
                }
                component.set_property_opt("requires", bean.attribute("requires"));
            }
            if let Some(camel) = named(element, "implementation.camel").next() {
                component.set_property_opt("requires", camel.attribute("requires"));
            }
            for reference in named(element, "reference") {
                if let Some(key) = java_interface(reference) {
                    component.relate_by_key(REFERENCES, key);
                }
            }

            for offered in named(element, "service") {
                let name = offered.attribute("name").unwrap_or_default();
                let mut service = Artifact::new(ArtifactType::extended_derived(COMPONENT_SERVICE), name);
                if let Some(key) = java_interface(offered) {
                    service.relate_by_key(IMPLEMENTS, key);
                }
                service.set_property_opt("requires", offered.attribute("requires"));
                component.relate(OFFERS, ctx.derive(service));
            }

            by_name.insert(component.name.clone(), component.uuid());
            ctx.derive(component);
        }
        by_name
    }

    fn services(
        ctx: &mut XmlDeriveContext<'_>,
        composite: Element<'_>,
        components: &FxHashMap<String, Uuid>,
    ) {
        for element in named(composite, "service") {
            let name = element.attribute("name").unwrap_or_default();
            let mut service = Artifact::new(ArtifactType::extended_derived(SERVICE), name);
            if let Some(promote) = element.attribute_non_empty("promote") {
                // `promote` may name a component service as `Component/Service`.
                let component = promote.split('/').next().unwrap_or(promote);
                match components.get(component) {
                    Some(&uuid) => service.relate(PROMOTES, uuid),
                    None => service.relate_by_key(PROMOTES, IdentityKey::named(COMPONENT, component)),
                }
            }
            if let Some(key) = java_interface(element) {
                service.relate_by_key(IMPLEMENTS, key);
            }
            ctx.derive(service);
        }
    }

    fn transformers(ctx: &mut XmlDeriveContext<'_>, root: Element<'_>) {
        let transforms = named(root, "transforms")
            .flat_map(|t| t.children())
            .filter(|t| t.local_name().starts_with("transform."));
        for element in transforms {
            let from = element.attribute_non_empty("from");
            let to = element.attribute_non_empty("to");
            let name = match (element.attribute_non_empty("name"), from, to) {
                (Some(name), _, _) => name.to_string(),
                (None, Some(from), Some(to)) => format!("{}->{}", short_type(from), short_type(to)),
                _ => element.local_name().to_string(),
            };

            let mut transformer = Artifact::new(ArtifactType::extended_derived(TRANSFORMER), name)
                .with_property(TRANSFORMER_TYPE, kind_suffix(element));
            if let Some(class) = element.attribute_non_empty("class") {
                transformer.relate_by_key(IMPLEMENTED_BY, IdentityKey::JavaClass(class.to_string()));
            }
            if let Some(from) = from {
                transformer.relate_by_key(TRANSFORMS_FROM, type_key(from));
            }
            if let Some(to) = to {
                transformer.relate_by_key(TRANSFORMS_TO, type_key(to));
            }
            ctx.derive(transformer);
        }
    }

    fn validators(ctx: &mut XmlDeriveContext<'_>, root: Element<'_>) {
        let validates = named(root, "validates")
            .flat_map(|v| v.children())
            .filter(|v| v.local_name().starts_with("validate."));
        for element in validates {
            let Some(name) = element.attribute_non_empty("name") else {
                continue;
            };
            let mut validator = Artifact::new(ArtifactType::extended_derived(VALIDATOR), name)
                .with_property(VALIDATE_TYPE, kind_suffix(element));
            validator.relate_by_key(VALIDATES, type_key(name));
            if let Some(class) = element.attribute_non_empty("class") {
                validator.relate_by_key(IMPLEMENTED_BY, IdentityKey::JavaClass(class.to_string()));
            }
            ctx.derive(validator);
        }
    }
}

impl XmlDeriver for SwitchYardXmlDeriver {
    fn name(&self) -> &'static str {
        "switchyard-xml"
    }

    fn derive(&mut self, ctx: &mut XmlDeriveContext<'_>) -> Result<()> {
        let root = ctx.root();
        ctx.primary
            .set_property_opt("targetNamespace", root.attribute("targetNamespace"));
        if let Some(name) = root.attribute_non_empty("name") {
            if ctx.primary.name == "switchyard.xml" {
                ctx.primary.name = name.to_string();
            }
        }

        // Components first so services can promote them.
        if let Some(composite) = named(root, "composite").next() {
            let components = Self::components(ctx, composite);
            Self::services(ctx, composite, &components);
        }
        Self::transformers(ctx, root);
        Self::validators(ctx, root);
        Ok(())
    }
}
