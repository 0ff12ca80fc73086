//! XML builder base and the generic XPath-driven deriver.

use uuid::Uuid;

use super::{ArtifactBuilder, DerivedArtifacts};
use crate::config::IngestConfig;
use crate::error::Result;
use crate::model::{Artifact, ArtifactContent, ArtifactType};
use crate::xml::{Document, Element, NamespaceContext, XNode, XPath};

/// Encoding recorded when the document declares none.
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Format-specific half of an [`XmlArtifactBuilder`].
pub trait XmlDeriver: Send {
    fn name(&self) -> &'static str;

    /// Register the XPath prefixes the deriver's expressions use.
    fn configure_namespace_mappings(&self, namespaces: &mut NamespaceContext) {
        let _ = namespaces;
    }

    /// Inspect the parsed document and push derived artifacts.
    fn derive(&mut self, ctx: &mut XmlDeriveContext<'_>) -> Result<()>;
}

/// Everything a deriver sees while walking one document.
pub struct XmlDeriveContext<'a> {
    pub primary: &'a mut Artifact,
    pub derived: &'a mut DerivedArtifacts,
    pub content: &'a ArtifactContent,
    document: &'a Document,
    namespaces: &'a NamespaceContext,
}

impl<'a> XmlDeriveContext<'a> {
    pub fn new(
        primary: &'a mut Artifact,
        derived: &'a mut DerivedArtifacts,
        content: &'a ArtifactContent,
        document: &'a Document,
        namespaces: &'a NamespaceContext,
    ) -> Self {
        Self {
            primary,
            derived,
            content,
            document,
            namespaces,
        }
    }

    pub fn root(&self) -> Element<'a> {
        self.document.root()
    }

    pub fn namespaces(&self) -> &NamespaceContext {
        self.namespaces
    }

    pub fn primary_uuid(&self) -> Uuid {
        self.primary.uuid()
    }

    /// Evaluate `expr` relative to `node`.
    pub fn query(&self, node: Element<'a>, expr: &str) -> Result<Vec<XNode<'a>>> {
        let xpath = XPath::compile(expr, self.namespaces)?;
        let found = xpath.select(node);
        tracing::trace!(expr, matches = found.len(), "xpath");
        Ok(found)
    }

    pub fn elements(&self, node: Element<'a>, expr: &str) -> Result<Vec<Element<'a>>> {
        Ok(XPath::compile(expr, self.namespaces)?.select_elements(node))
    }

    pub fn first(&self, node: Element<'a>, expr: &str) -> Result<Option<Element<'a>>> {
        Ok(self.elements(node, expr)?.into_iter().next())
    }

    pub fn strings(&self, node: Element<'a>, expr: &str) -> Result<Vec<String>> {
        Ok(XPath::compile(expr, self.namespaces)?.select_strings(node))
    }

    /// First non-empty string value, trimmed.
    pub fn string(&self, node: Element<'a>, expr: &str) -> Result<Option<String>> {
        Ok(self
            .strings(node, expr)?
            .into_iter()
            .map(|s| s.trim().to_string())
            .find(|s| !s.is_empty()))
    }

    /// Add a derived artifact; returns its UUID.
    pub fn derive(&mut self, artifact: Artifact) -> Uuid {
        self.derived.push(artifact)
    }
}

/// Parses the content once and hands the DOM to an [`XmlDeriver`].
pub struct XmlArtifactBuilder<D> {
    deriver: D,
    namespaces: NamespaceContext,
    derived: DerivedArtifacts,
}

impl<D: XmlDeriver> XmlArtifactBuilder<D> {
    pub fn new(deriver: D, config: &IngestConfig) -> Self {
        let mut namespaces = NamespaceContext::new();
        deriver.configure_namespace_mappings(&mut namespaces);
        namespaces.extend(&config.namespace_mappings);
        Self {
            deriver,
            namespaces,
            derived: DerivedArtifacts::new(),
        }
    }

    pub fn deriver(&self) -> &D {
        &self.deriver
    }

    pub fn namespaces(&self) -> &NamespaceContext {
        &self.namespaces
    }
}

impl<D: XmlDeriver> ArtifactBuilder for XmlArtifactBuilder<D> {
    fn name(&self) -> &'static str {
        self.deriver.name()
    }

    fn build_artifacts(&mut self, primary: &mut Artifact, content: &ArtifactContent) -> Result<()> {
        let document = Document::parse_content(content)?;
        let encoding = document.encoding().unwrap_or(DEFAULT_ENCODING).to_string();
        primary
            .content
            .get_or_insert_with(|| content.metadata())
            .encoding = Some(encoding);

        let mut ctx = XmlDeriveContext::new(
            primary,
            &mut self.derived,
            content,
            &document,
            &self.namespaces,
        );
        self.deriver.derive(&mut ctx)?;

        self.derived.ensure_related_document(primary.uuid());
        Ok(())
    }

    fn derived_artifacts(&self) -> &DerivedArtifacts {
        &self.derived
    }

    fn derived_artifacts_mut(&mut self) -> &mut DerivedArtifacts {
        &mut self.derived
    }
}

/// Deriver for plain XML documents: records the encoding, derives nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainXmlDeriver;

impl XmlDeriver for PlainXmlDeriver {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn derive(&mut self, _ctx: &mut XmlDeriveContext<'_>) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// ATTRIBUTE XPATH DERIVER
// ============================================================================

/// One artifact per node matched by `expression`.
#[derive(Debug, Clone, PartialEq)]
pub struct XPathRule {
    pub expression: String,
    pub artifact_type: ArtifactType,
    /// Attribute supplying the artifact name; the element name otherwise.
    pub name_attribute: Option<String>,
}

impl XPathRule {
    pub fn new(expression: impl Into<String>, artifact_type: ArtifactType) -> Self {
        Self {
            expression: expression.into(),
            artifact_type,
            name_attribute: None,
        }
    }

    pub fn named_by(mut self, attribute: impl Into<String>) -> Self {
        self.name_attribute = Some(attribute.into());
        self
    }
}

/// Configurable deriver: every element matched by a rule becomes a derived
/// artifact whose properties are the element's attributes.
#[derive(Debug, Clone, Default)]
pub struct AttributeXPathDeriver {
    mappings: Vec<(String, String)>,
    rules: Vec<XPathRule>,
}

impl AttributeXPathDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.mappings.push((prefix.into(), uri.into()));
        self
    }

    pub fn with_rule(mut self, rule: XPathRule) -> Self {
        self.rules.push(rule);
        self
    }
}

impl XmlDeriver for AttributeXPathDeriver {
    fn name(&self) -> &'static str {
        "attribute-xpath"
    }

    fn configure_namespace_mappings(&self, namespaces: &mut NamespaceContext) {
        for (prefix, uri) in &self.mappings {
            namespaces.add_mapping(prefix.clone(), uri.clone());
        }
    }

    fn derive(&mut self, ctx: &mut XmlDeriveContext<'_>) -> Result<()> {
        let root = ctx.root();
        for rule in &self.rules {
            for element in ctx.elements(root, &rule.expression)? {
                let name = rule
                    .name_attribute
                    .as_deref()
                    .and_then(|a| element.attribute_non_empty(a))
                    .unwrap_or(element.local_name());
                let mut artifact = Artifact::new(rule.artifact_type.clone(), name);
                for attribute in element.attributes() {
                    let key = match &attribute.prefix {
                        Some(prefix) => format!("{prefix}:{}", attribute.local_name),
                        None => attribute.local_name.clone(),
                    };
                    artifact.set_property(key, attribute.value.clone());
                }
                ctx.derive(artifact);
            }
        }
        Ok(())
    }
}
