//! Maven POM inspection.

use super::xml::{XmlArtifactBuilder, XmlDeriveContext, XmlDeriver};
use crate::config::IngestConfig;
use crate::error::Result;
use crate::xml::Element;

pub const MAVEN_POM: &str = "MavenPom";

pub const GROUP_ID: &str = "maven.groupId";
pub const ARTIFACT_ID: &str = "maven.artifactId";
pub const VERSION: &str = "maven.version";
pub const PARENT_GROUP_ID: &str = "maven.parent-groupId";
pub const PARENT_ARTIFACT_ID: &str = "maven.parent-artifactId";
pub const PARENT_VERSION: &str = "maven.parent-version";
/// Prefix of properties copied from `<properties>`.
pub const PROPERTY_PREFIX: &str = "maven.property.";

/// The parts of a POM recorded on the primary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomModel {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent: Option<(Option<String>, Option<String>, Option<String>)>,
    pub properties: Vec<(String, String)>,
}

impl PomModel {
    /// Read the model from a `<project>` element. Elements are matched by
    /// local name in the project's own namespace, so both namespaced and
    /// bare POMs are accepted.
    pub fn from_project(project: Element<'_>) -> Self {
        let namespace = project.namespace().unwrap_or_default();
        let child = |parent: Element<'_>, name: &str| -> Option<String> {
            parent
                .first_child_named(namespace, name)
                .map(|e| e.text_content().trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let parent = project.first_child_named(namespace, "parent").map(|p| {
            (
                child(p, "groupId"),
                child(p, "artifactId"),
                child(p, "version"),
            )
        });
        let properties = project
            .first_child_named(namespace, "properties")
            .map(|props| {
                props
                    .children()
                    .map(|p| (p.local_name().to_string(), p.text_content().trim().to_string()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            group_id: child(project, "groupId"),
            artifact_id: child(project, "artifactId"),
            version: child(project, "version"),
            name: child(project, "name"),
            description: child(project, "description"),
            parent,
            properties,
        }
    }

    /// Group id, inherited from the parent when omitted.
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.0.as_deref()))
    }

    /// Version, inherited from the parent when omitted.
    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.2.as_deref()))
    }
}

#[derive(Debug, Default, Clone)]
pub struct PomDeriver {
    model: Option<PomModel>,
}

impl PomDeriver {
    /// The model read by the last derivation.
    pub fn model(&self) -> Option<&PomModel> {
        self.model.as_ref()
    }
}

pub fn builder(config: &IngestConfig) -> XmlArtifactBuilder<PomDeriver> {
    XmlArtifactBuilder::new(PomDeriver::default(), config)
}

impl XmlDeriver for PomDeriver {
    fn name(&self) -> &'static str {
        "maven-pom"
    }

    fn derive(&mut self, ctx: &mut XmlDeriveContext<'_>) -> Result<()> {
        let model = PomModel::from_project(ctx.root());
        let primary = &mut *ctx.primary;

        for (name, value) in &model.properties {
            primary.set_property(format!("{PROPERTY_PREFIX}{name}"), value.clone());
        }
        primary.set_property_opt(GROUP_ID, model.effective_group_id());
        primary.set_property_opt(ARTIFACT_ID, model.artifact_id.as_deref());
        primary.set_property_opt(VERSION, model.effective_version());
        if let Some((group, artifact, version)) = &model.parent {
            primary.set_property_opt(PARENT_GROUP_ID, group.as_deref());
            primary.set_property_opt(PARENT_ARTIFACT_ID, artifact.as_deref());
            primary.set_property_opt(PARENT_VERSION, version.as_deref());
        }

        // A name defaulted from the filename counts as absent.
        let name_absent = primary.name.is_empty() || primary.name == ctx.content.base_name();
        if name_absent {
            if let Some(name) = model.name.as_ref().or(model.artifact_id.as_ref()) {
                primary.name = name.clone();
            }
        }
        if primary.description.is_none() {
            primary.description = model.description.clone();
        }
        if primary.version.is_none() {
            primary.version = model.effective_version().map(str::to_string);
        }

        self.model = Some(model);
        Ok(())
    }
}
