//! WS-Policy derivation.

use super::xml::{XmlArtifactBuilder, XmlDeriveContext, XmlDeriver};
use crate::config::IngestConfig;
use crate::error::Result;
use crate::model::{Artifact, ArtifactKind};
use crate::xml::{NamespaceContext, ns};

/// Policy operators that become expressions when they appear at the top level.
const OPERATORS: &[&str] = &["All", "ExactlyOne", "Policy"];

#[derive(Debug, Default, Clone, Copy)]
pub struct PolicyDeriver;

pub fn builder(config: &IngestConfig) -> XmlArtifactBuilder<PolicyDeriver> {
    XmlArtifactBuilder::new(PolicyDeriver, config)
}

impl XmlDeriver for PolicyDeriver {
    fn name(&self) -> &'static str {
        "ws-policy"
    }

    fn configure_namespace_mappings(&self, namespaces: &mut NamespaceContext) {
        namespaces.add_mapping("wsp", ns::POLICY);
        namespaces.add_mapping("wsp2004", ns::POLICY_2004);
    }

    fn derive(&mut self, ctx: &mut XmlDeriveContext<'_>) -> Result<()> {
        let policy = ctx.root();
        ctx.primary
            .set_property_opt("policyName", policy.attribute_non_empty("Name"));

        for operator in policy.children() {
            let namespace = operator.namespace().unwrap_or_default();
            if !(namespace == ns::POLICY || namespace == ns::POLICY_2004)
                || !OPERATORS.contains(&operator.local_name())
            {
                continue;
            }
            let name = match operator.prefix() {
                Some(prefix) => format!("{prefix}:{}", operator.local_name()),
                None => operator.local_name().to_string(),
            };
            let mut expression = Artifact::new(ArtifactKind::PolicyExpression.into(), name)
                .with_namespace(namespace)
                .with_nc_name(operator.local_name())
                .with_property("operator", operator.local_name())
                .with_property("assertionCount", operator.children().count().to_string());
            expression.set_property_opt("policyName", operator.attribute_non_empty("Name"));
            ctx.derive(expression);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::ArtifactBuilder;
    use crate::model::ArtifactContent;

    #[test]
    fn test_one_expression_per_operator() {
        let body = r#"<wsp:Policy xmlns:wsp="http://www.w3.org/ns/ws-policy" Name="secure">
            <wsp:ExactlyOne>
              <wsp:All><sp:TransportBinding xmlns:sp="urn:sp"/></wsp:All>
              <wsp:All/>
            </wsp:ExactlyOne>
            <sp:Assertion xmlns:sp="urn:sp"/>
            <wsp:All/>
        </wsp:Policy>"#;
        let mut builder = builder(&IngestConfig::default());
        let content = ArtifactContent::new("secure.wspolicy", body.as_bytes().to_vec());
        let mut primary = Artifact::new(ArtifactKind::PolicyDocument.into(), "secure.wspolicy");
        builder.build_artifacts(&mut primary, &content).unwrap();

        assert_eq!(primary.property("policyName"), Some("secure"));
        let derived: Vec<_> = builder.derived_artifacts().iter().collect();
        assert_eq!(derived.len(), 2);
        assert_eq!(derived[0].name, "wsp:ExactlyOne");
        assert_eq!(derived[0].property("assertionCount"), Some("2"));
        assert_eq!(derived[1].property("operator"), Some("All"));
    }
}
