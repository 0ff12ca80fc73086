//! WSDL 1.1 derivation.

use indexmap::IndexMap;
use uuid::Uuid;

use super::xml::{XmlArtifactBuilder, XmlDeriveContext, XmlDeriver};
use super::xsd::{IMPORTED_XSDS, add_schema_mappings, derive_schema};
use crate::config::IngestConfig;
use crate::error::Result;
use crate::model::{Artifact, ArtifactKind, IdentityKey, QNameKind};
use crate::xml::{Element, NamespaceContext, ns, split_qname};

pub const IMPORTED_WSDLS: &str = "importedWsdls";
pub const PART: &str = "part";
pub const ELEMENT: &str = "element";
pub const TYPE: &str = "type";
pub const OPERATION: &str = "operation";
pub const INPUT: &str = "input";
pub const OUTPUT: &str = "output";
pub const FAULT: &str = "fault";
pub const MESSAGE: &str = "message";
pub const PORT_TYPE: &str = "portType";
pub const BINDING_OPERATION: &str = "bindingOperation";
pub const BINDING: &str = "binding";
pub const PORT: &str = "port";
pub const EXTENSION: &str = "extension";

#[derive(Debug, Default)]
pub struct WsdlDeriver {
    /// `(port type local name, operation name) -> operation` for this document.
    operations: IndexMap<(String, String), Uuid>,
}

pub fn builder(config: &IngestConfig) -> XmlArtifactBuilder<WsdlDeriver> {
    XmlArtifactBuilder::new(WsdlDeriver::default(), config)
}

impl XmlDeriver for WsdlDeriver {
    fn name(&self) -> &'static str {
        "wsdl"
    }

    fn configure_namespace_mappings(&self, namespaces: &mut NamespaceContext) {
        add_schema_mappings(namespaces);
        namespaces.add_mapping("wsdl", ns::WSDL);
        namespaces.add_mapping("soap", ns::SOAP);
        namespaces.add_mapping("soap12", ns::SOAP12);
    }

    fn derive(&mut self, ctx: &mut XmlDeriveContext<'_>) -> Result<()> {
        let definitions = ctx.root();
        let target = definitions.attribute("targetNamespace").unwrap_or_default();
        if !target.is_empty() {
            ctx.primary.namespace = Some(target.to_string());
        }

        for schema in ctx.elements(definitions, "./wsdl:types/xsd:schema")? {
            derive_schema(ctx, schema)?;
        }
        self.imports(ctx, definitions)?;
        self.messages(ctx, definitions, target)?;
        self.port_types(ctx, definitions, target)?;
        self.bindings(ctx, definitions, target)?;
        self.services(ctx, definitions, target)?;
        Ok(())
    }
}

/// Resolve a QName-valued attribute. Unprefixed names take the target
/// namespace; unknown prefixes leave the name unqualified.
fn qname_key(element: Element<'_>, kind: QNameKind, value: &str, target: &str) -> IdentityKey {
    let value = value.trim();
    match split_qname(value) {
        (None, local) => IdentityKey::qname(kind, target, local),
        (Some(prefix), local) => match element.lookup_namespace(Some(prefix.as_str())) {
            Some(namespace) => IdentityKey::qname(kind, namespace, local),
            None => IdentityKey::qname(kind, "", value),
        },
    }
}

/// Named component in the document's target namespace.
fn component(kind: ArtifactKind, element: Element<'_>, fallback: &str, target: &str) -> Artifact {
    match element.attribute_non_empty("name") {
        Some(name) => Artifact::new(kind.into(), name)
            .with_namespace(target)
            .with_nc_name(name),
        None => Artifact::new(kind.into(), fallback).with_namespace(target),
    }
}

impl WsdlDeriver {
    fn imports<'a>(&self, ctx: &mut XmlDeriveContext<'a>, definitions: Element<'a>) -> Result<()> {
        for import in ctx.elements(definitions, "./wsdl:import")? {
            let Some(namespace) = import.attribute("namespace") else {
                continue;
            };
            let is_schema = import
                .attribute("location")
                .is_some_and(|l| l.to_ascii_lowercase().ends_with(".xsd"));
            let (relationship, key) = if is_schema {
                (IMPORTED_XSDS, IdentityKey::XsdDocument(namespace.to_string()))
            } else {
                (IMPORTED_WSDLS, IdentityKey::WsdlDocument(namespace.to_string()))
            };
            ctx.primary.relate_by_key(relationship, key);
        }
        Ok(())
    }

    fn messages<'a>(
        &self,
        ctx: &mut XmlDeriveContext<'a>,
        definitions: Element<'a>,
        target: &str,
    ) -> Result<()> {
        for message_elem in ctx.elements(definitions, "./wsdl:message")? {
            if message_elem.attribute_non_empty("name").is_none() {
                continue;
            }
            let mut message = component(ArtifactKind::Message, message_elem, "wsdl:message", target);
            for part_elem in ctx.elements(message_elem, "./wsdl:part")? {
                let mut part = component(ArtifactKind::Part, part_elem, "wsdl:part", target);
                if let Some(element) = part_elem.attribute_non_empty("element") {
                    part.relate_by_key(ELEMENT, qname_key(part_elem, QNameKind::Element, element, target));
                } else if let Some(type_name) = part_elem.attribute_non_empty("type") {
                    part.relate_by_key(TYPE, qname_key(part_elem, QNameKind::Type, type_name, target));
                }
                message.relate(PART, ctx.derive(part));
            }
            ctx.derive(message);
        }
        Ok(())
    }

    fn port_types<'a>(
        &mut self,
        ctx: &mut XmlDeriveContext<'a>,
        definitions: Element<'a>,
        target: &str,
    ) -> Result<()> {
        for port_type_elem in ctx.elements(definitions, "./wsdl:portType")? {
            let Some(port_type_name) = port_type_elem.attribute_non_empty("name") else {
                continue;
            };
            let mut port_type = component(ArtifactKind::PortType, port_type_elem, "", target);
            for operation_elem in ctx.elements(port_type_elem, "./wsdl:operation")? {
                let Some(operation_name) = operation_elem.attribute_non_empty("name") else {
                    continue;
                };
                let mut operation = component(ArtifactKind::Operation, operation_elem, "", target);
                for (expr, kind, relationship) in [
                    ("./wsdl:input", ArtifactKind::OperationInput, INPUT),
                    ("./wsdl:output", ArtifactKind::OperationOutput, OUTPUT),
                    ("./wsdl:fault", ArtifactKind::Fault, FAULT),
                ] {
                    for io_elem in ctx.elements(operation_elem, expr)? {
                        let io = Self::operation_io(io_elem, kind, target);
                        operation.relate(relationship, ctx.derive(io));
                    }
                }
                let uuid = ctx.derive(operation);
                self.operations
                    .insert((port_type_name.to_string(), operation_name.to_string()), uuid);
                port_type.relate(OPERATION, uuid);
            }
            ctx.derive(port_type);
        }
        Ok(())
    }

    /// Operation input, output or fault referencing its message.
    fn operation_io(element: Element<'_>, kind: ArtifactKind, target: &str) -> Artifact {
        let message = element.attribute_non_empty("message");
        let fallback = message
            .map(|m| split_qname(m.trim()).1)
            .unwrap_or_else(|| format!("wsdl:{}", element.local_name()));
        let mut io = component(kind, element, &fallback, target);
        if let Some(message) = message {
            io.relate_by_key(MESSAGE, qname_key(element, QNameKind::Message, message, target));
        }
        io
    }

    fn bindings<'a>(
        &self,
        ctx: &mut XmlDeriveContext<'a>,
        definitions: Element<'a>,
        target: &str,
    ) -> Result<()> {
        for binding_elem in ctx.elements(definitions, "./wsdl:binding")? {
            if binding_elem.attribute_non_empty("name").is_none() {
                continue;
            }
            let mut binding = component(ArtifactKind::Binding, binding_elem, "", target);

            let port_type = binding_elem.attribute_non_empty("type");
            if let Some(port_type) = port_type {
                binding.relate_by_key(PORT_TYPE, qname_key(binding_elem, QNameKind::PortType, port_type, target));
            }
            // Only port types of this document are known by operation.
            let local_port_type = port_type
                .map(|p| qname_key(binding_elem, QNameKind::PortType, p, target))
                .and_then(|key| match key {
                    IdentityKey::QName {
                        namespace,
                        local_name,
                        ..
                    } if namespace == target => Some(local_name),
                    _ => None,
                });

            for extension in Self::extensions(ctx, binding_elem, &["binding"], ArtifactKind::SoapBinding) {
                binding.relate(EXTENSION, extension);
            }

            for operation_elem in ctx.elements(binding_elem, "./wsdl:operation")? {
                let Some(operation_name) = operation_elem.attribute_non_empty("name") else {
                    continue;
                };
                let mut binding_operation =
                    component(ArtifactKind::BindingOperation, operation_elem, "", target);
                if let Some(operation) = local_port_type.as_ref().and_then(|pt| {
                    self.operations
                        .get(&(pt.clone(), operation_name.to_string()))
                        .copied()
                }) {
                    binding_operation.relate(OPERATION, operation);
                }
                for (expr, kind, relationship) in [
                    ("./wsdl:input", ArtifactKind::BindingOperationInput, INPUT),
                    ("./wsdl:output", ArtifactKind::BindingOperationOutput, OUTPUT),
                    ("./wsdl:fault", ArtifactKind::BindingOperationFault, FAULT),
                ] {
                    for io_elem in ctx.elements(operation_elem, expr)? {
                        let fallback = format!("wsdl:{}", io_elem.local_name());
                        let io = component(kind, io_elem, &fallback, target);
                        binding_operation.relate(relationship, ctx.derive(io));
                    }
                }
                binding.relate(BINDING_OPERATION, ctx.derive(binding_operation));
            }
            ctx.derive(binding);
        }
        Ok(())
    }

    fn services<'a>(
        &self,
        ctx: &mut XmlDeriveContext<'a>,
        definitions: Element<'a>,
        target: &str,
    ) -> Result<()> {
        for service_elem in ctx.elements(definitions, "./wsdl:service")? {
            let mut service = component(ArtifactKind::WsdlService, service_elem, "wsdl:service", target);
            for port_elem in ctx.elements(service_elem, "./wsdl:port")? {
                let mut port = component(ArtifactKind::Port, port_elem, "wsdl:port", target);
                if let Some(binding) = port_elem.attribute_non_empty("binding") {
                    port.relate_by_key(BINDING, qname_key(port_elem, QNameKind::Binding, binding, target));
                }
                for extension in Self::extensions(ctx, port_elem, &["address"], ArtifactKind::SoapAddress) {
                    port.relate(EXTENSION, extension);
                }
                service.relate(PORT, ctx.derive(port));
            }
            ctx.derive(service);
        }
        Ok(())
    }

    /// Derive the extensibility elements of a binding or port. SOAP
    /// elements named in `soap_names` become `soap_kind`; anything else
    /// outside the WSDL namespace becomes a generic `WsdlExtension`.
    fn extensions<'a>(
        ctx: &mut XmlDeriveContext<'a>,
        parent: Element<'a>,
        soap_names: &[&str],
        soap_kind: ArtifactKind,
    ) -> Vec<Uuid> {
        let mut derived = Vec::new();
        for child in parent.children() {
            let namespace = child.namespace().unwrap_or_default();
            if namespace == ns::WSDL {
                continue;
            }
            let is_soap = (namespace == ns::SOAP || namespace == ns::SOAP12)
                && soap_names.contains(&child.local_name());
            let qualified = match child.prefix() {
                Some(prefix) => format!("{prefix}:{}", child.local_name()),
                None => child.local_name().to_string(),
            };
            let kind = if is_soap { soap_kind } else { ArtifactKind::WsdlExtension };
            let mut extension = Artifact::new(kind.into(), qualified)
                .with_namespace(namespace)
                .with_nc_name(child.local_name());
            if is_soap {
                match soap_kind {
                    ArtifactKind::SoapBinding => {
                        extension.set_property_opt("style", child.attribute("style"));
                        extension.set_property_opt("transport", child.attribute("transport"));
                    }
                    _ => extension.set_property_opt("soapLocation", child.attribute("location")),
                }
            }
            derived.push(ctx.derive(extension));
        }
        derived
    }
}
