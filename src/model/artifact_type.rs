//! Artifact type tags.
//!
//! Built-in types are a closed enumeration ([`ArtifactKind`]). Anything else
//! is an extended type carrying a free-form sub-type name, e.g.
//! `ext/JavaClass` or `ext/SwitchYardService`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Model name for extended types.
pub const EXTENDED_MODEL: &str = "ext";

// ============================================================================
// BUILT-IN KINDS
// ============================================================================

/// The built-in artifact types, grouped by model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    // core
    Document,
    XmlDocument,

    // xsd
    XsdDocument,
    AttributeDeclaration,
    ElementDeclaration,
    SimpleTypeDeclaration,
    ComplexTypeDeclaration,

    // policy
    PolicyDocument,
    PolicyExpression,
    PolicyAttachment,

    // soapWsdl
    SoapAddress,
    SoapBinding,

    // wsdl
    WsdlDocument,
    WsdlService,
    Port,
    WsdlExtension,
    Part,
    Message,
    Fault,
    PortType,
    Operation,
    OperationInput,
    OperationOutput,
    Binding,
    BindingOperation,
    BindingOperationInput,
    BindingOperationOutput,
    BindingOperationFault,
}

impl ArtifactKind {
    /// Every built-in kind, in declaration order.
    pub const ALL: &'static [ArtifactKind] = &[
        Self::Document,
        Self::XmlDocument,
        Self::XsdDocument,
        Self::AttributeDeclaration,
        Self::ElementDeclaration,
        Self::SimpleTypeDeclaration,
        Self::ComplexTypeDeclaration,
        Self::PolicyDocument,
        Self::PolicyExpression,
        Self::PolicyAttachment,
        Self::SoapAddress,
        Self::SoapBinding,
        Self::WsdlDocument,
        Self::WsdlService,
        Self::Port,
        Self::WsdlExtension,
        Self::Part,
        Self::Message,
        Self::Fault,
        Self::PortType,
        Self::Operation,
        Self::OperationInput,
        Self::OperationOutput,
        Self::Binding,
        Self::BindingOperation,
        Self::BindingOperationInput,
        Self::BindingOperationOutput,
        Self::BindingOperationFault,
    ];

    /// The S-RAMP model this kind belongs to.
    pub fn model(self) -> &'static str {
        use ArtifactKind::*;
        match self {
            Document | XmlDocument => "core",
            XsdDocument | AttributeDeclaration | ElementDeclaration | SimpleTypeDeclaration
            | ComplexTypeDeclaration => "xsd",
            PolicyDocument | PolicyExpression | PolicyAttachment => "policy",
            SoapAddress | SoapBinding => "soapWsdl",
            WsdlDocument | WsdlService | Port | WsdlExtension | Part | Message | Fault
            | PortType | Operation | OperationInput | OperationOutput | Binding
            | BindingOperation | BindingOperationInput | BindingOperationOutput
            | BindingOperationFault => "wsdl",
        }
    }

    /// The type name, identical to the variant name.
    pub fn type_name(self) -> &'static str {
        use ArtifactKind::*;
        match self {
            Document => "Document",
            XmlDocument => "XmlDocument",
            XsdDocument => "XsdDocument",
            AttributeDeclaration => "AttributeDeclaration",
            ElementDeclaration => "ElementDeclaration",
            SimpleTypeDeclaration => "SimpleTypeDeclaration",
            ComplexTypeDeclaration => "ComplexTypeDeclaration",
            PolicyDocument => "PolicyDocument",
            PolicyExpression => "PolicyExpression",
            PolicyAttachment => "PolicyAttachment",
            SoapAddress => "SoapAddress",
            SoapBinding => "SoapBinding",
            WsdlDocument => "WsdlDocument",
            WsdlService => "WsdlService",
            Port => "Port",
            WsdlExtension => "WsdlExtension",
            Part => "Part",
            Message => "Message",
            Fault => "Fault",
            PortType => "PortType",
            Operation => "Operation",
            OperationInput => "OperationInput",
            OperationOutput => "OperationOutput",
            Binding => "Binding",
            BindingOperation => "BindingOperation",
            BindingOperationInput => "BindingOperationInput",
            BindingOperationOutput => "BindingOperationOutput",
            BindingOperationFault => "BindingOperationFault",
        }
    }

    /// Human readable label.
    pub fn label(self) -> &'static str {
        use ArtifactKind::*;
        match self {
            Document => "Document",
            XmlDocument => "XML Document",
            XsdDocument => "XML Schema",
            AttributeDeclaration => "XML Schema Attribute Declaration",
            ElementDeclaration => "XML Schema Element Declaration",
            SimpleTypeDeclaration => "XML Schema Simple Type Declaration",
            ComplexTypeDeclaration => "XML Schema Complex Type Declaration",
            PolicyDocument => "Policy",
            PolicyExpression => "Policy Expression",
            PolicyAttachment => "Policy Attachment",
            SoapAddress => "SOAP Address",
            SoapBinding => "SOAP Binding",
            WsdlDocument => "WSDL",
            WsdlService => "WSDL Service",
            Port => "WSDL Port",
            WsdlExtension => "WSDL Extension",
            Part => "WSDL Part",
            Message => "WSDL Message",
            Fault => "WSDL Fault",
            PortType => "WSDL Port Type",
            Operation => "WSDL Operation",
            OperationInput => "WSDL Operation Input",
            OperationOutput => "WSDL Operation Output",
            Binding => "WSDL Binding",
            BindingOperation => "WSDL Binding Operation",
            BindingOperationInput => "WSDL Binding Operation Input",
            BindingOperationOutput => "WSDL Binding Operation Output",
            BindingOperationFault => "WSDL Binding Operation Fault",
        }
    }

    /// Documents carry content; everything else is derived.
    pub fn is_document(self) -> bool {
        matches!(
            self,
            Self::Document
                | Self::XmlDocument
                | Self::XsdDocument
                | Self::PolicyDocument
                | Self::WsdlDocument
        )
    }

    pub fn is_derived(self) -> bool {
        !self.is_document()
    }

    /// Documents whose content is XML.
    pub fn is_xml(self) -> bool {
        matches!(
            self,
            Self::XmlDocument | Self::XsdDocument | Self::PolicyDocument | Self::WsdlDocument
        )
    }

    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.type_name() == name)
    }
}

// ============================================================================
// ARTIFACT TYPE
// ============================================================================

/// Type tag of an artifact: a built-in kind or an extended sub-type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactType {
    Core(ArtifactKind),
    Extended {
        extended_type: String,
        derived: bool,
        document: bool,
    },
}

impl ArtifactType {
    pub fn document() -> Self {
        Self::Core(ArtifactKind::Document)
    }

    pub fn xml_document() -> Self {
        Self::Core(ArtifactKind::XmlDocument)
    }

    /// An extended type whose instances carry content.
    pub fn extended_document(extended_type: impl Into<String>) -> Self {
        Self::Extended {
            extended_type: extended_type.into(),
            derived: false,
            document: true,
        }
    }

    /// An extended type produced by a builder rather than uploaded.
    pub fn extended_derived(extended_type: impl Into<String>) -> Self {
        Self::Extended {
            extended_type: extended_type.into(),
            derived: true,
            document: false,
        }
    }

    pub fn kind(&self) -> Option<ArtifactKind> {
        match self {
            Self::Core(kind) => Some(*kind),
            Self::Extended { .. } => None,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::Core(kind) => kind.model(),
            Self::Extended { .. } => EXTENDED_MODEL,
        }
    }

    /// Built-in type name, or the extended sub-type.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Core(kind) => kind.type_name(),
            Self::Extended { extended_type, .. } => extended_type,
        }
    }

    pub fn extended_type(&self) -> Option<&str> {
        match self {
            Self::Core(_) => None,
            Self::Extended { extended_type, .. } => Some(extended_type),
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, Self::Extended { .. })
    }

    /// Whether this is the extended type with the given sub-type name.
    pub fn is_extended_type(&self, name: &str) -> bool {
        self.extended_type() == Some(name)
    }

    pub fn is_derived(&self) -> bool {
        match self {
            Self::Core(kind) => kind.is_derived(),
            Self::Extended { derived, .. } => *derived,
        }
    }

    pub fn is_document(&self) -> bool {
        match self {
            Self::Core(kind) => kind.is_document(),
            Self::Extended { document, .. } => *document,
        }
    }

    /// The generic fallback type.
    pub fn is_generic(&self) -> bool {
        matches!(self, Self::Core(ArtifactKind::Document))
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Core(kind) => kind.label(),
            Self::Extended { extended_type, .. } => extended_type,
        }
    }
}

impl From<ArtifactKind> for ArtifactType {
    fn from(kind: ArtifactKind) -> Self {
        Self::Core(kind)
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.model(), self.type_name())
    }
}

impl FromStr for ArtifactType {
    type Err = String;

    /// Parses `model/Type`, or a bare type name.
    ///
    /// Extended types parse as documents.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (model, name) = match s.split_once('/') {
            Some((model, name)) => (Some(model), name),
            None => (None, s),
        };
        if name.is_empty() {
            return Err(format!("Empty artifact type: '{s}'"));
        }
        match model {
            Some(EXTENDED_MODEL) => Ok(Self::extended_document(name)),
            Some(model) => match ArtifactKind::from_type_name(name) {
                Some(kind) if kind.model() == model => Ok(Self::Core(kind)),
                _ => Err(format!("Unknown artifact type: '{s}'")),
            },
            None => Ok(ArtifactKind::from_type_name(name)
                .map(Self::Core)
                .unwrap_or_else(|| Self::extended_document(name))),
        }
    }
}
