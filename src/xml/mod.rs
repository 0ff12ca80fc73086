//! XML support: a namespace-aware DOM and an XPath subset.

mod dom;
mod xpath;

pub use dom::{Attribute, Document, Element, XML_NAMESPACE, sniff_root, split_qname};
pub use xpath::{NamespaceContext, XNode, XPath};

/// Well-known namespace URIs.
pub mod ns {
    pub const XSD: &str = "http://www.w3.org/2001/XMLSchema";
    pub const WSDL: &str = "http://schemas.xmlsoap.org/wsdl/";
    pub const SOAP: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
    pub const SOAP12: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";
    pub const POLICY: &str = "http://www.w3.org/ns/ws-policy";
    pub const POLICY_2004: &str = "http://schemas.xmlsoap.org/ws/2004/09/policy";
    pub const MAVEN_POM: &str = "http://maven.apache.org/POM/4.0.0";
}
