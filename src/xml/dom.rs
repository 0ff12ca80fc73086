//! Namespace-aware, read-only DOM built from quick-xml events.
//!
//! Elements live in an arena owned by [`Document`]; [`Element`] is a cheap
//! `Copy` handle into it.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{IngestError, Result};
use crate::model::ArtifactContent;

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// An attribute with its prefix resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub prefix: Option<String>,
    pub local_name: String,
    pub namespace: Option<String>,
    pub value: String,
}

#[derive(Debug)]
struct NodeData {
    prefix: Option<String>,
    local_name: String,
    namespace: Option<String>,
    attributes: Vec<Attribute>,
    /// `xmlns` declarations made on this element: (prefix, uri).
    declarations: Vec<(Option<String>, String)>,
    children: Vec<usize>,
    parent: Option<usize>,
    text: String,
}

/// A parsed XML document.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
    encoding: Option<String>,
}

impl Document {
    /// Parse raw bytes. Errors carry no file context; see [`Document::parse_content`].
    pub fn parse(input: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);

        let mut doc = Document {
            nodes: Vec::new(),
            encoding: None,
        };
        let mut stack: Vec<usize> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Decl(ref decl)) => {
                    if let Some(Ok(encoding)) = decl.encoding() {
                        doc.encoding = Some(String::from_utf8_lossy(&encoding).into_owned());
                    }
                }
                Ok(Event::Start(ref e)) => {
                    let id = doc.open_element(e, stack.last().copied())?;
                    stack.push(id);
                }
                Ok(Event::Empty(ref e)) => {
                    doc.open_element(e, stack.last().copied())?;
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Text(ref t)) => {
                    if let Some(&current) = stack.last() {
                        let text = t
                            .unescape()
                            .map_err(|e| IngestError::xml(format!("Invalid text: {e}")))?;
                        doc.nodes[current].text.push_str(&text);
                    }
                }
                Ok(Event::CData(c)) => {
                    if let Some(&current) = stack.last() {
                        let data = c.into_inner();
                        doc.nodes[current]
                            .text
                            .push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(IngestError::xml(format!(
                        "XML parse error at position {}: {e}",
                        reader.error_position()
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(IngestError::xml("Unexpected end of document"));
        }
        if doc.nodes.is_empty() {
            return Err(IngestError::xml("Document has no root element"));
        }
        Ok(doc)
    }

    /// Parse artifact content, reporting failures against its filename.
    pub fn parse_content(content: &ArtifactContent) -> Result<Self> {
        Self::parse(content.bytes()).map_err(|e| match e {
            IngestError::Xml(message) => IngestError::parse(content.filename(), message),
            other => other,
        })
    }

    pub fn root(&self) -> Element<'_> {
        Element { doc: self, id: 0 }
    }

    /// Encoding from the XML declaration, if any.
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    fn open_element(&mut self, e: &BytesStart<'_>, parent: Option<usize>) -> Result<usize> {
        if parent.is_none() && !self.nodes.is_empty() {
            return Err(IngestError::xml("Multiple root elements"));
        }

        let name = std::str::from_utf8(e.name().as_ref())
            .map_err(|e| IngestError::xml(format!("Invalid tag name: {e}")))?
            .to_string();
        let (prefix, local_name) = split_qname(&name);

        let mut declarations = Vec::new();
        let mut raw_attributes = Vec::new();
        for attr_result in e.attributes() {
            let attr =
                attr_result.map_err(|e| IngestError::xml(format!("Attribute error: {e}")))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| IngestError::xml(format!("Attribute key error: {e}")))?
                .to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| IngestError::xml(format!("Attribute value error: {e}")))?
                .to_string();

            if key == "xmlns" {
                declarations.push((None, value));
            } else if let Some(declared) = key.strip_prefix("xmlns:") {
                declarations.push((Some(declared.to_string()), value));
            } else {
                raw_attributes.push((key, value));
            }
        }

        let namespace = self.resolve_prefix(&declarations, parent, prefix.as_deref());
        let attributes = raw_attributes
            .into_iter()
            .map(|(key, value)| {
                let (prefix, local_name) = split_qname(&key);
                // Unprefixed attributes are in no namespace.
                let namespace = prefix
                    .as_deref()
                    .and_then(|p| self.resolve_prefix(&declarations, parent, Some(p)));
                Attribute {
                    prefix,
                    local_name,
                    namespace,
                    value,
                }
            })
            .collect();

        let id = self.nodes.len();
        self.nodes.push(NodeData {
            prefix,
            local_name,
            namespace,
            attributes,
            declarations,
            children: Vec::new(),
            parent,
            text: String::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(id);
        }
        Ok(id)
    }

    fn resolve_prefix(
        &self,
        declarations: &[(Option<String>, String)],
        parent: Option<usize>,
        prefix: Option<&str>,
    ) -> Option<String> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE.to_string());
        }
        if let Some((_, uri)) = declarations.iter().find(|(p, _)| p.as_deref() == prefix) {
            return non_empty(uri);
        }
        let mut current = parent;
        while let Some(id) = current {
            let node = &self.nodes[id];
            if let Some((_, uri)) = node.declarations.iter().find(|(p, _)| p.as_deref() == prefix) {
                return non_empty(uri);
            }
            current = node.parent;
        }
        None
    }
}

/// Namespace and local name of the root element, reading no further than
/// its start tag. `None` if the input is not XML.
pub fn sniff_root(input: &[u8]) -> Option<(String, String)> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = std::str::from_utf8(e.name().as_ref()).ok()?.to_string();
                let (prefix, local) = split_qname(&name);
                let wanted = match &prefix {
                    Some(p) => format!("xmlns:{p}"),
                    None => "xmlns".to_string(),
                };
                let namespace = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref() == wanted.as_bytes())
                    .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
                    .unwrap_or_default();
                return Some((namespace, local));
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(Event::Text(_)) | Ok(Event::CData(_)) => return None,
            _ => {}
        }
        buf.clear();
    }
}

fn non_empty(uri: &str) -> Option<String> {
    (!uri.is_empty()).then(|| uri.to_string())
}

/// Split `prefix:local` into its parts.
pub fn split_qname(name: &str) -> (Option<String>, String) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix.to_string()), local.to_string()),
        None => (None, name.to_string()),
    }
}

// ============================================================================
// ELEMENT HANDLE
// ============================================================================

/// Handle to one element of a [`Document`].
#[derive(Clone, Copy, Debug)]
pub struct Element<'d> {
    doc: &'d Document,
    id: usize,
}

impl PartialEq for Element<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for Element<'_> {}

impl<'d> Element<'d> {
    fn data(&self) -> &'d NodeData {
        &self.doc.nodes[self.id]
    }

    /// Position in document order.
    pub fn index(&self) -> usize {
        self.id
    }

    pub fn local_name(&self) -> &'d str {
        &self.data().local_name
    }

    pub fn prefix(&self) -> Option<&'d str> {
        self.data().prefix.as_deref()
    }

    pub fn namespace(&self) -> Option<&'d str> {
        self.data().namespace.as_deref()
    }

    /// Whether the element has the given namespace and local name.
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.local_name() == local_name && self.namespace().unwrap_or("") == namespace
    }

    pub fn attributes(&self) -> &'d [Attribute] {
        &self.data().attributes
    }

    /// Attribute by name: `local` matches unprefixed attributes, `p:local` matches literally.
    pub fn attribute(&self, name: &str) -> Option<&'d str> {
        let (prefix, local) = split_qname(name);
        self.attributes()
            .iter()
            .find(|a| a.local_name == local && a.prefix == prefix)
            .map(|a| a.value.as_str())
    }

    /// Attribute by resolved namespace and local name.
    pub fn attribute_ns(&self, namespace: Option<&str>, local_name: &str) -> Option<&'d str> {
        self.attributes()
            .iter()
            .find(|a| a.local_name == local_name && a.namespace.as_deref() == namespace)
            .map(|a| a.value.as_str())
    }

    /// Non-empty attribute value.
    pub fn attribute_non_empty(&self, name: &str) -> Option<&'d str> {
        self.attribute(name).filter(|v| !v.is_empty())
    }

    pub fn parent(&self) -> Option<Element<'d>> {
        self.data().parent.map(|id| Element { doc: self.doc, id })
    }

    pub fn children(&self) -> impl Iterator<Item = Element<'d>> + use<'d> {
        let doc = self.doc;
        self.data()
            .children
            .iter()
            .map(move |&id| Element { doc, id })
    }

    /// Child elements with the given namespace and local name.
    pub fn children_named(
        &self,
        namespace: &'d str,
        local_name: &'d str,
    ) -> impl Iterator<Item = Element<'d>> + use<'d> {
        self.children().filter(move |c| c.is(namespace, local_name))
    }

    pub fn first_child_named(&self, namespace: &str, local_name: &str) -> Option<Element<'d>> {
        self.children().find(|c| c.is(namespace, local_name))
    }

    /// All descendants in document order, excluding `self`.
    pub fn descendants(&self) -> Vec<Element<'d>> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.data().children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(Element { doc: self.doc, id });
            stack.extend(self.doc.nodes[id].children.iter().rev().copied());
        }
        out
    }

    /// Text directly inside this element.
    pub fn text(&self) -> &'d str {
        &self.data().text
    }

    /// Concatenated text of this element and its descendants.
    pub fn text_content(&self) -> String {
        let mut text = self.text().to_string();
        for child in self.descendants() {
            text.push_str(child.text());
        }
        text
    }

    /// Namespace URI in scope for a prefix (`None` for the default namespace).
    pub fn lookup_namespace(&self, prefix: Option<&str>) -> Option<String> {
        self.doc.resolve_prefix(&[], Some(self.id), prefix)
    }

    /// Resolve a QName-valued attribute like `tns:Order` against the
    /// namespaces in scope. Returns `(namespace, local_name)`.
    pub fn resolve_qname(&self, value: &str) -> (String, String) {
        let value = value.trim();
        let (prefix, local) = split_qname(value);
        let namespace = self.lookup_namespace(prefix.as_deref()).unwrap_or_default();
        (namespace, local)
    }
}
