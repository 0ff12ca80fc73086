//! A compact XPath 1.0 subset over [`Document`](super::Document).
//!
//! Supported syntax:
//!
//! ```text
//! expr      := path ('|' path)*
//! path      := ('/' | '//' | './' | './/')? step (('/' | '//') step)*
//! step      := '.' | '..' | '@' nametest | nametest predicate*
//! nametest  := '*' | name | prefix ':' (name | '*')
//! predicate := '[' ( number | '@' nametest ('=' literal)? | nametest ('=' literal)? ) ']'
//! ```
//!
//! Unprefixed element names match elements in no namespace, as in XPath 1.0.
//! Prefixes resolve through a [`NamespaceContext`] at compile time.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use super::dom::{Attribute, Element};
use crate::error::{IngestError, Result};

// ============================================================================
// NAMESPACE CONTEXT
// ============================================================================

/// Prefix to namespace URI mappings used when compiling expressions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NamespaceContext {
    mappings: IndexMap<String, String>,
}

impl NamespaceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `prefix` to `uri`. An empty URI maps the prefix to "no namespace".
    pub fn add_mapping(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.mappings.insert(prefix.into(), uri.into());
    }

    pub fn with_mapping(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.add_mapping(prefix, uri);
        self
    }

    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.mappings.get(prefix).map(String::as_str)
    }

    pub fn extend<'a>(&mut self, mappings: impl IntoIterator<Item = (&'a String, &'a String)>) {
        for (prefix, uri) in mappings {
            self.add_mapping(prefix.clone(), uri.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

// ============================================================================
// RESULT NODES
// ============================================================================

/// A node selected by an expression.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum XNode<'d> {
    Element(Element<'d>),
    Attribute(Element<'d>, &'d Attribute),
}

impl<'d> XNode<'d> {
    /// The element itself, or the element owning the attribute.
    pub fn element(&self) -> Element<'d> {
        match self {
            Self::Element(e) | Self::Attribute(e, _) => *e,
        }
    }

    /// Attribute value, or the element's text content.
    pub fn value(&self) -> String {
        match self {
            Self::Element(e) => e.text_content(),
            Self::Attribute(_, a) => a.value.clone(),
        }
    }

    fn key(&self) -> NodeKey {
        match self {
            Self::Element(e) => NodeKey::Element(e.index()),
            Self::Attribute(e, a) => NodeKey::Attribute(e.index(), std::ptr::from_ref(*a) as usize),
        }
    }
}

/// Identity of a node within one document.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum NodeKey {
    Document,
    Element(usize),
    Attribute(usize, usize),
}

// ============================================================================
// COMPILED FORM
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
enum NameTest {
    Any,
    /// `None` namespace means "no namespace".
    Name {
        namespace: Option<String>,
        local: Option<String>,
    },
}

impl NameTest {
    fn matches(&self, namespace: Option<&str>, local: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Name {
                namespace: ns,
                local: name,
            } => ns.as_deref() == namespace && name.as_deref().is_none_or(|n| n == local),
        }
    }

    fn matches_element(&self, e: &Element<'_>) -> bool {
        self.matches(e.namespace(), e.local_name())
    }

    fn matches_attribute(&self, a: &Attribute) -> bool {
        match self {
            // `@*` excludes namespace declarations, which are never stored as attributes.
            Self::Any => true,
            _ => self.matches(a.namespace.as_deref(), &a.local_name),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Predicate {
    Position(usize),
    HasAttribute(NameTest),
    AttributeEquals(NameTest, String),
    HasChild(NameTest),
    ChildEquals(NameTest, String),
}

#[derive(Clone, Debug, PartialEq)]
enum Step {
    SelfNode,
    Parent,
    Child(NameTest, Vec<Predicate>),
    Attribute(NameTest),
}

#[derive(Clone, Debug, PartialEq)]
enum Start {
    Context,
    DocumentRoot,
}

/// A step preceded by `//` expands the input set to descendant-or-self first.
#[derive(Clone, Debug, PartialEq)]
struct LocatedStep {
    descendant: bool,
    step: Step,
}

#[derive(Clone, Debug, PartialEq)]
struct LocationPath {
    start: Start,
    steps: Vec<LocatedStep>,
}

/// A compiled expression.
#[derive(Clone, Debug, PartialEq)]
pub struct XPath {
    source: String,
    paths: Vec<LocationPath>,
}

impl XPath {
    pub fn compile(expr: &str, namespaces: &NamespaceContext) -> Result<Self> {
        let mut parser = Parser {
            input: expr.as_bytes(),
            pos: 0,
            expr,
            namespaces,
        };
        let paths = parser.parse_union()?;
        Ok(Self {
            source: expr.to_string(),
            paths,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluate against a context element. Results are in document order
    /// without duplicates.
    pub fn select<'d>(&self, context: Element<'d>) -> Vec<XNode<'d>> {
        let mut out: Vec<XNode<'d>> = Vec::new();
        let mut seen = FxHashSet::default();
        for path in &self.paths {
            for node in evaluate(path, context) {
                if seen.insert(node.key()) {
                    out.push(node);
                }
            }
        }
        if self.paths.len() > 1 {
            out.sort_by_key(|n| n.element().index());
        }
        tracing::trace!(expr = %self.source, matches = out.len(), "xpath evaluated");
        out
    }

    pub fn select_elements<'d>(&self, context: Element<'d>) -> Vec<Element<'d>> {
        self.select(context)
            .into_iter()
            .filter_map(|n| match n {
                XNode::Element(e) => Some(e),
                XNode::Attribute(..) => None,
            })
            .collect()
    }

    pub fn select_first<'d>(&self, context: Element<'d>) -> Option<XNode<'d>> {
        self.select(context).into_iter().next()
    }

    /// String values of all selected nodes.
    pub fn select_strings(&self, context: Element<'_>) -> Vec<String> {
        self.select(context).iter().map(XNode::value).collect()
    }
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Node-set member during evaluation. `Document` is the virtual parent of the root.
#[derive(Clone, Copy, PartialEq)]
enum Cursor<'d> {
    Document(Element<'d>),
    Node(XNode<'d>),
}

impl Cursor<'_> {
    fn key(&self) -> NodeKey {
        match self {
            Self::Document(_) => NodeKey::Document,
            Self::Node(node) => node.key(),
        }
    }
}

/// Cursors in insertion order without duplicates.
struct CursorSet<'d> {
    cursors: Vec<Cursor<'d>>,
    seen: FxHashSet<NodeKey>,
}

impl<'d> CursorSet<'d> {
    fn new() -> Self {
        Self {
            cursors: Vec::new(),
            seen: FxHashSet::default(),
        }
    }

    fn push(&mut self, cursor: Cursor<'d>) {
        if self.seen.insert(cursor.key()) {
            self.cursors.push(cursor);
        }
    }

    fn into_vec(self) -> Vec<Cursor<'d>> {
        self.cursors
    }
}

fn evaluate<'d>(path: &LocationPath, context: Element<'d>) -> Vec<XNode<'d>> {
    let mut current = vec![match path.start {
        Start::Context => Cursor::Node(XNode::Element(context)),
        Start::DocumentRoot => Cursor::Document(document_root(context)),
    }];

    for located in &path.steps {
        if located.descendant {
            current = descendant_or_self(&current);
        }
        let mut next = CursorSet::new();
        for cursor in &current {
            for produced in apply_step(&located.step, *cursor) {
                next.push(produced);
            }
        }
        current = next.into_vec();
    }

    current
        .into_iter()
        .filter_map(|c| match c {
            Cursor::Node(node) => Some(node),
            Cursor::Document(_) => None,
        })
        .collect()
}

fn document_root(mut element: Element<'_>) -> Element<'_> {
    while let Some(parent) = element.parent() {
        element = parent;
    }
    element
}

fn descendant_or_self<'d>(cursors: &[Cursor<'d>]) -> Vec<Cursor<'d>> {
    let mut out = CursorSet::new();
    for cursor in cursors {
        match *cursor {
            Cursor::Document(root) => {
                out.push(*cursor);
                out.push(Cursor::Node(XNode::Element(root)));
                for d in root.descendants() {
                    out.push(Cursor::Node(XNode::Element(d)));
                }
            }
            Cursor::Node(XNode::Element(e)) => {
                out.push(*cursor);
                for d in e.descendants() {
                    out.push(Cursor::Node(XNode::Element(d)));
                }
            }
            Cursor::Node(XNode::Attribute(..)) => out.push(*cursor),
        }
    }
    out.into_vec()
}

fn apply_step<'d>(step: &Step, cursor: Cursor<'d>) -> Vec<Cursor<'d>> {
    match (step, cursor) {
        (Step::SelfNode, c) => vec![c],
        (Step::Parent, Cursor::Node(XNode::Element(e))) => match e.parent() {
            Some(p) => vec![Cursor::Node(XNode::Element(p))],
            None => vec![Cursor::Document(e)],
        },
        (Step::Parent, Cursor::Node(XNode::Attribute(e, _))) => {
            vec![Cursor::Node(XNode::Element(e))]
        }
        (Step::Parent, Cursor::Document(_)) => Vec::new(),
        (Step::Child(test, predicates), Cursor::Document(root)) => {
            filter_children(vec![root], test, predicates)
        }
        (Step::Child(test, predicates), Cursor::Node(XNode::Element(e))) => {
            filter_children(e.children().collect(), test, predicates)
        }
        (Step::Attribute(test), Cursor::Node(XNode::Element(e))) => e
            .attributes()
            .iter()
            .filter(|a| test.matches_attribute(a))
            .map(|a| Cursor::Node(XNode::Attribute(e, a)))
            .collect(),
        _ => Vec::new(),
    }
}

fn filter_children<'d>(
    candidates: Vec<Element<'d>>,
    test: &NameTest,
    predicates: &[Predicate],
) -> Vec<Cursor<'d>> {
    let mut matched: Vec<Element<'d>> = candidates
        .into_iter()
        .filter(|e| test.matches_element(e))
        .collect();
    for predicate in predicates {
        matched = match predicate {
            Predicate::Position(n) => matched.into_iter().nth(n - 1).into_iter().collect(),
            other => matched
                .into_iter()
                .filter(|e| predicate_holds(other, e))
                .collect(),
        };
    }
    matched
        .into_iter()
        .map(|e| Cursor::Node(XNode::Element(e)))
        .collect()
}

fn predicate_holds(predicate: &Predicate, element: &Element<'_>) -> bool {
    match predicate {
        Predicate::Position(_) => true,
        Predicate::HasAttribute(test) => element.attributes().iter().any(|a| test.matches_attribute(a)),
        Predicate::AttributeEquals(test, value) => element
            .attributes()
            .iter()
            .any(|a| test.matches_attribute(a) && &a.value == value),
        Predicate::HasChild(test) => element.children().any(|c| test.matches_element(&c)),
        Predicate::ChildEquals(test, value) => element
            .children()
            .any(|c| test.matches_element(&c) && c.text_content().trim() == value),
    }
}

// ============================================================================
// PARSER
// ============================================================================

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    expr: &'a str,
    namespaces: &'a NamespaceContext,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> IngestError {
        IngestError::xpath(format!("{message} at offset {} in '{}'", self.pos, self.expr))
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, b: u8) -> bool {
        self.skip_ws();
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, b: u8) -> Result<()> {
        if self.eat(b) {
            Ok(())
        } else {
            Err(self.error(&format!("Expected '{}'", b as char)))
        }
    }

    fn parse_union(&mut self) -> Result<Vec<LocationPath>> {
        let mut paths = vec![self.parse_path()?];
        while self.eat(b'|') {
            paths.push(self.parse_path()?);
        }
        self.skip_ws();
        if self.pos != self.input.len() {
            return Err(self.error("Unexpected trailing input"));
        }
        Ok(paths)
    }

    /// Consume a `/` or `//` separator; returns `Some(is_descendant)`.
    fn separator(&mut self) -> Option<bool> {
        self.skip_ws();
        if self.peek() != Some(b'/') {
            return None;
        }
        if self.peek_at(1) == Some(b'/') {
            self.pos += 2;
            Some(true)
        } else {
            self.pos += 1;
            Some(false)
        }
    }

    fn parse_path(&mut self) -> Result<LocationPath> {
        self.skip_ws();
        let mut steps = Vec::new();
        let start = match self.separator() {
            Some(descendant) => {
                steps.push(LocatedStep {
                    descendant,
                    step: self.parse_step()?,
                });
                Start::DocumentRoot
            }
            None => {
                steps.push(LocatedStep {
                    descendant: false,
                    step: self.parse_step()?,
                });
                Start::Context
            }
        };
        while let Some(descendant) = self.separator() {
            steps.push(LocatedStep {
                descendant,
                step: self.parse_step()?,
            });
        }
        Ok(LocationPath { start, steps })
    }

    fn parse_step(&mut self) -> Result<Step> {
        self.skip_ws();
        if self.peek() == Some(b'.') {
            self.pos += 1;
            if self.peek() == Some(b'.') {
                self.pos += 1;
                return Ok(Step::Parent);
            }
            return Ok(Step::SelfNode);
        }
        if self.eat(b'@') {
            return Ok(Step::Attribute(self.parse_name_test()?));
        }
        let test = self.parse_name_test()?;
        let mut predicates = Vec::new();
        while self.eat(b'[') {
            predicates.push(self.parse_predicate()?);
            self.expect(b']')?;
        }
        Ok(Step::Child(test, predicates))
    }

    fn parse_name(&mut self) -> Option<String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.') || b >= 0x80)
        {
            self.pos += 1;
        }
        (self.pos > start).then(|| String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    fn parse_name_test(&mut self) -> Result<NameTest> {
        self.skip_ws();
        if self.peek() == Some(b'*') {
            self.pos += 1;
            return Ok(NameTest::Any);
        }
        let first = self.parse_name().ok_or_else(|| self.error("Expected name"))?;
        if self.peek() == Some(b':') {
            self.pos += 1;
            let namespace = self
                .namespaces
                .namespace(&first)
                .ok_or_else(|| self.error(&format!("Unknown prefix '{first}'")))?;
            let namespace = (!namespace.is_empty()).then(|| namespace.to_string());
            let local = if self.peek() == Some(b'*') {
                self.pos += 1;
                None
            } else {
                Some(self.parse_name().ok_or_else(|| self.error("Expected local name"))?)
            };
            return Ok(NameTest::Name { namespace, local });
        }
        Ok(NameTest::Name {
            namespace: None,
            local: Some(first),
        })
    }

    fn parse_literal(&mut self) -> Result<String> {
        self.skip_ws();
        let quote = self
            .peek()
            .filter(|&q| q == b'\'' || q == b'"')
            .ok_or_else(|| self.error("Expected string literal"))?;
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|b| b != quote) {
            self.pos += 1;
        }
        if self.peek() != Some(quote) {
            return Err(self.error("Unterminated string literal"));
        }
        let value = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
        self.pos += 1;
        Ok(value)
    }

    fn parse_predicate(&mut self) -> Result<Predicate> {
        self.skip_ws();
        if self.peek().is_some_and(|b| b.is_ascii_digit()) {
            let start = self.pos;
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
            let n: usize = std::str::from_utf8(&self.input[start..self.pos])
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .ok_or_else(|| self.error("Invalid position"))?;
            return Ok(Predicate::Position(n));
        }
        let attribute = self.eat(b'@');
        let test = self.parse_name_test()?;
        let value = if self.eat(b'=') {
            Some(self.parse_literal()?)
        } else {
            None
        };
        Ok(match (attribute, value) {
            (true, None) => Predicate::HasAttribute(test),
            (true, Some(v)) => Predicate::AttributeEquals(test, v),
            (false, None) => Predicate::HasChild(test),
            (false, Some(v)) => Predicate::ChildEquals(test, v),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::Document;

    const XS: &str = "http://www.w3.org/2001/XMLSchema";

    const SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:t">
  <xs:element name="a"/>
  <xs:element ref="b"/>
  <xs:complexType name="T">
    <xs:sequence><xs:element name="inner"/></xs:sequence>
  </xs:complexType>
  <xs:import namespace="urn:other" schemaLocation="other.xsd"/>
</xs:schema>"#;

    fn ns() -> NamespaceContext {
        NamespaceContext::new()
            .with_mapping("xsd", XS)
            .with_mapping("xs", XS)
    }

    #[test]
    fn test_relative_child_with_attribute_predicate() {
        let doc = Document::parse(SCHEMA.as_bytes()).unwrap();
        let xpath = XPath::compile("./xsd:element[@name]", &ns()).unwrap();
        let found = xpath.select_elements(doc.root());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].attribute("name"), Some("a"));
    }

    #[test]
    fn test_descendant_axis() {
        let doc = Document::parse(SCHEMA.as_bytes()).unwrap();
        let xpath = XPath::compile("//xs:element", &ns()).unwrap();
        assert_eq!(xpath.select(doc.root()).len(), 3);
    }

    #[test]
    fn test_absolute_root_step() {
        let doc = Document::parse(SCHEMA.as_bytes()).unwrap();
        let inner = XPath::compile("//xs:sequence", &ns())
            .unwrap()
            .select_elements(doc.root())[0];
        let xpath = XPath::compile("/xs:schema/@targetNamespace", &ns()).unwrap();
        assert_eq!(xpath.select_strings(inner), vec!["urn:t".to_string()]);
    }

    #[test]
    fn test_nested_descendant_steps_yield_each_node_once() {
        let depth = 300;
        let xml = format!("<root>{}{}</root>", "<item>".repeat(depth), "</item>".repeat(depth));
        let doc = Document::parse(xml.as_bytes()).unwrap();
        let ns = NamespaceContext::new();

        let nested = XPath::compile("//item//item", &ns).unwrap().select_elements(doc.root());
        assert_eq!(nested.len(), depth - 1);
        assert!(nested.windows(2).all(|w| w[0].index() < w[1].index()));

        let union = XPath::compile("//item | .//item", &ns).unwrap();
        assert_eq!(union.select(doc.root()).len(), depth);
    }

    #[test]
    fn test_union_and_attribute_values() {
        let doc = Document::parse(SCHEMA.as_bytes()).unwrap();
        let xpath = XPath::compile("./xs:import/@namespace | ./xs:element/@name", &ns()).unwrap();
        assert_eq!(xpath.select_strings(doc.root()), vec!["a", "urn:other"]);
    }

    #[test]
    fn test_attribute_equals_and_position() {
        let doc = Document::parse(SCHEMA.as_bytes()).unwrap();
        let eq = XPath::compile("xs:complexType[@name='T']", &ns()).unwrap();
        assert_eq!(eq.select(doc.root()).len(), 1);
        let second = XPath::compile("xs:element[2]/@ref", &ns()).unwrap();
        assert_eq!(second.select_strings(doc.root()), vec!["b"]);
    }

    #[test]
    fn test_unprefixed_matches_no_namespace_only() {
        let doc = Document::parse(br#"<root xmlns:p="urn:p"><item/><p:item/></root>"#).unwrap();
        let ns = NamespaceContext::new().with_mapping("p", "urn:p");
        assert_eq!(XPath::compile("item", &ns).unwrap().select(doc.root()).len(), 1);
        assert_eq!(XPath::compile("p:*", &ns).unwrap().select(doc.root()).len(), 1);
        assert_eq!(XPath::compile("*", &ns).unwrap().select(doc.root()).len(), 2);
    }

    #[test]
    fn test_compile_errors() {
        assert!(XPath::compile("foo:bar", &NamespaceContext::new()).is_err());
        assert!(XPath::compile("a[@b='c'", &NamespaceContext::new()).is_err());
        assert!(XPath::compile("a b", &NamespaceContext::new()).is_err());
    }
}
