//! Document trees
//!
//! This module defines the node graph the engine operates on and a
//! quick-xml based parser that produces it. Element and attribute
//! namespaces are resolved at parse time from the in-scope `xmlns`
//! declarations; the declarations themselves stay on the element (the
//! namespace promoter relies on seeing them).

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::XMLNS_NAMESPACE;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

/// An attribute with resolved namespace
///
/// Namespace declarations appear here too: `xmlns="u"` is stored with
/// local name `xmlns`, `xmlns:p="u"` with local name `p`, both under the
/// xmlns namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute local name
    pub local_name: String,
    /// Resolved namespace URI (empty for unprefixed attributes)
    pub namespace: String,
    /// Attribute value
    pub value: String,
}

impl Attribute {
    /// Whether this attribute is a namespace declaration
    pub fn is_xmlns(&self) -> bool {
        self.namespace == XMLNS_NAMESPACE
    }

    /// The declared prefix, when this is a namespace declaration
    ///
    /// `None` for the default-namespace declaration.
    pub fn declared_prefix(&self) -> Option<&str> {
        if self.is_xmlns() && self.local_name != "xmlns" {
            Some(&self.local_name)
        } else {
            None
        }
    }
}

/// A node in the document tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// An element node
    Element(Element),
    /// A text node
    Text(String),
    /// A comment node
    Comment(String),
}

impl Node {
    /// The contained element, if this is an element node
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }
}

/// An element node with resolved namespace, attributes and children
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// Element local name
    pub local_name: String,
    /// Resolved namespace URI (empty when in no namespace)
    pub namespace: String,
    /// Attributes in document order
    pub attributes: Vec<Attribute>,
    /// Child nodes in document order
    pub children: Vec<Node>,
}

impl Element {
    /// Create a new element
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            namespace: namespace.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Value of the first non-xmlns attribute with the given local name
    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| !a.is_xmlns() && a.local_name == local_name)
            .map(|a| a.value.as_str())
    }

    /// Child elements in document order
    pub fn element_children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Mutable child elements in document order
    pub fn element_children_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Concatenated text content of this element's subtree
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => out.push_str(&e.text_content()),
                Node::Comment(_) => {}
            }
        }
        out
    }

    /// Namespace declarations carried directly on this element
    ///
    /// Yields `(prefix, uri)` pairs; `None` prefix is the default namespace.
    pub fn xmlns_declarations(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        self.attributes
            .iter()
            .filter(|a| a.is_xmlns())
            .map(|a| (a.declared_prefix(), a.value.as_str()))
    }
}

/// A parsed document: a single root element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTree {
    /// The document's root element
    pub root: Element,
}

impl DocumentTree {
    /// Parse a document with default limits
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with_limits(text, &Limits::default())
    }

    /// Parse a document, enforcing size and depth limits
    pub fn parse_with_limits(text: &str, limits: &Limits) -> Result<Self> {
        limits.check_xml_size(text.len())?;

        // Whitespace-only text nodes are dropped below; mixed content
        // keeps its inner spacing, so no trim_text here.
        let mut reader = Reader::from_reader(text.as_bytes());

        let mut stack: Vec<Element> = Vec::new();
        let mut scopes = PrefixScopes::new();
        let mut root: Option<Element> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(start)) => {
                    let element = parse_element(&start, &mut scopes, true)?;
                    stack.push(element);
                    limits.check_xml_depth(stack.len())?;
                }
                Ok(Event::End(_)) => {
                    scopes.pop();
                    if let Some(done) = stack.pop() {
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(Node::Element(done)),
                            None => root = Some(done),
                        }
                    }
                }
                Ok(Event::Empty(start)) => {
                    let element = parse_element(&start, &mut scopes, false)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(element)),
                        None => root = Some(element),
                    }
                }
                Ok(Event::Text(text)) => {
                    let text = text
                        .unescape()
                        .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?
                        .to_string();
                    if !text.trim().is_empty() {
                        if let Some(current) = stack.last_mut() {
                            current.children.push(Node::Text(text));
                        }
                    }
                }
                Ok(Event::Comment(comment)) => {
                    if let Some(current) = stack.last_mut() {
                        let text = String::from_utf8_lossy(comment.as_ref()).to_string();
                        current.children.push(Node::Comment(text));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "Error parsing XML at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {} // declarations, processing instructions, doctypes
            }
            buf.clear();
        }

        match root {
            Some(root) => Ok(Self { root }),
            None => Err(Error::Xml("document has no root element".to_string())),
        }
    }
}

/// Stack of in-scope prefix bindings, one frame per open element
#[derive(Debug)]
struct PrefixScopes {
    frames: Vec<HashMap<Option<String>, String>>,
}

impl PrefixScopes {
    fn new() -> Self {
        Self { frames: Vec::new() }
    }

    fn push(&mut self, frame: HashMap<Option<String>, String>) {
        self.frames.push(frame);
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        let key = prefix.map(|p| p.to_string());
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.get(&key))
            .map(|s| s.as_str())
    }
}

fn parse_element(start: &BytesStart, scopes: &mut PrefixScopes, keep_scope: bool) -> Result<Element> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?
        .to_string();

    let mut attributes = Vec::new();
    let mut frame: HashMap<Option<String>, String> = HashMap::new();

    // First pass over the raw attributes collects xmlns declarations so
    // that the element's own declarations are in scope for its own name.
    for attr_result in start.attributes() {
        let attr =
            attr_result.map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;
        let attr_name = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?
            .to_string();
        let attr_value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
            .to_string();

        if attr_name == "xmlns" {
            frame.insert(None, attr_value.clone());
            attributes.push(Attribute {
                local_name: "xmlns".to_string(),
                namespace: XMLNS_NAMESPACE.to_string(),
                value: attr_value,
            });
        } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
            frame.insert(Some(prefix.to_string()), attr_value.clone());
            attributes.push(Attribute {
                local_name: prefix.to_string(),
                namespace: XMLNS_NAMESPACE.to_string(),
                value: attr_value,
            });
        } else {
            attributes.push(Attribute {
                local_name: attr_name,
                namespace: String::new(), // resolved below
                value: attr_value,
            });
        }
    }

    scopes.push(frame);

    // Resolve prefixed regular attributes (unprefixed attributes are in
    // no namespace, the default namespace does not apply to them).
    for attr in &mut attributes {
        if attr.namespace.is_empty() {
            let raw = attr.local_name.clone();
            if let Some((prefix, local)) = raw.split_once(':') {
                attr.namespace = scopes.resolve(Some(prefix)).unwrap_or("").to_string();
                attr.local_name = local.to_string();
            }
        }
    }

    let (prefix, local) = match name.split_once(':') {
        Some((p, l)) => (Some(p), l),
        None => (None, name.as_str()),
    };
    let namespace = scopes.resolve(prefix).unwrap_or("").to_string();

    let element = Element {
        local_name: local.to_string(),
        namespace,
        attributes,
        children: Vec::new(),
    };

    if !keep_scope {
        scopes.pop();
    }

    Ok(element)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolves_element_namespaces() {
        let xml = r#"<wsdl:definitions xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/">
            <wsdl:types/>
        </wsdl:definitions>"#;
        let tree = DocumentTree::parse(xml).unwrap();

        assert_eq!(tree.root.local_name, "definitions");
        assert_eq!(tree.root.namespace, "http://schemas.xmlsoap.org/wsdl/");
        let types = tree.root.element_children().next().unwrap();
        assert_eq!(types.local_name, "types");
        assert_eq!(types.namespace, "http://schemas.xmlsoap.org/wsdl/");
    }

    #[test]
    fn test_default_namespace_applies_to_elements_only() {
        let xml = r#"<schema xmlns="http://www.w3.org/2001/XMLSchema">
            <element name="a" type="string"/>
        </schema>"#;
        let tree = DocumentTree::parse(xml).unwrap();

        let elem = tree.root.element_children().next().unwrap();
        assert_eq!(elem.namespace, "http://www.w3.org/2001/XMLSchema");
        let name_attr = elem
            .attributes
            .iter()
            .find(|a| a.local_name == "name")
            .unwrap();
        assert_eq!(name_attr.namespace, "");
    }

    #[test]
    fn test_xmlns_declarations_kept_as_attributes() {
        let xml = r#"<schema xmlns="urn:x" xmlns:p="urn:p"/>"#;
        let tree = DocumentTree::parse(xml).unwrap();

        let decls: Vec<_> = tree.root.xmlns_declarations().collect();
        assert_eq!(decls, vec![(None, "urn:x"), (Some("p"), "urn:p")]);
    }

    #[test]
    fn test_text_content() {
        let xml = r#"<documentation>multi-file <b>WSDL</b> sets</documentation>"#;
        let tree = DocumentTree::parse(xml).unwrap();
        assert_eq!(tree.root.text_content(), "multi-file WSDL sets");
    }

    #[test]
    fn test_nested_prefix_shadowing() {
        let xml = r#"<a xmlns:p="urn:outer"><p:b xmlns:p="urn:inner"/><p:c/></a>"#;
        let tree = DocumentTree::parse(xml).unwrap();

        let children: Vec<_> = tree.root.element_children().collect();
        assert_eq!(children[0].namespace, "urn:inner");
        assert_eq!(children[1].namespace, "urn:outer");
    }

    #[test]
    fn test_depth_limit() {
        let mut xml = String::new();
        for _ in 0..200 {
            xml.push_str("<a>");
        }
        for _ in 0..200 {
            xml.push_str("</a>");
        }
        let limits = Limits::strict();
        assert!(DocumentTree::parse_with_limits(&xml, &limits).is_err());
    }
}
