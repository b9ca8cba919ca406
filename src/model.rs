//! Semantic model construction
//!
//! A validated, namespace-promoted document tree is folded into a [`Model`]:
//! nested objects keyed by element local name, with repeated children
//! folded into ordered sequences. Children are a proper sum type
//! ([`Value`]) so downstream consumers pattern-match instead of probing
//! shapes at runtime.

use crate::documents::{DocumentTree, Element};
use crate::error::{Error, Result};
use crate::grammar;
use crate::{WSDL_NAMESPACE, XSD_NAMESPACE};
use indexmap::IndexMap;
use serde::Serialize;

/// Reserved pseudo-prefix holding an element's own target namespace
pub const TNS_KEY: &str = "__tns__";

/// Key under which the default namespace is recorded
pub const DEFAULT_NS_KEY: &str = "xmlns";

/// Ordered prefix -> URI map
pub type NamespaceMap = IndexMap<String, String>;

/// A child entry of a model object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Explicit marker for an element that produced nothing
    Null,
    /// Collapsed text content (documentation)
    Text(String),
    /// A single occurrence
    Node(ModelNode),
    /// Repeated occurrences, in source order
    Many(Vec<ModelNode>),
}

impl Value {
    /// The single node, if this is a `Node` value
    pub fn as_node(&self) -> Option<&ModelNode> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    /// View this value as a slice-like sequence of nodes
    pub fn nodes(&self) -> Vec<&ModelNode> {
        match self {
            Value::Node(node) => vec![node],
            Value::Many(nodes) => nodes.iter().collect(),
            _ => vec![],
        }
    }

    /// Number of folded occurrences
    pub fn len(&self) -> usize {
        match self {
            Value::Many(nodes) => nodes.len(),
            Value::Node(_) | Value::Text(_) => 1,
            Value::Null => 0,
        }
    }

    /// Whether the value holds no occurrences
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where a merged fragment came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Origin {
    /// Merged via an import reference
    #[serde(rename = "fromImport")]
    Import,
    /// Merged via an include reference
    #[serde(rename = "fromInclude")]
    Include,
}

/// Provenance breadcrumbs stamped on merged fragments
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    /// How the fragment was reached
    pub origin: Origin,
    /// Short file name of the originating document
    pub file: String,
    /// Namespace map in force at the point of origin
    pub namespaces: NamespaceMap,
    /// Target namespace of the originating document
    pub target_namespace: Option<String>,
}

/// One object in the semantic model
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ModelNode {
    /// Child entries keyed by element local name
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub entries: IndexMap<String, Value>,
    /// Attribute bag keyed by attribute local name
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
    /// Structural token breadcrumb (`family_localname`), set on non-empty objects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qname: Option<String>,
    /// Governing SOAP namespace, retained on binding/address elements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub governing_namespace: Option<String>,
    /// Namespace map, carried by definitions/schema objects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<NamespaceMap>,
    /// Merge provenance, stamped by the merge engine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl ModelNode {
    /// Entry value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// The element's target namespace, when it carries a namespace map
    pub fn target_namespace(&self) -> Option<&str> {
        self.namespaces
            .as_ref()
            .and_then(|ns| ns.get(TNS_KEY))
            .map(|s| s.as_str())
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.attributes.is_empty()
    }
}

/// Root flavor of a per-file model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RootKind {
    /// A WSDL document (`wsdl:definitions` root)
    Definitions,
    /// A schema document (`xsd:schema` root)
    Schema,
}

/// The semantic model of one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    /// Whether the document is a WSDL or a bare schema
    pub root_kind: RootKind,
    /// The `definitions` (WSDL) or `schema` (XSD) object
    pub root: ModelNode,
    /// All namespace declarations seen in the document
    pub global_namespaces: NamespaceMap,
    /// Top-level `service` objects, lifted for WSDL roots
    pub services: Vec<ModelNode>,
}

/// Build the semantic model of a validated, promoted tree
pub fn build(tree: &DocumentTree) -> Result<Model> {
    let root = &tree.root;
    let root_kind = match (root.namespace.as_str(), root.local_name.as_str()) {
        (WSDL_NAMESPACE, "definitions") => RootKind::Definitions,
        (XSD_NAMESPACE, "schema") => RootKind::Schema,
        (ns, local) => {
            return Err(Error::Resolution(format!(
                "root element {{{}}}{} is neither wsdl:definitions nor xsd:schema",
                ns, local
            )))
        }
    };

    let mut builder = Builder::default();
    let root_node = match builder.build_element(root, true) {
        Value::Node(node) => node,
        _ => {
            return Err(Error::Resolution(
                "document root produced no model".to_string(),
            ))
        }
    };

    let mut model = Model {
        root_kind,
        root: root_node,
        global_namespaces: builder.global,
        services: Vec::new(),
    };

    match root_kind {
        RootKind::Definitions => {
            if let Some(value) = model.root.entries.get("service") {
                model.services = value.nodes().into_iter().cloned().collect();
            }
        }
        RootKind::Schema => {
            // Bare schema roots expose the accumulated map directly.
            model.root.namespaces = Some(model.global_namespaces.clone());
        }
    }

    Ok(model)
}

#[derive(Debug, Default)]
struct Builder {
    global: NamespaceMap,
    scopes: Vec<NamespaceMap>,
}

impl Builder {
    fn build_element(&mut self, element: &Element, is_root: bool) -> Value {
        // Attribute-free documentation collapses to its text.
        if element.local_name == "documentation"
            && !element.attributes.iter().any(|a| !a.is_xmlns())
        {
            return Value::Text(element.text_content());
        }

        let is_schema = element.namespace == XSD_NAMESPACE && element.local_name == "schema";
        let scoped = is_root || is_schema;
        if scoped {
            self.scopes.push(NamespaceMap::new());
        }

        let mut node = ModelNode::default();

        for attr in &element.attributes {
            if attr.is_xmlns() {
                let key = attr
                    .declared_prefix()
                    .unwrap_or(DEFAULT_NS_KEY)
                    .to_string();
                self.global.insert(key.clone(), attr.value.clone());
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(key, attr.value.clone());
                }
            } else {
                node.attributes
                    .insert(attr.local_name.clone(), attr.value.clone());
            }
        }

        if scoped {
            match element.attribute("targetNamespace") {
                Some(tns) => {
                    self.global.insert(TNS_KEY.to_string(), tns.to_string());
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.insert(TNS_KEY.to_string(), tns.to_string());
                    }
                }
                None => {
                    // Explicit marker: the document asserted no namespace.
                    node.attributes
                        .insert("targetNamespace".to_string(), String::new());
                }
            }
        }

        for child in element.element_children() {
            let value = self.build_element(child, false);
            append_child(&mut node, &child.local_name, value);
        }

        if scoped {
            node.namespaces = self.scopes.pop();
        }

        if node.is_empty() {
            return Value::Null;
        }

        let token = grammar::classify(&element.namespace, &element.local_name, None).token;
        node.qname = Some(if token.is_empty() {
            element.local_name.clone()
        } else {
            token.as_str().to_string()
        });

        if matches!(token.as_str(), "soap_binding" | "soap_address") {
            node.governing_namespace = Some(element.namespace.clone());
        }

        Value::Node(node)
    }
}

/// Insert a child value, folding repeats into an ordered sequence
fn append_child(parent: &mut ModelNode, key: &str, value: Value) {
    let node = match value {
        Value::Node(node) => node,
        other => {
            // Text and Null children do not fold; last write wins.
            parent.entries.insert(key.to_string(), other);
            return;
        }
    };
    match parent.entries.get_mut(key) {
        Some(Value::Many(nodes)) => nodes.push(node),
        Some(existing @ Value::Node(_)) => {
            let first = match std::mem::replace(existing, Value::Null) {
                Value::Node(first) => first,
                _ => unreachable!("matched Value::Node above"),
            };
            *existing = Value::Many(vec![first, node]);
        }
        _ => {
            parent.entries.insert(key.to_string(), Value::Node(node));
        }
    }
}
