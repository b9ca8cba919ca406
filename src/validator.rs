//! Structural validation
//!
//! A single top-down pass over a document tree checks every classified
//! element against the static grammar tables: the parent's token must be in
//! the element's allowed-parent set and the concatenation of child tokens
//! must match the element's allowed-children pattern. The only traversal
//! state is the SOAP namespace of the most recently entered binding
//! extension, used to flag SOAP 1.1/1.2 mixing.

use crate::documents::{DocumentTree, Element};
use crate::grammar::{self, Family, Token, CHILDREN, PARENTS, VALUE_FACETS};
use std::fmt;

/// Kind of structural violation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// Element appears under a parent outside its allowed-parent set
    BadParent,
    /// The element's children do not match its allowed-children pattern
    BadChildren,
    /// A value facet occurs more than once under `xsd:restriction`
    FacetCardinality,
    /// SOAP 1.1 and 1.2 constructs mixed within one binding
    SoapVersionMix,
}

impl ViolationKind {
    /// Rule citation for this kind of violation
    pub fn citation(&self) -> &'static str {
        match self {
            ViolationKind::BadParent => "WS-I BP 1.1 R2028",
            ViolationKind::BadChildren => "WS-I BP 1.1 R2029",
            ViolationKind::FacetCardinality => "XSD 1.0 Part 2 §4.3",
            ViolationKind::SoapVersionMix => "WSDL 1.1 §3",
        }
    }
}

/// A structural violation found by [`validate`]
#[derive(Debug, Clone)]
pub struct Violation {
    /// Kind of violation
    pub kind: ViolationKind,
    /// Token of the offending element
    pub token: Token,
    /// Human-readable description
    pub message: String,
}

impl Violation {
    /// MIME-family findings and SOAP version mixing are recoverable; the
    /// MIME sub-grammar of the WSDL specification is known to be ambiguous.
    pub fn is_fatal(&self) -> bool {
        if self.kind == ViolationKind::SoapVersionMix {
            return false;
        }
        self.token.family() != Some(Family::Mime)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.message, self.kind.citation())
    }
}

/// Validate a document tree against the structural grammar
pub fn validate(tree: &DocumentTree) -> Vec<Violation> {
    let mut violations = Vec::new();
    walk(&tree.root, Token::DOCUMENT, None, &mut violations);
    violations
}

/// First fatal violation in a list, if any
pub fn first_fatal(violations: &[Violation]) -> Option<&Violation> {
    violations.iter().find(|v| v.is_fatal())
}

fn walk(
    element: &Element,
    parent_token: Token,
    enclosing_soap: Option<&str>,
    violations: &mut Vec<Violation>,
) {
    let classified = grammar::classify(
        &element.namespace,
        &element.local_name,
        enclosing_soap,
    );
    let token = classified.token;

    if classified.soap_version_mixed {
        violations.push(Violation {
            kind: ViolationKind::SoapVersionMix,
            token,
            message: format!(
                "SOAP element '{}' in namespace '{}' mixed into a binding using a different SOAP version",
                element.local_name, element.namespace
            ),
        });
    }

    // Lax elements (documentation, annotation, appinfo) are opaque: their
    // content is not grammar-checked.
    if token.is_empty() && is_lax(&element.local_name) {
        return;
    }

    if !token.is_empty() {
        check_parent(token, parent_token, violations);
        check_children(element, token, enclosing_soap, violations);
        if token.as_str() == "xsd_restriction" {
            check_facet_cardinality(element, token, enclosing_soap, violations);
        }
    }

    // Entering a binding pins the SOAP namespace of its extension element
    // for the whole subtree; entering a service resets it.
    let next_soap = if token.as_str() == "wsdl_binding" {
        binding_soap_namespace(element)
    } else if token.as_str() == "wsdl_service" {
        None
    } else {
        enclosing_soap.map(|s| s.to_string())
    };

    for child in element.element_children() {
        walk(child, token, next_soap.as_deref(), violations);
    }
}

fn is_lax(local_name: &str) -> bool {
    matches!(local_name, "documentation" | "annotation" | "appinfo")
}

/// The SOAP namespace of a binding's extension element, if present
fn binding_soap_namespace(binding: &Element) -> Option<String> {
    binding
        .element_children()
        .find(|c| c.local_name == "binding" && grammar::is_soap_namespace(&c.namespace))
        .map(|c| c.namespace.clone())
}

fn check_parent(token: Token, parent_token: Token, violations: &mut Vec<Violation>) {
    let allowed = match PARENTS.get(token.as_str()) {
        Some(allowed) => *allowed,
        None => return,
    };
    // A foreign (unclassified) parent is outside the grammar's reach.
    if parent_token.is_empty() {
        return;
    }
    if !allowed.contains(&parent_token.as_str()) {
        violations.push(Violation {
            kind: ViolationKind::BadParent,
            token,
            message: format!(
                "element '{}' not allowed under '{}'; expected one of {:?}",
                token, parent_token, allowed
            ),
        });
    }
}

fn check_children(
    element: &Element,
    token: Token,
    enclosing_soap: Option<&str>,
    violations: &mut Vec<Violation>,
) {
    let pattern = match CHILDREN.get(token.as_str()) {
        Some(pattern) => pattern,
        None => return,
    };
    let child_tokens = classified_children(element, enclosing_soap);
    if !pattern.matches(&child_tokens) {
        let rendered: Vec<&str> = child_tokens.iter().map(|t| t.as_str()).collect();
        violations.push(Violation {
            kind: ViolationKind::BadChildren,
            token,
            message: format!(
                "children of '{}' do not match its content model: [{}]",
                token,
                rendered.join(", ")
            ),
        });
    }
}

fn check_facet_cardinality(
    element: &Element,
    token: Token,
    enclosing_soap: Option<&str>,
    violations: &mut Vec<Violation>,
) {
    let child_tokens = classified_children(element, enclosing_soap);
    for facet in VALUE_FACETS {
        let count = child_tokens.iter().filter(|t| t.as_str() == *facet).count();
        if count > 1 {
            violations.push(Violation {
                kind: ViolationKind::FacetCardinality,
                token,
                message: format!(
                    "facet '{}' occurs {} times under 'xsd_restriction'; at most one allowed",
                    facet, count
                ),
            });
        }
    }
}

/// Tokens of the element children, lax/unknown ones dropped
fn classified_children(element: &Element, enclosing_soap: Option<&str>) -> Vec<Token> {
    element
        .element_children()
        .map(|c| grammar::classify(&c.namespace, &c.local_name, enclosing_soap).token)
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::DocumentTree;

    const WSDL: &str = "http://schemas.xmlsoap.org/wsdl/";
    const XSD: &str = "http://www.w3.org/2001/XMLSchema";
    const SOAP11: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
    const SOAP12: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";

    fn parse(xml: &str) -> DocumentTree {
        DocumentTree::parse(xml).unwrap()
    }

    #[test]
    fn test_valid_wsdl_has_no_violations() {
        let tree = parse(&format!(
            r#"<wsdl:definitions xmlns:wsdl="{WSDL}" targetNamespace="urn:a">
                <wsdl:documentation>an example</wsdl:documentation>
                <wsdl:types/>
                <wsdl:message name="In"><wsdl:part name="p"/></wsdl:message>
                <wsdl:portType name="PT">
                    <wsdl:operation name="op">
                        <wsdl:input message="tns:In"/>
                    </wsdl:operation>
                </wsdl:portType>
                <wsdl:service name="S"><wsdl:port name="p" binding="tns:B"/></wsdl:service>
            </wsdl:definitions>"#
        ));
        let violations = validate(&tree);
        assert!(violations.is_empty(), "{:?}", violations);
    }

    #[test]
    fn test_bad_parent_reported() {
        // part directly under definitions
        let tree = parse(&format!(
            r#"<wsdl:definitions xmlns:wsdl="{WSDL}"><wsdl:part name="p"/></wsdl:definitions>"#
        ));
        let violations = validate(&tree);
        assert!(violations
            .iter()
            .any(|v| v.kind == ViolationKind::BadParent && v.token.as_str() == "wsdl_part"));
        // definitions' own children no longer match either
        assert!(violations
            .iter()
            .any(|v| v.kind == ViolationKind::BadChildren));
        assert!(first_fatal(&violations).is_some());
    }

    #[test]
    fn test_bad_children_names_offender() {
        let tree = parse(&format!(
            r#"<wsdl:definitions xmlns:wsdl="{WSDL}">
                <wsdl:service name="S"/>
                <wsdl:message name="M"/>
            </wsdl:definitions>"#
        ));
        let violations = validate(&tree);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::BadChildren);
        assert!(violations[0].message.contains("wsdl_service, wsdl_message"));
    }

    #[test]
    fn test_facet_cardinality() {
        let tree = parse(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}">
                <xsd:simpleType name="T">
                    <xsd:restriction base="xsd:string">
                        <xsd:length value="1"/>
                        <xsd:length value="2"/>
                    </xsd:restriction>
                </xsd:simpleType>
            </xsd:schema>"#
        ));
        let violations = validate(&tree);
        assert!(violations
            .iter()
            .any(|v| v.kind == ViolationKind::FacetCardinality));
    }

    #[test]
    fn test_enumeration_may_repeat() {
        let tree = parse(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}">
                <xsd:simpleType name="T">
                    <xsd:restriction base="xsd:string">
                        <xsd:enumeration value="a"/>
                        <xsd:enumeration value="b"/>
                    </xsd:restriction>
                </xsd:simpleType>
            </xsd:schema>"#
        ));
        assert!(validate(&tree).is_empty());
    }

    #[test]
    fn test_soap_version_mix_is_recoverable() {
        let tree = parse(&format!(
            r#"<wsdl:definitions xmlns:wsdl="{WSDL}" xmlns:soap="{SOAP11}" xmlns:soap12="{SOAP12}">
                <wsdl:binding name="B" type="tns:PT">
                    <soap:binding transport="http://schemas.xmlsoap.org/soap/http"/>
                    <wsdl:operation name="op">
                        <soap12:operation soapAction="urn:op"/>
                    </wsdl:operation>
                </wsdl:binding>
            </wsdl:definitions>"#
        ));
        let violations = validate(&tree);
        let mix: Vec<_> = violations
            .iter()
            .filter(|v| v.kind == ViolationKind::SoapVersionMix)
            .collect();
        assert_eq!(mix.len(), 1);
        assert!(!mix[0].is_fatal());
        assert!(first_fatal(&violations).is_none());
    }

    #[test]
    fn test_mime_violations_are_recoverable() {
        let mime = "http://schemas.xmlsoap.org/wsdl/mime/";
        // mimeXml directly under multipartRelated instead of inside a part
        let tree = parse(&format!(
            r#"<wsdl:definitions xmlns:wsdl="{WSDL}" xmlns:mime="{mime}">
                <wsdl:binding name="B" type="tns:PT">
                    <wsdl:operation name="op">
                        <wsdl:input>
                            <mime:multipartRelated>
                                <mime:mimeXml part="p"/>
                            </mime:multipartRelated>
                        </wsdl:input>
                    </wsdl:operation>
                </wsdl:binding>
            </wsdl:definitions>"#
        ));
        let violations = validate(&tree);
        assert!(!violations.is_empty());
        assert!(violations
            .iter()
            .any(|v| v.kind == ViolationKind::BadParent && v.token.as_str() == "mime_mimeXml"));
        assert!(violations.iter().all(|v| !v.is_fatal()));
        assert!(first_fatal(&violations).is_none());
    }

    #[test]
    fn test_documentation_content_is_opaque() {
        let tree = parse(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}">
                <xsd:annotation><xsd:documentation><b>bold</b> text</xsd:documentation></xsd:annotation>
                <xsd:element name="e" type="xsd:string"/>
            </xsd:schema>"#
        ));
        assert!(validate(&tree).is_empty());
    }
}
