//! Structural grammar for WSDL/XSD/SOAP/MIME documents
//!
//! The classifier maps an element's (namespace, local name) pair to a
//! structural token of the form `family_localname`. The static tables map
//! each token to its allowed parents and to an allowed-children pattern,
//! reproduced from the WSDL 1.1 / XSD 1.0 / SOAP binding / MIME binding
//! grammars. Children patterns are explicit seq/choice/repeat combinators
//! built once at startup; matching is a small backtracking walk over the
//! child-token sequence, one level deep.

use crate::{
    MIME_NAMESPACE, SOAP11_NAMESPACE, SOAP12_NAMESPACE, WSDL_NAMESPACE, XSD_NAMESPACE,
};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Specification family a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// XML Schema
    Xsd,
    /// WSDL 1.1
    Wsdl,
    /// SOAP binding (1.1 or 1.2)
    Soap,
    /// MIME binding
    Mime,
}

impl Family {
    /// The token prefix for this family
    pub fn prefix(&self) -> &'static str {
        match self {
            Family::Xsd => "xsd",
            Family::Wsdl => "wsdl",
            Family::Soap => "soap",
            Family::Mime => "mime",
        }
    }
}

/// Structural token of an element
///
/// The empty token marks unrecognized or deliberately ignored elements
/// (annotation, documentation, appinfo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(&'static str);

impl Token {
    /// The empty token
    pub const EMPTY: Token = Token("");

    /// Pseudo-token for the document root's parent
    pub const DOCUMENT: Token = Token("#document");

    /// The raw tag, e.g. `wsdl_definitions`
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Whether this is the empty token
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The token's family, when recognized
    pub fn family(&self) -> Option<Family> {
        match self.0.split_once('_')?.0 {
            "xsd" => Some(Family::Xsd),
            "wsdl" => Some(Family::Wsdl),
            "soap" => Some(Family::Soap),
            "mime" => Some(Family::Mime),
            _ => None,
        }
    }

    /// The token's local name, e.g. `definitions`
    pub fn local_name(&self) -> &'static str {
        self.0.split_once('_').map(|(_, l)| l).unwrap_or(self.0)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of classifying one element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Structural token, possibly empty
    pub token: Token,
    /// The element is a SOAP construct whose namespace disagrees with the
    /// enclosing binding's SOAP namespace (1.1 vs 1.2 mixing)
    pub soap_version_mixed: bool,
}

/// Elements that never take part in grammar checks
const LAX_LOCAL_NAMES: &[&str] = &["documentation", "annotation", "appinfo"];

/// Value facets that may occur at most once under `xsd:restriction`
pub const VALUE_FACETS: &[&str] = &[
    "xsd_length",
    "xsd_minLength",
    "xsd_maxLength",
    "xsd_pattern",
    "xsd_whiteSpace",
    "xsd_totalDigits",
    "xsd_fractionDigits",
    "xsd_minInclusive",
    "xsd_maxInclusive",
    "xsd_minExclusive",
    "xsd_maxExclusive",
];

const WSDL_LOCALS: &[(&str, &str)] = &[
    ("definitions", "wsdl_definitions"),
    ("import", "wsdl_import"),
    ("types", "wsdl_types"),
    ("message", "wsdl_message"),
    ("part", "wsdl_part"),
    ("portType", "wsdl_portType"),
    ("operation", "wsdl_operation"),
    ("input", "wsdl_input"),
    ("output", "wsdl_output"),
    ("fault", "wsdl_fault"),
    ("binding", "wsdl_binding"),
    ("service", "wsdl_service"),
    ("port", "wsdl_port"),
];

const SOAP_LOCALS: &[(&str, &str)] = &[
    ("binding", "soap_binding"),
    ("operation", "soap_operation"),
    ("body", "soap_body"),
    ("header", "soap_header"),
    ("headerfault", "soap_headerfault"),
    ("fault", "soap_fault"),
    ("address", "soap_address"),
];

const MIME_LOCALS: &[(&str, &str)] = &[
    ("content", "mime_content"),
    ("multipartRelated", "mime_multipartRelated"),
    ("part", "mime_part"),
    ("mimeXml", "mime_mimeXml"),
];

const XSD_LOCALS: &[(&str, &str)] = &[
    ("schema", "xsd_schema"),
    ("include", "xsd_include"),
    ("import", "xsd_import"),
    ("redefine", "xsd_redefine"),
    ("element", "xsd_element"),
    ("complexType", "xsd_complexType"),
    ("simpleType", "xsd_simpleType"),
    ("attribute", "xsd_attribute"),
    ("attributeGroup", "xsd_attributeGroup"),
    ("group", "xsd_group"),
    ("sequence", "xsd_sequence"),
    ("choice", "xsd_choice"),
    ("all", "xsd_all"),
    ("any", "xsd_any"),
    ("anyAttribute", "xsd_anyAttribute"),
    ("restriction", "xsd_restriction"),
    ("extension", "xsd_extension"),
    ("simpleContent", "xsd_simpleContent"),
    ("complexContent", "xsd_complexContent"),
    ("list", "xsd_list"),
    ("union", "xsd_union"),
    ("unique", "xsd_unique"),
    ("key", "xsd_key"),
    ("keyref", "xsd_keyref"),
    ("selector", "xsd_selector"),
    ("field", "xsd_field"),
    ("notation", "xsd_notation"),
    ("length", "xsd_length"),
    ("minLength", "xsd_minLength"),
    ("maxLength", "xsd_maxLength"),
    ("pattern", "xsd_pattern"),
    ("enumeration", "xsd_enumeration"),
    ("whiteSpace", "xsd_whiteSpace"),
    ("totalDigits", "xsd_totalDigits"),
    ("fractionDigits", "xsd_fractionDigits"),
    ("minInclusive", "xsd_minInclusive"),
    ("maxInclusive", "xsd_maxInclusive"),
    ("minExclusive", "xsd_minExclusive"),
    ("maxExclusive", "xsd_maxExclusive"),
];

fn lookup(table: &[(&str, &'static str)], local_name: &str) -> Token {
    table
        .iter()
        .find(|(l, _)| *l == local_name)
        .map(|(_, t)| Token(t))
        .unwrap_or(Token::EMPTY)
}

/// Whether a namespace is one of the SOAP binding namespaces
pub fn is_soap_namespace(namespace: &str) -> bool {
    namespace == SOAP11_NAMESPACE || namespace == SOAP12_NAMESPACE
}

/// Classify an element by namespace and local name
///
/// Total and deterministic: unknown input yields the empty token. SOAP
/// elements are compared against the enclosing binding's SOAP namespace;
/// a 1.1/1.2 mix is surfaced as a side diagnostic, not a failure.
pub fn classify(
    namespace: &str,
    local_name: &str,
    enclosing_soap_ns: Option<&str>,
) -> Classification {
    if LAX_LOCAL_NAMES.contains(&local_name) {
        return Classification {
            token: Token::EMPTY,
            soap_version_mixed: false,
        };
    }

    let token = match namespace {
        XSD_NAMESPACE => lookup(XSD_LOCALS, local_name),
        WSDL_NAMESPACE => lookup(WSDL_LOCALS, local_name),
        MIME_NAMESPACE => lookup(MIME_LOCALS, local_name),
        ns if is_soap_namespace(ns) => lookup(SOAP_LOCALS, local_name),
        _ => Token::EMPTY,
    };

    let soap_version_mixed = is_soap_namespace(namespace)
        && matches!(enclosing_soap_ns, Some(enclosing) if enclosing != namespace);

    Classification {
        token,
        soap_version_mixed,
    }
}

/// An allowed-children pattern over child tokens
#[derive(Debug, Clone)]
pub enum Content {
    /// No element children allowed
    Empty,
    /// Exactly one occurrence of a token
    Tok(&'static str),
    /// All parts in order
    Seq(Vec<Content>),
    /// Exactly one of the alternatives
    Choice(Vec<Content>),
    /// Zero or one occurrence
    Opt(Box<Content>),
    /// Zero or more occurrences
    Star(Box<Content>),
}

fn tok(t: &'static str) -> Content {
    Content::Tok(t)
}

fn seq(parts: Vec<Content>) -> Content {
    Content::Seq(parts)
}

fn choice(parts: Vec<Content>) -> Content {
    Content::Choice(parts)
}

fn opt(part: Content) -> Content {
    Content::Opt(Box::new(part))
}

fn star(part: Content) -> Content {
    Content::Star(Box::new(part))
}

impl Content {
    /// Whether a child-token sequence satisfies this pattern
    pub fn matches(&self, tokens: &[Token]) -> bool {
        self.match_ends(tokens, 0).contains(&tokens.len())
    }

    /// All positions the pattern can consume up to, starting at `pos`
    fn match_ends(&self, tokens: &[Token], pos: usize) -> Vec<usize> {
        match self {
            Content::Empty => vec![pos],
            Content::Tok(t) => match tokens.get(pos) {
                Some(tk) if tk.as_str() == *t => vec![pos + 1],
                _ => vec![],
            },
            Content::Opt(inner) => {
                let mut ends = vec![pos];
                merge_ends(&mut ends, inner.match_ends(tokens, pos));
                ends
            }
            Content::Star(inner) => {
                let mut ends = vec![pos];
                let mut frontier = vec![pos];
                while let Some(p) = frontier.pop() {
                    for end in inner.match_ends(tokens, p) {
                        if end > p && !ends.contains(&end) {
                            ends.push(end);
                            frontier.push(end);
                        }
                    }
                }
                ends
            }
            Content::Seq(parts) => {
                let mut ends = vec![pos];
                for part in parts {
                    let mut next = Vec::new();
                    for p in &ends {
                        merge_ends(&mut next, part.match_ends(tokens, *p));
                    }
                    if next.is_empty() {
                        return vec![];
                    }
                    ends = next;
                }
                ends
            }
            Content::Choice(parts) => {
                let mut ends = Vec::new();
                for part in parts {
                    merge_ends(&mut ends, part.match_ends(tokens, pos));
                }
                ends
            }
        }
    }
}

fn merge_ends(into: &mut Vec<usize>, from: Vec<usize>) {
    for end in from {
        if !into.contains(&end) {
            into.push(end);
        }
    }
}

/// Allowed parents per token; `#document` stands for the document root
pub static PARENTS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, &'static [&'static str]> = HashMap::new();

    map.insert("wsdl_definitions", &["#document"]);
    map.insert("wsdl_import", &["wsdl_definitions"]);
    map.insert("wsdl_types", &["wsdl_definitions"]);
    map.insert("wsdl_message", &["wsdl_definitions"]);
    map.insert("wsdl_part", &["wsdl_message"]);
    map.insert("wsdl_portType", &["wsdl_definitions"]);
    map.insert("wsdl_operation", &["wsdl_portType", "wsdl_binding"]);
    map.insert("wsdl_input", &["wsdl_operation"]);
    map.insert("wsdl_output", &["wsdl_operation"]);
    map.insert("wsdl_fault", &["wsdl_operation"]);
    map.insert("wsdl_binding", &["wsdl_definitions"]);
    map.insert("wsdl_service", &["wsdl_definitions"]);
    map.insert("wsdl_port", &["wsdl_service"]);

    map.insert("soap_binding", &["wsdl_binding"]);
    map.insert("soap_operation", &["wsdl_operation"]);
    map.insert("soap_body", &["wsdl_input", "wsdl_output", "mime_part"]);
    map.insert("soap_header", &["wsdl_input", "wsdl_output", "mime_part"]);
    map.insert("soap_headerfault", &["soap_header"]);
    map.insert("soap_fault", &["wsdl_fault"]);
    map.insert("soap_address", &["wsdl_port"]);

    map.insert("mime_content", &["wsdl_input", "wsdl_output", "mime_part"]);
    map.insert("mime_multipartRelated", &["wsdl_input", "wsdl_output"]);
    map.insert("mime_part", &["mime_multipartRelated"]);
    map.insert("mime_mimeXml", &["wsdl_input", "wsdl_output", "mime_part"]);

    map.insert("xsd_schema", &["#document", "wsdl_types"]);
    map.insert("xsd_include", &["xsd_schema"]);
    map.insert("xsd_import", &["xsd_schema"]);
    map.insert("xsd_redefine", &["xsd_schema"]);
    map.insert(
        "xsd_element",
        &["xsd_schema", "xsd_sequence", "xsd_choice", "xsd_all"],
    );
    map.insert(
        "xsd_complexType",
        &["xsd_schema", "xsd_element", "xsd_redefine"],
    );
    map.insert(
        "xsd_simpleType",
        &[
            "xsd_schema",
            "xsd_element",
            "xsd_attribute",
            "xsd_restriction",
            "xsd_list",
            "xsd_union",
            "xsd_redefine",
        ],
    );
    map.insert(
        "xsd_restriction",
        &["xsd_simpleType", "xsd_simpleContent", "xsd_complexContent"],
    );
    map.insert("xsd_extension", &["xsd_simpleContent", "xsd_complexContent"]);
    map.insert("xsd_simpleContent", &["xsd_complexType"]);
    map.insert("xsd_complexContent", &["xsd_complexType"]);
    map.insert(
        "xsd_sequence",
        &[
            "xsd_complexType",
            "xsd_group",
            "xsd_sequence",
            "xsd_choice",
            "xsd_restriction",
            "xsd_extension",
        ],
    );
    map.insert(
        "xsd_choice",
        &[
            "xsd_complexType",
            "xsd_group",
            "xsd_sequence",
            "xsd_choice",
            "xsd_restriction",
            "xsd_extension",
        ],
    );
    map.insert(
        "xsd_all",
        &["xsd_complexType", "xsd_group", "xsd_restriction", "xsd_extension"],
    );
    map.insert(
        "xsd_group",
        &[
            "xsd_schema",
            "xsd_complexType",
            "xsd_sequence",
            "xsd_choice",
            "xsd_restriction",
            "xsd_extension",
            "xsd_redefine",
        ],
    );
    map.insert(
        "xsd_attribute",
        &[
            "xsd_schema",
            "xsd_complexType",
            "xsd_attributeGroup",
            "xsd_restriction",
            "xsd_extension",
        ],
    );
    map.insert(
        "xsd_attributeGroup",
        &[
            "xsd_schema",
            "xsd_complexType",
            "xsd_attributeGroup",
            "xsd_restriction",
            "xsd_extension",
            "xsd_redefine",
        ],
    );
    map.insert("xsd_any", &["xsd_sequence", "xsd_choice"]);
    map.insert(
        "xsd_anyAttribute",
        &[
            "xsd_complexType",
            "xsd_restriction",
            "xsd_extension",
            "xsd_attributeGroup",
        ],
    );
    map.insert("xsd_list", &["xsd_simpleType"]);
    map.insert("xsd_union", &["xsd_simpleType"]);
    map.insert("xsd_unique", &["xsd_element"]);
    map.insert("xsd_key", &["xsd_element"]);
    map.insert("xsd_keyref", &["xsd_element"]);
    map.insert("xsd_selector", &["xsd_unique", "xsd_key", "xsd_keyref"]);
    map.insert("xsd_field", &["xsd_unique", "xsd_key", "xsd_keyref"]);
    map.insert("xsd_notation", &["xsd_schema"]);

    for facet in VALUE_FACETS {
        map.insert(*facet, &["xsd_restriction"]);
    }
    map.insert("xsd_enumeration", &["xsd_restriction"]);

    map
});

/// Allowed-children pattern per token
pub static CHILDREN: Lazy<HashMap<&'static str, Content>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, Content> = HashMap::new();

    map.insert(
        "wsdl_definitions",
        seq(vec![
            star(tok("wsdl_import")),
            opt(tok("wsdl_types")),
            star(tok("wsdl_message")),
            star(tok("wsdl_portType")),
            star(tok("wsdl_binding")),
            star(tok("wsdl_service")),
        ]),
    );
    map.insert("wsdl_import", Content::Empty);
    map.insert("wsdl_types", star(tok("xsd_schema")));
    map.insert("wsdl_message", star(tok("wsdl_part")));
    map.insert("wsdl_part", Content::Empty);
    map.insert("wsdl_portType", star(tok("wsdl_operation")));
    // First two alternatives are the portType operation exchange patterns
    // (request-response / solicit-response), the third the binding form.
    map.insert(
        "wsdl_operation",
        choice(vec![
            seq(vec![
                tok("wsdl_input"),
                opt(tok("wsdl_output")),
                star(tok("wsdl_fault")),
            ]),
            seq(vec![
                tok("wsdl_output"),
                opt(tok("wsdl_input")),
                star(tok("wsdl_fault")),
            ]),
            seq(vec![
                opt(tok("soap_operation")),
                opt(tok("wsdl_input")),
                opt(tok("wsdl_output")),
                star(tok("wsdl_fault")),
            ]),
        ]),
    );
    let binding_io = star(choice(vec![
        tok("soap_body"),
        tok("soap_header"),
        tok("mime_content"),
        tok("mime_multipartRelated"),
        tok("mime_mimeXml"),
    ]));
    map.insert("wsdl_input", binding_io.clone());
    map.insert("wsdl_output", binding_io);
    map.insert("wsdl_fault", opt(tok("soap_fault")));
    map.insert(
        "wsdl_binding",
        seq(vec![opt(tok("soap_binding")), star(tok("wsdl_operation"))]),
    );
    map.insert("wsdl_service", star(tok("wsdl_port")));
    map.insert("wsdl_port", opt(tok("soap_address")));

    map.insert("soap_binding", Content::Empty);
    map.insert("soap_operation", Content::Empty);
    map.insert("soap_body", Content::Empty);
    map.insert("soap_header", star(tok("soap_headerfault")));
    map.insert("soap_headerfault", Content::Empty);
    map.insert("soap_fault", Content::Empty);
    map.insert("soap_address", Content::Empty);

    map.insert("mime_content", Content::Empty);
    map.insert("mime_multipartRelated", star(tok("mime_part")));
    map.insert(
        "mime_part",
        star(choice(vec![
            tok("soap_body"),
            tok("soap_header"),
            tok("mime_content"),
            tok("mime_mimeXml"),
        ])),
    );
    map.insert("mime_mimeXml", Content::Empty);

    map.insert(
        "xsd_schema",
        seq(vec![
            star(choice(vec![
                tok("xsd_include"),
                tok("xsd_import"),
                tok("xsd_redefine"),
            ])),
            star(choice(vec![
                tok("xsd_simpleType"),
                tok("xsd_complexType"),
                tok("xsd_group"),
                tok("xsd_attributeGroup"),
                tok("xsd_element"),
                tok("xsd_attribute"),
                tok("xsd_notation"),
            ])),
        ]),
    );
    map.insert("xsd_include", Content::Empty);
    map.insert("xsd_import", Content::Empty);
    map.insert(
        "xsd_redefine",
        star(choice(vec![
            tok("xsd_simpleType"),
            tok("xsd_complexType"),
            tok("xsd_group"),
            tok("xsd_attributeGroup"),
        ])),
    );
    map.insert(
        "xsd_element",
        seq(vec![
            opt(choice(vec![tok("xsd_simpleType"), tok("xsd_complexType")])),
            star(choice(vec![
                tok("xsd_unique"),
                tok("xsd_key"),
                tok("xsd_keyref"),
            ])),
        ]),
    );
    let model_group = choice(vec![
        tok("xsd_group"),
        tok("xsd_all"),
        tok("xsd_choice"),
        tok("xsd_sequence"),
    ]);
    let attr_uses = seq(vec![
        star(choice(vec![tok("xsd_attribute"), tok("xsd_attributeGroup")])),
        opt(tok("xsd_anyAttribute")),
    ]);
    map.insert(
        "xsd_complexType",
        choice(vec![
            tok("xsd_simpleContent"),
            tok("xsd_complexContent"),
            seq(vec![opt(model_group.clone()), attr_uses.clone()]),
        ]),
    );
    map.insert(
        "xsd_simpleType",
        choice(vec![tok("xsd_restriction"), tok("xsd_list"), tok("xsd_union")]),
    );
    let mut facet_alternatives: Vec<Content> = VALUE_FACETS.iter().map(|f| tok(*f)).collect();
    facet_alternatives.push(tok("xsd_enumeration"));
    map.insert(
        "xsd_restriction",
        seq(vec![
            opt(choice(vec![
                tok("xsd_group"),
                tok("xsd_all"),
                tok("xsd_choice"),
                tok("xsd_sequence"),
                tok("xsd_simpleType"),
            ])),
            star(choice(facet_alternatives)),
            attr_uses.clone(),
        ]),
    );
    map.insert(
        "xsd_extension",
        seq(vec![opt(model_group), attr_uses.clone()]),
    );
    map.insert(
        "xsd_simpleContent",
        choice(vec![tok("xsd_restriction"), tok("xsd_extension")]),
    );
    map.insert(
        "xsd_complexContent",
        choice(vec![tok("xsd_restriction"), tok("xsd_extension")]),
    );
    let particles = star(choice(vec![
        tok("xsd_element"),
        tok("xsd_group"),
        tok("xsd_choice"),
        tok("xsd_sequence"),
        tok("xsd_any"),
    ]));
    map.insert("xsd_sequence", particles.clone());
    map.insert("xsd_choice", particles);
    map.insert("xsd_all", star(tok("xsd_element")));
    map.insert(
        "xsd_group",
        opt(choice(vec![
            tok("xsd_all"),
            tok("xsd_choice"),
            tok("xsd_sequence"),
        ])),
    );
    map.insert("xsd_attribute", opt(tok("xsd_simpleType")));
    map.insert("xsd_attributeGroup", attr_uses);
    map.insert("xsd_any", Content::Empty);
    map.insert("xsd_anyAttribute", Content::Empty);
    map.insert("xsd_list", opt(tok("xsd_simpleType")));
    map.insert("xsd_union", star(tok("xsd_simpleType")));
    let identity = seq(vec![tok("xsd_selector"), star(tok("xsd_field"))]);
    map.insert("xsd_unique", identity.clone());
    map.insert("xsd_key", identity.clone());
    map.insert("xsd_keyref", identity);
    map.insert("xsd_selector", Content::Empty);
    map.insert("xsd_field", Content::Empty);
    map.insert("xsd_notation", Content::Empty);

    for facet in VALUE_FACETS {
        map.insert(*facet, Content::Empty);
    }
    map.insert("xsd_enumeration", Content::Empty);

    map
});
