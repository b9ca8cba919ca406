//! Namespace promotion
//!
//! Namespace-prefix declarations that appear below a schema root are
//! hoisted to that root before model construction, so that every prefix
//! used inside a schema resolves through one map. A declaration whose
//! prefix is already bound to a different URI in the enclosing scope is a
//! collision: the declaration is dropped, a replacement prefix is chosen,
//! and every `type`/`base`/`ref` reference in the affected subtree is
//! rewritten to the replacement. The whole pass is idempotent.

use crate::documents::{Attribute, DocumentTree, Element, Node};
use crate::{XMLNS_NAMESPACE, XSD_NAMESPACE};
use indexmap::IndexMap;

/// Attributes whose values are prefixed references subject to rewriting
const REFERENCE_ATTRIBUTES: &[&str] = &["type", "base", "ref"];

/// One open schema scope
#[derive(Debug, Default)]
struct Scope {
    /// prefix (None = default namespace) -> URI
    prefixes: IndexMap<Option<String>, String>,
    /// declarations to write back onto the schema element on exit
    promoted: Vec<(Option<String>, String)>,
}

/// A prefix rewrite rule active for one subtree
#[derive(Debug)]
struct Rewrite {
    /// the colliding prefix; None when the default namespace collided
    old: Option<String>,
    /// the replacement prefix
    new: String,
}

/// Hoist descendant namespace declarations to their enclosing schema root
pub fn promote(tree: &mut DocumentTree) {
    let mut scopes: Vec<Scope> = Vec::new();
    let mut rewrites: Vec<Rewrite> = Vec::new();
    let mut counter = 0usize;
    walk(&mut tree.root, &mut scopes, &mut rewrites, &mut counter);
}

fn is_schema(element: &Element) -> bool {
    element.namespace == XSD_NAMESPACE && element.local_name == "schema"
}

fn walk(
    element: &mut Element,
    scopes: &mut Vec<Scope>,
    rewrites: &mut Vec<Rewrite>,
    counter: &mut usize,
) {
    let schema_root = is_schema(element);
    let mut pushed_rewrites = 0usize;

    if schema_root {
        // The schema's own declarations seed the scope; they are already
        // where promotion would put them.
        let mut scope = Scope::default();
        for (prefix, uri) in element.xmlns_declarations() {
            scope
                .prefixes
                .insert(prefix.map(str::to_string), uri.to_string());
        }
        scopes.push(scope);
    } else if !scopes.is_empty() {
        pushed_rewrites = collect_declarations(element, scopes, rewrites, counter);
    }

    if !rewrites.is_empty() {
        rewrite_references(element, rewrites);
    }

    for child in element.element_children_mut() {
        walk(child, scopes, rewrites, counter);
    }

    rewrites.truncate(rewrites.len() - pushed_rewrites);

    if schema_root {
        let scope = scopes.pop().expect("schema scope pushed above");
        write_back(element, scope);
    }
}

/// Merge an element's declarations into the current scope, resolving
/// collisions. Returns the number of rewrite rules pushed.
fn collect_declarations(
    element: &mut Element,
    scopes: &mut [Scope],
    rewrites: &mut Vec<Rewrite>,
    counter: &mut usize,
) -> usize {
    let scope = scopes.last_mut().expect("caller checked for open scope");
    let declarations: Vec<(usize, Option<String>, String)> = element
        .attributes
        .iter()
        .enumerate()
        .filter(|(_, a)| a.is_xmlns())
        .map(|(i, a)| (i, a.declared_prefix().map(str::to_string), a.value.clone()))
        .collect();

    let mut pushed = 0usize;
    let mut to_remove: Vec<usize> = Vec::new();

    for (index, prefix, uri) in declarations {
        match scope.prefixes.get(&prefix).cloned() {
            None => {
                // New prefix: promote it upward.
                scope.prefixes.insert(prefix.clone(), uri.clone());
                scope.promoted.push((prefix, uri));
            }
            Some(existing) if existing == uri => {}
            Some(_) => {
                // Collision: same prefix, different URI.
                to_remove.push(index);
                let reusable = scope
                    .prefixes
                    .iter()
                    .find(|(p, u)| p.is_some() && **u == uri)
                    .and_then(|(p, _)| p.clone());
                let replacement = match reusable {
                    Some(prefix) => prefix,
                    None => {
                        let fresh = fresh_prefix(scope, counter);
                        scope
                            .prefixes
                            .insert(Some(fresh.clone()), uri.clone());
                        scope.promoted.push((Some(fresh.clone()), uri));
                        fresh
                    }
                };
                rewrites.push(Rewrite {
                    old: prefix,
                    new: replacement,
                });
                pushed += 1;
            }
        }
    }

    for index in to_remove.into_iter().rev() {
        element.attributes.remove(index);
    }

    pushed
}

fn fresh_prefix(scope: &Scope, counter: &mut usize) -> String {
    loop {
        *counter += 1;
        let candidate = format!("ns{}", counter);
        if !scope.prefixes.contains_key(&Some(candidate.clone())) {
            return candidate;
        }
    }
}

/// Rewrite prefixed `type`/`base`/`ref` values per the active rules
fn rewrite_references(element: &mut Element, rewrites: &[Rewrite]) {
    for attr in &mut element.attributes {
        if attr.is_xmlns() || !REFERENCE_ATTRIBUTES.contains(&attr.local_name.as_str()) {
            continue;
        }
        // Innermost rule wins when collisions nest.
        for rule in rewrites.iter().rev() {
            match (&rule.old, attr.value.split_once(':')) {
                (Some(old), Some((prefix, local))) if prefix == old => {
                    attr.value = format!("{}:{}", rule.new, local);
                    break;
                }
                (None, None) => {
                    // Default-namespace collision: unprefixed references
                    // were implicitly bound to it.
                    attr.value = format!("{}:{}", rule.new, attr.value);
                    break;
                }
                _ => {}
            }
        }
    }
}

/// Write promoted declarations back onto the schema element
fn write_back(schema: &mut Element, scope: Scope) {
    for (prefix, uri) in scope.promoted {
        let already_present = schema
            .xmlns_declarations()
            .any(|(p, _)| p == prefix.as_deref());
        if already_present {
            continue;
        }
        schema.attributes.push(Attribute {
            local_name: prefix.unwrap_or_else(|| "xmlns".to_string()),
            namespace: XMLNS_NAMESPACE.to_string(),
            value: uri,
        });
    }
}
