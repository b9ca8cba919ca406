//! Closure resolution
//!
//! Starting from one or more root documents, the resolver computes by fixed
//! point the set of files transitively reachable via `wsdl:import`,
//! `xsd:import`, `xsd:include` and `xsd:redefine`. Each pass parses,
//! validates, promotes and models every newly known file, unions the
//! reference locations, and asks the file supply for anything not seen
//! before. The loop ends when a pass discovers nothing new; whatever is
//! still missing stays in the closure as a `Missing` marker.

use crate::diagnostics::Diagnostics;
use crate::documents::DocumentTree;
use crate::error::{GrammarError, Result};
use crate::grammar;
use crate::limits::Limits;
use crate::loaders::FileSupply;
use crate::locations;
use crate::model::{self, Model, RootKind};
use crate::promoter;
use crate::validator::{self, Violation};
use indexmap::{IndexMap, IndexSet};

/// Per-file reference locations, normalized and de-duplicated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSet {
    /// `xsd:import/@schemaLocation` targets
    pub xsd_imports: IndexSet<String>,
    /// `xsd:include/@schemaLocation` targets
    pub xsd_includes: IndexSet<String>,
    /// `xsd:redefine/@schemaLocation` targets
    pub xsd_redefines: IndexSet<String>,
    /// `wsdl:import/@location` targets
    pub wsdl_imports: IndexSet<String>,
}

impl ReferenceSet {
    /// All referenced locations, de-duplicated, insertion order
    pub fn all(&self) -> IndexSet<String> {
        let mut all = IndexSet::new();
        all.extend(self.wsdl_imports.iter().cloned());
        all.extend(self.xsd_imports.iter().cloned());
        all.extend(self.xsd_includes.iter().cloned());
        all.extend(self.xsd_redefines.iter().cloned());
        all
    }

    /// Whether the file references nothing
    pub fn is_empty(&self) -> bool {
        self.wsdl_imports.is_empty()
            && self.xsd_imports.is_empty()
            && self.xsd_includes.is_empty()
            && self.xsd_redefines.is_empty()
    }
}

/// Closure entry for one location
#[derive(Debug, Clone, PartialEq)]
pub enum ClosureEntry {
    /// The file was supplied and its references extracted
    Resolved(ReferenceSet),
    /// The file could not be supplied
    Missing,
}

/// Fixed-point mapping from normalized location to closure entry
///
/// Invariant once resolution finishes: every location appearing in any
/// member's reference set is itself a key of the map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileClosure {
    entries: IndexMap<String, ClosureEntry>,
}

impl FileClosure {
    /// Entry for a location
    pub fn get(&self, location: &str) -> Option<&ClosureEntry> {
        self.entries.get(location)
    }

    /// All member locations, insertion order
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    /// Locations the supply could not satisfy
    pub fn missing(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, e)| matches!(e, ClosureEntry::Missing))
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Number of member locations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the closure has no members
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check the fixed-point invariant
    pub fn is_fixed_point(&self) -> bool {
        self.entries.values().all(|entry| match entry {
            ClosureEntry::Resolved(refs) => {
                refs.all().iter().all(|loc| self.entries.contains_key(loc))
            }
            ClosureEntry::Missing => true,
        })
    }
}

/// A fully processed member of the closure
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// Normalized location
    pub location: String,
    /// Semantic model built from the promoted tree
    pub model: Model,
    /// Extracted references
    pub references: ReferenceSet,
    /// Structural violations (fatal and recoverable)
    pub violations: Vec<Violation>,
}

impl ParsedFile {
    /// Whether the file carries a fatal structural violation
    pub fn has_fatal_violation(&self) -> bool {
        validator::first_fatal(&self.violations).is_some()
    }
}

/// Result of a resolution request
#[derive(Debug)]
pub struct Resolution {
    /// The stabilized closure
    pub closure: FileClosure,
    /// Successfully parsed members, by location
    pub files: IndexMap<String, ParsedFile>,
    /// First fatal structural violation of each unusable member
    pub failures: IndexMap<String, GrammarError>,
    /// Accepted root documents
    pub roots: Vec<String>,
    /// Whether bare-schema mode was entered (no WSDL among the roots)
    pub bare_schema_mode: bool,
}

/// Fixed-point closure resolver over a file supply
pub struct Resolver<'a> {
    supply: &'a dyn FileSupply,
    limits: Limits,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over a supply with default limits
    pub fn new(supply: &'a dyn FileSupply) -> Self {
        Self {
            supply,
            limits: Limits::default(),
        }
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Compute the transitive closure of the root documents
    pub fn resolve(
        &self,
        root_locations: &[String],
        diags: &mut Diagnostics,
    ) -> Result<Resolution> {
        let mut closure = FileClosure::default();
        let mut files: IndexMap<String, ParsedFile> = IndexMap::new();
        let mut failures: IndexMap<String, GrammarError> = IndexMap::new();
        let mut pending: Vec<String> = Vec::new();

        for root in root_locations {
            let normalized = locations::squash_dots(root);
            if !closure.entries.contains_key(&normalized) {
                closure
                    .entries
                    .insert(normalized.clone(), ClosureEntry::Missing);
                pending.push(normalized);
            }
        }

        let mut passes = 0usize;
        while !pending.is_empty() {
            passes += 1;
            self.limits.check_closure_passes(passes)?;
            tracing::debug!(pass = passes, pending = pending.len(), "closure pass");

            // Each pass is a barrier: every pending file is extracted
            // before its references grow the candidate set.
            let batch = std::mem::take(&mut pending);
            let mut discovered: IndexSet<String> = IndexSet::new();

            for location in batch {
                match self.supply.supply(&location)? {
                    None => {
                        diags.detail(
                            format!("location '{}' not yet supplied", location),
                            None,
                        );
                        // stays Missing
                    }
                    Some(text) => {
                        match self.process_file(&location, &text, diags, &mut failures) {
                            Some(parsed) => {
                                discovered.extend(parsed.references.all());
                                closure.entries.insert(
                                    location.clone(),
                                    ClosureEntry::Resolved(parsed.references.clone()),
                                );
                                files.insert(location.clone(), parsed);
                            }
                            None => {
                                // Parse or fatal validation failure; the file is
                                // present but unusable. Its entry resolves empty so
                                // the closure still reaches a fixed point.
                                closure.entries.insert(
                                    location.clone(),
                                    ClosureEntry::Resolved(ReferenceSet::default()),
                                );
                            }
                        }
                    }
                }
            }

            for location in discovered {
                if !closure.entries.contains_key(&location) {
                    self.limits.check_closure_files(closure.len() + 1)?;
                    closure
                        .entries
                        .insert(location.clone(), ClosureEntry::Missing);
                    pending.push(location);
                }
            }
        }

        for missing in closure.missing() {
            diags.warning(
                format!("referenced location '{}' could not be supplied", missing),
                None,
            );
        }

        let mut roots: Vec<String> = root_locations
            .iter()
            .map(|r| locations::squash_dots(r))
            .filter(|r| {
                files
                    .get(r)
                    .map(|f| f.model.root_kind == RootKind::Definitions)
                    .unwrap_or(false)
            })
            .collect();

        // Bare schema mode: no WSDL among the candidates, retry accepting
        // schema documents as roots.
        let mut bare_schema_mode = false;
        if roots.is_empty() {
            roots = root_locations
                .iter()
                .map(|r| locations::squash_dots(r))
                .filter(|r| {
                    files
                        .get(r)
                        .map(|f| f.model.root_kind == RootKind::Schema)
                        .unwrap_or(false)
                })
                .collect();
            if !roots.is_empty() {
                bare_schema_mode = true;
                diags.info(
                    "no WSDL root documents found; interpreting roots as bare schemas",
                    None,
                );
            }
        }

        Ok(Resolution {
            closure,
            files,
            failures,
            roots,
            bare_schema_mode,
        })
    }

    /// Parse, validate, promote and model one file
    ///
    /// Returns `None` when the file is unusable; diagnostics carry the
    /// reason.
    fn process_file(
        &self,
        location: &str,
        text: &str,
        diags: &mut Diagnostics,
        failures: &mut IndexMap<String, GrammarError>,
    ) -> Option<ParsedFile> {
        let mut tree = match DocumentTree::parse_with_limits(text, &self.limits) {
            Ok(tree) => tree,
            Err(e) => {
                diags.error(format!("failed to parse: {}", e), Some(location));
                return None;
            }
        };

        let violations = validator::validate(&tree);
        for violation in &violations {
            if violation.is_fatal() {
                diags.error(format!("{}", violation), Some(location));
            } else {
                diags.warning(format!("{}", violation), Some(location));
            }
        }
        if let Some(fatal) = validator::first_fatal(&violations) {
            failures.insert(
                location.to_string(),
                GrammarError::new(fatal.message.clone())
                    .with_file(location)
                    .with_citation(fatal.kind.citation()),
            );
            return None;
        }

        promoter::promote(&mut tree);

        let references = extract_references(location, &tree);

        let model = match model::build(&tree) {
            Ok(model) => model,
            Err(e) => {
                diags.error(format!("{}", e), Some(location));
                return None;
            }
        };

        tracing::debug!(location, references = references.all().len(), "processed file");

        Some(ParsedFile {
            location: location.to_string(),
            model,
            references,
            violations,
        })
    }
}

/// Collect the reference locations declared in a tree, normalized against
/// the owning file's directory
pub fn extract_references(location: &str, tree: &DocumentTree) -> ReferenceSet {
    let mut refs = ReferenceSet::default();
    collect_refs(&tree.root, location, &mut refs);
    refs
}

fn collect_refs(element: &crate::documents::Element, location: &str, refs: &mut ReferenceSet) {
    let token = grammar::classify(&element.namespace, &element.local_name, None).token;
    match token.as_str() {
        "wsdl_import" => {
            if let Some(loc) = element.attribute("location") {
                refs.wsdl_imports
                    .insert(locations::normalize(location, loc));
            }
        }
        "xsd_import" => {
            // schemaLocation is optional on xsd:import
            if let Some(loc) = element.attribute("schemaLocation") {
                refs.xsd_imports.insert(locations::normalize(location, loc));
            }
        }
        "xsd_include" => {
            if let Some(loc) = element.attribute("schemaLocation") {
                refs.xsd_includes
                    .insert(locations::normalize(location, loc));
            }
        }
        "xsd_redefine" => {
            if let Some(loc) = element.attribute("schemaLocation") {
                refs.xsd_redefines
                    .insert(locations::normalize(location, loc));
            }
        }
        _ => {}
    }
    for child in element.element_children() {
        collect_refs(child, location, refs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::MemorySupply;

    const WSDL: &str = "http://schemas.xmlsoap.org/wsdl/";
    const XSD: &str = "http://www.w3.org/2001/XMLSchema";

    fn wsdl_importing(tns: &str, import_ns: &str, import_loc: &str) -> String {
        format!(
            r#"<wsdl:definitions xmlns:wsdl="{WSDL}" targetNamespace="{tns}">
                <wsdl:import namespace="{import_ns}" location="{import_loc}"/>
            </wsdl:definitions>"#
        )
    }

    fn plain_wsdl(tns: &str) -> String {
        format!(
            r#"<wsdl:definitions xmlns:wsdl="{WSDL}" targetNamespace="{tns}">
                <wsdl:types/>
            </wsdl:definitions>"#
        )
    }

    #[test]
    fn test_closure_fixed_point() {
        let supply = MemorySupply::new()
            .with_file("a.wsdl", wsdl_importing("urn:a", "urn:b", "b.wsdl"))
            .with_file("b.wsdl", plain_wsdl("urn:b"));
        let mut diags = Diagnostics::new();
        let resolution = Resolver::new(&supply)
            .resolve(&["a.wsdl".to_string()], &mut diags)
            .unwrap();

        assert!(resolution.closure.is_fixed_point());
        assert_eq!(resolution.closure.len(), 2);
        assert!(resolution.closure.missing().is_empty());
        assert_eq!(resolution.roots, vec!["a.wsdl"]);
        assert!(!resolution.bare_schema_mode);
    }

    #[test]
    fn test_missing_reference_marked() {
        let supply = MemorySupply::new().with_file(
            "a.wsdl",
            wsdl_importing("urn:a", "urn:b", "absent.wsdl"),
        );
        let mut diags = Diagnostics::new();
        let resolution = Resolver::new(&supply)
            .resolve(&["a.wsdl".to_string()], &mut diags)
            .unwrap();

        assert!(resolution.closure.is_fixed_point());
        assert_eq!(resolution.closure.missing(), vec!["absent.wsdl"]);
    }

    #[test]
    fn test_relative_locations_normalized() {
        let supply = MemorySupply::new()
            .with_file("dir/a.wsdl", wsdl_importing("urn:a", "urn:b", "../b.wsdl"))
            .with_file("b.wsdl", plain_wsdl("urn:b"));
        let mut diags = Diagnostics::new();
        let resolution = Resolver::new(&supply)
            .resolve(&["dir/a.wsdl".to_string()], &mut diags)
            .unwrap();

        assert!(resolution.files.contains_key("b.wsdl"));
        assert!(resolution.closure.missing().is_empty());
    }

    #[test]
    fn test_bare_schema_mode() {
        let schema = format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="urn:s">
                <xsd:element name="e" type="xsd:string"/>
            </xsd:schema>"#
        );
        let supply = MemorySupply::new().with_file("s.xsd", schema);
        let mut diags = Diagnostics::new();
        let resolution = Resolver::new(&supply)
            .resolve(&["s.xsd".to_string()], &mut diags)
            .unwrap();

        assert!(resolution.bare_schema_mode);
        assert_eq!(resolution.roots, vec!["s.xsd"]);
    }

    #[test]
    fn test_cyclic_imports_terminate() {
        let supply = MemorySupply::new()
            .with_file("a.wsdl", wsdl_importing("urn:a", "urn:b", "b.wsdl"))
            .with_file("b.wsdl", wsdl_importing("urn:b", "urn:a", "a.wsdl"));
        let mut diags = Diagnostics::new();
        let resolution = Resolver::new(&supply)
            .resolve(&["a.wsdl".to_string()], &mut diags)
            .unwrap();

        assert!(resolution.closure.is_fixed_point());
        assert_eq!(resolution.closure.len(), 2);
    }

    #[test]
    fn test_fatal_violation_recorded_with_citation() {
        let supply = MemorySupply::new().with_file(
            "bad.wsdl",
            format!(
                r#"<wsdl:definitions xmlns:wsdl="{WSDL}" targetNamespace="urn:b">
                    <wsdl:part name="stray"/>
                </wsdl:definitions>"#
            ),
        );
        let mut diags = Diagnostics::new();
        let resolution = Resolver::new(&supply)
            .resolve(&["bad.wsdl".to_string()], &mut diags)
            .unwrap();

        assert!(!resolution.files.contains_key("bad.wsdl"));
        let failure = resolution.failures.get("bad.wsdl").unwrap();
        assert_eq!(failure.file.as_deref(), Some("bad.wsdl"));
        assert_eq!(failure.citation.as_deref(), Some("WS-I BP 1.1 R2029"));
    }

    #[test]
    fn test_resolution_idempotent() {
        let supply = MemorySupply::new()
            .with_file("a.wsdl", wsdl_importing("urn:a", "urn:b", "b.wsdl"))
            .with_file("b.wsdl", plain_wsdl("urn:b"));
        let mut diags = Diagnostics::new();
        let resolver = Resolver::new(&supply);
        let first = resolver.resolve(&["a.wsdl".to_string()], &mut diags).unwrap();
        let second = resolver.resolve(&["a.wsdl".to_string()], &mut diags).unwrap();
        assert_eq!(first.closure, second.closure);
    }

    #[test]
    fn test_schema_location_extraction() {
        let xml = format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="urn:s">
                <xsd:import namespace="urn:other" schemaLocation="other.xsd"/>
                <xsd:import namespace="urn:known"/>
                <xsd:include schemaLocation="./part.xsd"/>
            </xsd:schema>"#
        );
        let tree = DocumentTree::parse(&xml).unwrap();
        let refs = extract_references("nested/s.xsd", &tree);
        assert!(refs.xsd_imports.contains("nested/other.xsd"));
        assert!(refs.xsd_includes.contains("nested/part.xsd"));
        assert_eq!(refs.all().len(), 2);
    }
}
