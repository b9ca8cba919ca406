//! Merge engine
//!
//! Folds the per-file models of a closure into one composite model per
//! root document. WSDL imports merge `definitions` content key by key;
//! schema imports/includes append schema fragments under the composite's
//! `types` section. Every merged fragment is annotated with the namespace
//! map and target namespace in force at its point of origin, because
//! different fragments may bind different prefixes to the same URI.

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::loaders::FileSupply;
use crate::locations;
use crate::model::{Model, ModelNode, NamespaceMap, Origin, Provenance, RootKind, Value, TNS_KEY};
use crate::names;
use crate::resolver::{ClosureEntry, ParsedFile, Resolution, Resolver};
use indexmap::IndexSet;
use serde::Serialize;
use std::collections::VecDeque;

/// A composite model assembled from one root document and everything it
/// transitively references
#[derive(Debug, Clone, Serialize)]
pub struct MergedModel {
    /// Normalized location of the root document
    pub root_location: String,
    /// The composite `definitions` object (synthetic wrapper for bare-XSD roots)
    pub definitions: ModelNode,
    /// Accumulated prefix map across all merged files (first binding wins)
    pub global_namespaces: NamespaceMap,
    /// Whether the root was a bare schema rather than a WSDL
    pub bare_schema: bool,
}

/// Service summary line: one service with its ports
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceSummary {
    /// Service name
    pub name: String,
    /// The service's ports
    pub ports: Vec<PortSummary>,
}

/// One port of a service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortSummary {
    /// Port name
    pub name: String,
    /// Referenced binding (local name, prefix stripped)
    pub binding: String,
    /// Operations of the referenced binding
    pub operations: Vec<String>,
}

impl MergedModel {
    /// Derive the service -> port -> binding -> operations view from the
    /// composite maps, without re-walking the full tree
    pub fn service_summary(&self) -> Vec<ServiceSummary> {
        let services = match self.definitions.get("service") {
            Some(value) => value.nodes(),
            None => return Vec::new(),
        };
        services
            .into_iter()
            .filter_map(|service| {
                let name = service.attributes.get("name")?.clone();
                let ports = service
                    .get("port")
                    .map(|v| v.nodes())
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|port| {
                        let port_name = port.attributes.get("name")?.clone();
                        let binding_ref = port.attributes.get("binding")?;
                        let (_, binding) = names::split_qname(binding_ref);
                        Some(PortSummary {
                            name: port_name,
                            binding: binding.to_string(),
                            operations: self.binding_operations(binding),
                        })
                    })
                    .collect();
                Some(ServiceSummary { name, ports })
            })
            .collect()
    }

    /// Serialize the composite model to a JSON value
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| Error::Other(format!("failed to serialize merged model: {}", e)))
    }

    fn binding_operations(&self, binding_name: &str) -> Vec<String> {
        let bindings = match self.definitions.get("binding") {
            Some(value) => value.nodes(),
            None => return Vec::new(),
        };
        bindings
            .into_iter()
            .find(|b| b.attributes.get("name").map(|n| n.as_str()) == Some(binding_name))
            .and_then(|b| b.get("operation"))
            .map(|ops| {
                ops.nodes()
                    .into_iter()
                    .filter_map(|op| op.attributes.get("name").cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Everything a resolution request produced
#[derive(Debug)]
pub struct MergeOutcome {
    /// One composite model per successfully merged root
    pub models: Vec<MergedModel>,
    /// All findings of the run
    pub diagnostics: Diagnostics,
}

/// Resolve the closure of the given roots and merge each root into a
/// composite model
///
/// A fatal finding against one root's closure suppresses that root's
/// composite model but does not abort sibling roots.
pub fn resolve_and_merge(
    root_locations: &[String],
    supply: &dyn FileSupply,
    limits: Limits,
) -> Result<MergeOutcome> {
    let mut diags = Diagnostics::new();
    let resolution = Resolver::new(supply)
        .with_limits(limits.clone())
        .resolve(root_locations, &mut diags)?;

    if resolution.roots.is_empty() {
        return Err(Error::Resolution(
            "no usable root documents among the supplied locations".to_string(),
        ));
    }

    let merger = Merger::new(&resolution).with_limits(limits);
    let mut models = Vec::new();
    for root in &resolution.roots {
        match merger.merge_root(root, &mut diags) {
            Ok(model) => models.push(model),
            Err(e) => diags.error(format!("{}", e), Some(root.as_str())),
        }
    }

    Ok(MergeOutcome {
        models,
        diagnostics: diags,
    })
}

/// Pending schema reference work
#[derive(Debug)]
struct SchemaWork {
    origin: Origin,
    /// `namespace` attribute on the reference element, if any
    declared_namespace: Option<String>,
    /// normalized target location
    location: String,
    /// target namespace of the referencing schema
    referent_tns: Option<String>,
    /// the reference sits directly inside a WSDL types section
    in_wsdl_types: bool,
    depth: usize,
}

/// Merges per-file models along a resolved closure
pub struct Merger<'a> {
    resolution: &'a Resolution,
    limits: Limits,
}

impl<'a> Merger<'a> {
    /// Create a merger over a resolution
    pub fn new(resolution: &'a Resolution) -> Self {
        Self {
            resolution,
            limits: Limits::default(),
        }
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Merge one root document into a composite model
    pub fn merge_root(&self, root: &str, diags: &mut Diagnostics) -> Result<MergedModel> {
        let file = self.lookup(root)?;
        match file.model.root_kind {
            RootKind::Definitions => self.merge_wsdl_root(file, diags),
            RootKind::Schema => self.merge_schema_root(file, diags),
        }
    }

    /// A closure member that must be present and structurally sound
    fn lookup(&self, location: &str) -> Result<&ParsedFile> {
        if let Some(file) = self.resolution.files.get(location) {
            return Ok(file);
        }
        if let Some(grammar) = self.resolution.failures.get(location) {
            return Err(Error::Grammar(grammar.clone()));
        }
        match self.resolution.closure.get(location) {
            Some(ClosureEntry::Resolved(_)) => Err(Error::Resolution(format!(
                "referenced file '{}' could not be processed",
                location
            ))),
            _ => Err(Error::UnresolvedReference(format!(
                "referenced file '{}' could not be supplied",
                location
            ))),
        }
    }

    fn merge_wsdl_root(
        &self,
        root: &ParsedFile,
        diags: &mut Diagnostics,
    ) -> Result<MergedModel> {
        let mut composite = root.model.root.clone();
        // The root's reference elements are expanded below, like everyone
        // else's; they do not survive into the composite.
        composite.entries.shift_remove("import");
        let mut global = root.model.global_namespaces.clone();
        let mut visited: IndexSet<String> = IndexSet::new();
        visited.insert(root.location.clone());

        let mut schema_queue: VecDeque<SchemaWork> = VecDeque::new();
        enqueue_types_references(
            &composite,
            &root.location,
            0,
            &mut schema_queue,
        );

        // Breadth-first over wsdl:import, one merge per location.
        let mut wsdl_queue: VecDeque<(String, usize)> = VecDeque::new();
        wsdl_queue.push_back((root.location.clone(), 0));

        while let Some((location, depth)) = wsdl_queue.pop_front() {
            self.limits.check_merge_depth(depth)?;
            let importer = self.lookup(&location)?;
            for (declared_ns, import_location) in
                wsdl_import_decls(&importer.model.root, &location)
            {
                let import_location = match import_location {
                    Some(loc) => loc,
                    None => continue,
                };
                if !visited.insert(import_location.clone()) {
                    continue; // diamond import, already merged
                }
                let target = self.lookup(&import_location)?;

                match target.model.root_kind {
                    RootKind::Schema => {
                        // Tolerated deviation: a wsdl:import pointing at a
                        // plain XSD is treated as an implicit types addition.
                        diags.info(
                            format!(
                                "wsdl:import of schema document '{}' is non-conformant but accepted",
                                import_location
                            ),
                            Some(location.as_str()),
                        );
                        visited.remove(&import_location);
                        schema_queue.push_back(SchemaWork {
                            origin: Origin::Import,
                            declared_namespace: declared_ns,
                            location: import_location,
                            referent_tns: tns_of(&importer.model),
                            in_wsdl_types: true,
                            depth: depth + 1,
                        });
                    }
                    RootKind::Definitions => {
                        let effective_tns = self.check_wsdl_import_namespace(
                            &location,
                            &import_location,
                            declared_ns.as_deref(),
                            target,
                            diags,
                        )?;
                        self.merge_definitions(
                            &mut composite,
                            target,
                            effective_tns,
                            &mut schema_queue,
                            depth,
                        );
                        merge_namespaces(&mut global, &target.model.global_namespaces);
                        wsdl_queue.push_back((import_location, depth + 1));
                    }
                }
            }
        }

        self.drain_schema_queue(&mut composite, &mut global, &mut visited, schema_queue, diags)?;

        Ok(MergedModel {
            root_location: root.location.clone(),
            definitions: composite,
            global_namespaces: global,
            bare_schema: false,
        })
    }

    fn merge_schema_root(
        &self,
        root: &ParsedFile,
        diags: &mut Diagnostics,
    ) -> Result<MergedModel> {
        // Synthetic definitions/types wrapper around the bare schema.
        let mut composite = ModelNode::default();
        composite.qname = Some("wsdl_definitions".to_string());
        let mut types = ModelNode::default();
        types.qname = Some("wsdl_types".to_string());
        types
            .entries
            .insert("schema".to_string(), Value::Node(root.model.root.clone()));
        composite.entries.insert("types".to_string(), Value::Node(types));

        let mut global = root.model.global_namespaces.clone();
        let mut visited: IndexSet<String> = IndexSet::new();
        visited.insert(root.location.clone());

        let mut queue: VecDeque<SchemaWork> = VecDeque::new();
        enqueue_schema_references(
            &root.model.root,
            &root.location,
            tns_of(&root.model),
            false,
            0,
            &mut queue,
        );

        self.drain_schema_queue(&mut composite, &mut global, &mut visited, queue, diags)?;

        Ok(MergedModel {
            root_location: root.location.clone(),
            definitions: composite,
            global_namespaces: global,
            bare_schema: true,
        })
    }

    /// Enforce the wsdl:import namespace contract, returning the imported
    /// document's effective target namespace
    fn check_wsdl_import_namespace(
        &self,
        importer_location: &str,
        import_location: &str,
        declared_ns: Option<&str>,
        target: &ParsedFile,
        diags: &mut Diagnostics,
    ) -> Result<Option<String>> {
        let target_tns = tns_of(&target.model);
        match (declared_ns, target_tns.as_deref()) {
            (Some(declared), Some(actual)) if declared != actual => Err(Error::Namespace(format!(
                "'{}' imports '{}' expecting namespace '{}' but it declares '{}'",
                importer_location, import_location, declared, actual
            ))),
            (Some(declared), None) => {
                // Chameleon: the imported document asserts no namespace and
                // inherits the importer-declared one.
                diags.warning(
                    format!(
                        "imported document '{}' has no target namespace; assuming '{}'",
                        import_location, declared
                    ),
                    Some(importer_location),
                );
                Ok(Some(declared.to_string()))
            }
            _ => Ok(target_tns),
        }
    }

    /// Merge an imported WSDL's definitions content into the composite
    fn merge_definitions(
        &self,
        composite: &mut ModelNode,
        target: &ParsedFile,
        effective_tns: Option<String>,
        schema_queue: &mut VecDeque<SchemaWork>,
        depth: usize,
    ) {
        let mut namespaces = target.model.global_namespaces.clone();
        if let Some(tns) = &effective_tns {
            namespaces.insert(TNS_KEY.to_string(), tns.clone());
        }
        let provenance = Provenance {
            origin: Origin::Import,
            file: locations::short_name(&target.location).to_string(),
            namespaces,
            target_namespace: effective_tns,
        };

        for (key, value) in &target.model.root.entries {
            // Reference elements are expanded through the queues, not copied.
            if key == "import" {
                continue;
            }
            if key == "types" {
                // types content merges at the schema-fragment level
                for schema in schema_fragments(value) {
                    let mut fragment = schema.clone();
                    fragment.provenance = Some(provenance.clone());
                    push_schema_fragment(composite, fragment);
                }
                continue;
            }
            append_entries(composite, key, value, &provenance);
        }

        enqueue_types_references(&target.model.root, &target.location, depth + 1, schema_queue);
    }

    /// Process queued schema references until exhaustion
    fn drain_schema_queue(
        &self,
        composite: &mut ModelNode,
        global: &mut NamespaceMap,
        visited: &mut IndexSet<String>,
        mut queue: VecDeque<SchemaWork>,
        diags: &mut Diagnostics,
    ) -> Result<()> {
        while let Some(work) = queue.pop_front() {
            self.limits.check_merge_depth(work.depth)?;
            if !visited.insert(work.location.clone()) {
                continue;
            }
            let target = self.lookup(&work.location)?;
            if target.model.root_kind != RootKind::Schema {
                return Err(Error::Namespace(format!(
                    "schema reference target '{}' is not a schema document",
                    work.location
                )));
            }

            let target_tns = tns_of(&target.model);
            let effective_tns = self.check_schema_namespace(&work, target_tns, diags)?;

            let mut namespaces = target.model.global_namespaces.clone();
            if let Some(tns) = &effective_tns {
                namespaces.insert(TNS_KEY.to_string(), tns.clone());
            }
            let mut fragment = target.model.root.clone();
            fragment.provenance = Some(Provenance {
                origin: work.origin,
                file: locations::short_name(&work.location).to_string(),
                namespaces,
                target_namespace: effective_tns.clone(),
            });
            push_schema_fragment(composite, fragment);
            merge_namespaces(global, &target.model.global_namespaces);

            enqueue_schema_references(
                &target.model.root,
                &work.location,
                effective_tns,
                false,
                work.depth + 1,
                &mut queue,
            );
        }
        Ok(())
    }

    /// Enforce the xsd:import / xsd:include namespace contracts
    fn check_schema_namespace(
        &self,
        work: &SchemaWork,
        target_tns: Option<String>,
        diags: &mut Diagnostics,
    ) -> Result<Option<String>> {
        match work.origin {
            Origin::Include => {
                // Include target must match the includer's namespace or have
                // none at all (chameleon include, silent inherit).
                match (&work.referent_tns, &target_tns) {
                    (Some(ours), Some(theirs)) if ours != theirs => {
                        Err(Error::Namespace(format!(
                            "included schema '{}' declares target namespace '{}' but the including schema declares '{}'",
                            work.location, theirs, ours
                        )))
                    }
                    (Some(ours), None) => Ok(Some(ours.clone())),
                    _ => Ok(target_tns),
                }
            }
            Origin::Import => {
                if let (Some(declared), Some(actual)) =
                    (&work.declared_namespace, &target_tns)
                {
                    if declared != actual {
                        return Err(Error::Namespace(format!(
                            "imported schema '{}' declares target namespace '{}' but the import expects '{}'",
                            work.location, actual, declared
                        )));
                    }
                }
                match (&work.referent_tns, &target_tns) {
                    (Some(ours), Some(theirs)) if ours == theirs => {
                        if work.in_wsdl_types {
                            // WS-I tolerates same-namespace imports inside a
                            // WSDL types section.
                            diags.info(
                                format!(
                                    "schema '{}' imported into its own namespace '{}' inside a WSDL types section",
                                    work.location, ours
                                ),
                                None,
                            );
                            Ok(target_tns)
                        } else {
                            Err(Error::Namespace(format!(
                                "schema '{}' cannot import '{}' into its own target namespace '{}'",
                                work.location, ours, ours
                            )))
                        }
                    }
                    _ => Ok(target_tns),
                }
            }
        }
    }
}

/// The imported document's target namespace, when asserted
fn tns_of(model: &Model) -> Option<String> {
    model
        .root
        .namespaces
        .as_ref()
        .and_then(|ns| ns.get(TNS_KEY))
        .cloned()
}

/// `(namespace, normalized location)` of each wsdl:import on a definitions node
fn wsdl_import_decls(
    definitions: &ModelNode,
    owner_location: &str,
) -> Vec<(Option<String>, Option<String>)> {
    definitions
        .get("import")
        .map(|v| v.nodes())
        .unwrap_or_default()
        .into_iter()
        .map(|import| {
            (
                import.attributes.get("namespace").cloned(),
                import
                    .attributes
                    .get("location")
                    .map(|loc| locations::normalize(owner_location, loc)),
            )
        })
        .collect()
}

/// The schema fragments under a `types` value
fn schema_fragments(types: &Value) -> Vec<&ModelNode> {
    types
        .nodes()
        .into_iter()
        .flat_map(|t| t.get("schema").map(|v| v.nodes()).unwrap_or_default())
        .collect()
}

/// Queue the schema references of every fragment under a definitions node's
/// types section
fn enqueue_types_references(
    definitions: &ModelNode,
    owner_location: &str,
    depth: usize,
    queue: &mut VecDeque<SchemaWork>,
) {
    if let Some(types) = definitions.get("types") {
        for schema in schema_fragments(types) {
            let tns = schema
                .namespaces
                .as_ref()
                .and_then(|ns| ns.get(TNS_KEY))
                .cloned();
            enqueue_schema_references(schema, owner_location, tns, true, depth, queue);
        }
    }
}

/// Queue one schema node's import/include/redefine references
fn enqueue_schema_references(
    schema: &ModelNode,
    owner_location: &str,
    schema_tns: Option<String>,
    in_wsdl_types: bool,
    depth: usize,
    queue: &mut VecDeque<SchemaWork>,
) {
    let refs = [
        ("import", Origin::Import),
        ("include", Origin::Include),
        // redefine follows include's namespace rules
        ("redefine", Origin::Include),
    ];
    for (key, origin) in refs {
        for node in schema.get(key).map(|v| v.nodes()).unwrap_or_default() {
            let location = match node.attributes.get("schemaLocation") {
                Some(loc) => locations::normalize(owner_location, loc),
                None => continue,
            };
            queue.push_back(SchemaWork {
                origin,
                declared_namespace: node.attributes.get("namespace").cloned(),
                location,
                referent_tns: schema_tns.clone(),
                in_wsdl_types,
                depth,
            });
        }
    }
}

/// Append a schema fragment under the composite's types section
fn push_schema_fragment(composite: &mut ModelNode, fragment: ModelNode) {
    let types = composite
        .entries
        .entry("types".to_string())
        .or_insert(Value::Null);
    if !matches!(types, Value::Node(_)) {
        let mut node = ModelNode::default();
        node.qname = Some("wsdl_types".to_string());
        *types = Value::Node(node);
    }
    let types_node = match types {
        Value::Node(node) => node,
        _ => unreachable!("types coerced to a node above"),
    };
    match types_node.entries.get_mut("schema") {
        Some(Value::Many(fragments)) => fragments.push(fragment),
        Some(existing @ Value::Node(_)) => {
            let first = match std::mem::replace(existing, Value::Null) {
                Value::Node(first) => first,
                _ => unreachable!("matched Value::Node above"),
            };
            *existing = Value::Many(vec![first, fragment]);
        }
        _ => {
            types_node
                .entries
                .insert("schema".to_string(), Value::Node(fragment));
        }
    }
}

/// Copy or append an imported entry into the composite, annotating each
/// array element with its provenance
fn append_entries(composite: &mut ModelNode, key: &str, value: &Value, provenance: &Provenance) {
    let mut incoming: Vec<ModelNode> = value
        .nodes()
        .into_iter()
        .map(|node| {
            let mut node = node.clone();
            node.provenance = Some(provenance.clone());
            node
        })
        .collect();
    if incoming.is_empty() {
        // Text and Null values copy wholesale when the key is absent.
        if !composite.entries.contains_key(key) {
            composite.entries.insert(key.to_string(), value.clone());
        }
        return;
    }
    match composite.entries.get_mut(key) {
        Some(Value::Many(nodes)) => nodes.append(&mut incoming),
        Some(existing @ Value::Node(_)) => {
            let first = match std::mem::replace(existing, Value::Null) {
                Value::Node(first) => first,
                _ => unreachable!("matched Value::Node above"),
            };
            let mut nodes = vec![first];
            nodes.append(&mut incoming);
            *existing = Value::Many(nodes);
        }
        _ => {
            let value = if incoming.len() == 1 {
                match incoming.pop() {
                    Some(node) => Value::Node(node),
                    None => unreachable!("length checked above"),
                }
            } else {
                Value::Many(incoming)
            };
            composite.entries.insert(key.to_string(), value);
        }
    }
}

/// Merge prefix bindings, keeping the first binding of each prefix
fn merge_namespaces(into: &mut NamespaceMap, from: &NamespaceMap) {
    for (prefix, uri) in from {
        into.entry(prefix.clone()).or_insert_with(|| uri.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::MemorySupply;

    const WSDL: &str = "http://schemas.xmlsoap.org/wsdl/";
    const XSD: &str = "http://www.w3.org/2001/XMLSchema";
    const SOAP11: &str = "http://schemas.xmlsoap.org/wsdl/soap/";

    fn merge_one(supply: &MemorySupply, root: &str) -> (MergedModel, Diagnostics) {
        let outcome =
            resolve_and_merge(&[root.to_string()], supply, Limits::default()).unwrap();
        assert_eq!(
            outcome.models.len(),
            1,
            "{:?}",
            outcome.diagnostics.entries()
        );
        let mut models = outcome.models;
        match models.pop() {
            Some(model) => (model, outcome.diagnostics),
            None => unreachable!("length asserted above"),
        }
    }

    #[test]
    fn test_service_summary() {
        let supply = MemorySupply::new().with_file(
            "svc.wsdl",
            format!(
                r#"<wsdl:definitions xmlns:wsdl="{WSDL}" xmlns:soap="{SOAP11}"
                        xmlns:tns="urn:svc" targetNamespace="urn:svc">
                    <wsdl:portType name="PT">
                        <wsdl:operation name="submit"><wsdl:input message="tns:In"/></wsdl:operation>
                    </wsdl:portType>
                    <wsdl:binding name="B" type="tns:PT">
                        <soap:binding transport="http://schemas.xmlsoap.org/soap/http"/>
                        <wsdl:operation name="submit">
                            <wsdl:input><soap:body use="literal"/></wsdl:input>
                        </wsdl:operation>
                    </wsdl:binding>
                    <wsdl:service name="S">
                        <wsdl:port name="p" binding="tns:B">
                            <soap:address location="http://example.org/s"/>
                        </wsdl:port>
                    </wsdl:service>
                </wsdl:definitions>"#
            ),
        );
        let (model, _) = merge_one(&supply, "svc.wsdl");

        let summary = model.service_summary();
        assert_eq!(
            summary,
            vec![ServiceSummary {
                name: "S".to_string(),
                ports: vec![PortSummary {
                    name: "p".to_string(),
                    binding: "B".to_string(),
                    operations: vec!["submit".to_string()],
                }],
            }]
        );
    }

    #[test]
    fn test_bare_schema_gets_synthetic_wrapper() {
        let supply = MemorySupply::new().with_file(
            "t.xsd",
            format!(
                r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="urn:t">
                    <xsd:element name="e" type="xsd:string"/>
                </xsd:schema>"#
            ),
        );
        let (model, _) = merge_one(&supply, "t.xsd");

        assert!(model.bare_schema);
        assert_eq!(model.definitions.qname.as_deref(), Some("wsdl_definitions"));
        let types = model.definitions.get("types").unwrap().as_node().unwrap();
        let schema = types.get("schema").unwrap().as_node().unwrap();
        assert_eq!(schema.target_namespace(), Some("urn:t"));
    }

    #[test]
    fn test_wsdl_import_namespace_mismatch_is_fatal() {
        let supply = MemorySupply::new()
            .with_file(
                "a.wsdl",
                format!(
                    r#"<wsdl:definitions xmlns:wsdl="{WSDL}" targetNamespace="urn:a">
                        <wsdl:import namespace="urn:expected" location="b.wsdl"/>
                    </wsdl:definitions>"#
                ),
            )
            .with_file(
                "b.wsdl",
                format!(
                    r#"<wsdl:definitions xmlns:wsdl="{WSDL}" targetNamespace="urn:actual"/>"#
                ),
            );
        let outcome =
            resolve_and_merge(&["a.wsdl".to_string()], &supply, Limits::default()).unwrap();
        assert!(outcome.models.is_empty());
        assert!(outcome.diagnostics.has_errors_for("a.wsdl"));
    }

    #[test]
    fn test_chameleon_wsdl_import_warns_and_inherits() {
        let supply = MemorySupply::new()
            .with_file(
                "a.wsdl",
                format!(
                    r#"<wsdl:definitions xmlns:wsdl="{WSDL}" targetNamespace="urn:a">
                        <wsdl:import namespace="urn:assumed" location="b.wsdl"/>
                        <wsdl:types/>
                    </wsdl:definitions>"#
                ),
            )
            .with_file(
                "b.wsdl",
                format!(
                    r#"<wsdl:definitions xmlns:wsdl="{WSDL}">
                        <wsdl:message name="M"><wsdl:part name="p"/></wsdl:message>
                    </wsdl:definitions>"#
                ),
            );
        let (model, diags) = merge_one(&supply, "a.wsdl");

        assert!(diags
            .entries()
            .iter()
            .any(|d| d.severity == crate::diagnostics::Severity::Warning
                && d.message.contains("urn:assumed")));
        let message = model.definitions.get("message").unwrap().as_node().unwrap();
        let provenance = message.provenance.as_ref().unwrap();
        assert_eq!(provenance.origin, Origin::Import);
        assert_eq!(provenance.target_namespace.as_deref(), Some("urn:assumed"));
    }

    #[test]
    fn test_wsdl_import_of_schema_accepted_with_diagnostic() {
        let supply = MemorySupply::new()
            .with_file(
                "a.wsdl",
                format!(
                    r#"<wsdl:definitions xmlns:wsdl="{WSDL}" targetNamespace="urn:a">
                        <wsdl:import namespace="urn:t" location="t.xsd"/>
                    </wsdl:definitions>"#
                ),
            )
            .with_file(
                "t.xsd",
                format!(
                    r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="urn:t">
                        <xsd:element name="e" type="xsd:string"/>
                    </xsd:schema>"#
                ),
            );
        let (model, diags) = merge_one(&supply, "a.wsdl");

        assert!(diags
            .entries()
            .iter()
            .any(|d| d.message.contains("non-conformant but accepted")));
        let types = model.definitions.get("types").unwrap().as_node().unwrap();
        let schema = types.get("schema").unwrap().as_node().unwrap();
        let provenance = schema.provenance.as_ref().unwrap();
        assert_eq!(provenance.file, "t.xsd");
        assert_eq!(provenance.origin, Origin::Import);
    }

    #[test]
    fn test_import_declarations_not_kept_in_composite() {
        let supply = MemorySupply::new()
            .with_file(
                "a.wsdl",
                format!(
                    r#"<wsdl:definitions xmlns:wsdl="{WSDL}" targetNamespace="urn:a">
                        <wsdl:import namespace="urn:b" location="b.wsdl"/>
                    </wsdl:definitions>"#
                ),
            )
            .with_file(
                "b.wsdl",
                format!(
                    r#"<wsdl:definitions xmlns:wsdl="{WSDL}" targetNamespace="urn:b">
                        <wsdl:message name="M"><wsdl:part name="p"/></wsdl:message>
                    </wsdl:definitions>"#
                ),
            );
        let (model, _) = merge_one(&supply, "a.wsdl");

        assert!(model.definitions.get("import").is_none());
        assert!(model.definitions.get("message").is_some());
    }

    #[test]
    fn test_fatal_violation_in_referenced_file_is_a_grammar_error() {
        let supply = MemorySupply::new()
            .with_file(
                "a.wsdl",
                format!(
                    r#"<wsdl:definitions xmlns:wsdl="{WSDL}" targetNamespace="urn:a">
                        <wsdl:import namespace="urn:b" location="bad.wsdl"/>
                    </wsdl:definitions>"#
                ),
            )
            .with_file(
                "bad.wsdl",
                format!(
                    r#"<wsdl:definitions xmlns:wsdl="{WSDL}" targetNamespace="urn:b">
                        <wsdl:part name="stray"/>
                    </wsdl:definitions>"#
                ),
            );
        let mut diags = Diagnostics::new();
        let resolution = Resolver::new(&supply)
            .resolve(&["a.wsdl".to_string()], &mut diags)
            .unwrap();
        let merger = Merger::new(&resolution);

        let err = merger.merge_root("a.wsdl", &mut diags).unwrap_err();
        assert!(matches!(err, Error::Grammar(_)));
        assert!(format!("{}", err).contains("R2029"));
        assert!(format!("{}", err).contains("bad.wsdl"));
    }

    #[test]
    fn test_same_namespace_import_fatal_outside_wsdl_types() {
        let supply = MemorySupply::new()
            .with_file(
                "a.xsd",
                format!(
                    r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="urn:x">
                        <xsd:import namespace="urn:x" schemaLocation="b.xsd"/>
                    </xsd:schema>"#
                ),
            )
            .with_file(
                "b.xsd",
                format!(r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="urn:x"/>"#),
            );
        let outcome =
            resolve_and_merge(&["a.xsd".to_string()], &supply, Limits::default()).unwrap();
        assert!(outcome.models.is_empty());
        assert!(outcome.diagnostics.has_errors());
    }
}
