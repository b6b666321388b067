use anyhow::Result;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::index::{ApiIndex, InterfaceApi, RecordApi};

/// Result of a reachability run: the visited type set plus the edges that
/// were used to reach it. Recomputed fully on every run; nothing is cached.
#[derive(Debug, Default)]
pub struct ReachabilityAnalysis {
    pub reachable: HashSet<String>,
    /// interface name -> record types whose method-name set covers it
    pub interface_implementers: HashMap<String, Vec<String>>,
    /// type name -> type names found in its signatures, fields and embeds
    pub references: HashMap<String, HashSet<String>>,
    pub roots: Vec<String>,
}

pub struct ReachabilityAnalyzer {
    identifier: Regex,
}

impl ReachabilityAnalyzer {
    pub fn new() -> Result<Self> {
        let identifier = Regex::new(r"[A-Za-z_][A-Za-z0-9_]*")
            .map_err(|e| anyhow::anyhow!("Failed to compile identifier pattern: {}", e))?;
        Ok(Self { identifier })
    }

    /// Compute the set of types reachable from the library's entry points,
    /// walking explicit signature references and structural interface edges.
    pub fn analyze(&self, index: &ApiIndex) -> ReachabilityAnalysis {
        let all_records: Vec<&RecordApi> = index.records().collect();
        let all_interfaces: Vec<&InterfaceApi> = index.interfaces().collect();
        let all_type_names = index.type_names();

        let interface_implementers =
            compute_structural_edges(&all_records, &all_interfaces);

        let mut references: HashMap<String, HashSet<String>> = HashMap::new();
        for record in &all_records {
            references.insert(
                record.name.clone(),
                self.referenced_types_for_record(record, &all_type_names),
            );
        }
        for iface in &all_interfaces {
            references.insert(
                iface.name.clone(),
                self.referenced_types_for_interface(iface, &all_type_names),
            );
        }

        // Inbound reference counts, self-references skipped
        let mut referenced_by: HashMap<&str, usize> = HashMap::new();
        for (type_name, refs) in &references {
            for reference in refs {
                if reference != type_name {
                    *referenced_by.entry(reference.as_str()).or_insert(0) += 1;
                }
            }
        }

        let mut operation_types: HashSet<&str> = HashSet::new();
        for record in &all_records {
            if record.is_operation_holder() {
                operation_types.insert(record.name.as_str());
            }
        }
        for iface in &all_interfaces {
            if iface.is_operation_holder() {
                operation_types.insert(iface.name.as_str());
            }
        }

        let references_operations = |name: &str| -> bool {
            references
                .get(name)
                .map(|refs| refs.iter().any(|r| operation_types.contains(r.as_str())))
                .unwrap_or(false)
        };

        // Root selection. Interfaces never seed the search: only records (or,
        // in the relaxed pass, any record touching an operation holder) do.
        let mut roots: Vec<String> = all_records
            .iter()
            .filter(|r| {
                let is_referenced = referenced_by.contains_key(r.name.as_str());
                r.has_explicit_entry_point()
                    || (!is_referenced
                        && (r.is_operation_holder() || references_operations(&r.name)))
            })
            .map(|r| r.name.clone())
            .collect();

        if roots.is_empty() {
            // Relaxed second pass for libraries without entry-point metadata
            roots = all_records
                .iter()
                .filter(|r| r.is_operation_holder() || references_operations(&r.name))
                .map(|r| r.name.clone())
                .collect();
        }

        // Breadth-first traversal; cycles terminate on the visited check.
        let mut reachable: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        for root in &roots {
            if reachable.insert(root.clone()) {
                queue.push_back(root.clone());
            }
        }

        while let Some(current) = queue.pop_front() {
            if let Some(refs) = references.get(&current) {
                for reference in refs {
                    if reachable.insert(reference.clone()) {
                        queue.push_back(reference.clone());
                    }
                }
            }
            if let Some(implementers) = interface_implementers.get(&current) {
                for implementer in implementers {
                    if reachable.insert(implementer.clone()) {
                        queue.push_back(implementer.clone());
                    }
                }
            }
        }

        ReachabilityAnalysis {
            reachable,
            interface_implementers,
            references,
            roots,
        }
    }

    fn referenced_types_for_record(
        &self,
        record: &RecordApi,
        all_type_names: &HashSet<String>,
    ) -> HashSet<String> {
        let mut tokens = HashSet::new();
        for method in &record.methods {
            self.tokenize_into(&method.sig, &mut tokens);
            self.tokenize_into(&method.ret, &mut tokens);
        }
        for field in &record.fields {
            self.tokenize_into(&field.field_type, &mut tokens);
        }
        for embed in record.embeds.iter().chain(record.implements.iter()) {
            self.tokenize_into(embed, &mut tokens);
        }
        tokens.retain(|t| all_type_names.contains(t));
        tokens
    }

    fn referenced_types_for_interface(
        &self,
        iface: &InterfaceApi,
        all_type_names: &HashSet<String>,
    ) -> HashSet<String> {
        let mut tokens = HashSet::new();
        for method in &iface.methods {
            self.tokenize_into(&method.sig, &mut tokens);
            self.tokenize_into(&method.ret, &mut tokens);
        }
        for embed in &iface.embeds {
            self.tokenize_into(embed, &mut tokens);
        }
        tokens.retain(|t| all_type_names.contains(t));
        tokens
    }

    fn tokenize_into(&self, text: &str, tokens: &mut HashSet<String>) {
        if text.is_empty() {
            return;
        }
        for m in self.identifier.find_iter(text) {
            tokens.insert(m.as_str().to_string());
        }
    }
}

/// Duck-typed interface conformance: a record implements an interface iff its
/// method-name set is a superset of the interface's method-name set.
/// Signatures are not compared, so two interfaces sharing a method name by
/// coincidence can produce a false-positive edge. That leniency is the policy
/// here, not an accident; tightening it would mark samples uncovered that a
/// human reader would accept.
fn compute_structural_edges(
    records: &[&RecordApi],
    interfaces: &[&InterfaceApi],
) -> HashMap<String, Vec<String>> {
    let mut edges: HashMap<String, Vec<String>> = HashMap::new();

    for iface in interfaces {
        let iface_methods: HashSet<&str> =
            iface.methods.iter().map(|m| m.name.as_str()).collect();
        if iface_methods.is_empty() {
            continue;
        }

        for record in records {
            let record_methods: HashSet<&str> =
                record.methods.iter().map(|m| m.name.as_str()).collect();
            if iface_methods.is_subset(&record_methods) {
                edges
                    .entry(iface.name.clone())
                    .or_default()
                    .push(record.name.clone());
            }
        }
    }

    edges
}

/// The client-facing slice of a reachability result: reachable types that
/// actually hold operations, plus the name set used for call-site inference.
#[derive(Debug, Default)]
pub struct ClientSurface {
    /// client type -> operation name -> display signature
    pub operations: BTreeMap<String, BTreeMap<String, String>>,
    /// Names usable during type inference. Superset of the operation holders:
    /// also contains reachable records whose fields point at a client type,
    /// so container types can anchor member-access resolution.
    pub inference_names: HashSet<String>,
    pub interface_implementers: HashMap<String, Vec<String>>,
    pub implementer_interfaces: HashMap<String, Vec<String>>,
}

impl ClientSurface {
    pub fn from_analysis(index: &ApiIndex, analysis: &ReachabilityAnalysis) -> Self {
        let mut operations: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();

        for record in index.records() {
            if analysis.reachable.contains(&record.name) && record.is_operation_holder() {
                operations.entry(record.name.clone()).or_insert_with(|| {
                    record
                        .methods
                        .iter()
                        .map(|m| (m.name.clone(), m.display_signature()))
                        .collect()
                });
            }
        }
        for iface in index.interfaces() {
            if analysis.reachable.contains(&iface.name) && iface.is_operation_holder() {
                operations.entry(iface.name.clone()).or_insert_with(|| {
                    iface
                        .methods
                        .iter()
                        .map(|m| (m.name.clone(), m.display_signature()))
                        .collect()
                });
            }
        }

        let mut inference_names: HashSet<String> = operations.keys().cloned().collect();

        // Container expansion: a reachable record whose field holds a client
        // type participates in inference even without operations of its own.
        for record in index.records() {
            if !analysis.reachable.contains(&record.name)
                || inference_names.contains(&record.name)
            {
                continue;
            }
            let holds_client = record.fields.iter().any(|f| {
                let field_type = crate::coverage::normalize_type_text(&f.field_type);
                inference_names.contains(&field_type)
            });
            if holds_client {
                inference_names.insert(record.name.clone());
            }
        }

        let mut implementer_interfaces: HashMap<String, Vec<String>> = HashMap::new();
        for (iface, implementers) in &analysis.interface_implementers {
            for implementer in implementers {
                implementer_interfaces
                    .entry(implementer.clone())
                    .or_default()
                    .push(iface.clone());
            }
        }

        Self {
            operations,
            inference_names,
            interface_implementers: analysis.interface_implementers.clone(),
            implementer_interfaces,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn contains_operation(&self, type_name: &str, operation: &str) -> bool {
        self.operations
            .get(type_name)
            .map(|ops| ops.contains_key(operation))
            .unwrap_or(false)
    }

    pub fn operation_count(&self) -> usize {
        self.operations.values().map(|ops| ops.len()).sum()
    }
}
