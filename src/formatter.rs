use std::collections::{HashMap, HashSet, VecDeque};

use crate::config::FormatterConfig;
use crate::coverage::UsageCoverageReport;
use crate::index::{ApiIndex, InterfaceApi, RecordApi};

const TRUNCATION_MARGIN: usize = 100;

const OPTIONS_SUFFIXES: &[&str] = &["Options", "Config", "Settings", "Params"];
const ERROR_SUFFIXES: &[&str] = &["Error", "Exception"];

/// Emission priority classes for the dependency closure. Lower emits first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum TypePriority {
    Client = 0,
    Options = 1,
    Error = 2,
    Model = 3,
    Other = 4,
}

#[derive(Debug, Clone)]
enum TypeDecl<'a> {
    Record(&'a RecordApi),
    Interface(&'a InterfaceApi),
}

/// Renders an ApiIndex, optionally filtered by a coverage report, into a
/// compact textual stub within a character budget. Components are emitted
/// whole or not at all.
pub struct SurfaceFormatter {
    char_budget: usize,
    max_covered_per_type: usize,
}

impl SurfaceFormatter {
    pub fn new(config: &FormatterConfig) -> Self {
        Self {
            char_budget: config.char_budget,
            max_covered_per_type: config.max_covered_per_type.max(1),
        }
    }

    pub fn render(&self, index: &ApiIndex, coverage: Option<&UsageCoverageReport>) -> String {
        let decls = declaration_map(index);
        let all_type_names: HashSet<&str> = decls.keys().copied().collect();

        let mut out = String::new();
        out.push_str(&format!("// {} - Public API Surface\n\n", index.package));

        // (a) compact digest of what samples already demonstrate
        if let Some(report) = coverage {
            let grouped = report.covered_by_type();
            if !grouped.is_empty() {
                out.push_str("// Already covered:\n");
                for (type_name, methods) in &grouped {
                    let shown: Vec<&str> =
                        methods.iter().take(self.max_covered_per_type).copied().collect();
                    let mut line = format!("//   {}: {}", type_name, shown.join(", "));
                    if methods.len() > shown.len() {
                        line.push_str(&format!(" (+{} more)", methods.len() - shown.len()));
                    }
                    line.push('\n');
                    out.push_str(&line);
                }
                out.push('\n');
            }
        }

        // (b) full declarations for every type with at least one uncovered
        // operation, filtered to the uncovered members
        let mut components: Vec<String> = Vec::new();
        let mut declared: Vec<&str> = Vec::new();

        match coverage {
            Some(report) => {
                for (type_name, uncovered) in report.uncovered_by_type() {
                    let Some(decl) = decls.get(type_name) else { continue };
                    let keep: HashSet<&str> =
                        uncovered.iter().map(|u| u.operation.as_str()).collect();
                    components.push(render_decl(decl, Some(&keep)));
                    declared.push(type_name);
                }
            }
            None => {
                // No coverage report: every operation holder is rendered whole
                for (name, decl) in sorted_decls(&decls) {
                    if decl_has_operations(decl) {
                        components.push(render_decl(decl, None));
                        declared.push(name);
                    }
                }
            }
        }

        // (c) transitive dependency closure of the declarations above,
        // ordered by distance, then declared priority, then name
        let client_names: HashSet<&str> = declared.iter().copied().collect();
        let closure = dependency_closure(&declared, &decls, &all_type_names);
        let mut closure: Vec<(usize, TypePriority, &str)> = closure
            .into_iter()
            .filter(|(_, name)| !client_names.contains(name))
            .map(|(depth, name)| (depth, classify(name, &decls, &client_names), name))
            .collect();
        closure.sort();

        for (_, _, name) in &closure {
            if let Some(decl) = decls.get(name) {
                components.push(render_decl(decl, None));
            }
        }

        // Budget loop: a component is included whole or not at all
        let limit = self.char_budget.saturating_sub(TRUNCATION_MARGIN);
        let mut emitted = 0usize;
        for component in &components {
            if out.len() + component.len() > limit {
                break;
            }
            out.push_str(component);
            emitted += 1;
        }
        if emitted < components.len() {
            out.push_str(&format!(
                "... truncated ({} items omitted)\n",
                components.len() - emitted
            ));
        }

        out
    }
}

fn declaration_map(index: &ApiIndex) -> HashMap<&str, TypeDecl<'_>> {
    let mut decls: HashMap<&str, TypeDecl<'_>> = HashMap::new();
    for record in index.records() {
        decls.insert(record.name.as_str(), TypeDecl::Record(record));
    }
    for iface in index.interfaces() {
        decls.insert(iface.name.as_str(), TypeDecl::Interface(iface));
    }
    for dep in &index.dependencies {
        for record in &dep.records {
            decls.entry(record.name.as_str()).or_insert(TypeDecl::Record(record));
        }
        for iface in &dep.interfaces {
            decls.entry(iface.name.as_str()).or_insert(TypeDecl::Interface(iface));
        }
    }
    decls
}

fn sorted_decls<'a>(
    decls: &'a HashMap<&'a str, TypeDecl<'a>>,
) -> Vec<(&'a str, &'a TypeDecl<'a>)> {
    let mut entries: Vec<(&str, &TypeDecl)> = decls.iter().map(|(n, d)| (*n, d)).collect();
    entries.sort_by_key(|(n, _)| *n);
    entries
}

fn decl_has_operations(decl: &TypeDecl) -> bool {
    match decl {
        TypeDecl::Record(r) => r.is_operation_holder(),
        TypeDecl::Interface(i) => i.is_operation_holder(),
    }
}

fn classify(name: &str, decls: &HashMap<&str, TypeDecl>, clients: &HashSet<&str>) -> TypePriority {
    if clients.contains(name) {
        return TypePriority::Client;
    }
    if OPTIONS_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        return TypePriority::Options;
    }
    if ERROR_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        return TypePriority::Error;
    }
    match decls.get(name) {
        Some(TypeDecl::Record(r)) if !r.fields.is_empty() && r.methods.is_empty() => {
            TypePriority::Model
        }
        _ => TypePriority::Other,
    }
}

/// Breadth-first closure over type names referenced from the given
/// declarations. Returns (distance, name) pairs; distance 1 is a direct
/// dependency of a client declaration.
fn dependency_closure<'a>(
    roots: &[&'a str],
    decls: &HashMap<&'a str, TypeDecl<'a>>,
    all_type_names: &HashSet<&'a str>,
) -> Vec<(usize, &'a str)> {
    let mut seen: HashSet<&str> = roots.iter().copied().collect();
    let mut queue: VecDeque<(usize, &str)> = roots.iter().map(|n| (0usize, *n)).collect();
    let mut result = Vec::new();

    while let Some((depth, name)) = queue.pop_front() {
        if depth > 0 {
            result.push((depth, name));
        }
        let Some(decl) = decls.get(name) else { continue };

        let mut tokens: HashSet<String> = HashSet::new();
        match decl {
            TypeDecl::Record(r) => {
                for m in &r.methods {
                    tokenize_into(&m.sig, &mut tokens);
                    tokenize_into(&m.ret, &mut tokens);
                }
                for f in &r.fields {
                    tokenize_into(&f.field_type, &mut tokens);
                }
                for e in r.embeds.iter().chain(r.implements.iter()) {
                    tokenize_into(e, &mut tokens);
                }
            }
            TypeDecl::Interface(i) => {
                for m in &i.methods {
                    tokenize_into(&m.sig, &mut tokens);
                    tokenize_into(&m.ret, &mut tokens);
                }
                for e in &i.embeds {
                    tokenize_into(e, &mut tokens);
                }
            }
        }

        for token in tokens {
            if let Some(&known) = all_type_names.get(token.as_str()) {
                if seen.insert(known) {
                    queue.push_back((depth + 1, known));
                }
            }
        }
    }

    result
}

/// Identifier-run scanner over signature text, the same tokenization the
/// reachability pass applies.
fn tokenize_into(text: &str, tokens: &mut HashSet<String>) {
    let mut start: Option<usize> = None;
    for (i, ch) in text.char_indices() {
        let is_ident = ch.is_ascii_alphanumeric() || ch == '_';
        match (is_ident, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                tokens.insert(text[s..i].to_string());
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.insert(text[s..].to_string());
    }
}

/// Stub rendering in the original engine's syntax. When `keep` is given,
/// only the named operations are shown.
fn render_decl(decl: &TypeDecl, keep: Option<&HashSet<&str>>) -> String {
    let mut out = String::new();
    match decl {
        TypeDecl::Record(record) => {
            if !record.doc.is_empty() {
                out.push_str(&format!("// {}\n", record.doc));
            }
            out.push_str(&format!("type {} struct {{\n", record.name));
            for field in &record.fields {
                out.push_str(&format!("    {} {}\n", field.name, field.field_type));
            }
            out.push_str("}\n");
            for method in &record.methods {
                if let Some(keep) = keep {
                    if !keep.contains(method.name.as_str()) {
                        continue;
                    }
                }
                let ret = if method.ret.is_empty() {
                    String::new()
                } else {
                    format!(" {}", method.ret)
                };
                out.push_str(&format!(
                    "func ({}) {}({}){}\n",
                    record.name, method.name, method.sig, ret
                ));
            }
            out.push('\n');
        }
        TypeDecl::Interface(iface) => {
            if !iface.doc.is_empty() {
                out.push_str(&format!("// {}\n", iface.doc));
            }
            out.push_str(&format!("type {} interface {{\n", iface.name));
            for method in &iface.methods {
                if let Some(keep) = keep {
                    if !keep.contains(method.name.as_str()) {
                        continue;
                    }
                }
                let ret = if method.ret.is_empty() {
                    String::new()
                } else {
                    format!(" {}", method.ret)
                };
                out.push_str(&format!("    {}({}){}\n", method.name, method.sig, ret));
            }
            out.push_str("}\n\n");
        }
    }
    out
}
