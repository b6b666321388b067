use std::collections::HashMap;

use crate::index::ApiIndex;
use crate::reachability::ClientSurface;
use crate::samples::model::{Binding, SampleExpr, SampleFile};

/// Wrapper type names whose first (or, for Coroutine, last) argument is the
/// payload. Covers the async and container spellings the per-language front
/// ends emit; unknown wrappers just lose their generic arguments.
const UNWRAP_FIRST: &[&str] = &[
    "Awaitable",
    "Task",
    "Future",
    "Promise",
    "AsyncIterator",
    "AsyncIterable",
    "Optional",
    "Option",
    "Result",
    "Box",
    "Arc",
    "Rc",
    "Vec",
    "List",
];

/// Normalize a raw type-reference string down to a bare type name:
/// strips pointer/slice/ref sigils, multi-return tuples, async and container
/// wrappers, and generic argument lists. `"(*BlobClient, error)"` and
/// `"Awaitable[BlobClient]"` both normalize to `"BlobClient"`.
pub fn normalize_type_text(raw: &str) -> String {
    let mut text = raw.trim();

    // Multi-return tuple: take the first element
    if text.starts_with('(') && text.ends_with(')') && text.len() > 2 {
        let inner = &text[1..text.len() - 1];
        text = inner.split(',').next().unwrap_or(inner).trim();
    }

    // Sigil prefixes, possibly stacked: *[]&mut
    loop {
        let stripped = text
            .strip_prefix('*')
            .or_else(|| text.strip_prefix('&'))
            .or_else(|| text.strip_prefix("[]"))
            .or_else(|| text.strip_prefix("mut "))
            .or_else(|| text.strip_prefix("dyn "))
            .or_else(|| text.strip_prefix("impl "));
        match stripped {
            Some(rest) => text = rest.trim_start(),
            None => break,
        }
    }

    // Wrapper unwrapping, repeated for nesting like Task<Option<T>>
    let mut owned = text.to_string();
    loop {
        let unwrapped = unwrap_once(&owned);
        if unwrapped == owned {
            break;
        }
        owned = unwrapped;
    }

    // Whatever generic arguments remain are not part of the name
    if let Some(idx) = owned.find(['[', '<']) {
        if idx > 0 {
            owned.truncate(idx);
        }
    }

    owned.trim().to_string()
}

fn unwrap_once(text: &str) -> String {
    let text = text.trim();
    for (open, close) in [('[', ']'), ('<', '>')] {
        if !text.ends_with(close) {
            continue;
        }
        let Some(idx) = text.find(open) else { continue };
        let name = &text[..idx];
        let inner = &text[idx + 1..text.len() - 1];

        if name == "Coroutine" {
            // Coroutine[Any, Any, X] -> X
            if let Some(last) = inner.rsplit(',').next() {
                return strip_sigils(last.trim()).to_string();
            }
        }
        if UNWRAP_FIRST.contains(&name) {
            let first = split_top_level(inner).into_iter().next().unwrap_or(inner);
            return strip_sigils(first.trim()).to_string();
        }
    }
    text.to_string()
}

fn strip_sigils(text: &str) -> &str {
    let mut text = text;
    loop {
        let stripped = text
            .strip_prefix('*')
            .or_else(|| text.strip_prefix('&'))
            .or_else(|| text.strip_prefix("[]"))
            .or_else(|| text.strip_prefix("mut "))
            .or_else(|| text.strip_prefix("dyn "))
            .or_else(|| text.strip_prefix("impl "));
        match stripped {
            Some(rest) => text = rest.trim_start(),
            None => return text,
        }
    }
}

/// Split generic arguments at top-level commas only, so
/// `Map<String, Widget>, error` keeps the map intact.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, ch) in text.char_indices() {
        match ch {
            '[' | '<' | '(' => depth += 1,
            ']' | '>' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// The three lookup tables behind call-site resolution, built once per
/// analysis run and scoped to the known client names so resolution never
/// needs live type-checking.
#[derive(Debug, Default)]
pub struct ResolutionTables {
    /// "OwnerType.method" -> client type the method returns
    pub method_returns: HashMap<String, String>,
    /// free function name -> client type it returns
    pub function_returns: HashMap<String, String>,
    /// "OwnerType.member" -> client type of the field/property
    pub field_types: HashMap<String, String>,
}

impl ResolutionTables {
    pub fn build(index: &ApiIndex, surface: &ClientSurface) -> Self {
        let mut tables = Self::default();
        let known = &surface.inference_names;

        for record in index.records() {
            for method in &record.methods {
                if method.ret.is_empty() {
                    continue;
                }
                let ret = normalize_type_text(&method.ret);
                if known.contains(&ret) {
                    tables
                        .method_returns
                        .insert(format!("{}.{}", record.name, method.name), ret);
                }
            }
            for field in &record.fields {
                let field_type = normalize_type_text(&field.field_type);
                if known.contains(&field_type) {
                    tables
                        .field_types
                        .insert(format!("{}.{}", record.name, field.name), field_type);
                }
            }
        }

        for iface in index.interfaces() {
            for method in &iface.methods {
                if method.ret.is_empty() {
                    continue;
                }
                let ret = normalize_type_text(&method.ret);
                if known.contains(&ret) {
                    tables
                        .method_returns
                        .insert(format!("{}.{}", iface.name, method.name), ret);
                }
            }
        }

        for function in index.functions() {
            if function.ret.is_empty() {
                continue;
            }
            let ret = normalize_type_text(&function.ret);
            if known.contains(&ret) {
                tables.function_returns.insert(function.name.clone(), ret);
            }
        }

        tables
    }
}

/// Per-file local-variable resolver: one linear pass over bindings in source
/// order, then receiver lookups during the call-site scan. Rebuilt per file,
/// never shared. "Unresolved" is an explicit `None`.
pub struct FileTypeResolver<'a> {
    surface: &'a ClientSurface,
    tables: &'a ResolutionTables,
    locals: HashMap<String, String>,
}

impl<'a> FileTypeResolver<'a> {
    pub fn new(surface: &'a ClientSurface, tables: &'a ResolutionTables) -> Self {
        Self {
            surface,
            tables,
            locals: HashMap::new(),
        }
    }

    /// Process every binding in source order. Later bindings may depend on
    /// earlier ones; no fixed-point iteration is performed.
    pub fn bind_file(&mut self, file: &SampleFile) {
        for binding in &file.bindings {
            self.bind(binding);
        }
    }

    fn bind(&mut self, binding: &Binding) {
        // Rule 1: explicit annotation naming a known client type
        if let Some(annotation) = &binding.annotation {
            let type_name = normalize_type_text(annotation);
            if self.surface.inference_names.contains(&type_name) {
                self.locals.insert(binding.name.clone(), type_name);
                return;
            }
        }

        if let Some(value) = &binding.value {
            if let Some(resolved) = self.resolve_expr(value) {
                self.locals.insert(binding.name.clone(), resolved);
            }
        }
    }

    /// Resolve a binding initializer. Rules fire in priority order; each only
    /// runs when the expression has the matching shape.
    pub fn resolve_expr(&self, expr: &SampleExpr) -> Option<String> {
        match expr {
            // Rule 2: direct construction
            SampleExpr::Construct { type_name } => {
                let type_name = normalize_type_text(type_name);
                self.surface
                    .inference_names
                    .contains(&type_name)
                    .then_some(type_name)
            }

            // Rule 3: free function with a known return type
            SampleExpr::FunctionCall { function } => {
                self.tables.function_returns.get(function).cloned()
            }

            // Rules 4-6: method calls, including one level of chaining
            SampleExpr::MethodCall { receiver, method } => {
                self.call_return_type(receiver, method)
            }

            // Rule 7: member access on a tracked receiver
            SampleExpr::MemberAccess { receiver, member } => {
                let owner = self.receiver_name(receiver)?;
                self.tables
                    .field_types
                    .get(&format!("{}.{}", owner, member))
                    .cloned()
            }

            // Rule 8: cast naming a known client type
            SampleExpr::Cast { type_name, .. } => {
                let type_name = normalize_type_text(type_name);
                self.surface
                    .inference_names
                    .contains(&type_name)
                    .then_some(type_name)
            }

            // Rule 9: bare identifier that is itself a client type name
            SampleExpr::Identifier(name) => self
                .surface
                .inference_names
                .contains(name)
                .then(|| name.clone()),
        }
    }

    /// Resolve the receiver of a call site to a client type, if possible.
    /// Handles tracked locals, static-class references, one-level call
    /// chains, and member-access receivers; anything else is unresolved.
    pub fn resolve_receiver(&self, receiver: &SampleExpr) -> Option<String> {
        match receiver {
            SampleExpr::Identifier(name) => {
                if let Some(local) = self.locals.get(name) {
                    return Some(local.clone());
                }
                self.surface
                    .inference_names
                    .contains(name)
                    .then(|| name.clone())
            }

            // One-level chain: recv.method1().method2() resolves method1's
            // return type first; deeper chains are out of scope.
            SampleExpr::MethodCall { receiver, method } => {
                self.call_return_type(receiver, method)
            }

            SampleExpr::MemberAccess { receiver, member } => {
                let owner = self.receiver_name(receiver)?;
                self.tables
                    .field_types
                    .get(&format!("{}.{}", owner, member))
                    .cloned()
            }

            SampleExpr::Cast { type_name, .. } => {
                let type_name = normalize_type_text(type_name);
                self.surface
                    .inference_names
                    .contains(&type_name)
                    .then_some(type_name)
            }

            _ => None,
        }
    }

    /// Return type of `receiver.method(...)` where the receiver resolves in a
    /// single step (no nested chains).
    fn call_return_type(&self, receiver: &SampleExpr, method: &str) -> Option<String> {
        let SampleExpr::Identifier(name) = receiver else {
            return None;
        };

        // Static factory: ClientType.method(...). When the index has no
        // return mapping the call is assumed to yield (or configure) the
        // owning type itself; that leniency is deliberate.
        if self.surface.inference_names.contains(name) {
            return Some(
                self.tables
                    .method_returns
                    .get(&format!("{}.{}", name, method))
                    .cloned()
                    .unwrap_or_else(|| name.clone()),
            );
        }

        // Instance method on a tracked local
        let receiver_type = self.locals.get(name)?;
        self.tables
            .method_returns
            .get(&format!("{}.{}", receiver_type, method))
            .cloned()
    }

    fn receiver_name(&self, receiver: &SampleExpr) -> Option<String> {
        match receiver {
            SampleExpr::Identifier(name) => self.locals.get(name).cloned(),
            _ => None,
        }
    }

    pub fn local_type(&self, name: &str) -> Option<&String> {
        self.locals.get(name)
    }
}
