use anyhow::Result;
use std::path::Path;
use thiserror::Error;
use tree_sitter::{Node, Parser};

use crate::samples::model::{Binding, CallSite, SampleExpr, SampleFile};

/// Per-file walker failures. These are recoverable: the loader skips the
/// offending file and keeps going.
#[derive(Error, Debug)]
pub enum SampleWalkError {
    #[error("Failed to read sample file {0}: {1}")]
    Unreadable(String, std::io::Error),

    #[error("Failed to parse sample file {0}")]
    Unparseable(String),
}

/// Reference sample walker for Rust sources.
///
/// Turns a `.rs` file into the language-agnostic sample model: bindings from
/// `let` declarations and assignments, call sites from method and
/// path-qualified call expressions. Everything else in the tree is ignored.
pub struct RustSampleWalker {
    parser: Parser,
}

impl RustSampleWalker {
    pub fn new() -> Result<Self> {
        let language = tree_sitter_rust::language();
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| anyhow::anyhow!("Failed to set language: {}", e))?;

        Ok(Self { parser })
    }

    pub fn walk_file(&mut self, abs_path: &Path, rel_path: &Path) -> Result<SampleFile, SampleWalkError> {
        let source = std::fs::read_to_string(abs_path)
            .map_err(|e| SampleWalkError::Unreadable(abs_path.display().to_string(), e))?;
        self.walk_source(&source, rel_path)
    }

    pub fn walk_source(&mut self, source: &str, rel_path: &Path) -> Result<SampleFile, SampleWalkError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| SampleWalkError::Unparseable(rel_path.display().to_string()))?;

        let mut file = SampleFile::new(rel_path.to_path_buf());
        collect(tree.root_node(), source.as_bytes(), &mut file);
        Ok(file)
    }
}

fn collect(node: Node, source: &[u8], file: &mut SampleFile) {
    match node.kind() {
        "let_declaration" => {
            if let Some(binding) = extract_let(node, source) {
                file.bindings.push(binding);
            }
        }
        "assignment_expression" => {
            if let Some(binding) = extract_assignment(node, source) {
                file.bindings.push(binding);
            }
        }
        "call_expression" => {
            if let Some(call) = extract_call_site(node, source) {
                file.calls.push(call);
            }
        }
        _ => {}
    }

    // Keep walking: nested calls (e.g. the inner half of a chain) get their
    // own call sites, and bindings inside blocks are still bindings.
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect(child, source, file);
    }
}

fn extract_let(node: Node, source: &[u8]) -> Option<Binding> {
    let pattern = node.child_by_field_name("pattern")?;
    if pattern.kind() != "identifier" {
        return None; // tuple/struct patterns are out of model
    }
    let name = node_text(pattern, source)?;

    let annotation = node
        .child_by_field_name("type")
        .and_then(|t| node_text(t, source));

    let value = node
        .child_by_field_name("value")
        .and_then(|v| convert_expr(v, source));

    Some(Binding {
        name,
        annotation,
        value,
        line: node.start_position().row + 1,
    })
}

fn extract_assignment(node: Node, source: &[u8]) -> Option<Binding> {
    let left = node.child_by_field_name("left")?;
    if left.kind() != "identifier" {
        return None;
    }
    let name = node_text(left, source)?;
    let value = node
        .child_by_field_name("right")
        .and_then(|v| convert_expr(v, source));

    Some(Binding {
        name,
        annotation: None,
        value,
        line: node.start_position().row + 1,
    })
}

/// A call expression becomes a call site when it has a receiver: either
/// `recv.method(...)` or `Type::method(...)`. Bare function calls carry no
/// receiver and only matter as binding initializers.
fn extract_call_site(node: Node, source: &[u8]) -> Option<CallSite> {
    let function = unwrap_generic_function(node.child_by_field_name("function")?);
    let line = node.start_position().row + 1;

    match function.kind() {
        "field_expression" => {
            let receiver = convert_expr(function.child_by_field_name("value")?, source)?;
            let method = node_text(function.child_by_field_name("field")?, source)?;
            Some(CallSite { receiver, method, line })
        }
        "scoped_identifier" => {
            let (type_name, method) = split_scoped(function, source)?;
            Some(CallSite {
                receiver: SampleExpr::Identifier(type_name),
                method,
                line,
            })
        }
        _ => None,
    }
}

fn convert_expr(node: Node, source: &[u8]) -> Option<SampleExpr> {
    match node.kind() {
        "identifier" => Some(SampleExpr::Identifier(node_text(node, source)?)),
        "call_expression" => {
            let function = unwrap_generic_function(node.child_by_field_name("function")?);
            match function.kind() {
                "field_expression" => {
                    let receiver =
                        convert_expr(function.child_by_field_name("value")?, source)?;
                    let method = node_text(function.child_by_field_name("field")?, source)?;
                    Some(SampleExpr::MethodCall {
                        receiver: Box::new(receiver),
                        method,
                    })
                }
                "scoped_identifier" => {
                    let (type_name, method) = split_scoped(function, source)?;
                    Some(SampleExpr::MethodCall {
                        receiver: Box::new(SampleExpr::Identifier(type_name)),
                        method,
                    })
                }
                "identifier" => Some(SampleExpr::FunctionCall {
                    function: node_text(function, source)?,
                }),
                _ => None,
            }
        }
        "field_expression" => {
            let receiver = convert_expr(node.child_by_field_name("value")?, source)?;
            let member = node_text(node.child_by_field_name("field")?, source)?;
            Some(SampleExpr::MemberAccess {
                receiver: Box::new(receiver),
                member,
            })
        }
        "struct_expression" => {
            let type_node = node.child_by_field_name("name")?;
            Some(SampleExpr::Construct {
                type_name: node_text(type_node, source)?,
            })
        }
        "type_cast_expression" => {
            let inner = convert_expr(node.child_by_field_name("value")?, source)?;
            let type_name = node_text(node.child_by_field_name("type")?, source)?;
            Some(SampleExpr::Cast {
                inner: Box::new(inner),
                type_name,
            })
        }
        // Transparent wrappers: the interesting expression sits inside
        "reference_expression" | "unary_expression" => {
            convert_expr(node.child_by_field_name("value").or_else(|| last_named(node))?, source)
        }
        "parenthesized_expression" | "await_expression" | "try_expression" => {
            convert_expr(last_named(node)?, source)
        }
        _ => None,
    }
}

fn unwrap_generic_function(node: Node) -> Node {
    if node.kind() == "generic_function" {
        if let Some(inner) = node.child_by_field_name("function") {
            return inner;
        }
    }
    node
}

/// `Type::method` / `module::Type::method` -> (Type, method)
fn split_scoped(node: Node, source: &[u8]) -> Option<(String, String)> {
    let method = node_text(node.child_by_field_name("name")?, source)?;
    let path = node.child_by_field_name("path")?;
    let type_name = match path.kind() {
        "identifier" | "type_identifier" => node_text(path, source)?,
        "scoped_identifier" => node_text(path.child_by_field_name("name")?, source)?,
        _ => return None,
    };
    Some((type_name, method))
}

fn last_named(node: Node) -> Option<Node> {
    let count = node.named_child_count();
    if count == 0 {
        return None;
    }
    node.named_child(count - 1)
}

fn node_text(node: Node, source: &[u8]) -> Option<String> {
    node.utf8_text(source).ok().map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn walk(source: &str) -> SampleFile {
        let mut walker = RustSampleWalker::new().unwrap();
        walker.walk_source(source, &PathBuf::from("sample.rs")).unwrap()
    }

    #[test]
    fn test_let_with_annotation() {
        let file = walk("fn main() { let client: WidgetClient = connect(); }");
        assert_eq!(file.bindings.len(), 1);
        let binding = &file.bindings[0];
        assert_eq!(binding.name, "client");
        assert_eq!(binding.annotation.as_deref(), Some("WidgetClient"));
        assert!(matches!(
            binding.value,
            Some(SampleExpr::FunctionCall { ref function }) if function == "connect"
        ));
    }

    #[test]
    fn test_static_call_is_binding_value_and_call_site() {
        let file = walk("fn main() { let w = Widget::create(); }");
        assert_eq!(file.bindings.len(), 1);
        assert!(matches!(
            &file.bindings[0].value,
            Some(SampleExpr::MethodCall { receiver, method })
                if method == "create" && matches!(&**receiver, SampleExpr::Identifier(n) if n == "Widget")
        ));
        // The static call itself is also a scannable call site
        assert_eq!(file.calls.len(), 1);
        assert_eq!(file.calls[0].method, "create");
    }

    #[test]
    fn test_chain_emits_inner_and_outer_call_sites() {
        let file = walk("fn main() { store.open().read(); }");
        assert_eq!(file.calls.len(), 2);

        let outer = &file.calls[0];
        assert_eq!(outer.method, "read");
        assert!(matches!(
            &outer.receiver,
            SampleExpr::MethodCall { method, .. } if method == "open"
        ));

        let inner = &file.calls[1];
        assert_eq!(inner.method, "open");
        assert!(matches!(&inner.receiver, SampleExpr::Identifier(n) if n == "store"));
    }

    #[test]
    fn test_member_access_receiver() {
        let file = walk("fn main() { service.widgets.list(); }");
        assert_eq!(file.calls.len(), 1);
        let call = &file.calls[0];
        assert_eq!(call.method, "list");
        assert!(matches!(
            &call.receiver,
            SampleExpr::MemberAccess { member, .. } if member == "widgets"
        ));
    }

    #[test]
    fn test_struct_expression_and_assignment() {
        let file = walk("fn main() { let mut w = Widget { id: 1 }; w = Widget { id: 2 }; }");
        assert_eq!(file.bindings.len(), 2);
        assert!(matches!(
            &file.bindings[0].value,
            Some(SampleExpr::Construct { type_name }) if type_name == "Widget"
        ));
        assert!(file.bindings[1].annotation.is_none());
    }

    #[test]
    fn test_await_and_try_are_transparent() {
        let file = walk("async fn run() { let s = store.open().await?; }");
        assert_eq!(file.bindings.len(), 1);
        assert!(matches!(
            &file.bindings[0].value,
            Some(SampleExpr::MethodCall { method, .. }) if method == "open"
        ));
    }

    #[test]
    fn test_tuple_patterns_skipped() {
        let file = walk("fn main() { let (a, b) = pair(); }");
        assert!(file.bindings.is_empty());
    }

    #[test]
    fn test_line_numbers_are_one_based() {
        let file = walk("fn main() {\n    let w = Widget::create();\n}\n");
        assert_eq!(file.bindings[0].line, 2);
        assert_eq!(file.calls[0].line, 2);
    }
}
