//! Go analyser. Exported ⇔ initial uppercase; the package clause feeds the
//! namespace index; receiver methods link back to their type when it is
//! declared in the same file.

use std::path::Path;

use tree_sitter::Node;

use mycelium_core::types::{Lang, SymbolKind, Visibility};

use crate::analyser::{FileAnalysis, LanguageAnalyser, RawCall, RawImport, RawSymbol};
use crate::treesitter::{end_line, grammar_for, node_text, start_line, ParserEngine};

const BUILTINS: &[&str] = &[
    "fmt", "len", "cap", "make", "new", "append", "copy", "delete", "panic", "recover",
    "print", "println", "close", "errors", "strings", "strconv", "sort", "time", "os",
    "io", "log", "context", "sync", "bytes", "math", "json", "http",
];

pub struct GoAnalyser {
    engine: ParserEngine,
}

impl GoAnalyser {
    pub fn new() -> Self {
        GoAnalyser {
            engine: ParserEngine::new(),
        }
    }
}

impl Default for GoAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyser for GoAnalyser {
    fn language(&self) -> Lang {
        Lang::Go
    }

    fn parse_file(&self, path: &Path, content: &str) -> FileAnalysis {
        let Some(grammar) = grammar_for(Lang::Go) else {
            return FileAnalysis::default();
        };
        let Some(tree) = self.engine.parse(&grammar, content) else {
            eprintln!("mycelium: warning: failed to parse {}", path.display());
            return FileAnalysis::default();
        };

        let src = content.as_bytes();
        let mut out = FileAnalysis::default();
        let mut package = None;
        // (symbol index, receiver type name) links resolved after the walk,
        // once the type declaration has been seen.
        let mut pending_receivers: Vec<(usize, String)> = Vec::new();

        walk(tree.root_node(), src, &mut out, &mut package, &mut pending_receivers);

        for sym in &mut out.symbols {
            sym.namespace = package.clone();
        }
        for (method_idx, type_name) in pending_receivers {
            let parent = out
                .symbols
                .iter()
                .position(|s| s.name == type_name && !s.kind.is_callable());
            out.symbols[method_idx].parent = parent;
        }
        out
    }

    fn builtin_exclusions(&self) -> &'static [&'static str] {
        BUILTINS
    }
}

fn walk(
    node: Node<'_>,
    src: &[u8],
    out: &mut FileAnalysis,
    package: &mut Option<String>,
    pending_receivers: &mut Vec<(usize, String)>,
) {
    match node.kind() {
        "package_clause" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.kind() == "package_identifier" {
                    *package = Some(node_text(child, src).to_string());
                }
            }
        }
        "import_spec" => {
            if let Some(path_node) = node.child_by_field_name("path") {
                let specifier = node_text(path_node, src).trim_matches('"').to_string();
                out.imports.push(RawImport {
                    raw: node_text(node, src).trim().to_string(),
                    specifier,
                    line: start_line(node),
                });
            }
        }
        "function_declaration" => {
            push_named(node, src, out, SymbolKind::Function);
            recurse(node, src, out, package, pending_receivers);
        }
        "method_declaration" => {
            if push_named(node, src, out, SymbolKind::Method) {
                if let Some(receiver) = receiver_type(node, src) {
                    pending_receivers.push((out.symbols.len() - 1, receiver));
                }
            }
            recurse(node, src, out, package, pending_receivers);
        }
        "type_spec" => {
            let name = node
                .child_by_field_name("name")
                .map(|n| node_text(n, src).to_string())
                .unwrap_or_default();
            if !name.is_empty() {
                let kind = match node.child_by_field_name("type").map(|t| t.kind()) {
                    Some("struct_type") => SymbolKind::Struct,
                    Some("interface_type") => SymbolKind::Interface,
                    _ => SymbolKind::TypeAlias,
                };
                push_symbol(&name, kind, node, out);
            }
            recurse(node, src, out, package, pending_receivers);
        }
        "const_spec" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                push_symbol(node_text(name_node, src), SymbolKind::Constant, node, out);
            }
        }
        "call_expression" => {
            if let Some(function) = node.child_by_field_name("function") {
                let (qualifier, callee) = match function.kind() {
                    "selector_expression" => {
                        let qualifier = function
                            .child_by_field_name("operand")
                            .map(|n| node_text(n, src).to_string());
                        let callee = function
                            .child_by_field_name("field")
                            .map(|n| node_text(n, src).to_string())
                            .unwrap_or_default();
                        (qualifier, callee)
                    }
                    _ => (None, node_text(function, src).to_string()),
                };
                if !callee.is_empty() && !callee.contains('(') {
                    out.calls.push(RawCall {
                        callee,
                        qualifier,
                        line: start_line(node),
                    });
                }
            }
            recurse(node, src, out, package, pending_receivers);
        }
        _ => recurse(node, src, out, package, pending_receivers),
    }
}

fn recurse(
    node: Node<'_>,
    src: &[u8],
    out: &mut FileAnalysis,
    package: &mut Option<String>,
    pending_receivers: &mut Vec<(usize, String)>,
) {
    let mut cursor = node.walk();
    let children: Vec<_> = node.named_children(&mut cursor).collect();
    for child in children {
        walk(child, src, out, package, pending_receivers);
    }
}

fn push_named(node: Node<'_>, src: &[u8], out: &mut FileAnalysis, kind: SymbolKind) -> bool {
    match node.child_by_field_name("name") {
        Some(name_node) => {
            push_symbol(node_text(name_node, src), kind, node, out);
            true
        }
        None => false,
    }
}

fn push_symbol(name: &str, kind: SymbolKind, node: Node<'_>, out: &mut FileAnalysis) {
    if name.is_empty() {
        return;
    }
    let exported = name.chars().next().is_some_and(|c| c.is_uppercase());
    let mut sym = RawSymbol::new(name, kind, start_line(node), end_line(node));
    sym.exported = exported;
    sym.visibility = if exported {
        Visibility::Public
    } else {
        Visibility::Private
    };
    out.symbols.push(sym);
}

/// `func (s *Server) Run()` → `Server`.
fn receiver_type(node: Node<'_>, src: &[u8]) -> Option<String> {
    let receiver = node.child_by_field_name("receiver")?;
    let mut cursor = receiver.walk();
    for param in receiver.named_children(&mut cursor) {
        if param.kind() != "parameter_declaration" {
            continue;
        }
        let ty = param.child_by_field_name("type")?;
        let text = node_text(ty, src).trim_start_matches('*');
        return Some(text.to_string());
    }
    None
}
