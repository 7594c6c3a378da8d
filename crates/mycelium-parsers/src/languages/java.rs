//! Java analyser. Visibility comes from the modifiers subtree; annotations
//! are recorded for entry-point scoring.

use std::path::Path;

use tree_sitter::Node;

use mycelium_core::types::{Lang, SymbolKind, Visibility};

use super::strip_generics;
use crate::analyser::{FileAnalysis, LanguageAnalyser, RawCall, RawImport, RawSymbol};
use crate::treesitter::{end_line, grammar_for, node_text, start_line, ParserEngine};

const BUILTINS: &[&str] = &[
    "System", "Math", "String", "Objects", "List", "Map", "Set", "Optional", "Stream",
    "Collections", "Arrays", "Integer", "Long", "Double", "Boolean", "Character",
    "StringBuilder", "Thread", "Exception", "RuntimeException", "IllegalArgumentException",
    "IllegalStateException", "Files", "Paths", "Logger",
];

pub struct JavaAnalyser {
    engine: ParserEngine,
}

impl JavaAnalyser {
    pub fn new() -> Self {
        JavaAnalyser {
            engine: ParserEngine::new(),
        }
    }
}

impl Default for JavaAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyser for JavaAnalyser {
    fn language(&self) -> Lang {
        Lang::Java
    }

    fn parse_file(&self, path: &Path, content: &str) -> FileAnalysis {
        let Some(grammar) = grammar_for(Lang::Java) else {
            return FileAnalysis::default();
        };
        let Some(tree) = self.engine.parse(&grammar, content) else {
            eprintln!("mycelium: warning: failed to parse {}", path.display());
            return FileAnalysis::default();
        };

        let src = content.as_bytes();
        let mut out = FileAnalysis::default();
        let mut package = None;
        walk(tree.root_node(), src, &mut out, &mut package, None);
        for sym in &mut out.symbols {
            sym.namespace = package.clone();
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
    parent: Option<usize>,
) {
    match node.kind() {
        "package_declaration" => {
            for child in named_children(node) {
                if matches!(child.kind(), "scoped_identifier" | "identifier") {
                    *package = Some(node_text(child, src).to_string());
                }
            }
        }
        "import_declaration" => {
            let raw = node_text(node, src).trim().to_string();
            let specifier = raw
                .trim_end_matches(';')
                .trim_start_matches("import")
                .trim()
                .trim_start_matches("static")
                .trim()
                .to_string();
            if !specifier.is_empty() {
                out.imports.push(RawImport {
                    raw,
                    specifier,
                    line: start_line(node),
                });
            }
        }
        "class_declaration"
        | "interface_declaration"
        | "enum_declaration"
        | "record_declaration"
        | "annotation_type_declaration" => {
            let kind = match node.kind() {
                "class_declaration" => SymbolKind::Class,
                "interface_declaration" => SymbolKind::Interface,
                "enum_declaration" => SymbolKind::Enum,
                "record_declaration" => SymbolKind::Record,
                _ => SymbolKind::Annotation,
            };
            let Some(idx) = push_declaration(node, src, out, kind, parent) else {
                return;
            };
            out.symbols[idx].bases = base_names(node, src);
            for child in named_children(node) {
                walk(child, src, out, package, Some(idx));
            }
        }
        "method_declaration" | "constructor_declaration" => {
            let kind = if node.kind() == "method_declaration" {
                SymbolKind::Method
            } else {
                SymbolKind::Constructor
            };
            if let Some(idx) = push_declaration(node, src, out, kind, parent) {
                for child in named_children(node) {
                    walk(child, src, out, package, Some(idx));
                }
            }
        }
        "method_invocation" => {
            let qualifier = node
                .child_by_field_name("object")
                .map(|n| node_text(n, src).to_string());
            let callee = node
                .child_by_field_name("name")
                .map(|n| node_text(n, src).to_string())
                .unwrap_or_default();
            if !callee.is_empty() {
                out.calls.push(RawCall {
                    callee,
                    qualifier,
                    line: start_line(node),
                });
            }
            for child in named_children(node) {
                walk(child, src, out, package, parent);
            }
        }
        "object_creation_expression" => {
            if let Some(ty) = node.child_by_field_name("type") {
                let callee = strip_generics(node_text(ty, src)).to_string();
                if !callee.is_empty() {
                    out.calls.push(RawCall {
                        callee,
                        qualifier: None,
                        line: start_line(node),
                    });
                }
            }
            for child in named_children(node) {
                walk(child, src, out, package, parent);
            }
        }
        _ => {
            for child in named_children(node) {
                walk(child, src, out, package, parent);
            }
        }
    }
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    let children: Vec<_> = node.named_children(&mut cursor).collect();
    children
}

fn push_declaration(
    node: Node<'_>,
    src: &[u8],
    out: &mut FileAnalysis,
    kind: SymbolKind,
    parent: Option<usize>,
) -> Option<usize> {
    let name_node = node.child_by_field_name("name")?;
    let (visibility, annotations) = modifiers(node, src);
    let mut sym = RawSymbol::new(
        node_text(name_node, src),
        kind,
        start_line(node),
        end_line(node),
    );
    sym.visibility = visibility;
    sym.exported = visibility == Visibility::Public;
    sym.parent = parent;
    sym.attributes = annotations;
    out.symbols.push(sym);
    Some(out.symbols.len() - 1)
}

/// Visibility and annotation names from the `modifiers` subtree.
/// Package-private maps to internal.
fn modifiers(node: Node<'_>, src: &[u8]) -> (Visibility, Vec<String>) {
    let mut visibility = Visibility::Internal;
    let mut annotations = Vec::new();
    for child in named_children(node) {
        if child.kind() != "modifiers" {
            continue;
        }
        let mut cursor = child.walk();
        for modifier in child.children(&mut cursor) {
            match modifier.kind() {
                "public" => visibility = Visibility::Public,
                "private" => visibility = Visibility::Private,
                "protected" => visibility = Visibility::Protected,
                "marker_annotation" | "annotation" => {
                    if let Some(name) = modifier.child_by_field_name("name") {
                        annotations.push(node_text(name, src).to_string());
                    }
                }
                _ => {}
            }
        }
    }
    (visibility, annotations)
}

/// `extends A implements B, C` → `["A", "B", "C"]`.
fn base_names(node: Node<'_>, src: &[u8]) -> Vec<String> {
    let mut bases = Vec::new();
    for child in named_children(node) {
        match child.kind() {
            "superclass" => {
                let text = node_text(child, src).trim_start_matches("extends").trim();
                bases.push(strip_generics(text).to_string());
            }
            "super_interfaces" | "extends_interfaces" => {
                let text = node_text(child, src)
                    .trim_start_matches("implements")
                    .trim_start_matches("extends")
                    .trim();
                for part in text.split(',') {
                    let name = strip_generics(part.trim());
                    if !name.is_empty() {
                        bases.push(name.to_string());
                    }
                }
            }
            _ => {}
        }
    }
    bases
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
package com.acme.orders;

import com.acme.store.OrderRepository;

public class OrderService implements OrderApi {
    private final OrderRepository repository;

    public OrderService(OrderRepository repository) {
        this.repository = repository;
    }

    @Deprecated
    public Order findOrder(long id) {
        return repository.findById(id);
    }

    void auditLog(Order order) {
        System.out.println(order);
    }
}
"#;

    fn analyse() -> FileAnalysis {
        JavaAnalyser::new().parse_file(Path::new("OrderService.java"), SOURCE)
    }

    #[test]
    fn test_class_and_members() {
        let out = analyse();
        let find = |name: &str| out.symbols.iter().find(|s| s.name == name).unwrap();

        let class = find("OrderService");
        assert_eq!(class.kind, SymbolKind::Class);
        assert_eq!(class.namespace.as_deref(), Some("com.acme.orders"));
        assert_eq!(class.bases, vec!["OrderApi"]);

        let ctor = out
            .symbols
            .iter()
            .find(|s| s.kind == SymbolKind::Constructor)
            .unwrap();
        assert_eq!(ctor.name, "OrderService");
    }

    #[test]
    fn test_visibility_from_modifiers() {
        let out = analyse();
        let find = |name: &str| out.symbols.iter().find(|s| s.name == name).unwrap();

        assert_eq!(find("findOrder").visibility, Visibility::Public);
        assert!(find("findOrder").exported);
        // Package-private member.
        assert_eq!(find("auditLog").visibility, Visibility::Internal);
        assert!(!find("auditLog").exported);
    }

    #[test]
    fn test_annotations_recorded() {
        let out = analyse();
        let find = |name: &str| out.symbols.iter().find(|s| s.name == name).unwrap();
        assert_eq!(find("findOrder").attributes, vec!["Deprecated"]);
    }

    #[test]
    fn test_imports_and_calls() {
        let out = analyse();
        assert_eq!(out.imports[0].specifier, "com.acme.store.OrderRepository");
        assert!(out
            .calls
            .iter()
            .any(|c| c.callee == "findById" && c.qualifier.as_deref() == Some("repository")));
    }
}
