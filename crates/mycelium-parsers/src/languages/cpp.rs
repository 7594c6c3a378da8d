//! C++ analyser. Adds classes, namespaces, and templates on top of the C
//! handling, including methods defined out of line with qualified names.

use std::path::Path;

use tree_sitter::Node;

use mycelium_core::types::{Lang, SymbolKind, Visibility};

use super::c_lang::{declarator_name, innermost_declarator};
use super::strip_generics;
use crate::analyser::{FileAnalysis, LanguageAnalyser, RawCall, RawImport, RawSymbol};
use crate::treesitter::{end_line, grammar_for, node_text, start_line, ParserEngine};

const BUILTINS: &[&str] = &[
    "printf", "fprintf", "sprintf", "snprintf", "malloc", "calloc", "realloc", "free",
    "memcpy", "memset", "strlen", "strcmp", "exit", "abort", "assert", "std", "cout",
    "cerr", "endl", "make_unique", "make_shared", "move", "forward", "swap", "size",
    "begin", "end", "push_back", "emplace_back",
];

pub struct CppAnalyser {
    engine: ParserEngine,
}

impl CppAnalyser {
    pub fn new() -> Self {
        CppAnalyser {
            engine: ParserEngine::new(),
        }
    }
}

impl Default for CppAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyser for CppAnalyser {
    fn language(&self) -> Lang {
        Lang::Cpp
    }

    fn parse_file(&self, path: &Path, content: &str) -> FileAnalysis {
        let Some(grammar) = grammar_for(Lang::Cpp) else {
            return FileAnalysis::default();
        };
        let Some(tree) = self.engine.parse(&grammar, content) else {
            eprintln!("mycelium: warning: failed to parse {}", path.display());
            return FileAnalysis::default();
        };

        let mut out = FileAnalysis::default();
        let ctx = Ctx {
            namespace: None,
            parent: None,
            template: false,
        };
        walk(tree.root_node(), content.as_bytes(), &mut out, &ctx);
        out
    }

    fn builtin_exclusions(&self) -> &'static [&'static str] {
        BUILTINS
    }
}

#[derive(Clone)]
struct Ctx {
    namespace: Option<String>,
    parent: Option<usize>,
    /// Set while descending through a `template_declaration` wrapper.
    template: bool,
}

fn walk(node: Node<'_>, src: &[u8], out: &mut FileAnalysis, ctx: &Ctx) {
    match node.kind() {
        "preproc_include" => {
            if let Some(path_node) = node.child_by_field_name("path") {
                if path_node.kind() == "string_literal" {
                    out.imports.push(RawImport {
                        raw: node_text(node, src).trim().to_string(),
                        specifier: node_text(path_node, src).trim_matches('"').to_string(),
                        line: start_line(node),
                    });
                }
            }
        }
        "namespace_definition" => {
            let name = node
                .child_by_field_name("name")
                .map(|n| node_text(n, src).to_string())
                .unwrap_or_default();
            let full = match (&ctx.namespace, name.is_empty()) {
                (_, true) => ctx.namespace.clone(),
                (Some(outer), false) => Some(format!("{outer}::{name}")),
                (None, false) => Some(name.clone()),
            };
            if let Some(ns) = &full {
                let mut sym = RawSymbol::new(
                    ns.clone(),
                    SymbolKind::Namespace,
                    start_line(node),
                    end_line(node),
                );
                sym.visibility = Visibility::Public;
                sym.exported = true;
                sym.namespace = full.clone();
                out.symbols.push(sym);
            }
            let inner = Ctx {
                namespace: full,
                parent: None,
                template: false,
            };
            recurse(node, src, out, &inner);
        }
        "template_declaration" => {
            let inner = Ctx {
                template: true,
                ..ctx.clone()
            };
            recurse(node, src, out, &inner);
        }
        "class_specifier" | "struct_specifier" | "union_specifier" | "enum_specifier" => {
            let named_definition = node.child_by_field_name("name").is_some()
                && node.child_by_field_name("body").is_some();
            if named_definition {
                let name_node = node.child_by_field_name("name").unwrap();
                let kind = if ctx.template {
                    SymbolKind::Template
                } else {
                    match node.kind() {
                        "class_specifier" => SymbolKind::Class,
                        "enum_specifier" => SymbolKind::Enum,
                        _ => SymbolKind::Struct,
                    }
                };
                let mut sym = RawSymbol::new(
                    strip_generics(node_text(name_node, src)),
                    kind,
                    start_line(node),
                    end_line(node),
                );
                sym.visibility = Visibility::Unknown;
                sym.exported = true;
                sym.parent = ctx.parent;
                sym.namespace = ctx.namespace.clone();
                sym.bases = base_class_names(node, src);
                out.symbols.push(sym);
                let idx = out.symbols.len() - 1;
                let inner = Ctx {
                    namespace: ctx.namespace.clone(),
                    parent: Some(idx),
                    template: false,
                };
                recurse(node, src, out, &inner);
            } else {
                recurse(node, src, out, ctx);
            }
        }
        "function_definition" => {
            if let Some(raw_name) = declarator_name(node, src) {
                // `Foo::bar` out-of-line definitions link back to their type
                // when it is declared in the same file.
                let (scope, name) = match raw_name.rsplit_once("::") {
                    Some((scope, name)) => (Some(scope.to_string()), name.to_string()),
                    None => (None, raw_name),
                };
                let in_type = ctx.parent.is_some() || scope.is_some();
                let kind = if ctx.template {
                    SymbolKind::Template
                } else if in_type {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                };
                let mut sym = RawSymbol::new(&name, kind, start_line(node), end_line(node));
                sym.visibility = Visibility::Unknown;
                sym.exported = true;
                sym.namespace = ctx.namespace.clone();
                sym.parent = ctx.parent.or_else(|| {
                    scope.as_ref().and_then(|s| {
                        let type_name = strip_generics(s);
                        out.symbols
                            .iter()
                            .position(|sym| sym.name == type_name && !sym.kind.is_callable())
                    })
                });
                out.symbols.push(sym);
            }
            recurse(node, src, out, ctx);
        }
        "type_definition" => {
            if let Some(declarator) = node.child_by_field_name("declarator") {
                let name = node_text(innermost_declarator(declarator), src).to_string();
                if !name.is_empty() {
                    let mut sym = RawSymbol::new(
                        &name,
                        SymbolKind::Typedef,
                        start_line(node),
                        end_line(node),
                    );
                    sym.exported = true;
                    sym.namespace = ctx.namespace.clone();
                    out.symbols.push(sym);
                }
            }
            recurse(node, src, out, ctx);
        }
        "call_expression" => {
            if let Some(function) = node.child_by_field_name("function") {
                let (qualifier, callee) = match function.kind() {
                    "field_expression" => {
                        let qualifier = function
                            .child_by_field_name("argument")
                            .map(|n| node_text(n, src).to_string());
                        let callee = function
                            .child_by_field_name("field")
                            .map(|n| node_text(n, src).to_string())
                            .unwrap_or_default();
                        (qualifier, callee)
                    }
                    "qualified_identifier" => {
                        let qualifier = function
                            .child_by_field_name("scope")
                            .map(|n| node_text(n, src).to_string());
                        let callee = function
                            .child_by_field_name("name")
                            .map(|n| node_text(n, src).to_string())
                            .unwrap_or_default();
                        (qualifier, callee)
                    }
                    "identifier" => (None, node_text(function, src).to_string()),
                    _ => (None, String::new()),
                };
                if !callee.is_empty() {
                    out.calls.push(RawCall {
                        callee,
                        qualifier,
                        line: start_line(node),
                    });
                }
            }
            recurse(node, src, out, ctx);
        }
        _ => recurse(node, src, out, ctx),
    }
}

fn recurse(node: Node<'_>, src: &[u8], out: &mut FileAnalysis, ctx: &Ctx) {
    let mut cursor = node.walk();
    let children: Vec<_> = node.named_children(&mut cursor).collect();
    for child in children {
        walk(child, src, out, ctx);
    }
}

fn base_class_names(node: Node<'_>, src: &[u8]) -> Vec<String> {
    let mut bases = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "base_class_clause" {
            continue;
        }
        let mut inner = child.walk();
        for base in child.named_children(&mut inner) {
            if matches!(base.kind(), "type_identifier" | "qualified_identifier") {
                bases.push(strip_generics(node_text(base, src)).to_string());
            }
        }
    }
    bases
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
#include "engine.h"

namespace render {

class Shape {
public:
    virtual double area() const = 0;
};

class Circle : public Shape {
public:
    double area() const override;
};

double Circle::area() const {
    return compute_area(radius_);
}

template <typename T>
class Buffer {
public:
    void push(T value) {}
};

}
"#;

    fn analyse() -> FileAnalysis {
        CppAnalyser::new().parse_file(Path::new("shapes.cpp"), SOURCE)
    }

    #[test]
    fn test_namespace_and_classes() {
        let out = analyse();
        let find = |name: &str| out.symbols.iter().find(|s| s.name == name).unwrap();

        assert_eq!(find("render").kind, SymbolKind::Namespace);
        assert_eq!(find("Shape").kind, SymbolKind::Class);
        assert_eq!(find("Shape").namespace.as_deref(), Some("render"));
        assert_eq!(find("Circle").bases, vec!["Shape"]);
    }

    #[test]
    fn test_out_of_line_method_links_to_class() {
        let out = analyse();
        let method = out
            .symbols
            .iter()
            .find(|s| s.name == "area" && s.parent.is_some())
            .unwrap();
        assert_eq!(method.kind, SymbolKind::Method);
        let parent_names: Vec<_> = out
            .symbols
            .iter()
            .filter(|s| s.name == "area")
            .filter_map(|s| s.parent.map(|p| out.symbols[p].name.clone()))
            .collect();
        assert!(parent_names.contains(&"Shape".to_string())
            || parent_names.contains(&"Circle".to_string()));
    }

    #[test]
    fn test_template_kind() {
        let out = analyse();
        let buffer = out.symbols.iter().find(|s| s.name == "Buffer").unwrap();
        assert_eq!(buffer.kind, SymbolKind::Template);
    }

    #[test]
    fn test_include_and_calls() {
        let out = analyse();
        assert_eq!(out.imports[0].specifier, "engine.h");
        assert!(out.calls.iter().any(|c| c.callee == "compute_area"));
    }
}
