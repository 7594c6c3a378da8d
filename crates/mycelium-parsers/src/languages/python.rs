//! Python analyser. Exported means top-level without a leading underscore.

use std::path::Path;

use tree_sitter::Node;

use mycelium_core::types::{Lang, SymbolKind, Visibility};

use crate::analyser::{FileAnalysis, LanguageAnalyser, RawCall, RawImport, RawSymbol};
use crate::treesitter::{end_line, grammar_for, node_text, start_line, ParserEngine};

const BUILTINS: &[&str] = &[
    "print", "len", "range", "str", "int", "float", "bool", "list", "dict", "set",
    "tuple", "isinstance", "issubclass", "super", "enumerate", "zip", "open", "type",
    "getattr", "setattr", "hasattr", "sorted", "reversed", "min", "max", "sum", "abs",
    "round", "format", "repr", "iter", "next", "map", "filter", "any", "all", "vars",
    "id", "hash", "input",
];

pub struct PythonAnalyser {
    engine: ParserEngine,
}

impl PythonAnalyser {
    pub fn new() -> Self {
        PythonAnalyser {
            engine: ParserEngine::new(),
        }
    }
}

impl Default for PythonAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyser for PythonAnalyser {
    fn language(&self) -> Lang {
        Lang::Python
    }

    fn parse_file(&self, path: &Path, content: &str) -> FileAnalysis {
        let Some(grammar) = grammar_for(Lang::Python) else {
            return FileAnalysis::default();
        };
        let Some(tree) = self.engine.parse(&grammar, content) else {
            eprintln!("mycelium: warning: failed to parse {}", path.display());
            return FileAnalysis::default();
        };

        let mut out = FileAnalysis::default();
        walk(tree.root_node(), content.as_bytes(), &mut out, None, &[]);
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
    parent: Option<usize>,
    decorators: &[String],
) {
    match node.kind() {
        "decorated_definition" => {
            let names = decorator_names(node, src);
            if let Some(definition) = node.child_by_field_name("definition") {
                walk(definition, src, out, parent, &names);
            }
        }
        "function_definition" => {
            let name = field_text(node, "name", src);
            if name.is_empty() {
                return;
            }
            let kind = if parent.is_some() {
                SymbolKind::Method
            } else {
                SymbolKind::Function
            };
            let top_level = parent.is_none();
            let private = name.starts_with('_');

            let mut sym = RawSymbol::new(&name, kind, start_line(node), end_line(node));
            sym.visibility = if private {
                Visibility::Private
            } else {
                Visibility::Public
            };
            sym.exported = top_level && !private;
            sym.parent = parent;
            sym.attributes = decorators.to_vec();
            out.symbols.push(sym);
            let idx = out.symbols.len() - 1;

            if let Some(body) = node.child_by_field_name("body") {
                recurse(body, src, out, Some(idx));
            }
        }
        "class_definition" => {
            let name = field_text(node, "name", src);
            if name.is_empty() {
                return;
            }
            let private = name.starts_with('_');
            let mut sym =
                RawSymbol::new(&name, SymbolKind::Class, start_line(node), end_line(node));
            sym.visibility = if private {
                Visibility::Private
            } else {
                Visibility::Public
            };
            sym.exported = parent.is_none() && !private;
            sym.parent = parent;
            sym.attributes = decorators.to_vec();
            sym.bases = superclass_names(node, src);
            out.symbols.push(sym);
            let idx = out.symbols.len() - 1;

            if let Some(body) = node.child_by_field_name("body") {
                recurse(body, src, out, Some(idx));
            }
        }
        "import_statement" => {
            let raw = node_text(node, src).trim().to_string();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                let specifier = match child.kind() {
                    "dotted_name" => node_text(child, src).to_string(),
                    "aliased_import" => child
                        .child_by_field_name("name")
                        .map(|n| node_text(n, src).to_string())
                        .unwrap_or_default(),
                    _ => continue,
                };
                if !specifier.is_empty() {
                    out.imports.push(RawImport {
                        raw: raw.clone(),
                        specifier,
                        line: start_line(node),
                    });
                }
            }
        }
        "import_from_statement" => {
            if let Some(module) = node.child_by_field_name("module_name") {
                out.imports.push(RawImport {
                    raw: node_text(node, src).trim().to_string(),
                    specifier: node_text(module, src).to_string(),
                    line: start_line(node),
                });
            }
        }
        "call" => {
            if let Some(function) = node.child_by_field_name("function") {
                let (qualifier, callee) = match function.kind() {
                    "attribute" => {
                        let qualifier = function
                            .child_by_field_name("object")
                            .map(|n| node_text(n, src).to_string());
                        let callee = function
                            .child_by_field_name("attribute")
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
            recurse(node, src, out, parent);
        }
        _ => recurse(node, src, out, parent),
    }
}

fn recurse(node: Node<'_>, src: &[u8], out: &mut FileAnalysis, parent: Option<usize>) {
    let mut cursor = node.walk();
    let children: Vec<_> = node.named_children(&mut cursor).collect();
    for child in children {
        walk(child, src, out, parent, &[]);
    }
}

fn field_text(node: Node<'_>, field: &str, src: &[u8]) -> String {
    node.child_by_field_name(field)
        .map(|n| node_text(n, src).to_string())
        .unwrap_or_default()
}

fn decorator_names(node: Node<'_>, src: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "decorator" {
            let text = node_text(child, src)
                .trim_start_matches('@')
                .split('(')
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            if !text.is_empty() {
                names.push(text);
            }
        }
    }
    names
}

fn superclass_names(node: Node<'_>, src: &[u8]) -> Vec<String> {
    let mut bases = Vec::new();
    let Some(list) = node.child_by_field_name("superclasses") else {
        return bases;
    };
    let mut cursor = list.walk();
    for base in list.named_children(&mut cursor) {
        if matches!(base.kind(), "identifier" | "attribute") {
            bases.push(node_text(base, src).to_string());
        }
    }
    bases
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
import os
from models import User

class UserService:
    def __init__(self, repo):
        self.repo = repo

    def create_user(self, name):
        user = User(name)
        return self.repo.save(user)

def build_service():
    return UserService(make_repo())

def _internal():
    pass
"#;

    fn analyse() -> FileAnalysis {
        PythonAnalyser::new().parse_file(Path::new("service.py"), SOURCE)
    }

    #[test]
    fn test_functions_classes_methods() {
        let out = analyse();
        let find = |name: &str| out.symbols.iter().find(|s| s.name == name).unwrap();

        assert_eq!(find("UserService").kind, SymbolKind::Class);
        assert_eq!(find("create_user").kind, SymbolKind::Method);
        assert_eq!(find("build_service").kind, SymbolKind::Function);
        assert_eq!(
            out.symbols[find("create_user").parent.unwrap()].name,
            "UserService"
        );
    }

    #[test]
    fn test_export_is_top_level_without_underscore() {
        let out = analyse();
        let find = |name: &str| out.symbols.iter().find(|s| s.name == name).unwrap();

        assert!(find("build_service").exported);
        assert!(!find("_internal").exported);
        // Methods are not top-level, hence not exported.
        assert!(!find("create_user").exported);
        assert_eq!(find("_internal").visibility, Visibility::Private);
    }

    #[test]
    fn test_imports() {
        let out = analyse();
        let specs: Vec<_> = out.imports.iter().map(|i| i.specifier.as_str()).collect();
        assert_eq!(specs, vec!["os", "models"]);
        assert_eq!(out.imports[1].raw, "from models import User");
    }

    #[test]
    fn test_calls_and_qualifiers() {
        let out = analyse();
        assert!(out
            .calls
            .iter()
            .any(|c| c.callee == "save" && c.qualifier.as_deref() == Some("self.repo")));
        assert!(out.calls.iter().any(|c| c.callee == "User" && c.qualifier.is_none()));
        assert!(out.calls.iter().any(|c| c.callee == "make_repo"));
    }
}
