//! Rust analyser. Recurses into `impl` blocks and inline `mod` bodies;
//! visibility comes from the `visibility_modifier` child.

use std::path::Path;

use tree_sitter::Node;

use mycelium_core::types::{Lang, SymbolKind, Visibility};

use super::strip_generics;
use crate::analyser::{FileAnalysis, LanguageAnalyser, RawCall, RawImport, RawSymbol};
use crate::treesitter::{end_line, grammar_for, node_text, start_line, ParserEngine};

const BUILTINS: &[&str] = &[
    "println", "print", "eprintln", "eprint", "format", "write", "writeln", "vec",
    "panic", "assert", "assert_eq", "assert_ne", "debug_assert", "todo", "unimplemented",
    "unreachable", "matches", "dbg", "Some", "None", "Ok", "Err", "Box", "Vec", "String",
    "HashMap", "HashSet", "BTreeMap", "Arc", "Rc", "Mutex", "RwLock", "Cell", "RefCell",
    "Option", "Result", "Default", "Clone", "Copy", "drop", "std", "core", "alloc",
];

pub struct RustAnalyser {
    engine: ParserEngine,
}

impl RustAnalyser {
    pub fn new() -> Self {
        RustAnalyser {
            engine: ParserEngine::new(),
        }
    }
}

impl Default for RustAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyser for RustAnalyser {
    fn language(&self) -> Lang {
        Lang::Rust
    }

    fn parse_file(&self, path: &Path, content: &str) -> FileAnalysis {
        let Some(grammar) = grammar_for(Lang::Rust) else {
            return FileAnalysis::default();
        };
        let Some(tree) = self.engine.parse(&grammar, content) else {
            eprintln!("mycelium: warning: failed to parse {}", path.display());
            return FileAnalysis::default();
        };

        let mut out = FileAnalysis::default();
        walk(tree.root_node(), content.as_bytes(), &mut out, None);
        out
    }

    fn builtin_exclusions(&self) -> &'static [&'static str] {
        BUILTINS
    }
}

fn walk(node: Node<'_>, src: &[u8], out: &mut FileAnalysis, parent: Option<usize>) {
    match node.kind() {
        "use_declaration" => {
            if let Some(argument) = node.child_by_field_name("argument") {
                out.imports.push(RawImport {
                    raw: node_text(node, src).trim().to_string(),
                    specifier: node_text(argument, src).to_string(),
                    line: start_line(node),
                });
            }
        }
        "function_item" | "function_signature_item" => {
            let kind = if parent_is_container(out, parent) {
                SymbolKind::Method
            } else {
                SymbolKind::Function
            };
            if let Some(idx) = push_named(node, src, out, kind, parent) {
                recurse(node, src, out, Some(idx));
            }
        }
        "struct_item" => {
            push_named(node, src, out, SymbolKind::Struct, parent);
        }
        "enum_item" => {
            push_named(node, src, out, SymbolKind::Enum, parent);
        }
        "trait_item" => {
            if let Some(idx) = push_named(node, src, out, SymbolKind::Trait, parent) {
                recurse(node, src, out, Some(idx));
            }
        }
        "type_item" => {
            push_named(node, src, out, SymbolKind::TypeAlias, parent);
        }
        "const_item" => {
            push_named(node, src, out, SymbolKind::Constant, parent);
        }
        "static_item" => {
            push_named(node, src, out, SymbolKind::Static, parent);
        }
        "macro_definition" => {
            push_named(node, src, out, SymbolKind::Macro, parent);
        }
        "mod_item" => {
            // Inline module bodies are walked; `mod foo;` declarations have
            // no body and only contribute the Module symbol.
            if let Some(idx) = push_named(node, src, out, SymbolKind::Module, parent) {
                recurse(node, src, out, Some(idx));
            }
        }
        "impl_item" => {
            let Some(type_node) = node.child_by_field_name("type") else {
                return recurse(node, src, out, parent);
            };
            let name = strip_generics(node_text(type_node, src)).to_string();
            let mut sym = RawSymbol::new(&name, SymbolKind::Impl, start_line(node), end_line(node));
            sym.visibility = Visibility::Unknown;
            sym.parent = parent;
            if let Some(trait_node) = node.child_by_field_name("trait") {
                sym.bases
                    .push(strip_generics(node_text(trait_node, src)).to_string());
            }
            out.symbols.push(sym);
            let idx = out.symbols.len() - 1;
            recurse(node, src, out, Some(idx));
        }
        "call_expression" => {
            if let Some(function) = node.child_by_field_name("function") {
                let (qualifier, callee) = match function.kind() {
                    "scoped_identifier" => {
                        let qualifier = function
                            .child_by_field_name("path")
                            .map(|n| node_text(n, src).to_string());
                        let callee = function
                            .child_by_field_name("name")
                            .map(|n| node_text(n, src).to_string())
                            .unwrap_or_default();
                        (qualifier, callee)
                    }
                    "field_expression" => {
                        let qualifier = function
                            .child_by_field_name("value")
                            .map(|n| node_text(n, src).to_string());
                        let callee = function
                            .child_by_field_name("field")
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
        "macro_invocation" => {
            if let Some(name) = node.child_by_field_name("macro") {
                out.calls.push(RawCall {
                    callee: node_text(name, src).to_string(),
                    qualifier: None,
                    line: start_line(node),
                });
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
        walk(child, src, out, parent);
    }
}

fn parent_is_container(out: &FileAnalysis, parent: Option<usize>) -> bool {
    parent
        .map(|p| matches!(out.symbols[p].kind, SymbolKind::Impl | SymbolKind::Trait))
        .unwrap_or(false)
}

fn push_named(
    node: Node<'_>,
    src: &[u8],
    out: &mut FileAnalysis,
    kind: SymbolKind,
    parent: Option<usize>,
) -> Option<usize> {
    let name_node = node.child_by_field_name("name")?;
    let visibility = visibility_of(node, src);
    let mut sym = RawSymbol::new(
        node_text(name_node, src),
        kind,
        start_line(node),
        end_line(node),
    );
    sym.visibility = visibility;
    sym.exported = visibility == Visibility::Public;
    sym.parent = parent;
    out.symbols.push(sym);
    Some(out.symbols.len() - 1)
}

fn visibility_of(node: Node<'_>, src: &[u8]) -> Visibility {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "visibility_modifier" {
            return match node_text(child, src) {
                "pub" => Visibility::Public,
                "pub(crate)" => Visibility::Internal,
                text if text.starts_with("pub(") => Visibility::Internal,
                _ => Visibility::Unknown,
            };
        }
    }
    Visibility::Private
}
