//! C analyser. Function definitions are found by unwinding declarator
//! chains; quoted includes feed the import resolver while angle-bracket
//! includes are ignored as system headers.

use std::path::Path;

use tree_sitter::Node;

use mycelium_core::types::{Lang, SymbolKind, Visibility};

use crate::analyser::{FileAnalysis, LanguageAnalyser, RawCall, RawImport, RawSymbol};
use crate::treesitter::{end_line, grammar_for, node_text, start_line, ParserEngine};

const BUILTINS: &[&str] = &[
    "printf", "fprintf", "sprintf", "snprintf", "puts", "putchar", "scanf", "sscanf",
    "malloc", "calloc", "realloc", "free", "memcpy", "memmove", "memset", "memcmp",
    "strcpy", "strncpy", "strcat", "strlen", "strcmp", "strncmp", "strchr", "strstr",
    "fopen", "fclose", "fread", "fwrite", "fgets", "fseek", "exit", "abort", "assert",
    "atoi", "atof", "qsort", "sizeof",
];

pub struct CAnalyser {
    engine: ParserEngine,
}

impl CAnalyser {
    pub fn new() -> Self {
        CAnalyser {
            engine: ParserEngine::new(),
        }
    }
}

impl Default for CAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyser for CAnalyser {
    fn language(&self) -> Lang {
        Lang::C
    }

    fn parse_file(&self, path: &Path, content: &str) -> FileAnalysis {
        let Some(grammar) = grammar_for(Lang::C) else {
            return FileAnalysis::default();
        };
        let Some(tree) = self.engine.parse(&grammar, content) else {
            eprintln!("mycelium: warning: failed to parse {}", path.display());
            return FileAnalysis::default();
        };

        let mut out = FileAnalysis::default();
        walk(tree.root_node(), content.as_bytes(), &mut out);
        out
    }

    fn builtin_exclusions(&self) -> &'static [&'static str] {
        BUILTINS
    }
}

fn walk(node: Node<'_>, src: &[u8], out: &mut FileAnalysis) {
    match node.kind() {
        "preproc_include" => {
            if let Some(path_node) = node.child_by_field_name("path") {
                // Only quoted includes resolve within the repository.
                if path_node.kind() == "string_literal" {
                    let specifier = node_text(path_node, src).trim_matches('"').to_string();
                    out.imports.push(RawImport {
                        raw: node_text(node, src).trim().to_string(),
                        specifier,
                        line: start_line(node),
                    });
                }
            }
        }
        "function_definition" => {
            if let Some(name) = declarator_name(node, src) {
                let is_static = has_static_specifier(node, src);
                let mut sym =
                    RawSymbol::new(&name, SymbolKind::Function, start_line(node), end_line(node));
                sym.visibility = if is_static {
                    Visibility::Private
                } else {
                    Visibility::Unknown
                };
                sym.exported = !is_static;
                out.symbols.push(sym);
            }
            recurse(node, src, out);
        }
        "struct_specifier" | "union_specifier" | "enum_specifier" => {
            // Only named definitions with a body; bare references share the
            // same node kind.
            if let (Some(name_node), Some(_body)) = (
                node.child_by_field_name("name"),
                node.child_by_field_name("body"),
            ) {
                let kind = if node.kind() == "enum_specifier" {
                    SymbolKind::Enum
                } else {
                    SymbolKind::Struct
                };
                let mut sym = RawSymbol::new(
                    node_text(name_node, src),
                    kind,
                    start_line(node),
                    end_line(node),
                );
                sym.exported = true;
                out.symbols.push(sym);
            }
            recurse(node, src, out);
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
                    out.symbols.push(sym);
                }
            }
            recurse(node, src, out);
        }
        "call_expression" => {
            if let Some(function) = node.child_by_field_name("function") {
                if function.kind() == "identifier" {
                    out.calls.push(RawCall {
                        callee: node_text(function, src).to_string(),
                        qualifier: None,
                        line: start_line(node),
                    });
                }
            }
            recurse(node, src, out);
        }
        // #ifdef / #if branches are ordinary children, so the default
        // recursion visits both arms.
        _ => recurse(node, src, out),
    }
}

fn recurse(node: Node<'_>, src: &[u8], out: &mut FileAnalysis) {
    let mut cursor = node.walk();
    let children: Vec<_> = node.named_children(&mut cursor).collect();
    for child in children {
        walk(child, src, out);
    }
}

/// Unwind pointer/reference declarator chains down to the function name.
pub(super) fn declarator_name(node: Node<'_>, src: &[u8]) -> Option<String> {
    let declarator = node.child_by_field_name("declarator")?;
    let mut current = declarator;
    loop {
        match current.kind() {
            "pointer_declarator" | "reference_declarator" | "parenthesized_declarator" => {
                current = current.child_by_field_name("declarator").or_else(|| {
                    let mut cursor = current.walk();
                    let named: Vec<_> = current.named_children(&mut cursor).collect();
                    named.into_iter().next_back()
                })?;
            }
            "function_declarator" => {
                let inner = current.child_by_field_name("declarator")?;
                let name = node_text(innermost_declarator(inner), src);
                return if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                };
            }
            _ => return None,
        }
    }
}

pub(super) fn innermost_declarator(node: Node<'_>) -> Node<'_> {
    let mut current = node;
    while let Some(inner) = current.child_by_field_name("declarator") {
        current = inner;
    }
    current
}

fn has_static_specifier(node: Node<'_>, src: &[u8]) -> bool {
    let mut cursor = node.walk();
    let result = node.children(&mut cursor).any(|c| {
        c.kind() == "storage_class_specifier" && node_text(c, src) == "static"
    });
    result
}
