//! C# analyser.
//!
//! Extracts type/member declarations with visibility from modifier tokens,
//! `using` directives, invocation and object-creation call sites, and
//! constructor-parameter types so the call resolver can follow
//! dependency-injected qualifiers.

use std::path::Path;

use tree_sitter::Node;

use mycelium_core::types::{Lang, SymbolKind, Visibility};

use super::strip_generics;
use crate::analyser::{FileAnalysis, LanguageAnalyser, RawCall, RawImport, RawSymbol};
use crate::treesitter::{end_line, grammar_for, node_text, start_line, ParserEngine};

const BUILTINS: &[&str] = &[
    "Console",
    "Math",
    "Convert",
    "String",
    "Int32",
    "Int64",
    "Guid",
    "DateTime",
    "TimeSpan",
    "Task",
    "List",
    "Dictionary",
    "HashSet",
    "Enumerable",
    "Array",
    "Object",
    "Exception",
    "ArgumentException",
    "ArgumentNullException",
    "InvalidOperationException",
    "StringBuilder",
    "Path",
    "File",
    "Directory",
    "Encoding",
    "Regex",
    "JsonSerializer",
    "CancellationToken",
    "nameof",
    "typeof",
    "ToString",
    "Equals",
    "GetHashCode",
    "GetType",
];

pub struct CSharpAnalyser {
    engine: ParserEngine,
}

impl CSharpAnalyser {
    pub fn new() -> Self {
        CSharpAnalyser {
            engine: ParserEngine::new(),
        }
    }
}

impl Default for CSharpAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyser for CSharpAnalyser {
    fn language(&self) -> Lang {
        Lang::CSharp
    }

    fn parse_file(&self, path: &Path, content: &str) -> FileAnalysis {
        let Some(grammar) = grammar_for(Lang::CSharp) else {
            return FileAnalysis::default();
        };
        let Some(tree) = self.engine.parse(&grammar, content) else {
            eprintln!("mycelium: warning: failed to parse {}", path.display());
            return FileAnalysis::default();
        };

        let mut out = FileAnalysis::default();
        walk(
            tree.root_node(),
            content.as_bytes(),
            &mut out,
            &Ctx {
                namespace: None,
                parent: None,
            },
        );
        out
    }

    fn builtin_exclusions(&self) -> &'static [&'static str] {
        BUILTINS
    }
}

struct Ctx {
    namespace: Option<String>,
    parent: Option<usize>,
}

fn walk(node: Node<'_>, src: &[u8], out: &mut FileAnalysis, ctx: &Ctx) {
    match node.kind() {
        "using_directive" => {
            let raw = node_text(node, src).trim().to_string();
            let specifier = using_specifier(&raw);
            if !specifier.is_empty() {
                out.imports.push(RawImport {
                    raw,
                    specifier,
                    line: start_line(node),
                });
            }
        }
        "namespace_declaration" | "file_scoped_namespace_declaration" => {
            let name = field_text(node, "name", src);
            let full = match &ctx.namespace {
                Some(outer) => format!("{outer}.{name}"),
                None => name.clone(),
            };
            let mut sym = RawSymbol::new(
                full.clone(),
                SymbolKind::Namespace,
                start_line(node),
                end_line(node),
            );
            sym.visibility = Visibility::Public;
            sym.exported = true;
            sym.namespace = Some(full.clone());
            out.symbols.push(sym);

            let inner = Ctx {
                namespace: Some(full),
                parent: None,
            };
            for child in named_children(node) {
                walk(child, src, out, &inner);
            }
        }
        "class_declaration" | "interface_declaration" | "struct_declaration"
        | "enum_declaration" | "record_declaration" | "delegate_declaration" => {
            let kind = match node.kind() {
                "class_declaration" => SymbolKind::Class,
                "interface_declaration" => SymbolKind::Interface,
                "struct_declaration" => SymbolKind::Struct,
                "enum_declaration" => SymbolKind::Enum,
                "record_declaration" => SymbolKind::Record,
                _ => SymbolKind::Delegate,
            };
            let name = field_text(node, "name", src);
            if name.is_empty() {
                return;
            }
            let top_level = ctx.parent.is_none();
            let vis = modifier_visibility(node, src)
                .unwrap_or(if top_level { Visibility::Internal } else { Visibility::Private });

            let mut sym = RawSymbol::new(name, kind, start_line(node), end_line(node));
            sym.visibility = vis;
            sym.exported =
                vis == Visibility::Public || (vis == Visibility::Internal && top_level);
            sym.parent = ctx.parent;
            sym.namespace = ctx.namespace.clone();
            sym.attributes = attribute_names(node, src);
            sym.bases = base_names(node, src);
            out.symbols.push(sym);
            let idx = out.symbols.len() - 1;

            let inner = Ctx {
                namespace: ctx.namespace.clone(),
                parent: Some(idx),
            };
            for child in named_children(node) {
                walk(child, src, out, &inner);
            }
        }
        "method_declaration" | "constructor_declaration" | "property_declaration" => {
            let kind = match node.kind() {
                "method_declaration" => SymbolKind::Method,
                "constructor_declaration" => SymbolKind::Constructor,
                _ => SymbolKind::Property,
            };
            let name = field_text(node, "name", src);
            if name.is_empty() {
                return;
            }
            let in_interface = ctx
                .parent
                .map(|p| out.symbols[p].kind == SymbolKind::Interface)
                .unwrap_or(false);
            let vis = modifier_visibility(node, src).unwrap_or(if in_interface {
                Visibility::Public
            } else {
                Visibility::Private
            });

            let mut sym = RawSymbol::new(name, kind, start_line(node), end_line(node));
            sym.visibility = vis;
            sym.exported = vis == Visibility::Public;
            sym.parent = ctx.parent;
            sym.namespace = ctx.namespace.clone();
            sym.attributes = attribute_names(node, src);
            out.symbols.push(sym);

            // Constructor parameters feed DI resolution: record each
            // parameter's type under its name and under the `_name` field
            // convention, on the declaring type.
            if kind == SymbolKind::Constructor {
                if let Some(parent_idx) = ctx.parent {
                    for (param_name, param_type) in parameters(node, src) {
                        out.symbols[parent_idx]
                            .injected_types
                            .push((param_name.clone(), param_type.clone()));
                        out.symbols[parent_idx]
                            .injected_types
                            .push((format!("_{param_name}"), param_type));
                    }
                }
            }

            for child in named_children(node) {
                walk(child, src, out, ctx);
            }
        }
        "invocation_expression" => {
            if let Some(function) = node.child_by_field_name("function") {
                let (qualifier, callee) = split_function(function, src);
                if !callee.is_empty() {
                    out.calls.push(RawCall {
                        callee,
                        qualifier,
                        line: start_line(node),
                    });
                }
            }
            for child in named_children(node) {
                walk(child, src, out, ctx);
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
                walk(child, src, out, ctx);
            }
        }
        _ => {
            for child in named_children(node) {
                walk(child, src, out, ctx);
            }
        }
    }
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    let children: Vec<_> = node.named_children(&mut cursor).collect();
    children
}

fn field_text(node: Node<'_>, field: &str, src: &[u8]) -> String {
    node.child_by_field_name(field)
        .map(|n| node_text(n, src).to_string())
        .unwrap_or_default()
}

/// `using Foo.Bar;` → `Foo.Bar`. Handles `using static` and alias forms.
fn using_specifier(raw: &str) -> String {
    let mut rest = raw.trim_end_matches(';').trim();
    rest = rest.strip_prefix("global").map(str::trim).unwrap_or(rest);
    rest = rest.strip_prefix("using").map(str::trim).unwrap_or(rest);
    rest = rest.strip_prefix("static").map(str::trim).unwrap_or(rest);
    match rest.split_once('=') {
        Some((_, target)) => target.trim().to_string(),
        None => rest.to_string(),
    }
}

fn modifier_visibility(node: Node<'_>, src: &[u8]) -> Option<Visibility> {
    let mut cursor = node.walk();
    let mut saw_protected = false;
    let mut saw_internal = false;
    for child in node.children(&mut cursor) {
        if child.kind() != "modifier" {
            continue;
        }
        match node_text(child, src) {
            "public" => return Some(Visibility::Public),
            "private" => return Some(Visibility::Private),
            "internal" => saw_internal = true,
            "protected" => saw_protected = true,
            _ => {}
        }
    }
    match (saw_protected, saw_internal) {
        (true, _) => Some(Visibility::Protected),
        (false, true) => Some(Visibility::Internal),
        (false, false) => None,
    }
}

fn attribute_names(node: Node<'_>, src: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() != "attribute_list" {
            continue;
        }
        let mut inner = child.walk();
        for attr in child.named_children(&mut inner) {
            if attr.kind() == "attribute" {
                if let Some(name) = attr.child_by_field_name("name") {
                    names.push(strip_generics(node_text(name, src)).to_string());
                }
            }
        }
    }
    names
}

fn base_names(node: Node<'_>, src: &[u8]) -> Vec<String> {
    let mut bases = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() != "base_list" {
            continue;
        }
        let mut inner = child.walk();
        for base in child.named_children(&mut inner) {
            let text = strip_generics(node_text(base, src));
            if !text.is_empty() {
                bases.push(text.to_string());
            }
        }
    }
    bases
}

fn parameters(node: Node<'_>, src: &[u8]) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let Some(list) = node.child_by_field_name("parameters") else {
        return params;
    };
    let mut cursor = list.walk();
    for param in list.named_children(&mut cursor) {
        if param.kind() != "parameter" {
            continue;
        }
        let name = field_text(param, "name", src);
        let ty = param
            .child_by_field_name("type")
            .map(|t| strip_generics(node_text(t, src)).to_string())
            .unwrap_or_default();
        if !name.is_empty() && !ty.is_empty() {
            params.push((name, ty));
        }
    }
    params
}

/// Split an invocation target into (qualifier, callee).
fn split_function(function: Node<'_>, src: &[u8]) -> (Option<String>, String) {
    match function.kind() {
        "member_access_expression" => {
            let qualifier = function
                .child_by_field_name("expression")
                .map(|n| node_text(n, src).to_string());
            let callee = function
                .child_by_field_name("name")
                .map(|n| strip_generics(node_text(n, src)).to_string())
                .unwrap_or_default();
            (qualifier, callee)
        }
        "identifier" | "generic_name" => {
            (None, strip_generics(node_text(function, src)).to_string())
        }
        _ => {
            let text = node_text(function, src);
            match text.rsplit_once('.') {
                Some((qual, name)) => (
                    Some(qual.to_string()),
                    strip_generics(name).to_string(),
                ),
                None => (None, strip_generics(text).to_string()),
            }
        }
    }
}
