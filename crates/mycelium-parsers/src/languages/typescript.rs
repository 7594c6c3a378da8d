//! TypeScript / JavaScript analyser. One implementation covers both tags;
//! the grammar is chosen per file extension (`.tsx` needs the TSX dialect).

use std::path::Path;

use tree_sitter::Node;

use mycelium_core::types::{Lang, SymbolKind, Visibility};

use super::strip_generics;
use crate::analyser::{FileAnalysis, LanguageAnalyser, RawCall, RawImport, RawSymbol};
use crate::treesitter::{end_line, grammar_for, node_text, start_line, tsx_grammar, ParserEngine};

const BUILTINS: &[&str] = &[
    "console", "JSON", "Math", "Object", "Array", "Promise", "String", "Number",
    "Boolean", "Date", "RegExp", "Error", "Map", "Set", "Symbol", "Reflect", "Proxy",
    "parseInt", "parseFloat", "isNaN", "fetch", "setTimeout", "setInterval",
    "clearTimeout", "clearInterval", "require", "structuredClone", "encodeURIComponent",
    "decodeURIComponent",
];

pub struct TsAnalyser {
    lang: Lang,
    engine: ParserEngine,
}

impl TsAnalyser {
    pub fn new(lang: Lang) -> Self {
        TsAnalyser {
            lang,
            engine: ParserEngine::new(),
        }
    }
}

impl LanguageAnalyser for TsAnalyser {
    fn language(&self) -> Lang {
        self.lang
    }

    fn parse_file(&self, path: &Path, content: &str) -> FileAnalysis {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let grammar = if matches!(ext, "tsx" | "jsx") {
            tsx_grammar()
        } else {
            match grammar_for(self.lang) {
                Some(g) => g,
                None => return FileAnalysis::default(),
            }
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
                parent: None,
                exported: false,
            },
        );
        out
    }

    fn builtin_exclusions(&self) -> &'static [&'static str] {
        BUILTINS
    }
}

struct Ctx {
    parent: Option<usize>,
    exported: bool,
}

fn walk(node: Node<'_>, src: &[u8], out: &mut FileAnalysis, ctx: &Ctx) {
    match node.kind() {
        "import_statement" => {
            if let Some(source) = node.child_by_field_name("source") {
                out.imports.push(RawImport {
                    raw: node_text(node, src).trim().to_string(),
                    specifier: unquote(node_text(source, src)),
                    line: start_line(node),
                });
            }
        }
        "export_statement" => {
            // Re-exports also create an import dependency on the source.
            if let Some(source) = node.child_by_field_name("source") {
                out.imports.push(RawImport {
                    raw: node_text(node, src).trim().to_string(),
                    specifier: unquote(node_text(source, src)),
                    line: start_line(node),
                });
            }
            let inner = Ctx {
                parent: ctx.parent,
                exported: true,
            };
            for child in named_children(node) {
                walk(child, src, out, &inner);
            }
        }
        "function_declaration" | "generator_function_declaration" => {
            if let Some(idx) = push_named(node, src, out, SymbolKind::Function, ctx) {
                recurse_with(node, src, out, Some(idx));
            }
        }
        "class_declaration" => {
            let Some(name_node) = node.child_by_field_name("name") else {
                return recurse_with(node, src, out, ctx.parent);
            };
            let mut sym = RawSymbol::new(
                node_text(name_node, src),
                SymbolKind::Class,
                start_line(node),
                end_line(node),
            );
            sym.exported = ctx.exported;
            sym.visibility = Visibility::Unknown;
            sym.parent = ctx.parent;
            sym.bases = heritage_names(node, src);
            out.symbols.push(sym);
            let idx = out.symbols.len() - 1;
            recurse_with(node, src, out, Some(idx));
        }
        "method_definition" => {
            let Some(name_node) = node.child_by_field_name("name") else {
                return;
            };
            let name = node_text(name_node, src).to_string();
            let kind = if name == "constructor" {
                SymbolKind::Constructor
            } else {
                SymbolKind::Method
            };
            let mut sym = RawSymbol::new(&name, kind, start_line(node), end_line(node));
            sym.visibility = accessibility(node, src);
            sym.exported = false;
            sym.parent = ctx.parent;
            out.symbols.push(sym);
            let idx = out.symbols.len() - 1;
            recurse_with(node, src, out, Some(idx));
        }
        "interface_declaration" => {
            push_named(node, src, out, SymbolKind::Interface, ctx);
            recurse_with(node, src, out, ctx.parent);
        }
        "type_alias_declaration" => {
            push_named(node, src, out, SymbolKind::TypeAlias, ctx);
        }
        "enum_declaration" => {
            push_named(node, src, out, SymbolKind::Enum, ctx);
        }
        "variable_declarator" => {
            // `const f = (x) => …` and `const f = function …` declare functions.
            let value_kind = node.child_by_field_name("value").map(|v| v.kind());
            if matches!(
                value_kind,
                Some("arrow_function") | Some("function_expression") | Some("function")
            ) {
                if let Some(idx) = push_named(node, src, out, SymbolKind::Function, ctx) {
                    return recurse_with(node, src, out, Some(idx));
                }
            }
            // `const x = require("mod")` is a CommonJS import.
            if let Some(value) = node.child_by_field_name("value") {
                if value.kind() == "call_expression" {
                    if let Some(specifier) = require_specifier(value, src) {
                        out.imports.push(RawImport {
                            raw: node_text(node, src).trim().to_string(),
                            specifier,
                            line: start_line(node),
                        });
                    }
                }
            }
            recurse_with(node, src, out, ctx.parent);
        }
        "call_expression" => {
            if let Some(function) = node.child_by_field_name("function") {
                let (qualifier, callee) = match function.kind() {
                    "member_expression" => {
                        let qualifier = function
                            .child_by_field_name("object")
                            .map(|n| node_text(n, src).to_string());
                        let callee = function
                            .child_by_field_name("property")
                            .map(|n| node_text(n, src).to_string())
                            .unwrap_or_default();
                        (qualifier, callee)
                    }
                    "identifier" => (None, node_text(function, src).to_string()),
                    _ => (None, String::new()),
                };
                if !callee.is_empty() && callee != "require" {
                    out.calls.push(RawCall {
                        callee,
                        qualifier,
                        line: start_line(node),
                    });
                }
            }
            recurse_with(node, src, out, ctx.parent);
        }
        "new_expression" => {
            if let Some(ctor) = node.child_by_field_name("constructor") {
                let callee = strip_generics(node_text(ctor, src)).to_string();
                if !callee.is_empty() {
                    out.calls.push(RawCall {
                        callee,
                        qualifier: None,
                        line: start_line(node),
                    });
                }
            }
            recurse_with(node, src, out, ctx.parent);
        }
        // Statement wrappers (lexical declarations, expression statements)
        // must not reset the export flag on the way down.
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

fn recurse_with(node: Node<'_>, src: &[u8], out: &mut FileAnalysis, parent: Option<usize>) {
    let ctx = Ctx {
        parent,
        exported: false,
    };
    for child in named_children(node) {
        walk(child, src, out, &ctx);
    }
}

fn push_named(
    node: Node<'_>,
    src: &[u8],
    out: &mut FileAnalysis,
    kind: SymbolKind,
    ctx: &Ctx,
) -> Option<usize> {
    let name_node = node.child_by_field_name("name")?;
    let mut sym = RawSymbol::new(
        node_text(name_node, src),
        kind,
        start_line(node),
        end_line(node),
    );
    sym.exported = ctx.exported;
    sym.visibility = Visibility::Unknown;
    sym.parent = ctx.parent;
    out.symbols.push(sym);
    Some(out.symbols.len() - 1)
}

fn unquote(s: &str) -> String {
    s.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}

fn accessibility(node: Node<'_>, src: &[u8]) -> Visibility {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "accessibility_modifier" {
            return match node_text(child, src) {
                "public" => Visibility::Public,
                "private" => Visibility::Private,
                "protected" => Visibility::Protected,
                _ => Visibility::Unknown,
            };
        }
    }
    Visibility::Unknown
}

/// `class A extends B implements C` → `["B", "C"]`.
fn heritage_names(node: Node<'_>, src: &[u8]) -> Vec<String> {
    let mut bases = Vec::new();
    for child in named_children(node) {
        if child.kind() != "class_heritage" {
            continue;
        }
        let text = node_text(child, src)
            .replace("extends", ",")
            .replace("implements", ",");
        for part in text.split(',') {
            let name = strip_generics(part.trim());
            if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.')
            {
                bases.push(name.to_string());
            }
        }
    }
    bases
}

fn require_specifier(call: Node<'_>, src: &[u8]) -> Option<String> {
    let function = call.child_by_field_name("function")?;
    if function.kind() != "identifier" || node_text(function, src) != "require" {
        return None;
    }
    let args = call.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    let first = args.named_children(&mut cursor).next()?;
    if first.kind() == "string" {
        Some(unquote(node_text(first, src)))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
import { UserRepository } from "./repository";
export { save } from "./persistence";

export interface User {
    id: number;
}

export class UserService {
    private repo: UserRepository;

    constructor(repo: UserRepository) {
        this.repo = repo;
    }

    createUser(name: string): User {
        const user = this.build(name);
        return this.repo.save(user);
    }

    private build(name: string): User {
        return { id: name.length };
    }
}

export const formatName = (name: string): string => name.trim();

export default function main() {
    const svc = new UserService(new UserRepository());
    svc.createUser("ada");
}
"#;

    fn analyse() -> FileAnalysis {
        TsAnalyser::new(Lang::TypeScript).parse_file(Path::new("service.ts"), SOURCE)
    }

    #[test]
    fn test_declarations() {
        let out = analyse();
        let find = |name: &str| out.symbols.iter().find(|s| s.name == name).unwrap();

        assert_eq!(find("User").kind, SymbolKind::Interface);
        assert_eq!(find("UserService").kind, SymbolKind::Class);
        assert_eq!(find("createUser").kind, SymbolKind::Method);
        assert_eq!(find("constructor").kind, SymbolKind::Constructor);
        // Arrow function bound to a declarator is a function symbol.
        assert_eq!(find("formatName").kind, SymbolKind::Function);
    }

    #[test]
    fn test_export_flags() {
        let out = analyse();
        let find = |name: &str| out.symbols.iter().find(|s| s.name == name).unwrap();

        assert!(find("UserService").exported);
        assert!(find("formatName").exported);
        // Default export gets the flag through its export statement.
        assert!(find("main").exported);
        assert!(!find("createUser").exported);
    }

    #[test]
    fn test_member_visibility() {
        let out = analyse();
        let find = |name: &str| out.symbols.iter().find(|s| s.name == name).unwrap();
        assert_eq!(find("build").visibility, Visibility::Private);
        assert_eq!(find("createUser").visibility, Visibility::Unknown);
    }

    #[test]
    fn test_imports_include_reexports() {
        let out = analyse();
        let specs: Vec<_> = out.imports.iter().map(|i| i.specifier.as_str()).collect();
        assert_eq!(specs, vec!["./repository", "./persistence"]);
    }

    #[test]
    fn test_calls() {
        let out = analyse();
        assert!(out
            .calls
            .iter()
            .any(|c| c.callee == "save" && c.qualifier.as_deref() == Some("this.repo")));
        assert!(out.calls.iter().any(|c| c.callee == "UserService"));
        assert!(out
            .calls
            .iter()
            .any(|c| c.callee == "createUser" && c.qualifier.as_deref() == Some("svc")));
    }

    #[test]
    fn test_commonjs_require() {
        let js = r#"const lib = require("./lib");
function run() { return lib.go(); }
"#;
        let out = TsAnalyser::new(Lang::JavaScript).parse_file(Path::new("run.js"), js);
        assert_eq!(out.imports.len(), 1);
        assert_eq!(out.imports[0].specifier, "./lib");
    }
}
