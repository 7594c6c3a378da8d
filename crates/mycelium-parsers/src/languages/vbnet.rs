//! VB.NET analyser.
//!
//! No published grammar crate exists for VB.NET, so this analyser is a
//! line-structured scanner over the block keywords (`Module … End Module`,
//! `Sub … End Sub`, …). VB's line orientation makes this reliable enough
//! for structural extraction; the analyser still reports itself available.

use std::path::Path;

use mycelium_core::types::{Lang, SymbolKind, Visibility};

use crate::analyser::{FileAnalysis, LanguageAnalyser, RawCall, RawImport, RawSymbol};

const BUILTINS: &[&str] = &[
    "Console", "MsgBox", "CStr", "CInt", "CLng", "CDbl", "CBool", "CDate", "CType",
    "DirectCast", "TryCast", "IsNothing", "IsNumeric", "String", "Math", "Convert",
    "Format", "Len", "Mid", "Trim", "UCase", "LCase", "Throw", "GetType",
];

const KEYWORDS: &[&str] = &[
    "If", "Then", "Else", "ElseIf", "While", "Do", "Loop", "For", "Each", "Next",
    "Select", "Case", "Until", "Return", "Throw", "Try", "Catch", "Finally", "Using",
    "With", "Not", "And", "Or", "AndAlso", "OrElse", "Xor", "Mod", "Is", "IsNot",
    "New", "Call", "Dim", "Set", "Get", "Let", "Sub", "Function", "Property", "End",
    "Module", "Class", "Structure", "Interface", "Enum", "Namespace", "Imports",
    "Inherits", "Implements", "Handles", "AddressOf", "Me", "MyBase", "Nothing",
    "True", "False", "ByVal", "ByRef", "Optional", "As",
];

const MODIFIERS: &[&str] = &[
    "Public", "Private", "Friend", "Protected", "Shared", "Shadows", "Overrides",
    "Overridable", "MustOverride", "NotOverridable", "MustInherit", "NotInheritable",
    "Partial", "ReadOnly", "WriteOnly", "Default", "Overloads", "Async", "Iterator",
    "Const", "WithEvents",
];

pub struct VbNetAnalyser;

impl VbNetAnalyser {
    pub fn new() -> Self {
        VbNetAnalyser
    }
}

impl Default for VbNetAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Block {
    Namespace,
    Container,
    Routine,
}

struct OpenBlock {
    block: Block,
    symbol: Option<usize>,
}

impl LanguageAnalyser for VbNetAnalyser {
    fn language(&self) -> Lang {
        Lang::VbNet
    }

    fn parse_file(&self, _path: &Path, content: &str) -> FileAnalysis {
        let mut out = FileAnalysis::default();
        let mut stack: Vec<OpenBlock> = Vec::new();
        let mut namespaces: Vec<String> = Vec::new();
        let mut last_line = 0u32;

        for (i, raw_line) in content.lines().enumerate() {
            let line_no = i as u32 + 1;
            last_line = line_no;
            let line = strip_strings_and_comment(raw_line);
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("Imports ") {
                out.imports.push(RawImport {
                    raw: raw_line.trim().to_string(),
                    specifier: rest.trim().split('=').next_back().unwrap_or("").trim().to_string(),
                    line: line_no,
                });
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("Namespace ") {
                namespaces.push(rest.trim().to_string());
                stack.push(OpenBlock {
                    block: Block::Namespace,
                    symbol: None,
                });
                continue;
            }

            if let Some(ended) = trimmed.strip_prefix("End ") {
                // `End If`, `End Get`, `End Try`, … never open a block here,
                // so only the block-opening keywords may pop.
                let closes = match ended.trim() {
                    "Namespace" => Some(Block::Namespace),
                    "Module" | "Class" | "Structure" | "Interface" | "Enum" => {
                        Some(Block::Container)
                    }
                    "Sub" | "Function" => Some(Block::Routine),
                    _ => None,
                };
                if closes.is_some() && stack.last().map(|b| b.block) == closes {
                    let open = stack.pop().unwrap();
                    if open.block == Block::Namespace {
                        namespaces.pop();
                    }
                    if let Some(idx) = open.symbol {
                        out.symbols[idx].end_line = line_no;
                    }
                }
                continue;
            }

            let (modifiers, rest) = split_modifiers(trimmed);
            let explicit_vis = visibility_from(&modifiers);

            if let Some((keyword, name)) = container_declaration(rest) {
                let kind = match keyword {
                    "Module" => SymbolKind::Module,
                    "Class" => SymbolKind::Class,
                    "Structure" => SymbolKind::Struct,
                    "Interface" => SymbolKind::Interface,
                    _ => SymbolKind::Enum,
                };
                let top_level = !stack.iter().any(|b| b.block == Block::Container);
                let vis = explicit_vis.unwrap_or(Visibility::Internal);
                let mut sym = RawSymbol::new(name, kind, line_no, line_no);
                sym.visibility = vis;
                sym.exported =
                    vis == Visibility::Public || (vis == Visibility::Internal && top_level);
                sym.parent = current_container(&stack);
                sym.namespace = if namespaces.is_empty() {
                    None
                } else {
                    Some(namespaces.join("."))
                };
                out.symbols.push(sym);
                stack.push(OpenBlock {
                    block: Block::Container,
                    symbol: Some(out.symbols.len() - 1),
                });
                continue;
            }

            if let Some(rest) = rest.strip_prefix("Inherits ") {
                append_bases(&stack, &mut out, rest);
                continue;
            }
            if let Some(rest) = rest.strip_prefix("Implements ") {
                if stack.last().map(|b| b.block) == Some(Block::Container) {
                    append_bases(&stack, &mut out, rest);
                }
                continue;
            }

            if let Some((kind, name, has_body)) = routine_declaration(rest, &modifiers, &stack) {
                let in_interface =
                    current_container_kind(&stack, &out) == Some(SymbolKind::Interface);
                let vis = explicit_vis.unwrap_or(Visibility::Public);
                let mut sym = RawSymbol::new(name, kind, line_no, line_no);
                sym.visibility = vis;
                sym.exported = vis == Visibility::Public;
                sym.parent = current_container(&stack);
                sym.namespace = if namespaces.is_empty() {
                    None
                } else {
                    Some(namespaces.join("."))
                };
                out.symbols.push(sym);
                if has_body && !in_interface {
                    stack.push(OpenBlock {
                        block: Block::Routine,
                        symbol: Some(out.symbols.len() - 1),
                    });
                }
                continue;
            }

            // Ordinary statement: collect call sites when inside a routine.
            if stack.last().map(|b| b.block) == Some(Block::Routine) {
                for (qualifier, callee) in scan_calls(trimmed) {
                    out.calls.push(RawCall {
                        callee,
                        qualifier,
                        line: line_no,
                    });
                }
            }
        }

        // Unclosed blocks (truncated files) end at the last line.
        for open in stack {
            if let Some(idx) = open.symbol {
                out.symbols[idx].end_line = last_line;
            }
        }
        out
    }

    fn builtin_exclusions(&self) -> &'static [&'static str] {
        BUILTINS
    }
}

/// Blank out string literals and drop the trailing comment so call scanning
/// never matches inside either.
fn strip_strings_and_comment(line: &str) -> String {
    let mut result = String::with_capacity(line.len());
    let mut in_string = false;
    for c in line.chars() {
        match c {
            '"' => {
                in_string = !in_string;
                result.push(' ');
            }
            '\'' if !in_string => break,
            _ if in_string => result.push(' '),
            _ => result.push(c),
        }
    }
    result
}

fn split_modifiers(line: &str) -> (Vec<&str>, &str) {
    let mut modifiers = Vec::new();
    let mut rest = line;
    loop {
        let word = rest.split_whitespace().next().unwrap_or("");
        if MODIFIERS.contains(&word) {
            modifiers.push(word);
            rest = rest[word.len()..].trim_start();
        } else {
            return (modifiers, rest);
        }
    }
}

fn visibility_from(modifiers: &[&str]) -> Option<Visibility> {
    for m in modifiers {
        match *m {
            "Public" => return Some(Visibility::Public),
            "Private" => return Some(Visibility::Private),
            "Friend" => return Some(Visibility::Internal),
            "Protected" => return Some(Visibility::Protected),
            _ => {}
        }
    }
    None
}

fn container_declaration(rest: &str) -> Option<(&str, String)> {
    for keyword in ["Module", "Class", "Structure", "Interface", "Enum"] {
        if let Some(after) = rest.strip_prefix(keyword) {
            if after.starts_with(' ') {
                let name = after.trim().split_whitespace().next().unwrap_or("");
                if !name.is_empty() {
                    return Some((keyword, name.to_string()));
                }
            }
        }
    }
    None
}

fn routine_declaration(
    rest: &str,
    modifiers: &[&str],
    stack: &[OpenBlock],
) -> Option<(SymbolKind, String, bool)> {
    let (keyword, kind) = if rest.starts_with("Sub ") {
        ("Sub ", SymbolKind::Method)
    } else if rest.starts_with("Function ") {
        ("Function ", SymbolKind::Method)
    } else if rest.starts_with("Property ") {
        ("Property ", SymbolKind::Property)
    } else {
        return None;
    };
    let after = rest.strip_prefix(keyword)?;
    let name: String = after
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        return None;
    }

    let in_container = stack.iter().any(|b| b.block == Block::Container);
    let kind = if name == "New" {
        SymbolKind::Constructor
    } else if kind == SymbolKind::Method && !in_container {
        SymbolKind::Function
    } else {
        kind
    };
    // MustOverride members and properties carry no `End` block here.
    let has_body = kind != SymbolKind::Property && !modifiers.contains(&"MustOverride");
    Some((kind, name, has_body))
}

fn current_container(stack: &[OpenBlock]) -> Option<usize> {
    stack
        .iter()
        .rev()
        .find(|b| b.block == Block::Container)
        .and_then(|b| b.symbol)
}

fn current_container_kind(stack: &[OpenBlock], out: &FileAnalysis) -> Option<SymbolKind> {
    current_container(stack).map(|idx| out.symbols[idx].kind)
}

fn append_bases(stack: &[OpenBlock], out: &mut FileAnalysis, rest: &str) {
    if let Some(idx) = stack
        .iter()
        .rev()
        .find(|b| b.block == Block::Container)
        .and_then(|b| b.symbol)
    {
        for base in rest.split(',') {
            let name = base.trim().split('(').next().unwrap_or("").trim();
            if !name.is_empty() {
                out.symbols[idx].bases.push(name.to_string());
            }
        }
    }
}

/// Find `Qualifier.Name(` and `Name(` call sites in one statement line.
/// The `Call` keyword and `New` creations are handled naturally: `Call` is
/// never followed by `(` and `New Foo(...)` yields the type name.
fn scan_calls(line: &str) -> Vec<(Option<String>, String)> {
    let mut calls = Vec::new();
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() {
                let c = bytes[i] as char;
                if c.is_alphanumeric() || c == '_' || c == '.' {
                    i += 1;
                } else {
                    break;
                }
            }
            let chain = &line[start..i];
            let mut j = i;
            while j < bytes.len() && bytes[j] == b' ' {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'(' {
                let first = chain.split('.').next().unwrap_or("");
                if !KEYWORDS.contains(&first) {
                    match chain.rsplit_once('.') {
                        Some((qualifier, callee)) if !callee.is_empty() => {
                            calls.push((Some(qualifier.to_string()), callee.to_string()));
                        }
                        _ => calls.push((None, chain.to_string())),
                    }
                }
            }
        } else {
            i += 1;
        }
    }
    calls
}
