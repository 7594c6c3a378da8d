//! Shared tree-sitter plumbing for the grammar-backed analysers.

use std::sync::Mutex;

use tree_sitter::{Language, Node, Parser, Tree};

use mycelium_core::types::Lang;

/// Grammar lookup. VB.NET has no published grammar crate; its analyser is a
/// line scanner and never asks for one.
pub fn grammar_for(lang: Lang) -> Option<Language> {
    match lang {
        Lang::CSharp => Some(tree_sitter_c_sharp::LANGUAGE.into()),
        Lang::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        Lang::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
        Lang::Python => Some(tree_sitter_python::LANGUAGE.into()),
        Lang::Java => Some(tree_sitter_java::LANGUAGE.into()),
        Lang::Go => Some(tree_sitter_go::LANGUAGE.into()),
        Lang::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
        Lang::C => Some(tree_sitter_c::LANGUAGE.into()),
        Lang::Cpp => Some(tree_sitter_cpp::LANGUAGE.into()),
        Lang::VbNet => None,
    }
}

/// The TSX dialect needs its own grammar.
pub fn tsx_grammar() -> Language {
    tree_sitter_typescript::LANGUAGE_TSX.into()
}

/// A reusable parser behind a mutex so analysers stay `Send + Sync` and can
/// be shared across rayon workers.
pub struct ParserEngine {
    inner: Mutex<Parser>,
}

impl ParserEngine {
    pub fn new() -> Self {
        ParserEngine {
            inner: Mutex::new(Parser::new()),
        }
    }

    /// Parse `source` with the given grammar. Returns `None` on grammar
    /// version mismatch or parser failure; callers degrade to an empty
    /// analysis.
    pub fn parse(&self, grammar: &Language, source: &str) -> Option<Tree> {
        let mut parser = self.inner.lock().unwrap();
        parser.set_language(grammar).ok()?;
        parser.parse(source, None)
    }
}

impl Default for ParserEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// UTF-8 text of a node, empty on decode failure.
pub fn node_text<'a>(node: Node<'a>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// 1-based start line.
pub fn start_line(node: Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

/// 1-based end line.
pub fn end_line(node: Node<'_>) -> u32 {
    node.end_position().row as u32 + 1
}
