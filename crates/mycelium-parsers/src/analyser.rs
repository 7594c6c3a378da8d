//! The analyser contract every language implements, plus the lazy registry.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use mycelium_core::types::{Lang, SymbolKind, Visibility};

use crate::languages;

/// A declaration as extracted from one file, before global id assignment.
#[derive(Debug, Clone)]
pub struct RawSymbol {
    pub name: String,
    pub kind: SymbolKind,
    /// 1-based declaration line.
    pub line: u32,
    /// 1-based last line of the declaration body.
    pub end_line: u32,
    pub visibility: Visibility,
    pub exported: bool,
    /// Index of the containing symbol within the same [`FileAnalysis`].
    pub parent: Option<usize>,
    pub namespace: Option<String>,
    /// Attribute / annotation / decorator names on the declaration.
    pub attributes: Vec<String>,
    /// Base type names (extends + implements), unresolved.
    pub bases: Vec<String>,
    /// Constructor-injected name → type name (C# DI support).
    pub injected_types: Vec<(String, String)>,
}

impl RawSymbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, line: u32, end_line: u32) -> Self {
        RawSymbol {
            name: name.into(),
            kind,
            line,
            end_line,
            visibility: Visibility::Unknown,
            exported: false,
            parent: None,
            namespace: None,
            attributes: Vec::new(),
            bases: Vec::new(),
            injected_types: Vec::new(),
        }
    }
}

/// An import statement as written, with the specifier the resolver works on.
#[derive(Debug, Clone)]
pub struct RawImport {
    /// The statement text as it appears in source.
    pub raw: String,
    /// The resolvable part: namespace, module path, or file specifier.
    pub specifier: String,
    pub line: u32,
}

/// An unresolved call site.
#[derive(Debug, Clone)]
pub struct RawCall {
    pub callee: String,
    /// Receiver or qualifier expression (`svc`, `Foo.Bar`), if any.
    pub qualifier: Option<String>,
    pub line: u32,
}

/// Complete extraction output for a single file.
#[derive(Debug, Clone, Default)]
pub struct FileAnalysis {
    pub symbols: Vec<RawSymbol>,
    pub imports: Vec<RawImport>,
    pub calls: Vec<RawCall>,
}

/// The capability set every language analyser exposes.
///
/// Implementations must be total: a malformed or partially parsed file
/// yields whatever was recoverable. They must be `Send + Sync` so Phase 2
/// can fan out over rayon.
pub trait LanguageAnalyser: Send + Sync {
    fn language(&self) -> Lang;

    /// Whether the grammar for this language could be loaded. Files of an
    /// unavailable language degrade to FileNode-only.
    fn is_available(&self) -> bool {
        true
    }

    /// Parse one file and extract symbols, imports, and call sites.
    fn parse_file(&self, path: &Path, content: &str) -> FileAnalysis;

    /// Symbol/qualifier strings excluded from call resolution.
    fn builtin_exclusions(&self) -> &'static [&'static str];
}

/// Lazily constructed analyser registry keyed by language, so unused
/// grammars are never loaded.
pub struct AnalyserRegistry {
    built: Mutex<HashMap<Lang, Arc<dyn LanguageAnalyser>>>,
}

impl AnalyserRegistry {
    pub fn new() -> Self {
        AnalyserRegistry {
            built: Mutex::new(HashMap::new()),
        }
    }

    /// The analyser for a language, constructing it on first use.
    pub fn analyser_for(&self, lang: Lang) -> Arc<dyn LanguageAnalyser> {
        let mut built = self.built.lock().unwrap();
        built
            .entry(lang)
            .or_insert_with(|| languages::build_analyser(lang))
            .clone()
    }
}

impl Default for AnalyserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_builds_every_language() {
        let registry = AnalyserRegistry::new();
        for lang in [
            Lang::CSharp,
            Lang::VbNet,
            Lang::TypeScript,
            Lang::JavaScript,
            Lang::Python,
            Lang::Java,
            Lang::Go,
            Lang::Rust,
            Lang::C,
            Lang::Cpp,
        ] {
            let analyser = registry.analyser_for(lang);
            assert_eq!(analyser.language(), lang);
            assert!(analyser.is_available());
        }
    }

    #[test]
    fn test_registry_reuses_instances() {
        let registry = AnalyserRegistry::new();
        let a = registry.analyser_for(Lang::Python);
        let b = registry.analyser_for(Lang::Python);
        assert!(Arc::ptr_eq(&a, &b));
    }
}
