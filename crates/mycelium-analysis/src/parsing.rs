//! Phase 2: per-file extraction and global symbol registration.
//!
//! Extraction runs in parallel over rayon; id assignment then happens in a
//! single serial pass over files sorted by path, so symbol ids are
//! deterministic for a given repository regardless of worker scheduling.

use std::collections::BTreeMap;
use std::path::Path;

use rayon::prelude::*;

use mycelium_core::cancel::CancellationToken;
use mycelium_core::config::AnalysisOptions;
use mycelium_core::graph::KnowledgeGraph;
use mycelium_core::namespace::NamespaceIndex;
use mycelium_core::symbols::SymbolTable;
use mycelium_core::types::{symbol_id, AnalysisError, Symbol};
use mycelium_parsers::analyser::{AnalyserRegistry, FileAnalysis};

/// Raw per-file extraction results, kept for the import and call phases.
pub type FileAnalyses = BTreeMap<String, FileAnalysis>;

pub fn run(
    graph: &mut KnowledgeGraph,
    table: &mut SymbolTable,
    namespaces: &mut NamespaceIndex,
    registry: &AnalyserRegistry,
    root: &Path,
    options: &AnalysisOptions,
    token: &CancellationToken,
) -> Result<FileAnalyses, AnalysisError> {
    // Files are already in sorted order in the graph; jobs keep that order.
    let jobs: Vec<(String, mycelium_core::types::Lang)> = graph
        .files()
        .filter(|f| f.parseable)
        .filter_map(|f| f.lang.map(|lang| (f.path.clone(), lang)))
        .filter(|(_, lang)| options.wants(*lang))
        .filter(|(_, lang)| registry.analyser_for(*lang).is_available())
        .collect();

    if token.is_cancelled() {
        return Err(AnalysisError::Cancelled);
    }

    let extracted: Vec<(String, FileAnalysis)> = jobs
        .par_iter()
        .map(|(path, lang)| {
            let analyser = registry.analyser_for(*lang);
            let absolute = root.join(path);
            let analysis = match std::fs::read_to_string(&absolute) {
                Ok(content) => analyser.parse_file(Path::new(path), &content),
                Err(e) => {
                    eprintln!("mycelium: warning: cannot read {path}: {e}");
                    FileAnalysis::default()
                }
            };
            (path.clone(), analysis)
        })
        .collect();

    // Serial id assignment over path-sorted files.
    let mut analyses: FileAnalyses = BTreeMap::new();
    let mut sequence = 0usize;
    for (path, analysis) in extracted {
        if token.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let lang = graph
            .file(&path)
            .and_then(|f| f.lang)
            .expect("parse job came from a file node");

        let ids: Vec<String> = analysis
            .symbols
            .iter()
            .map(|_| {
                sequence += 1;
                symbol_id(sequence)
            })
            .collect();

        for (raw, id) in analysis.symbols.iter().zip(&ids) {
            let symbol = Symbol {
                id: id.clone(),
                name: raw.name.clone(),
                kind: raw.kind,
                file: path.clone(),
                line: raw.line,
                end_line: raw.end_line,
                visibility: raw.visibility,
                exported: raw.exported,
                parent: raw.parent.map(|p| ids[p].clone()),
                lang,
                namespace: raw.namespace.clone(),
                attributes: raw.attributes.clone(),
                bases: raw.bases.clone(),
                injected_types: raw.injected_types.clone(),
            };
            if let Some(ns) = &symbol.namespace {
                namespaces.insert(ns, &path);
            }
            table.insert(&path, &symbol.name, &symbol.id);
            graph.add_symbol(symbol);
        }

        analyses.insert(path, analysis);
    }

    Ok(analyses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mycelium_core::types::{FileNode, Lang};
    use std::fs;
    use tempfile::TempDir;

    fn setup(files: &[(&str, &str)]) -> (TempDir, KnowledgeGraph) {
        let dir = TempDir::new().unwrap();
        let mut graph = KnowledgeGraph::new();
        let mut sorted: Vec<_> = files.to_vec();
        sorted.sort_by_key(|(path, _)| path.to_string());
        for (path, content) in sorted {
            let absolute = dir.path().join(path);
            fs::create_dir_all(absolute.parent().unwrap()).unwrap();
            fs::write(&absolute, content).unwrap();
            let ext = Path::new(path).extension().and_then(|e| e.to_str()).unwrap();
            graph.add_file(FileNode {
                path: path.to_string(),
                lang: Lang::from_extension(ext),
                size: content.len() as u64,
                lines: content.lines().count() as u32,
                parseable: true,
            });
        }
        (dir, graph)
    }

    #[test]
    fn test_ids_follow_path_then_declaration_order() {
        let (dir, mut graph) = setup(&[
            ("b.py", "def beta(): pass\n"),
            ("a.py", "def alpha(): pass\n\ndef gamma(): pass\n"),
        ]);
        let mut table = SymbolTable::new();
        let mut ns = NamespaceIndex::new();
        let registry = AnalyserRegistry::new();

        run(
            &mut graph,
            &mut table,
            &mut ns,
            &registry,
            dir.path(),
            &AnalysisOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(table.lookup("a.py", "alpha"), Some("sym_0001"));
        assert_eq!(table.lookup("a.py", "gamma"), Some("sym_0002"));
        assert_eq!(table.lookup("b.py", "beta"), Some("sym_0003"));
    }

    #[test]
    fn test_parent_ids_resolved_within_file() {
        let (dir, mut graph) = setup(&[(
            "svc.py",
            "class Service:\n    def run(self):\n        pass\n",
        )]);
        let mut table = SymbolTable::new();
        let mut ns = NamespaceIndex::new();
        let registry = AnalyserRegistry::new();

        run(
            &mut graph,
            &mut table,
            &mut ns,
            &registry,
            dir.path(),
            &AnalysisOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap();

        let class_id = table.lookup("svc.py", "Service").unwrap().to_string();
        let method_id = table.lookup("svc.py", "run").unwrap().to_string();
        let method = graph.symbol(&method_id).unwrap();
        assert_eq!(method.parent.as_deref(), Some(class_id.as_str()));
        // Parent lives in the same file.
        assert_eq!(graph.symbol(&class_id).unwrap().file, method.file);
    }

    #[test]
    fn test_namespace_index_populated() {
        let (dir, mut graph) = setup(&[(
            "pkg/main.go",
            "package pkg\n\nfunc Run() {}\n",
        )]);
        let mut table = SymbolTable::new();
        let mut ns = NamespaceIndex::new();
        let registry = AnalyserRegistry::new();

        run(
            &mut graph,
            &mut table,
            &mut ns,
            &registry,
            dir.path(),
            &AnalysisOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(ns.files("pkg"), vec!["pkg/main.go"]);
    }

    #[test]
    fn test_language_restriction_skips_files() {
        let (dir, mut graph) = setup(&[
            ("a.py", "def alpha(): pass\n"),
            ("b.go", "package b\n\nfunc Beta() {}\n"),
        ]);
        let mut table = SymbolTable::new();
        let mut ns = NamespaceIndex::new();
        let registry = AnalyserRegistry::new();
        let options = AnalysisOptions {
            languages: Some(vec![Lang::Python]),
            ..Default::default()
        };

        run(
            &mut graph,
            &mut table,
            &mut ns,
            &registry,
            dir.path(),
            &options,
            &CancellationToken::new(),
        )
        .unwrap();

        assert!(table.lookup("a.py", "alpha").is_some());
        assert!(table.lookup("b.go", "Beta").is_none());
    }

    #[test]
    fn test_cancellation() {
        let (dir, mut graph) = setup(&[("a.py", "def alpha(): pass\n")]);
        let mut table = SymbolTable::new();
        let mut ns = NamespaceIndex::new();
        let registry = AnalyserRegistry::new();
        let token = CancellationToken::new();
        token.cancel();

        let result = run(
            &mut graph,
            &mut table,
            &mut ns,
            &registry,
            dir.path(),
            &AnalysisOptions::default(),
            &token,
        );
        assert!(matches!(result, Err(AnalysisError::Cancelled)));
    }
}
