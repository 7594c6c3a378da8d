//! The sequential six-phase orchestrator.
//!
//! Phases run strictly in order; the cancellation token is checked between
//! phases (and between files inside the phases). Invariants are verified
//! before the result is handed to the caller, so a partial artifact can
//! never be written.

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use mycelium_core::cancel::CancellationToken;
use mycelium_core::config::AnalysisOptions;
use mycelium_core::graph::KnowledgeGraph;
use mycelium_core::namespace::NamespaceIndex;
use mycelium_core::symbols::SymbolTable;
use mycelium_core::types::{
    AnalysisError, Community, PackageReference, PhaseTiming, Process, ProjectReference,
    UnresolvedImport,
};
use mycelium_parsers::analyser::AnalyserRegistry;
use mycelium_parsers::walker::StructureWalker;

use crate::{calls, community, imports, parsing, process};

/// Everything one pipeline run produces. Owned by the run; nothing outlives
/// the invocation.
pub struct Analysis {
    pub root_name: String,
    pub graph: KnowledgeGraph,
    pub symbols: SymbolTable,
    pub namespaces: NamespaceIndex,
    pub communities: Vec<Community>,
    pub processes: Vec<Process>,
    pub unresolved_imports: Vec<UnresolvedImport>,
    pub project_references: Vec<ProjectReference>,
    pub package_references: Vec<PackageReference>,
    pub timings: Vec<PhaseTiming>,
}

pub fn run(
    root: &Path,
    options: &AnalysisOptions,
    token: &CancellationToken,
) -> Result<Analysis, AnalysisError> {
    if !root.is_dir() {
        return Err(AnalysisError::InvalidRoot(root.display().to_string()));
    }
    let root_name = root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "repository".to_string());

    let mut graph = KnowledgeGraph::new();
    let mut table = SymbolTable::new();
    let mut namespaces = NamespaceIndex::new();
    let registry = AnalyserRegistry::new();
    let mut timings = Vec::new();

    // Phase 1: structure.
    let started = Instant::now();
    let walker = StructureWalker::new(root, &options.exclude, options.max_file_size);
    let walk = walker.walk();
    for file in &walk.files {
        graph.add_file(file.clone());
    }
    for folder in &walk.folders {
        graph.add_folder(folder.clone());
    }
    record(&mut timings, "structure", started);
    check(token)?;

    // Phase 2: parsing.
    let started = Instant::now();
    let analyses = parsing::run(
        &mut graph,
        &mut table,
        &mut namespaces,
        &registry,
        root,
        options,
        token,
    )?;
    record(&mut timings, "parsing", started);
    check(token)?;

    // Phase 3: imports.
    let started = Instant::now();
    let import_outcome = imports::run(&mut graph, &mut namespaces, &analyses, &walk, root, token)?;
    record(&mut timings, "imports", started);
    check(token)?;

    // Phase 4: calls.
    let started = Instant::now();
    calls::run(&mut graph, &table, &analyses, &registry, token)?;
    record(&mut timings, "calls", started);
    check(token)?;

    // Phase 5: communities.
    let started = Instant::now();
    let communities = community::run(&mut graph, options);
    record(&mut timings, "communities", started);
    check(token)?;

    // Phase 6: processes.
    let started = Instant::now();
    let processes = process::run(&graph, &communities, options);
    record(&mut timings, "processes", started);
    check(token)?;

    let analysis = Analysis {
        root_name,
        graph,
        symbols: table,
        namespaces,
        communities,
        processes,
        unresolved_imports: import_outcome.unresolved,
        project_references: import_outcome.project_references,
        package_references: import_outcome.package_references,
        timings,
    };
    verify_invariants(&analysis)?;
    Ok(analysis)
}

fn record(timings: &mut Vec<PhaseTiming>, phase: &str, started: Instant) {
    timings.push(PhaseTiming {
        phase: phase.to_string(),
        millis: started.elapsed().as_millis() as u64,
    });
}

fn check(token: &CancellationToken) -> Result<(), AnalysisError> {
    if token.is_cancelled() {
        Err(AnalysisError::Cancelled)
    } else {
        Ok(())
    }
}

/// Structural invariants that must hold before anything is emitted.
/// Violations here are implementation bugs, not user-input problems.
fn verify_invariants(analysis: &Analysis) -> Result<(), AnalysisError> {
    let graph = &analysis.graph;

    for symbol in graph.symbols() {
        if graph.file(&symbol.file).is_none() {
            return Err(AnalysisError::Invariant {
                phase: "parsing",
                detail: format!("symbol {} declared in unknown file {}", symbol.id, symbol.file),
            });
        }
        if let Some(parent) = &symbol.parent {
            match graph.symbol(parent) {
                Some(parent_symbol) if parent_symbol.file == symbol.file => {}
                Some(_) => {
                    return Err(AnalysisError::Invariant {
                        phase: "parsing",
                        detail: format!("symbol {} has parent in another file", symbol.id),
                    });
                }
                None => {
                    return Err(AnalysisError::Invariant {
                        phase: "parsing",
                        detail: format!("symbol {} has unknown parent {parent}", symbol.id),
                    });
                }
            }
        }
    }

    let mut call_pairs: HashSet<(String, String)> = HashSet::new();
    for edge in graph.call_edges() {
        if graph.symbol(&edge.from).is_none() || graph.symbol(&edge.to).is_none() {
            return Err(AnalysisError::Invariant {
                phase: "calls",
                detail: format!("call edge {} → {} has missing endpoint", edge.from, edge.to),
            });
        }
        const ALLOWED: [f64; 4] = [0.3, 0.5, 0.85, 0.9];
        if !ALLOWED.iter().any(|c| (edge.confidence - c).abs() < 1e-9) {
            return Err(AnalysisError::Invariant {
                phase: "calls",
                detail: format!("call edge carries confidence {}", edge.confidence),
            });
        }
        call_pairs.insert((edge.from, edge.to));
    }

    for community in &analysis.communities {
        if community.members.len() < 2 {
            return Err(AnalysisError::Invariant {
                phase: "communities",
                detail: format!("{} is a singleton", community.id),
            });
        }
    }

    for process in &analysis.processes {
        let unique: HashSet<&String> = process.steps.iter().collect();
        if unique.len() != process.steps.len() {
            return Err(AnalysisError::Invariant {
                phase: "processes",
                detail: format!("{} repeats a symbol", process.id),
            });
        }
        for pair in process.steps.windows(2) {
            let key = (pair[0].clone(), pair[1].clone());
            if !call_pairs.contains(&key) {
                return Err(AnalysisError::Invariant {
                    phase: "processes",
                    detail: format!("{} steps over a missing call edge", process.id),
                });
            }
        }
    }

    Ok(())
}
