use super::*;
use mycelium_core::types::{
    CallEdge, CallTier, FileNode, Lang, Symbol, SymbolKind, Visibility,
};

fn add_symbol(graph: &mut KnowledgeGraph, id: &str, name: &str, file: &str, exported: bool) {
    if graph.file(file).is_none() {
        graph.add_file(FileNode {
            path: file.to_string(),
            lang: Some(Lang::TypeScript),
            size: 1,
            lines: 100,
            parseable: true,
        });
    }
    graph.add_symbol(Symbol {
        id: id.to_string(),
        name: name.to_string(),
        kind: SymbolKind::Function,
        file: file.to_string(),
        line: 1,
        end_line: 2,
        visibility: Visibility::Public,
        exported,
        parent: None,
        lang: Lang::TypeScript,
        namespace: None,
        attributes: vec![],
        bases: vec![],
        injected_types: vec![],
    });
}

fn call(graph: &mut KnowledgeGraph, from: &str, to: &str, confidence: f64) {
    graph.add_call(&CallEdge {
        from: from.to_string(),
        to: to.to_string(),
        confidence,
        tier: CallTier::A,
        reason: "import-resolved".to_string(),
        line: 1,
    });
}

/// handleCreate → createUser → save, plus a low-scoring leaf logger.
fn chain_graph() -> KnowledgeGraph {
    let mut graph = KnowledgeGraph::new();
    add_symbol(&mut graph, "sym_0001", "handleCreate", "src/controller.ts", true);
    add_symbol(&mut graph, "sym_0002", "createUser", "src/service.ts", true);
    add_symbol(&mut graph, "sym_0003", "save", "src/repository.ts", true);
    add_symbol(&mut graph, "sym_0004", "info", "src/Utils/logger.ts", true);
    call(&mut graph, "sym_0001", "sym_0002", 0.9);
    call(&mut graph, "sym_0002", "sym_0003", 0.9);
    call(&mut graph, "sym_0001", "sym_0004", 0.5);
    call(&mut graph, "sym_0002", "sym_0004", 0.5);
    graph
}

#[test]
fn test_entry_scoring_prefers_handlers_over_utilities() {
    let graph = chain_graph();
    let scores = score_entry_points(&graph);
    assert!(scores["sym_0001"] > scores["sym_0004"]);
    assert!(scores["sym_0002"] > scores["sym_0004"]);
}

#[test]
fn test_entry_patterns() {
    assert!(matches_entry_pattern("UserController"));
    assert!(matches_entry_pattern("handleCreate"));
    assert!(matches_entry_pattern("onMessage"));
    assert!(matches_entry_pattern("Main"));
    assert!(matches_entry_pattern("MapOrderEndpoints"));
    assert!(matches_entry_pattern("ConfigureServices"));
    assert!(!matches_entry_pattern("save"));
    assert!(!matches_entry_pattern("Mapper"));
}

#[test]
fn test_trace_produces_full_chain() {
    let graph = chain_graph();
    let processes = run(&graph, &[], &AnalysisOptions::default());
    assert!(!processes.is_empty());
    let top = &processes[0];
    assert_eq!(
        top.steps,
        vec!["sym_0001", "sym_0002", "sym_0003"],
    );
    assert_eq!(top.entry, "sym_0001");
    assert_eq!(top.terminal, "sym_0003");
    assert!((top.confidence - 0.81).abs() < 1e-9);
}

#[test]
fn test_subpaths_deduplicated() {
    let graph = chain_graph();
    let processes = run(&graph, &[], &AnalysisOptions::default());
    // createUser → save is a contiguous subsequence of the full chain
    // and must not appear on its own.
    assert!(!processes
        .iter()
        .any(|p| p.steps == vec!["sym_0002".to_string(), "sym_0003".to_string()]));
}

#[test]
fn test_cycle_does_not_hang() {
    let mut graph = KnowledgeGraph::new();
    add_symbol(&mut graph, "sym_0001", "handleA", "a.ts", true);
    add_symbol(&mut graph, "sym_0002", "handleB", "b.ts", true);
    call(&mut graph, "sym_0001", "sym_0002", 0.9);
    call(&mut graph, "sym_0002", "sym_0001", 0.9);
    let processes = run(&graph, &[], &AnalysisOptions::default());
    for process in &processes {
        let unique: HashSet<&String> = process.steps.iter().collect();
        assert_eq!(unique.len(), process.steps.len(), "steps must be simple");
    }
}

#[test]
fn test_classification() {
    let graph = chain_graph();
    let community = Community {
        id: "community_1".to_string(),
        label: "src".to_string(),
        members: vec!["sym_0001".to_string(), "sym_0002".to_string(), "sym_0003".to_string()],
        cohesion: 0.5,
        lang: Lang::TypeScript,
    };
    let processes = run(&graph, &[community], &AnalysisOptions::default());
    let top = processes
        .iter()
        .find(|p| p.steps == vec!["sym_0001", "sym_0002", "sym_0003"])
        .unwrap();
    assert_eq!(top.kind, ProcessKind::IntraCommunity);

    let crossing = processes
        .iter()
        .find(|p| p.steps.contains(&"sym_0004".to_string()));
    if let Some(crossing) = crossing {
        assert_eq!(crossing.kind, ProcessKind::CrossCommunity);
    }
}

#[test]
fn test_min_steps_filters_short_candidates() {
    let mut graph = KnowledgeGraph::new();
    add_symbol(&mut graph, "sym_0001", "lonely", "a.ts", true);
    let processes = run(&graph, &[], &AnalysisOptions::default());
    assert!(processes.is_empty());
}

#[test]
fn test_test_files_excluded_from_entries() {
    let mut graph = KnowledgeGraph::new();
    add_symbol(&mut graph, "sym_0001", "handleThing", "tests/handler.ts", true);
    add_symbol(&mut graph, "sym_0002", "helper", "tests/helper.ts", true);
    call(&mut graph, "sym_0001", "sym_0002", 0.9);
    let processes = run(&graph, &[], &AnalysisOptions::default());
    assert!(processes.is_empty());
}
