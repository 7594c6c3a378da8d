use super::*;
use mycelium_core::types::{CallEdge, CallTier, FileNode, Symbol, SymbolKind, Visibility};

fn add_symbol(graph: &mut KnowledgeGraph, id: &str, name: &str, file: &str) {
    if graph.file(file).is_none() {
        graph.add_file(FileNode {
            path: file.to_string(),
            lang: Some(Lang::Python),
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
        exported: true,
        parent: None,
        lang: Lang::Python,
        namespace: None,
        attributes: vec![],
        bases: vec![],
        injected_types: vec![],
    });
}

fn call(graph: &mut KnowledgeGraph, from: &str, to: &str) {
    graph.add_call(&CallEdge {
        from: from.to_string(),
        to: to.to_string(),
        confidence: 0.9,
        tier: CallTier::A,
        reason: "import-resolved".to_string(),
        line: 1,
    });
}

/// Two dense triangles bridged by one weak edge.
fn two_cluster_graph() -> KnowledgeGraph {
    let mut graph = KnowledgeGraph::new();
    for (i, file) in [(1, "users/a.py"), (2, "users/b.py"), (3, "users/c.py")] {
        add_symbol(&mut graph, &format!("sym_000{i}"), &format!("u{i}"), file);
    }
    for (i, file) in [(4, "billing/a.py"), (5, "billing/b.py"), (6, "billing/c.py")] {
        add_symbol(&mut graph, &format!("sym_000{i}"), &format!("b{i}"), file);
    }
    for (a, b) in [(1, 2), (2, 3), (1, 3), (4, 5), (5, 6), (4, 6)] {
        call(&mut graph, &format!("sym_000{a}"), &format!("sym_000{b}"));
    }
    // One bridge between the clusters.
    graph.add_call(&CallEdge {
        from: "sym_0001".to_string(),
        to: "sym_0004".to_string(),
        confidence: 0.3,
        tier: CallTier::C,
        reason: "fuzzy".to_string(),
        line: 1,
    });
    graph
}

#[test]
fn test_two_clusters_found() {
    let mut graph = two_cluster_graph();
    let communities = run(&mut graph, &AnalysisOptions::default());
    assert_eq!(communities.len(), 2);
    assert_eq!(communities[0].members.len(), 3);
    assert_eq!(communities[1].members.len(), 3);
    assert_eq!(communities[0].id, "community_1");
    assert_eq!(communities[1].id, "community_2");
}

#[test]
fn test_labels_from_path_prefix() {
    let mut graph = two_cluster_graph();
    let communities = run(&mut graph, &AnalysisOptions::default());
    let mut labels: Vec<&str> = communities.iter().map(|c| c.label.as_str()).collect();
    labels.sort();
    assert_eq!(labels, vec!["billing", "users"]);
}

#[test]
fn test_cohesion_bounds() {
    let mut graph = two_cluster_graph();
    let communities = run(&mut graph, &AnalysisOptions::default());
    for community in &communities {
        assert!(community.cohesion > 0.0);
        assert!(community.cohesion <= 1.0);
    }
    // A triangle with capped weights is maximally connected.
    assert!(communities[0].cohesion > 0.8);
}

#[test]
fn test_singletons_discarded() {
    let mut graph = KnowledgeGraph::new();
    add_symbol(&mut graph, "sym_0001", "a", "x.py");
    add_symbol(&mut graph, "sym_0002", "b", "x.py");
    add_symbol(&mut graph, "sym_0003", "c", "y.py");
    // a↔b pair plus one c with no edges at all — c never enters the
    // projection; a lone pair forms one community.
    call(&mut graph, "sym_0001", "sym_0002");
    let communities = run(&mut graph, &AnalysisOptions::default());
    assert_eq!(communities.len(), 1);
    assert_eq!(communities[0].members.len(), 2);
}

#[test]
fn test_empty_graph_no_communities() {
    let mut graph = KnowledgeGraph::new();
    let communities = run(&mut graph, &AnalysisOptions::default());
    assert!(communities.is_empty());
}

#[test]
fn test_primary_language_mode() {
    let mut graph = two_cluster_graph();
    let communities = run(&mut graph, &AnalysisOptions::default());
    assert_eq!(communities[0].lang, Lang::Python);
}

#[test]
fn test_louvain_deterministic() {
    let graph = two_cluster_graph();
    let projection = Projection::build(&graph);
    let first = louvain(&projection.adjacency, 1.0);
    let second = louvain(&projection.adjacency, 1.0);
    assert_eq!(first, second);
}
