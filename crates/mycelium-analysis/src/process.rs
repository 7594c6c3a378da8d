//! Phase 6: entry-point scoring and flow tracing.
//!
//! Every symbol gets a score combining call-degree ratio, export status,
//! entry-shaped names, framework attributes, utility-path damping, and
//! subtree depth. The top entries are traced with a bounded multi-branch
//! search; candidate flows are deduplicated by contiguous-subsequence and
//! ranked by path confidence.

use std::collections::{HashMap, HashSet};

use mycelium_core::config::AnalysisOptions;
use mycelium_core::graph::KnowledgeGraph;
use mycelium_core::types::{Community, Process, ProcessKind};

const EXPORT_BOOST: f64 = 2.0;
const ENTRY_NAME_BOOST: f64 = 1.5;
const FRAMEWORK_BOOST: f64 = 1.8;
const UTILITY_DAMPING: f64 = 0.3;
const DEPTH_CAP: usize = 5;

/// Ceiling on nodes visited per entry, so pathological fan-out cannot make
/// a trace quadratic in the whole graph.
const TRACE_VISIT_BUDGET: usize = 10_000;

const FRAMEWORK_ATTRIBUTES: &[&str] = &[
    "HttpGet", "HttpPost", "HttpPut", "HttpDelete", "HttpPatch", "Route", "ApiController",
];

const UTILITY_SEGMENTS: &[&str] = &["Utils", "Helpers", "Extensions", "Common"];

pub fn run(
    graph: &KnowledgeGraph,
    communities: &[Community],
    options: &AnalysisOptions,
) -> Vec<Process> {
    let scores = score_entry_points(graph);
    let mut ranked: Vec<(&String, f64)> = scores.iter().map(|(id, s)| (id, *s)).collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    ranked.truncate(2 * options.max_processes);

    let mut candidates: Vec<(Vec<String>, f64)> = Vec::new();
    for (entry, _) in &ranked {
        trace(graph, entry.as_str(), options, &mut candidates);
    }
    candidates.retain(|(steps, _)| steps.len() >= options.min_steps);
    let mut candidates = dedup_subpaths(candidates);

    candidates.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.0.len().cmp(&a.0.len()))
            .then_with(|| a.0.cmp(&b.0))
    });
    candidates.truncate(options.max_processes);

    let community_of: HashMap<&str, &str> = communities
        .iter()
        .flat_map(|c| c.members.iter().map(move |m| (m.as_str(), c.id.as_str())))
        .collect();

    candidates
        .into_iter()
        .enumerate()
        .map(|(i, (steps, confidence))| {
            let kind = classify(&steps, &community_of);
            Process {
                id: format!("process_{}", i + 1),
                entry: steps.first().cloned().unwrap_or_default(),
                terminal: steps.last().cloned().unwrap_or_default(),
                steps,
                kind,
                confidence,
            }
        })
        .collect()
}

/// Entry score for every non-test symbol.
fn score_entry_points(graph: &KnowledgeGraph) -> HashMap<String, f64> {
    let mut depth_memo: HashMap<String, usize> = HashMap::new();
    let mut scores = HashMap::new();
    for symbol in graph.symbols() {
        if is_test_path(&symbol.file) {
            continue;
        }
        let out_degree = graph.call_out_degree(&symbol.id) as f64;
        let in_degree = graph.call_in_degree(&symbol.id) as f64;
        let mut score = out_degree / (in_degree + 1.0);
        if symbol.exported {
            score *= EXPORT_BOOST;
        }
        if matches_entry_pattern(&symbol.name) {
            score *= ENTRY_NAME_BOOST;
        }
        if is_framework_symbol(&symbol.attributes, &symbol.bases) {
            score *= FRAMEWORK_BOOST;
        }
        if is_utility_path(&symbol.file) {
            score *= UTILITY_DAMPING;
        }
        let depth = subtree_depth(graph, &symbol.id, &mut depth_memo, &mut HashSet::new());
        score *= 1.0 + (depth.min(DEPTH_CAP) as f64) * 0.1;
        scores.insert(symbol.id.clone(), score);
    }
    scores
}

pub(crate) fn matches_entry_pattern(name: &str) -> bool {
    const SUFFIXES: &[&str] = &["Controller", "Handler", "Endpoint", "Middleware", "Route", "Listener"];
    const PREFIXES: &[&str] = &["Configure", "handle", "on", "process"];
    if name == "Main" || name == "Startup" {
        return true;
    }
    if SUFFIXES.iter().any(|s| name.ends_with(s)) {
        return true;
    }
    if PREFIXES.iter().any(|p| name.starts_with(p)) {
        return true;
    }
    name.starts_with("Map") && name.ends_with("Endpoints")
}

fn is_framework_symbol(attributes: &[String], bases: &[String]) -> bool {
    if attributes
        .iter()
        .any(|a| FRAMEWORK_ATTRIBUTES.contains(&a.as_str()))
    {
        return true;
    }
    bases
        .iter()
        .any(|b| b.ends_with("Controller") || b == "IHostedService")
}

fn is_utility_path(path: &str) -> bool {
    if is_test_path(path) {
        return true;
    }
    path.split('/')
        .any(|segment| UTILITY_SEGMENTS.contains(&segment))
}

pub(crate) fn is_test_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    lower.contains("test") || lower.contains("spec")
}

/// Length of the longest outgoing call chain, memoised, cycle-safe.
fn subtree_depth(
    graph: &KnowledgeGraph,
    id: &str,
    memo: &mut HashMap<String, usize>,
    visiting: &mut HashSet<String>,
) -> usize {
    if let Some(&depth) = memo.get(id) {
        return depth;
    }
    if !visiting.insert(id.to_string()) {
        return 0;
    }
    let mut best = 0;
    for (callee, _) in graph.calls_from(id) {
        if visiting.contains(&callee) {
            continue;
        }
        let depth = 1 + subtree_depth(graph, &callee, memo, visiting);
        best = best.max(depth);
        if best > DEPTH_CAP {
            break; // only min(depth, 5) matters
        }
    }
    visiting.remove(id);
    memo.insert(id.to_string(), best);
    best
}

/// Bounded multi-branch trace from one entry. At each node the strongest
/// `max_branching` unvisited callees are followed; a path is emitted when
/// traversal exits its last node. Cycle avoidance is per-path.
fn trace(
    graph: &KnowledgeGraph,
    entry: &str,
    options: &AnalysisOptions,
    candidates: &mut Vec<(Vec<String>, f64)>,
) {
    let mut visited_budget = TRACE_VISIT_BUDGET;
    let mut path = vec![entry.to_string()];
    let mut on_path: HashSet<String> = path.iter().cloned().collect();
    explore(
        graph,
        options,
        &mut path,
        &mut on_path,
        1.0,
        &mut visited_budget,
        candidates,
    );
}

fn explore(
    graph: &KnowledgeGraph,
    options: &AnalysisOptions,
    path: &mut Vec<String>,
    on_path: &mut HashSet<String>,
    confidence: f64,
    budget: &mut usize,
    candidates: &mut Vec<(Vec<String>, f64)>,
) {
    if *budget == 0 {
        candidates.push((path.clone(), confidence));
        return;
    }
    *budget -= 1;

    let current = path.last().expect("path is never empty").clone();
    let depth = path.len() - 1;

    let mut next: Vec<(String, f64)> = Vec::new();
    if depth < options.max_depth {
        let mut seen: HashSet<String> = HashSet::new();
        let mut edges: Vec<(String, f64)> = graph
            .calls_from(&current)
            .into_iter()
            .filter(|(callee, _)| !on_path.contains(callee))
            .collect();
        // Strongest edges first; target id breaks ties deterministically.
        edges.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        // Parallel edges to one target: follow only the strongest.
        for (callee, confidence) in edges {
            if seen.insert(callee.clone()) {
                next.push((callee, confidence));
            }
        }
        next.truncate(options.max_branching);
    }

    if next.is_empty() {
        candidates.push((path.clone(), confidence));
        return;
    }
    for (callee, edge_confidence) in next {
        path.push(callee.clone());
        on_path.insert(callee.clone());
        explore(
            graph,
            options,
            path,
            on_path,
            confidence * edge_confidence,
            budget,
            candidates,
        );
        on_path.remove(&callee);
        path.pop();
    }
}

/// Drop any candidate whose steps are a strict contiguous subsequence of a
/// longer candidate's steps.
fn dedup_subpaths(candidates: Vec<(Vec<String>, f64)>) -> Vec<(Vec<String>, f64)> {
    let mut kept = Vec::new();
    for (i, (steps, confidence)) in candidates.iter().enumerate() {
        let absorbed = candidates.iter().enumerate().any(|(j, (other, _))| {
            i != j && other.len() > steps.len() && is_contiguous_subsequence(steps, other)
        });
        if !absorbed {
            kept.push((steps.clone(), *confidence));
        }
    }
    kept
}

fn is_contiguous_subsequence(needle: &[String], haystack: &[String]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn classify(steps: &[String], community_of: &HashMap<&str, &str>) -> ProcessKind {
    let mut communities = steps.iter().map(|s| community_of.get(s.as_str()));
    let first = communities.next().flatten();
    match first {
        Some(community) if communities.all(|c| c == Some(community)) => {
            ProcessKind::IntraCommunity
        }
        // A symbol outside every community counts as its own.
        _ => {
            if steps.len() == 1 {
                ProcessKind::IntraCommunity
            } else {
                ProcessKind::CrossCommunity
            }
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
