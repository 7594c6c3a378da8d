//! Phase 5: community detection.
//!
//! Louvain modularity maximisation over the undirected projection of the
//! call + inheritance graph. Degenerate partitions are re-run at a higher
//! resolution, oversized communities are split recursively, singletons are
//! discarded, and labels are derived from common path prefixes.

use std::collections::{BTreeMap, HashMap};

use mycelium_core::config::AnalysisOptions;
use mycelium_core::graph::KnowledgeGraph;
use mycelium_core::types::{Community, Lang};

/// Degenerate when one community holds more than half the nodes.
const DEGENERATE_SHARE: f64 = 0.5;
const MAX_TUNE_ATTEMPTS: usize = 3;

pub fn run(graph: &mut KnowledgeGraph, options: &AnalysisOptions) -> Vec<Community> {
    let projection = Projection::build(graph);
    if projection.nodes.is_empty() {
        return Vec::new();
    }

    // Initial run with auto-tuning against degenerate partitions. A retune
    // that dissolves everything into singletons is worse than the blob it
    // tried to break up, so such results are not kept.
    let mut gamma = options.resolution;
    let mut partition = louvain(&projection.adjacency, gamma);
    for _ in 0..MAX_TUNE_ATTEMPTS {
        let largest = partition.iter().map(Vec::len).max().unwrap_or(0);
        if (largest as f64) <= DEGENERATE_SHARE * projection.nodes.len() as f64 {
            break;
        }
        gamma *= 1.5;
        let retuned = louvain(&projection.adjacency, gamma);
        if retuned.iter().all(|c| c.len() < 2) {
            break;
        }
        partition = retuned;
    }

    // Recursive split of oversized communities.
    let mut queue: Vec<Vec<usize>> = partition;
    let mut finished: Vec<Vec<usize>> = Vec::new();
    while let Some(members) = queue.pop() {
        if members.len() <= options.community_split_threshold {
            finished.push(members);
            continue;
        }
        let sub = projection.induced(&members);
        let sub_partition = louvain(&sub.adjacency, gamma);
        let non_singleton = sub_partition.iter().filter(|c| c.len() >= 2).count();
        if non_singleton >= 2 {
            for sub_members in sub_partition {
                queue.push(sub_members.iter().map(|&i| members[sub.origin[i]]).collect());
            }
        } else {
            finished.push(members);
        }
    }

    // Singletons are never reported.
    finished.retain(|c| c.len() >= 2);

    // Rank largest-first; ties resolve on the smallest member id.
    for community in &mut finished {
        community.sort();
    }
    finished.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a[0].cmp(&b[0])));

    let mut communities: Vec<Community> = finished
        .iter()
        .enumerate()
        .map(|(rank, members)| describe(graph, &projection, members, rank))
        .collect();
    disambiguate_labels(graph, &projection, &finished, &mut communities);

    for community in &communities {
        graph.add_community(community.clone());
    }
    communities
}

/// Undirected weighted projection over symbols that participate in at
/// least one call or inheritance edge.
struct Projection {
    /// Symbol ids, index-aligned with the adjacency list.
    nodes: Vec<String>,
    adjacency: Vec<Vec<(usize, f64)>>,
}

struct Induced {
    adjacency: Vec<Vec<(usize, f64)>>,
    /// Induced index → index into the parent member list.
    origin: Vec<usize>,
}

impl Projection {
    fn build(graph: &KnowledgeGraph) -> Self {
        let mut index: BTreeMap<String, usize> = BTreeMap::new();
        let mut pairs: HashMap<(usize, usize), f64> = HashMap::new();

        let mut edges: Vec<(String, String, f64)> = graph
            .call_edges()
            .into_iter()
            .map(|e| (e.from, e.to, e.confidence))
            .collect();
        // Inheritance weighs 1.0 so it dominates weak fuzzy calls.
        edges.extend(
            graph
                .inherit_edges()
                .into_iter()
                .map(|(from, to)| (from, to, 1.0)),
        );

        let mut nodes: Vec<String> = Vec::new();
        for (from, to, weight) in edges {
            if from == to {
                continue;
            }
            let a = *index.entry(from.clone()).or_insert_with(|| {
                nodes.push(from.clone());
                nodes.len() - 1
            });
            let b = *index.entry(to.clone()).or_insert_with(|| {
                nodes.push(to.clone());
                nodes.len() - 1
            });
            let key = (a.min(b), a.max(b));
            *pairs.entry(key).or_insert(0.0) += weight;
        }

        let mut adjacency = vec![Vec::new(); nodes.len()];
        for (&(a, b), &weight) in &pairs {
            let weight = weight.min(1.0); // parallel edges sum, capped
            adjacency[a].push((b, weight));
            adjacency[b].push((a, weight));
        }
        for neighbours in &mut adjacency {
            neighbours.sort_by(|x, y| x.0.cmp(&y.0));
        }
        Projection { nodes, adjacency }
    }

    fn induced(&self, members: &[usize]) -> Induced {
        let member_index: HashMap<usize, usize> = members
            .iter()
            .enumerate()
            .map(|(local, &global)| (global, local))
            .collect();
        let mut adjacency = vec![Vec::new(); members.len()];
        for (local, &global) in members.iter().enumerate() {
            for &(neighbour, weight) in &self.adjacency[global] {
                if let Some(&neighbour_local) = member_index.get(&neighbour) {
                    adjacency[local].push((neighbour_local, weight));
                }
            }
        }
        Induced {
            adjacency,
            origin: (0..members.len()).collect(),
        }
    }
}

/// Standard two-level Louvain. Deterministic: nodes are visited in index
/// order and ties go to the lowest community id.
pub(crate) fn louvain(adjacency: &[Vec<(usize, f64)>], gamma: f64) -> Vec<Vec<usize>> {
    let n = adjacency.len();
    if n == 0 {
        return Vec::new();
    }

    // Current assignment of original nodes to top-level communities.
    let mut membership: Vec<usize> = (0..n).collect();
    let mut level_adjacency: Vec<Vec<(usize, f64)>> = adjacency.to_vec();

    loop {
        let moved = local_moves(&level_adjacency, gamma);
        let (compact, count) = compact_labels(&moved);
        if count == level_adjacency.len() {
            break; // no aggregation progress
        }
        for m in &mut membership {
            *m = compact[*m];
        }
        level_adjacency = aggregate(&level_adjacency, &compact, count);
        if count == 1 {
            break;
        }
    }

    let mut communities: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (node, &community) in membership.iter().enumerate() {
        communities.entry(community).or_default().push(node);
    }
    communities.into_values().collect()
}

/// One level of greedy modularity moves. Returns the community per node.
fn local_moves(adjacency: &[Vec<(usize, f64)>], gamma: f64) -> Vec<usize> {
    let n = adjacency.len();
    let degree: Vec<f64> = adjacency
        .iter()
        .map(|nbrs| nbrs.iter().map(|&(_, w)| w).sum())
        .collect();
    let two_m: f64 = degree.iter().sum();
    if two_m == 0.0 {
        return (0..n).collect();
    }

    let mut community: Vec<usize> = (0..n).collect();
    let mut total: Vec<f64> = degree.clone();

    let mut improved = true;
    while improved {
        improved = false;
        for node in 0..n {
            let current = community[node];
            total[current] -= degree[node];

            // Weight from `node` into each neighbouring community.
            let mut links: BTreeMap<usize, f64> = BTreeMap::new();
            for &(neighbour, weight) in &adjacency[node] {
                if neighbour != node {
                    *links.entry(community[neighbour]).or_insert(0.0) += weight;
                }
            }

            let mut best = current;
            let mut best_gain = links
                .get(&current)
                .copied()
                .unwrap_or(0.0)
                - gamma * total[current] * degree[node] / two_m;
            for (&candidate, &weight) in &links {
                let gain = weight - gamma * total[candidate] * degree[node] / two_m;
                if gain > best_gain + 1e-12 {
                    best = candidate;
                    best_gain = gain;
                }
            }

            total[best] += degree[node];
            if best != current {
                community[node] = best;
                improved = true;
            }
        }
    }
    community
}

fn compact_labels(labels: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping: BTreeMap<usize, usize> = BTreeMap::new();
    let mut compact = vec![0; labels.len()];
    for (i, &label) in labels.iter().enumerate() {
        let next = mapping.len();
        let id = *mapping.entry(label).or_insert(next);
        compact[i] = id;
    }
    (compact, mapping.len())
}

fn aggregate(
    adjacency: &[Vec<(usize, f64)>],
    membership: &[usize],
    count: usize,
) -> Vec<Vec<(usize, f64)>> {
    let mut pairs: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    for (node, neighbours) in adjacency.iter().enumerate() {
        for &(neighbour, weight) in neighbours {
            if node <= neighbour {
                let a = membership[node];
                let b = membership[neighbour];
                *pairs.entry((a.min(b), a.max(b))).or_insert(0.0) += weight;
            }
        }
    }
    let mut result = vec![Vec::new(); count];
    for (&(a, b), &weight) in &pairs {
        if a == b {
            // Self-loops keep internal weight through aggregation levels.
            result[a].push((a, weight));
        } else {
            result[a].push((b, weight));
            result[b].push((a, weight));
        }
    }
    result
}

fn describe(
    graph: &KnowledgeGraph,
    projection: &Projection,
    members: &[usize],
    rank: usize,
) -> Community {
    let ids: Vec<String> = members.iter().map(|&i| projection.nodes[i].clone()).collect();
    let files: Vec<&str> = ids
        .iter()
        .filter_map(|id| graph.symbol(id).map(|s| s.file.as_str()))
        .collect();
    let names: Vec<&str> = ids
        .iter()
        .filter_map(|id| graph.symbol(id).map(|s| s.name.as_str()))
        .collect();

    let label = path_prefix_label(&files)
        .or_else(|| name_prefix_label(&names))
        .unwrap_or_else(|| format!("Community {}", rank + 1));

    Community {
        id: format!("community_{}", rank + 1),
        label,
        cohesion: cohesion(projection, members),
        lang: primary_language(graph, &ids),
        members: ids,
    }
}

/// Longest common path prefix at path-segment granularity.
fn path_prefix_label(files: &[&str]) -> Option<String> {
    let first = files.first()?;
    let mut prefix: Vec<&str> = first.split('/').collect();
    prefix.pop(); // drop the file name
    for file in &files[1..] {
        let segments: Vec<&str> = file.split('/').collect();
        let common = prefix
            .iter()
            .zip(&segments)
            .take_while(|(a, b)| a == b)
            .count();
        prefix.truncate(common);
    }
    if prefix.is_empty() {
        None
    } else {
        Some(prefix.join("/"))
    }
}

/// Longest common name prefix, when long enough to mean something.
fn name_prefix_label(names: &[&str]) -> Option<String> {
    let first = names.first()?;
    let mut len = first.len();
    for name in &names[1..] {
        len = len.min(
            first
                .chars()
                .zip(name.chars())
                .take_while(|(a, b)| a == b)
                .count(),
        );
    }
    if len >= 3 {
        Some(first[..len].to_string())
    } else {
        None
    }
}

fn cohesion(projection: &Projection, members: &[usize]) -> f64 {
    let n = members.len();
    if n < 2 {
        return 0.0;
    }
    let member_set: std::collections::BTreeSet<usize> = members.iter().copied().collect();
    let mut internal = 0.0;
    for &node in members {
        for &(neighbour, weight) in &projection.adjacency[node] {
            if node < neighbour && member_set.contains(&neighbour) {
                internal += weight;
            }
        }
    }
    let possible = (n * (n - 1)) as f64 / 2.0;
    (internal / possible).clamp(0.0, 1.0)
}

/// Mode of member languages; ties break on larger count then tag order.
fn primary_language(graph: &KnowledgeGraph, ids: &[String]) -> Lang {
    let mut counts: BTreeMap<Lang, usize> = BTreeMap::new();
    for id in ids {
        if let Some(symbol) = graph.symbol(id) {
            *counts.entry(symbol.lang).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(lang, _)| lang)
        .unwrap_or(Lang::Python)
}

/// Append the next distinguishing path segment to colliding labels.
fn disambiguate_labels(
    graph: &KnowledgeGraph,
    projection: &Projection,
    finished: &[Vec<usize>],
    communities: &mut [Community],
) {
    let mut seen: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, community) in communities.iter().enumerate() {
        seen.entry(community.label.clone()).or_default().push(i);
    }
    for (label, holders) in seen {
        if holders.len() < 2 {
            continue;
        }
        let depth = label.split('/').count();
        for &holder in &holders {
            let files: Vec<&str> = finished[holder]
                .iter()
                .filter_map(|&i| graph.symbol(&projection.nodes[i]))
                .map(|s| s.file.as_str())
                .collect();
            // Most common next segment under the shared prefix.
            let mut next_counts: BTreeMap<&str, usize> = BTreeMap::new();
            for file in files {
                if let Some(segment) = file.split('/').nth(depth) {
                    *next_counts.entry(segment).or_insert(0) += 1;
                }
            }
            if let Some((segment, _)) = next_counts
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            {
                communities[holder].label = format!("{label}/{segment}");
            }
        }
        // Anything still colliding gets a rank suffix.
        let mut still: HashMap<String, usize> = HashMap::new();
        for &holder in &holders {
            let count = still.entry(communities[holder].label.clone()).or_insert(0);
            *count += 1;
            if *count > 1 {
                let suffix = *count;
                communities[holder].label =
                    format!("{} {}", communities[holder].label, suffix);
            }
        }
    }
}

#[cfg(test)]
#[path = "community_tests.rs"]
mod tests;
