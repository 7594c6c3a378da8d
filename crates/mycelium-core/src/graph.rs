//! Knowledge graph over petgraph's `StableDiGraph`.
//!
//! Nodes are files, folders, symbols, and communities; edges carry the
//! relationship kind plus the call-resolution payload where applicable.
//! Each pipeline phase appends; nothing a later phase does invalidates an
//! earlier phase's nodes.

use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;

use crate::types::{CallEdge, CallTier, Community, FileNode, FolderNode, Symbol};

/// What a graph node represents.
#[derive(Debug, Clone)]
pub enum NodeData {
    File(FileNode),
    Folder(FolderNode),
    Symbol(Symbol),
    Community(Community),
}

/// What kind of relationship an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// File → symbol declared in it.
    Defines,
    /// File → file import dependency.
    Imports,
    /// Symbol → symbol call.
    Calls,
    /// Symbol → symbol base-type relationship.
    Inherits,
    /// Symbol → community membership.
    MemberOf,
}

/// Edge payload. Call edges carry the confidence model; import edges carry
/// the raw statement text.
#[derive(Debug, Clone)]
pub struct EdgeData {
    pub kind: EdgeKind,
    pub confidence: f64,
    pub tier: Option<CallTier>,
    pub reason: Option<String>,
    pub line: Option<u32>,
    pub raw: Option<String>,
}

impl EdgeData {
    fn plain(kind: EdgeKind) -> Self {
        EdgeData {
            kind,
            confidence: 1.0,
            tier: None,
            reason: None,
            line: None,
            raw: None,
        }
    }
}

/// The typed directed multigraph all phases read through and append to.
///
/// Node and edge iteration order is insertion order, so inserting files in
/// sorted path order keeps every downstream traversal deterministic.
pub struct KnowledgeGraph {
    inner: StableDiGraph<NodeData, EdgeData>,
    file_index: HashMap<String, NodeIndex>,
    symbol_index: HashMap<String, NodeIndex>,
}

impl std::fmt::Debug for KnowledgeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeGraph")
            .field("nodes", &self.inner.node_count())
            .field("edges", &self.inner.edge_count())
            .finish()
    }
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        KnowledgeGraph {
            inner: StableDiGraph::new(),
            file_index: HashMap::new(),
            symbol_index: HashMap::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    // ── Phase 1: structure ──────────────────────────────────────────

    pub fn add_file(&mut self, file: FileNode) {
        let path = file.path.clone();
        let idx = self.inner.add_node(NodeData::File(file));
        self.file_index.insert(path, idx);
    }

    pub fn add_folder(&mut self, folder: FolderNode) {
        self.inner.add_node(NodeData::Folder(folder));
    }

    pub fn file(&self, path: &str) -> Option<&FileNode> {
        let idx = self.file_index.get(path)?;
        match self.inner.node_weight(*idx) {
            Some(NodeData::File(f)) => Some(f),
            _ => None,
        }
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.file_index.contains_key(path)
    }

    /// All files in insertion (sorted-path) order.
    pub fn files(&self) -> impl Iterator<Item = &FileNode> {
        self.inner.node_weights().filter_map(|n| match n {
            NodeData::File(f) => Some(f),
            _ => None,
        })
    }

    pub fn folders(&self) -> impl Iterator<Item = &FolderNode> {
        self.inner.node_weights().filter_map(|n| match n {
            NodeData::Folder(f) => Some(f),
            _ => None,
        })
    }

    // ── Phase 2: symbols ────────────────────────────────────────────

    /// Insert a symbol and its `Defines` edge from the declaring file.
    /// Returns false when the declaring file is unknown.
    pub fn add_symbol(&mut self, symbol: Symbol) -> bool {
        let Some(&file_idx) = self.file_index.get(&symbol.file) else {
            return false;
        };
        let id = symbol.id.clone();
        let idx = self.inner.add_node(NodeData::Symbol(symbol));
        self.symbol_index.insert(id, idx);
        self.inner
            .add_edge(file_idx, idx, EdgeData::plain(EdgeKind::Defines));
        true
    }

    pub fn symbol(&self, id: &str) -> Option<&Symbol> {
        let idx = self.symbol_index.get(id)?;
        match self.inner.node_weight(*idx) {
            Some(NodeData::Symbol(s)) => Some(s),
            _ => None,
        }
    }

    pub fn has_symbol(&self, id: &str) -> bool {
        self.symbol_index.contains_key(id)
    }

    /// All symbols in id-assignment order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.inner.node_weights().filter_map(|n| match n {
            NodeData::Symbol(s) => Some(s),
            _ => None,
        })
    }

    pub fn symbol_count(&self) -> usize {
        self.symbol_index.len()
    }

    // ── Phase 3: imports ────────────────────────────────────────────

    /// Insert a file → file import edge. Returns false when either endpoint
    /// is not a known file.
    pub fn add_import(&mut self, from: &str, to: &str, raw: &str) -> bool {
        let (Some(&a), Some(&b)) = (self.file_index.get(from), self.file_index.get(to)) else {
            return false;
        };
        let mut data = EdgeData::plain(EdgeKind::Imports);
        data.raw = Some(raw.to_string());
        self.inner.add_edge(a, b, data);
        true
    }

    /// Files imported by `path`, in insertion order.
    pub fn imports_of(&self, path: &str) -> Vec<String> {
        let Some(&idx) = self.file_index.get(path) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for edge in self.inner.edges_directed(idx, Direction::Outgoing) {
            if edge.weight().kind == EdgeKind::Imports {
                if let Some(NodeData::File(f)) = self.inner.node_weight(edge.target()) {
                    out.push(f.path.clone());
                }
            }
        }
        out.reverse(); // petgraph yields outgoing edges newest-first
        out
    }

    /// All import edges as (from, to, raw) in insertion order.
    pub fn import_edges(&self) -> Vec<(String, String, String)> {
        let mut out = Vec::new();
        for edge in self.inner.edge_references() {
            if edge.weight().kind != EdgeKind::Imports {
                continue;
            }
            if let (Some(NodeData::File(a)), Some(NodeData::File(b))) = (
                self.inner.node_weight(edge.source()),
                self.inner.node_weight(edge.target()),
            ) {
                out.push((
                    a.path.clone(),
                    b.path.clone(),
                    edge.weight().raw.clone().unwrap_or_default(),
                ));
            }
        }
        out
    }

    // ── Phase 4: calls and inheritance ──────────────────────────────

    /// Insert a resolved call edge. Returns false when either symbol id is
    /// unknown.
    pub fn add_call(&mut self, edge: &CallEdge) -> bool {
        let (Some(&a), Some(&b)) = (
            self.symbol_index.get(&edge.from),
            self.symbol_index.get(&edge.to),
        ) else {
            return false;
        };
        self.inner.add_edge(
            a,
            b,
            EdgeData {
                kind: EdgeKind::Calls,
                confidence: edge.confidence,
                tier: Some(edge.tier),
                reason: Some(edge.reason.clone()),
                line: Some(edge.line),
                raw: None,
            },
        );
        true
    }

    pub fn add_inherits(&mut self, from: &str, to: &str) -> bool {
        let (Some(&a), Some(&b)) = (self.symbol_index.get(from), self.symbol_index.get(to)) else {
            return false;
        };
        self.inner.add_edge(a, b, EdgeData::plain(EdgeKind::Inherits));
        true
    }

    /// All call edges in insertion order.
    pub fn call_edges(&self) -> Vec<CallEdge> {
        let mut out = Vec::new();
        for edge in self.inner.edge_references() {
            if edge.weight().kind != EdgeKind::Calls {
                continue;
            }
            if let (Some(NodeData::Symbol(a)), Some(NodeData::Symbol(b))) = (
                self.inner.node_weight(edge.source()),
                self.inner.node_weight(edge.target()),
            ) {
                let w = edge.weight();
                out.push(CallEdge {
                    from: a.id.clone(),
                    to: b.id.clone(),
                    confidence: w.confidence,
                    tier: w.tier.unwrap_or(CallTier::C),
                    reason: w.reason.clone().unwrap_or_default(),
                    line: w.line.unwrap_or(0),
                });
            }
        }
        out
    }

    /// All inheritance edges as (from, to) symbol ids.
    pub fn inherit_edges(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for edge in self.inner.edge_references() {
            if edge.weight().kind != EdgeKind::Inherits {
                continue;
            }
            if let (Some(NodeData::Symbol(a)), Some(NodeData::Symbol(b))) = (
                self.inner.node_weight(edge.source()),
                self.inner.node_weight(edge.target()),
            ) {
                out.push((a.id.clone(), b.id.clone()));
            }
        }
        out
    }

    /// Outgoing calls of a symbol as (target id, confidence), insertion order.
    pub fn calls_from(&self, id: &str) -> Vec<(String, f64)> {
        let Some(&idx) = self.symbol_index.get(id) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for edge in self.inner.edges_directed(idx, Direction::Outgoing) {
            if edge.weight().kind == EdgeKind::Calls {
                if let Some(NodeData::Symbol(s)) = self.inner.node_weight(edge.target()) {
                    out.push((s.id.clone(), edge.weight().confidence));
                }
            }
        }
        out.reverse();
        out
    }

    pub fn call_out_degree(&self, id: &str) -> usize {
        self.degree(id, Direction::Outgoing)
    }

    pub fn call_in_degree(&self, id: &str) -> usize {
        self.degree(id, Direction::Incoming)
    }

    fn degree(&self, id: &str, dir: Direction) -> usize {
        let Some(&idx) = self.symbol_index.get(id) else {
            return 0;
        };
        self.inner
            .edges_directed(idx, dir)
            .filter(|e| e.weight().kind == EdgeKind::Calls)
            .count()
    }

    // ── Phase 5: communities ────────────────────────────────────────

    /// Insert a community node and `MemberOf` edges from each member symbol.
    pub fn add_community(&mut self, community: Community) {
        let members = community.members.clone();
        let idx = self.inner.add_node(NodeData::Community(community));
        for member in &members {
            if let Some(&sym_idx) = self.symbol_index.get(member) {
                self.inner
                    .add_edge(sym_idx, idx, EdgeData::plain(EdgeKind::MemberOf));
            }
        }
    }

    pub fn communities(&self) -> impl Iterator<Item = &Community> {
        self.inner.node_weights().filter_map(|n| match n {
            NodeData::Community(c) => Some(c),
            _ => None,
        })
    }
}

impl Default for KnowledgeGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Lang, SymbolKind, Visibility};

    fn file(path: &str) -> FileNode {
        FileNode {
            path: path.into(),
            lang: Some(Lang::Python),
            size: 10,
            lines: 2,
            parseable: true,
        }
    }

    fn symbol(id: &str, name: &str, path: &str) -> Symbol {
        Symbol {
            id: id.into(),
            name: name.into(),
            kind: SymbolKind::Function,
            file: path.into(),
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
        }
    }

    #[test]
    fn test_symbol_requires_declaring_file() {
        let mut g = KnowledgeGraph::new();
        assert!(!g.add_symbol(symbol("sym_0001", "f", "missing.py")));
        g.add_file(file("a.py"));
        assert!(g.add_symbol(symbol("sym_0001", "f", "a.py")));
        assert_eq!(g.symbol("sym_0001").unwrap().name, "f");
    }

    #[test]
    fn test_call_edges_and_degrees() {
        let mut g = KnowledgeGraph::new();
        g.add_file(file("a.py"));
        g.add_symbol(symbol("sym_0001", "f", "a.py"));
        g.add_symbol(symbol("sym_0002", "g", "a.py"));
        let edge = CallEdge {
            from: "sym_0001".into(),
            to: "sym_0002".into(),
            confidence: 0.85,
            tier: CallTier::B,
            reason: "same-file".into(),
            line: 3,
        };
        assert!(g.add_call(&edge));
        assert!(!g.add_call(&CallEdge {
            to: "sym_9999".into(),
            ..edge.clone()
        }));

        assert_eq!(g.call_out_degree("sym_0001"), 1);
        assert_eq!(g.call_in_degree("sym_0002"), 1);
        assert_eq!(g.calls_from("sym_0001"), vec![("sym_0002".into(), 0.85)]);
        assert_eq!(g.call_edges().len(), 1);
    }

    #[test]
    fn test_parallel_call_edges_are_kept() {
        let mut g = KnowledgeGraph::new();
        g.add_file(file("a.py"));
        g.add_symbol(symbol("sym_0001", "f", "a.py"));
        g.add_symbol(symbol("sym_0002", "g", "a.py"));
        for line in [3, 7] {
            g.add_call(&CallEdge {
                from: "sym_0001".into(),
                to: "sym_0002".into(),
                confidence: 0.85,
                tier: CallTier::B,
                reason: "same-file".into(),
                line,
            });
        }
        assert_eq!(g.call_edges().len(), 2);
    }

    #[test]
    fn test_import_edges_order() {
        let mut g = KnowledgeGraph::new();
        g.add_file(file("a.py"));
        g.add_file(file("b.py"));
        g.add_file(file("c.py"));
        assert!(g.add_import("a.py", "b.py", "import b"));
        assert!(g.add_import("a.py", "c.py", "import c"));
        assert!(!g.add_import("a.py", "zzz.py", "import zzz"));
        assert_eq!(g.imports_of("a.py"), vec!["b.py".to_string(), "c.py".into()]);
    }

    #[test]
    fn test_files_iterate_in_insertion_order() {
        let mut g = KnowledgeGraph::new();
        for p in ["a.py", "b.py", "z.py"] {
            g.add_file(file(p));
        }
        let paths: Vec<_> = g.files().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.py", "b.py", "z.py"]);
    }
}
