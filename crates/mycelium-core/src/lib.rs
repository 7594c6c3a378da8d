//! Core types, knowledge graph, and lookup indices for mycelium.
//!
//! This crate provides the data structures shared by every pipeline phase:
//! - [`types`] — Files, symbols, edges, communities, processes, and errors
//! - [`graph`] — The [`KnowledgeGraph`](graph::KnowledgeGraph) over petgraph
//! - [`symbols`] — Dual exact/fuzzy symbol lookup
//! - [`namespace`] — Inverse namespace → files index
//! - [`config`] — Analysis options with spec defaults
//! - [`cancel`] — Cooperative cancellation token

pub mod cancel;
pub mod config;
pub mod graph;
pub mod namespace;
pub mod symbols;
pub mod types;
