//! Artifact assembly: the mechanical projection of a completed analysis
//! into the single JSON document consumers read.
//!
//! Top-level key order is fixed by struct field order; nested maps are
//! `BTreeMap` so their keys serialize sorted.

pub mod artifact;

pub use artifact::{build, read_commit_hash, to_pretty_json, Artifact};
