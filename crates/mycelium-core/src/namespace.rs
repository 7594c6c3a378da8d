//! Inverse index from declared namespace/package strings to declaring files.

use std::collections::{BTreeMap, BTreeSet};

/// Namespace → files and file → namespaces, kept symmetric:
/// `ns ∈ namespaces(file) ⇔ file ∈ files(ns)`.
#[derive(Debug, Default)]
pub struct NamespaceIndex {
    by_namespace: BTreeMap<String, BTreeSet<String>>,
    by_file: BTreeMap<String, BTreeSet<String>>,
}

impl NamespaceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, namespace: &str, file: &str) {
        if namespace.is_empty() {
            return;
        }
        self.by_namespace
            .entry(namespace.to_string())
            .or_default()
            .insert(file.to_string());
        self.by_file
            .entry(file.to_string())
            .or_default()
            .insert(namespace.to_string());
    }

    /// Files declaring the namespace, in sorted order.
    pub fn files(&self, namespace: &str) -> Vec<&str> {
        self.by_namespace
            .get(namespace)
            .map(|s| s.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Namespaces declared by the file, in sorted order.
    pub fn namespaces(&self, file: &str) -> Vec<&str> {
        self.by_file
            .get(file)
            .map(|s| s.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.by_namespace.contains_key(namespace)
    }

    pub fn namespace_count(&self) -> usize {
        self.by_namespace.len()
    }
}
