//! Dual symbol lookup: exact `(file, name) → id` and fuzzy `name → [id…]`.
//!
//! Within a file the exact map is last-write-wins for duplicate names; the
//! fuzzy map keeps every declaration so ambiguity survives to Tier C.

use std::collections::HashMap;

/// The symbol table populated during Phase 2 and read-only afterwards.
#[derive(Debug, Default)]
pub struct SymbolTable {
    exact: HashMap<(String, String), String>,
    fuzzy: HashMap<String, Vec<String>>,
    per_file: HashMap<String, Vec<String>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file: &str, name: &str, id: &str) {
        self.exact
            .insert((file.to_string(), name.to_string()), id.to_string());
        self.fuzzy
            .entry(name.to_string())
            .or_default()
            .push(id.to_string());
        self.per_file
            .entry(file.to_string())
            .or_default()
            .push(id.to_string());
    }

    /// Exact lookup within a declaring file.
    pub fn lookup(&self, file: &str, name: &str) -> Option<&str> {
        self.exact
            .get(&(file.to_string(), name.to_string()))
            .map(String::as_str)
    }

    /// Global fuzzy lookup: every symbol declared with this name, in
    /// id-assignment order.
    pub fn lookup_fuzzy(&self, name: &str) -> &[String] {
        self.fuzzy.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All symbol ids declared in a file, in declaration order.
    pub fn symbols_in_file(&self, file: &str) -> &[String] {
        self.per_file.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_fuzzy() {
        let mut t = SymbolTable::new();
        t.insert("a.py", "run", "sym_0001");
        t.insert("b.py", "run", "sym_0002");

        assert_eq!(t.lookup("a.py", "run"), Some("sym_0001"));
        assert_eq!(t.lookup("b.py", "run"), Some("sym_0002"));
        assert_eq!(t.lookup("c.py", "run"), None);
        assert_eq!(t.lookup_fuzzy("run"), &["sym_0001", "sym_0002"]);
        assert!(t.lookup_fuzzy("walk").is_empty());
    }

    #[test]
    fn test_duplicate_name_last_write_wins_exact_only() {
        let mut t = SymbolTable::new();
        t.insert("a.py", "run", "sym_0001");
        t.insert("a.py", "run", "sym_0002");

        // Exact lookup retains one; both stay reachable through fuzzy.
        assert_eq!(t.lookup("a.py", "run"), Some("sym_0002"));
        assert_eq!(t.lookup_fuzzy("run").len(), 2);
    }

    #[test]
    fn test_symbols_in_file_preserves_declaration_order() {
        let mut t = SymbolTable::new();
        t.insert("a.py", "one", "sym_0001");
        t.insert("a.py", "two", "sym_0002");
        assert_eq!(t.symbols_in_file("a.py"), &["sym_0001", "sym_0002"]);
    }
}
