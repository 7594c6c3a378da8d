//! Analysis options with their spec defaults.

use crate::types::Lang;

/// One megabyte; files above this are recorded but not parsed.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Tunables for a single pipeline run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Restrict parsing to these languages; `None` parses everything.
    pub languages: Option<Vec<Lang>>,
    /// Extra ignore globs on top of the fixed default set.
    pub exclude: Vec<String>,
    /// Initial Louvain resolution γ.
    pub resolution: f64,
    /// Phase 6 cap on emitted processes.
    pub max_processes: usize,
    /// Phase 6 BFS depth bound.
    pub max_depth: usize,
    /// Phase 6 branches followed per node.
    pub max_branching: usize,
    /// Minimum nodes for a candidate process.
    pub min_steps: usize,
    /// Communities above this member count get recursively split.
    pub community_split_threshold: usize,
    /// Files above this byte size are recorded as non-parseable.
    pub max_file_size: u64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            languages: None,
            exclude: Vec::new(),
            resolution: 1.0,
            max_processes: 75,
            max_depth: 10,
            max_branching: 4,
            min_steps: 2,
            community_split_threshold: 150,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl AnalysisOptions {
    /// Whether a language is admitted by the `--languages` restriction.
    pub fn wants(&self, lang: Lang) -> bool {
        match &self.languages {
            Some(list) => list.contains(&lang),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_spec() {
        let opts = AnalysisOptions::default();
        assert_eq!(opts.resolution, 1.0);
        assert_eq!(opts.max_processes, 75);
        assert_eq!(opts.max_depth, 10);
        assert_eq!(opts.max_branching, 4);
        assert_eq!(opts.min_steps, 2);
        assert_eq!(opts.community_split_threshold, 150);
        assert_eq!(opts.max_file_size, 1024 * 1024);
    }

    #[test]
    fn test_language_restriction() {
        let mut opts = AnalysisOptions::default();
        assert!(opts.wants(Lang::Go));
        opts.languages = Some(vec![Lang::CSharp]);
        assert!(opts.wants(Lang::CSharp));
        assert!(!opts.wants(Lang::Go));
    }
}
