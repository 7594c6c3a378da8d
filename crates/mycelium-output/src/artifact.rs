use std::collections::BTreeMap;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use mycelium_analysis::pipeline::Analysis;
use mycelium_core::types::{CallTier, Lang, ProcessKind, SymbolKind, Visibility};

pub const ARTIFACT_VERSION: &str = "1.0";

/// The single output document.
#[derive(Debug, Serialize, Deserialize)]
pub struct Artifact {
    pub version: String,
    pub metadata: Metadata,
    pub stats: Stats,
    pub structure: Structure,
    pub symbols: Vec<SymbolOut>,
    pub imports: Imports,
    pub calls: Vec<CallOut>,
    pub communities: Vec<CommunityOut>,
    pub processes: Vec<ProcessOut>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Metadata {
    pub repo_name: String,
    /// ISO-8601 UTC.
    pub generated_at: String,
    pub commit_hash: Option<String>,
    pub tool: String,
    pub tool_version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Stats {
    pub files: usize,
    pub folders: usize,
    pub symbols: usize,
    pub import_edges: usize,
    pub unresolved_imports: usize,
    pub call_edges: usize,
    pub communities: usize,
    pub processes: usize,
    pub files_by_language: BTreeMap<String, usize>,
    pub phase_timings_ms: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Structure {
    pub files: Vec<FileOut>,
    pub folders: Vec<FolderOut>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileOut {
    pub path: String,
    pub lang: Option<Lang>,
    pub size: u64,
    pub lines: u32,
    pub parseable: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FolderOut {
    pub path: String,
    pub file_count: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SymbolOut {
    pub id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub file: String,
    pub line: u32,
    pub visibility: Visibility,
    pub exported: bool,
    pub parent: Option<String>,
    pub lang: Lang,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Imports {
    pub files: Vec<ImportOut>,
    pub unresolved: Vec<UnresolvedOut>,
    pub projects: Vec<ProjectRefOut>,
    pub packages: Vec<PackageRefOut>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportOut {
    pub from_file: String,
    pub to_file: String,
    pub statement: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnresolvedOut {
    pub file: String,
    pub specifier: String,
    pub statement: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectRefOut {
    pub from_project: String,
    pub to_project: String,
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PackageRefOut {
    pub project: String,
    pub package: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CallOut {
    pub from: String,
    pub to: String,
    pub confidence: f64,
    pub tier: CallTier,
    pub reason: String,
    pub line: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommunityOut {
    pub id: String,
    pub label: String,
    pub members: Vec<String>,
    pub cohesion: f64,
    pub lang: Lang,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessOut {
    pub id: String,
    pub entry: String,
    pub terminal: String,
    pub steps: Vec<String>,
    pub kind: ProcessKind,
    pub confidence: f64,
}

/// Assemble the artifact from a completed analysis. `generated_at` is
/// injected so callers (and tests) control the timestamp.
pub fn build(analysis: &Analysis, commit_hash: Option<String>, generated_at: String) -> Artifact {
    let graph = &analysis.graph;

    let files: Vec<FileOut> = graph
        .files()
        .map(|f| FileOut {
            path: f.path.clone(),
            lang: f.lang,
            size: f.size,
            lines: f.lines,
            parseable: f.parseable,
        })
        .collect();
    let folders: Vec<FolderOut> = graph
        .folders()
        .map(|f| FolderOut {
            path: f.path.clone(),
            file_count: f.file_count,
        })
        .collect();

    let mut files_by_language: BTreeMap<String, usize> = BTreeMap::new();
    for file in graph.files() {
        if let Some(lang) = file.lang {
            *files_by_language.entry(lang.as_str().to_string()).or_insert(0) += 1;
        }
    }

    let symbols: Vec<SymbolOut> = graph
        .symbols()
        .map(|s| SymbolOut {
            id: s.id.clone(),
            name: s.name.clone(),
            kind: s.kind,
            file: s.file.clone(),
            line: s.line,
            visibility: s.visibility,
            exported: s.exported,
            parent: s.parent.clone(),
            lang: s.lang,
        })
        .collect();

    let import_files: Vec<ImportOut> = graph
        .import_edges()
        .into_iter()
        .map(|(from_file, to_file, statement)| ImportOut {
            from_file,
            to_file,
            statement,
        })
        .collect();

    let calls: Vec<CallOut> = graph
        .call_edges()
        .into_iter()
        .map(|e| CallOut {
            from: e.from,
            to: e.to,
            confidence: e.confidence,
            tier: e.tier,
            reason: e.reason,
            line: e.line,
        })
        .collect();

    let communities: Vec<CommunityOut> = analysis
        .communities
        .iter()
        .map(|c| CommunityOut {
            id: c.id.clone(),
            label: c.label.clone(),
            members: c.members.clone(),
            cohesion: round4(c.cohesion),
            lang: c.lang,
        })
        .collect();

    let processes: Vec<ProcessOut> = analysis
        .processes
        .iter()
        .map(|p| ProcessOut {
            id: p.id.clone(),
            entry: p.entry.clone(),
            terminal: p.terminal.clone(),
            steps: p.steps.clone(),
            kind: p.kind,
            confidence: round4(p.confidence),
        })
        .collect();

    let stats = Stats {
        files: files.len(),
        folders: folders.len(),
        symbols: symbols.len(),
        import_edges: import_files.len(),
        unresolved_imports: analysis.unresolved_imports.len(),
        call_edges: calls.len(),
        communities: communities.len(),
        processes: processes.len(),
        files_by_language,
        phase_timings_ms: analysis
            .timings
            .iter()
            .map(|t| (t.phase.clone(), t.millis))
            .collect(),
    };

    Artifact {
        version: ARTIFACT_VERSION.to_string(),
        metadata: Metadata {
            repo_name: analysis.root_name.clone(),
            generated_at,
            commit_hash,
            tool: "mycelium".to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        stats,
        structure: Structure { files, folders },
        symbols,
        imports: Imports {
            files: import_files,
            unresolved: analysis
                .unresolved_imports
                .iter()
                .map(|u| UnresolvedOut {
                    file: u.file.clone(),
                    specifier: u.specifier.clone(),
                    statement: u.raw.clone(),
                })
                .collect(),
            projects: analysis
                .project_references
                .iter()
                .map(|p| ProjectRefOut {
                    from_project: p.from_project.clone(),
                    to_project: p.to_project.clone(),
                    kind: p.kind.clone(),
                })
                .collect(),
            packages: analysis
                .package_references
                .iter()
                .map(|p| PackageRefOut {
                    project: p.project.clone(),
                    package: p.package.clone(),
                    version: p.version.clone(),
                })
                .collect(),
        },
        calls,
        communities,
        processes,
    }
}

/// Current UTC time in ISO-8601.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `GIT_COMMIT` wins; otherwise `.git/HEAD` is followed one level. Absence
/// is non-fatal.
pub fn read_commit_hash(root: &Path) -> Option<String> {
    if let Ok(hash) = std::env::var("GIT_COMMIT") {
        let hash = hash.trim().to_string();
        if !hash.is_empty() {
            return Some(hash);
        }
    }
    let head = std::fs::read_to_string(root.join(".git/HEAD")).ok()?;
    let head = head.trim();
    if let Some(reference) = head.strip_prefix("ref: ") {
        let resolved = std::fs::read_to_string(root.join(".git").join(reference.trim())).ok()?;
        let resolved = resolved.trim();
        (!resolved.is_empty()).then(|| resolved.to_string())
    } else {
        (!head.is_empty()).then(|| head.to_string())
    }
}

pub fn to_pretty_json(artifact: &Artifact) -> String {
    serde_json::to_string_pretty(artifact).unwrap_or_default()
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use mycelium_analysis::pipeline;
    use mycelium_core::cancel::CancellationToken;
    use mycelium_core::config::AnalysisOptions;
    use std::fs;
    use tempfile::TempDir;

    fn empty_artifact() -> Artifact {
        let dir = TempDir::new().unwrap();
        let analysis = pipeline::run(
            dir.path(),
            &AnalysisOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        build(&analysis, None, "2026-01-01T00:00:00Z".to_string())
    }

    #[test]
    fn test_empty_repo_artifact_shape() {
        let artifact = empty_artifact();
        assert_eq!(artifact.version, "1.0");
        assert_eq!(artifact.stats.files, 0);
        assert!(artifact.symbols.is_empty());
        assert!(artifact.calls.is_empty());
        assert!(artifact.communities.is_empty());
        assert!(artifact.processes.is_empty());
    }

    #[test]
    fn test_top_level_key_order() {
        let artifact = empty_artifact();
        let json = to_pretty_json(&artifact);
        let keys = ["version", "metadata", "stats", "structure", "symbols", "imports", "calls", "communities", "processes"];
        // Top-level keys sit at two-space indentation in pretty output;
        // nested keys are deeper, so this probe is unambiguous.
        let mut last = 0;
        for key in keys {
            let position = json
                .find(&format!("\n  \"{key}\""))
                .unwrap_or_else(|| panic!("missing top-level key {key}"));
            assert!(position > last, "{key} out of order");
            last = position;
        }
    }

    #[test]
    fn test_artifact_roundtrips() {
        let artifact = empty_artifact();
        let json = to_pretty_json(&artifact);
        let parsed: Artifact = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.version, artifact.version);
        assert_eq!(parsed.stats.files, 0);
    }

    #[test]
    fn test_language_tags_are_extensions() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "def f(): pass\n").unwrap();
        fs::write(dir.path().join("b.ts"), "export function g() {}\n").unwrap();
        let analysis = pipeline::run(
            dir.path(),
            &AnalysisOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        let artifact = build(&analysis, None, "2026-01-01T00:00:00Z".to_string());
        let json = to_pretty_json(&artifact);
        assert!(json.contains("\"py\""));
        assert!(json.contains("\"ts\""));
        assert_eq!(artifact.stats.files_by_language["py"], 1);
        assert_eq!(artifact.stats.files_by_language["ts"], 1);
    }

    #[test]
    fn test_commit_hash_from_git_head() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".git/refs/heads")).unwrap();
        fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
        fs::write(dir.path().join(".git/refs/heads/main"), "abc123def\n").unwrap();
        // GIT_COMMIT may leak in from the environment; only assert the
        // HEAD-following path when it is absent.
        if std::env::var("GIT_COMMIT").is_err() {
            assert_eq!(read_commit_hash(dir.path()), Some("abc123def".to_string()));
        }
        assert!(read_commit_hash(Path::new("/nonexistent")).is_none()
            || std::env::var("GIT_COMMIT").is_ok());
    }
}
