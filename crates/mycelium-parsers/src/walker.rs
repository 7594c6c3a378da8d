//! Phase 1: repository structure walk.
//!
//! Enumerates files and folders under the root, skipping the fixed ignore
//! set plus caller-supplied globs. Oversized files are recorded but marked
//! non-parseable. Solution and project files are collected for Phase 3.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use mycelium_core::types::{FileNode, FolderNode, Lang};

/// Path segments always skipped, regardless of caller configuration.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    ".git",
    "bin",
    "obj",
    "node_modules",
    "packages",
    ".vs",
    ".idea",
    "TestResults",
    "dist",
    "build",
    "target",
    ".venv",
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
];

/// Everything Phase 1 hands to the rest of the pipeline.
#[derive(Debug, Default)]
pub struct WalkResult {
    /// Sorted by path.
    pub files: Vec<FileNode>,
    /// Sorted by path, trailing slash.
    pub folders: Vec<FolderNode>,
    /// Repo-relative `.sln` paths.
    pub solutions: Vec<String>,
    /// Repo-relative `.csproj` / `.vbproj` paths.
    pub projects: Vec<String>,
}

pub struct StructureWalker {
    root: PathBuf,
    excludes: GlobSet,
    max_file_size: u64,
}

impl StructureWalker {
    pub fn new(root: &Path, exclude_patterns: &[String], max_file_size: u64) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in exclude_patterns {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => {
                    eprintln!("mycelium: warning: ignoring bad exclude pattern {pattern}: {e}");
                }
            }
        }
        let excludes = builder.build().unwrap_or_else(|_| GlobSet::empty());
        StructureWalker {
            root: root.to_path_buf(),
            excludes,
            max_file_size,
        }
    }

    /// Walk the repository. I/O errors on single entries are logged and
    /// skipped; an empty repository yields an empty, well-formed result.
    pub fn walk(&self) -> WalkResult {
        let mut result = WalkResult::default();
        let mut folder_files: BTreeMap<String, u32> = BTreeMap::new();

        let root = self.root.clone();
        let excludes = self.excludes.clone();
        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false)
            .ignore(false)
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                if DEFAULT_IGNORE_DIRS.contains(&name.as_ref()) {
                    return false;
                }
                let rel = entry
                    .path()
                    .strip_prefix(&root)
                    .unwrap_or(entry.path())
                    .to_string_lossy()
                    .replace('\\', "/");
                !excludes.is_match(rel.as_str())
            })
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    eprintln!("mycelium: warning: skipping unreadable entry: {e}");
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            let rel = relative_path(&self.root, entry.path());

            if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                folder_files.entry(format!("{rel}/")).or_insert(0);
                continue;
            }
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            if rel.ends_with(".sln") {
                result.solutions.push(rel.clone());
            } else if rel.ends_with(".csproj") || rel.ends_with(".vbproj") {
                result.projects.push(rel.clone());
            }

            let size = match entry.metadata() {
                Ok(m) => m.len(),
                Err(e) => {
                    eprintln!("mycelium: warning: skipping {rel}: {e}");
                    continue;
                }
            };

            let oversized = size > self.max_file_size;
            let (lines, readable) = if oversized {
                (0, false)
            } else {
                match std::fs::read_to_string(entry.path()) {
                    Ok(content) => (content.lines().count() as u32, true),
                    Err(_) => (0, false),
                }
            };

            if let Some(parent) = Path::new(&rel).parent() {
                let parent = parent.to_string_lossy().replace('\\', "/");
                if !parent.is_empty() {
                    *folder_files.entry(format!("{parent}/")).or_insert(0) += 1;
                }
            }

            let ext = Path::new(&rel)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("");
            let lang = Lang::from_extension(ext);
            result.files.push(FileNode {
                path: rel,
                lang,
                size,
                lines,
                parseable: readable && !oversized,
            });
        }

        result.files.sort_by(|a, b| a.path.cmp(&b.path));
        result.solutions.sort();
        result.projects.sort();
        result.folders = folder_files
            .into_iter()
            .map(|(path, file_count)| FolderNode { path, file_count })
            .collect();
        result
    }
}

/// Repo-relative forward-slash path.
pub fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
