//! Phase 3: file → file import resolution.
//!
//! One strategy per language family: namespace lookup for .NET, dotted
//! paths for Python and Java, extension probing for TS/JS, module-prefix
//! stripping for Go, module-tree walking for Rust, and include probing for
//! C/C++. Unresolved imports are recorded, never fatal.

use std::collections::BTreeSet;
use std::path::Path;

use mycelium_core::cancel::CancellationToken;
use mycelium_core::graph::KnowledgeGraph;
use mycelium_core::namespace::NamespaceIndex;
use mycelium_core::types::{
    AnalysisError, Lang, PackageReference, ProjectReference, UnresolvedImport,
};
use mycelium_parsers::dotnet;
use mycelium_parsers::walker::WalkResult;

use crate::parsing::FileAnalyses;

/// Phase 3 output that lives outside the graph.
#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub unresolved: Vec<UnresolvedImport>,
    pub project_references: Vec<ProjectReference>,
    pub package_references: Vec<PackageReference>,
}

pub fn run(
    graph: &mut KnowledgeGraph,
    namespaces: &mut NamespaceIndex,
    analyses: &FileAnalyses,
    walk: &WalkResult,
    root: &Path,
    token: &CancellationToken,
) -> Result<ImportOutcome, AnalysisError> {
    let mut outcome = ImportOutcome::default();

    // Project files first: RootNamespace / AssemblyName augment the
    // namespace index before any using-directive is resolved.
    process_dotnet_projects(namespaces, walk, root, &mut outcome);

    let resolver = Resolver::new(graph, root);

    for (path, analysis) in analyses {
        if token.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let Some(lang) = graph.file(path).and_then(|f| f.lang) else {
            continue;
        };
        let mut resolved_edges: Vec<(String, String)> = Vec::new();
        for import in &analysis.imports {
            let targets = resolver.resolve(lang, path, &import.specifier, namespaces);
            if targets.is_empty() {
                outcome.unresolved.push(UnresolvedImport {
                    file: path.clone(),
                    specifier: import.specifier.clone(),
                    raw: import.raw.clone(),
                });
            } else {
                for target in targets {
                    if target != *path {
                        resolved_edges.push((target, import.raw.clone()));
                    }
                }
            }
        }
        for (target, raw) in resolved_edges {
            graph.add_import(path, &target, &raw);
        }
    }

    Ok(outcome)
}

struct Resolver {
    files: BTreeSet<String>,
    /// Directories (without trailing slash, "" for root) that contain files.
    dirs: BTreeSet<String>,
    /// Bases under which Python packages live.
    python_roots: Vec<String>,
    /// Module prefix from go.mod, if present.
    go_module: Option<String>,
}

impl Resolver {
    fn new(graph: &KnowledgeGraph, root: &Path) -> Self {
        let files: BTreeSet<String> = graph.files().map(|f| f.path.clone()).collect();
        let mut dirs: BTreeSet<String> = BTreeSet::new();
        for file in &files {
            let mut dir = parent_dir(file);
            loop {
                dirs.insert(dir.clone());
                if dir.is_empty() {
                    break;
                }
                dir = parent_dir(&dir);
            }
        }

        // A Python source root is any directory with a top-level package
        // (a child directory holding __init__.py) or module directly in it.
        let mut python_roots: Vec<String> = dirs
            .iter()
            .filter(|dir| {
                files.iter().any(|f| {
                    f.ends_with("/__init__.py")
                        && parent_dir(&parent_dir(f)) == **dir
                })
            })
            .cloned()
            .collect();
        if !python_roots.contains(&String::new()) {
            python_roots.insert(0, String::new());
        }
        python_roots.sort();
        python_roots.dedup();

        let go_module = std::fs::read_to_string(root.join("go.mod"))
            .ok()
            .and_then(|content| {
                content.lines().find_map(|line| {
                    line.trim()
                        .strip_prefix("module ")
                        .map(|m| m.trim().to_string())
                })
            });

        Resolver {
            files,
            dirs,
            python_roots,
            go_module,
        }
    }

    fn resolve(
        &self,
        lang: Lang,
        from: &str,
        specifier: &str,
        namespaces: &NamespaceIndex,
    ) -> Vec<String> {
        match lang {
            Lang::CSharp | Lang::VbNet => namespaces
                .files(specifier)
                .into_iter()
                .map(String::from)
                .collect(),
            Lang::Python => self.resolve_python(from, specifier),
            Lang::TypeScript | Lang::JavaScript => self.resolve_ts(from, specifier),
            Lang::Java => self.resolve_java(specifier),
            Lang::Go => self.resolve_go(specifier),
            Lang::Rust => self.resolve_rust(from, specifier),
            Lang::C | Lang::Cpp => self.resolve_include(from, specifier),
        }
    }

    fn resolve_python(&self, from: &str, specifier: &str) -> Vec<String> {
        if let Some(stripped) = specifier.strip_prefix('.') {
            // `.mod` resolves beside the importer, `..mod` one level up.
            let extra_dots = stripped.chars().take_while(|c| *c == '.').count();
            let remainder = &stripped[extra_dots..];
            let mut base = parent_dir(from);
            for _ in 0..extra_dots {
                base = parent_dir(&base);
            }
            return self.probe_python(&base, remainder);
        }
        for root in &self.python_roots {
            let hits = self.probe_python(root, specifier);
            if !hits.is_empty() {
                return hits;
            }
        }
        Vec::new()
    }

    fn probe_python(&self, base: &str, dotted: &str) -> Vec<String> {
        if dotted.is_empty() {
            let init = join(base, "__init__.py");
            return self.existing(&[init]);
        }
        let rel = dotted.replace('.', "/");
        let module = join(base, &format!("{rel}.py"));
        let package = join(base, &format!("{rel}/__init__.py"));
        self.existing(&[module, package])
    }

    fn resolve_ts(&self, from: &str, specifier: &str) -> Vec<String> {
        if !specifier.starts_with('.') {
            return Vec::new(); // bare specifiers stay unresolved
        }
        let joined = dotnet::normalize_path(Path::new(&join(&parent_dir(from), specifier)));
        if self.files.contains(&joined) {
            return vec![joined];
        }
        const EXTS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];
        for ext in EXTS {
            let candidate = format!("{joined}.{ext}");
            if self.files.contains(&candidate) {
                return vec![candidate];
            }
        }
        for ext in EXTS {
            let candidate = format!("{joined}/index.{ext}");
            if self.files.contains(&candidate) {
                return vec![candidate];
            }
        }
        Vec::new()
    }

    fn resolve_java(&self, specifier: &str) -> Vec<String> {
        if let Some(package) = specifier.strip_suffix(".*") {
            let dir = package.replace('.', "/");
            return self
                .files
                .iter()
                .filter(|f| f.ends_with(".java") && parent_dir(f).ends_with(&dir))
                .cloned()
                .collect();
        }
        let rel = format!("{}.java", specifier.replace('.', "/"));
        let by_path: Vec<String> = self
            .files
            .iter()
            .filter(|f| *f == &rel || f.ends_with(&format!("/{rel}")))
            .cloned()
            .collect();
        if !by_path.is_empty() {
            return by_path;
        }
        // Basename fallback.
        let basename = format!("{}.java", specifier.rsplit('.').next().unwrap_or(specifier));
        self.files
            .iter()
            .filter(|f| file_name(f) == basename)
            .cloned()
            .collect()
    }

    fn resolve_go(&self, specifier: &str) -> Vec<String> {
        let Some(module) = &self.go_module else {
            return Vec::new();
        };
        let dir = if specifier == module {
            String::new()
        } else if let Some(rest) = specifier.strip_prefix(&format!("{module}/")) {
            rest.to_string()
        } else {
            return Vec::new();
        };
        if !self.dirs.contains(&dir) {
            return Vec::new();
        }
        self.files
            .iter()
            .filter(|f| f.ends_with(".go") && parent_dir(f) == dir)
            .cloned()
            .collect()
    }

    fn resolve_rust(&self, from: &str, specifier: &str) -> Vec<String> {
        let mut segments: Vec<&str> = specifier.split("::").collect();
        let base = match segments.first().copied() {
            Some("crate") => {
                segments.remove(0);
                self.rust_crate_root(from)
            }
            Some("super") => {
                let mut base = parent_dir(from);
                while segments.first() == Some(&"super") {
                    segments.remove(0);
                    base = parent_dir(&base);
                }
                base
            }
            Some("self") => {
                segments.remove(0);
                parent_dir(from)
            }
            _ => return Vec::new(), // external crate
        };
        if segments.last() == Some(&"*") {
            segments.pop();
        }

        // Progressive shortening: trailing segments are item names, not
        // module path components.
        while !segments.is_empty() {
            let rel = segments.join("/");
            let as_file = join(&base, &format!("{rel}.rs"));
            let as_mod = join(&base, &format!("{rel}/mod.rs"));
            let hits = self.existing(&[as_file, as_mod]);
            if !hits.is_empty() {
                return hits;
            }
            segments.pop();
        }
        Vec::new()
    }

    /// Nearest ancestor directory holding `lib.rs` or `main.rs`.
    fn rust_crate_root(&self, from: &str) -> String {
        let mut dir = parent_dir(from);
        loop {
            if self.files.contains(&join(&dir, "lib.rs"))
                || self.files.contains(&join(&dir, "main.rs"))
            {
                return dir;
            }
            if dir.is_empty() {
                return parent_dir(from);
            }
            dir = parent_dir(&dir);
        }
    }

    fn resolve_include(&self, from: &str, specifier: &str) -> Vec<String> {
        let local = dotnet::normalize_path(Path::new(&join(&parent_dir(from), specifier)));
        if self.files.contains(&local) {
            return self.with_paired_source(local);
        }
        for dir in &self.dirs {
            let candidate = dotnet::normalize_path(Path::new(&join(dir, specifier)));
            if self.files.contains(&candidate) {
                return self.with_paired_source(candidate);
            }
        }
        Vec::new()
    }

    /// A header import also depends on its sibling translation unit, where
    /// the declared functions are actually defined.
    fn with_paired_source(&self, header: String) -> Vec<String> {
        let mut targets = vec![header.clone()];
        if let Some(stem) = header
            .strip_suffix(".h")
            .or_else(|| header.strip_suffix(".hpp"))
            .or_else(|| header.strip_suffix(".hh"))
        {
            for ext in ["c", "cpp", "cc", "cxx"] {
                let source = format!("{stem}.{ext}");
                if self.files.contains(&source) {
                    targets.push(source);
                }
            }
        }
        targets
    }

    fn existing(&self, candidates: &[String]) -> Vec<String> {
        candidates
            .iter()
            .filter(|c| self.files.contains(*c))
            .cloned()
            .collect()
    }
}

fn process_dotnet_projects(
    namespaces: &mut NamespaceIndex,
    walk: &WalkResult,
    root: &Path,
    outcome: &mut ImportOutcome,
) {
    for solution in &walk.solutions {
        let content = match std::fs::read_to_string(root.join(solution)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("mycelium: warning: cannot read {solution}: {e}");
                continue;
            }
        };
        for project in dotnet::parse_solution(&content) {
            outcome.project_references.push(ProjectReference {
                from_project: solution.clone(),
                to_project: project.path,
                kind: "solution".to_string(),
            });
        }
    }

    for project in &walk.projects {
        let content = match std::fs::read_to_string(root.join(project)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("mycelium: warning: cannot read {project}: {e}");
                continue;
            }
        };
        let info = match dotnet::parse_project(&content, project) {
            Ok(info) => info,
            Err(e) => {
                eprintln!("mycelium: warning: skipping malformed {project}: {e}");
                continue;
            }
        };

        for target in info.project_references {
            outcome.project_references.push(ProjectReference {
                from_project: project.clone(),
                to_project: target,
                kind: "project".to_string(),
            });
        }
        for (package, version) in info.package_references {
            outcome.package_references.push(PackageReference {
                project: project.clone(),
                package,
                version,
            });
        }

        // RootNamespace / AssemblyName cover every .NET source file under
        // the project directory.
        let project_dir = parent_dir(project);
        let mut declared: Vec<String> = Vec::new();
        declared.extend(info.root_namespace);
        declared.extend(info.assembly_name);
        declared.dedup();
        // Walk entries were collected in Phase 1; the resolver only sees
        // graph files, so augment from the walk result directly.
        for file in &walk.files {
            let in_project =
                project_dir.is_empty() || file.path.starts_with(&format!("{project_dir}/"));
            if !in_project || !matches!(file.lang, Some(Lang::CSharp) | Some(Lang::VbNet)) {
                continue;
            }
            for ns in &declared {
                namespaces.insert(ns, &file.path);
            }
        }
    }
}

fn parent_dir(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => String::new(),
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn join(base: &str, rest: &str) -> String {
    if base.is_empty() {
        rest.to_string()
    } else {
        format!("{base}/{rest}")
    }
}
