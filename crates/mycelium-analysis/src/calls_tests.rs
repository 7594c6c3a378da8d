use super::*;
use mycelium_core::cancel::CancellationToken;
use mycelium_core::config::AnalysisOptions;
use mycelium_core::namespace::NamespaceIndex;
use mycelium_core::types::{FileNode, Lang};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Full phase-2..4 run over in-memory fixture files.
fn analyse(files: &[(&str, &str)]) -> (KnowledgeGraph, SymbolTable) {
    let dir = TempDir::new().unwrap();
    let mut graph = KnowledgeGraph::new();
    let mut sorted: Vec<_> = files.to_vec();
    sorted.sort_by_key(|(p, _)| p.to_string());
    for (path, content) in &sorted {
        let absolute = dir.path().join(path);
        fs::create_dir_all(absolute.parent().unwrap()).unwrap();
        fs::write(&absolute, content).unwrap();
        let ext = Path::new(path).extension().and_then(|e| e.to_str()).unwrap_or("");
        graph.add_file(FileNode {
            path: path.to_string(),
            lang: Lang::from_extension(ext),
            size: content.len() as u64,
            lines: content.lines().count() as u32,
            parseable: true,
        });
    }

    let mut table = SymbolTable::new();
    let mut ns = NamespaceIndex::new();
    let registry = AnalyserRegistry::new();
    let token = CancellationToken::new();
    let analyses = crate::parsing::run(
        &mut graph,
        &mut table,
        &mut ns,
        &registry,
        dir.path(),
        &AnalysisOptions::default(),
        &token,
    )
    .unwrap();
    let walk = mycelium_parsers::walker::WalkResult::default();
    crate::imports::run(&mut graph, &mut ns, &analyses, &walk, dir.path(), &token).unwrap();
    run(&mut graph, &table, &analyses, &registry, &token).unwrap();
    (graph, table)
}

fn edge<'a>(
    graph: &'a KnowledgeGraph,
    table: &SymbolTable,
    from: (&str, &str),
    to: (&str, &str),
) -> Option<CallEdge> {
    let from_id = table.lookup(from.0, from.1)?;
    let to_id = table.lookup(to.0, to.1)?;
    graph
        .call_edges()
        .into_iter()
        .find(|e| e.from == from_id && e.to == to_id)
}

#[test]
fn test_tier_a_via_ts_import() {
    let (graph, table) = analyse(&[
        (
            "src/controller.ts",
            r#"import { createUser } from "./service";
export function handleCreate(name: string) {
    return createUser(name);
}
"#,
        ),
        (
            "src/service.ts",
            r#"export function createUser(name: string) {
    return { name };
}
"#,
        ),
    ]);
    let e = edge(
        &graph,
        &table,
        ("src/controller.ts", "handleCreate"),
        ("src/service.ts", "createUser"),
    )
    .expect("tier A edge");
    assert_eq!(e.tier, CallTier::A);
    assert_eq!(e.confidence, 0.9);
    assert_eq!(e.reason, "import-resolved");
}

#[test]
fn test_tier_b_same_file() {
    let (graph, table) = analyse(&[(
        "lib.py",
        r#"def helper():
    return 1

def main():
    return helper()
"#,
    )]);
    let e = edge(&graph, &table, ("lib.py", "main"), ("lib.py", "helper"))
        .expect("tier B edge");
    assert_eq!(e.tier, CallTier::B);
    assert_eq!(e.confidence, 0.85);
    assert_eq!(e.reason, "same-file");
}

#[test]
fn test_tier_c_unique_and_ambiguous() {
    let (graph, table) = analyse(&[
        (
            "a.py",
            r#"def caller():
    lone()
    twin()
"#,
        ),
        ("b.py", "def lone(): pass\n\ndef twin(): pass\n"),
        ("c.py", "def twin(): pass\n"),
    ]);
    let unique = edge(&graph, &table, ("a.py", "caller"), ("b.py", "lone")).unwrap();
    assert_eq!(unique.confidence, 0.5);
    assert_eq!(unique.tier, CallTier::C);

    let ambiguous_b = edge(&graph, &table, ("a.py", "caller"), ("b.py", "twin")).unwrap();
    let ambiguous_c = edge(&graph, &table, ("a.py", "caller"), ("c.py", "twin")).unwrap();
    assert_eq!(ambiguous_b.confidence, 0.3);
    assert_eq!(ambiguous_c.confidence, 0.3);
}

#[test]
fn test_builtins_filtered() {
    let (graph, table) = analyse(&[(
        "a.py",
        r#"def caller():
    print("x")
    len([1])
"#,
    )]);
    let _ = table;
    assert!(graph.call_edges().is_empty());
}

#[test]
fn test_di_and_impl_fan_out() {
    let (graph, table) = analyse(&[
        (
            "App/IAbsenceRepository.cs",
            r#"namespace App
{
    public interface IAbsenceRepository
    {
        int GetDaysTaken(int employeeId);
    }
}
"#,
        ),
        (
            "App/AbsenceRepository.cs",
            r#"namespace App
{
    public class AbsenceRepository : IAbsenceRepository
    {
        public int GetDaysTaken(int employeeId)
        {
            return 3;
        }
    }
}
"#,
        ),
        (
            "App/AbsenceService.cs",
            r#"using App;

namespace App
{
    public class AbsenceService
    {
        private readonly IAbsenceRepository _repository;

        public AbsenceService(IAbsenceRepository repository)
        {
            _repository = repository;
        }

        public int CalculateEntitlement(int employeeId)
        {
            return 25 - _repository.GetDaysTaken(employeeId);
        }
    }
}
"#,
        ),
    ]);

    // DI resolution to the interface member.
    let di = edge(
        &graph,
        &table,
        ("App/AbsenceService.cs", "CalculateEntitlement"),
        ("App/IAbsenceRepository.cs", "GetDaysTaken"),
    )
    .expect("di-resolved edge");
    assert_eq!(di.confidence, 0.85);
    assert_eq!(di.reason, "di-resolved");

    // Fan-out to the implementing class member.
    let impl_edge = edge(
        &graph,
        &table,
        ("App/AbsenceService.cs", "CalculateEntitlement"),
        ("App/AbsenceRepository.cs", "GetDaysTaken"),
    )
    .expect("impl-resolved edge");
    assert_eq!(impl_edge.confidence, 0.85);
    assert_eq!(impl_edge.reason, "impl-resolved");
}

#[test]
fn test_self_qualifier_prefers_same_file() {
    let (graph, table) = analyse(&[
        (
            "svc.ts",
            r#"import { build } from "./other";
export class Service {
    run() {
        return this.build();
    }
    build() {
        return 1;
    }
}
"#,
        ),
        ("other.ts", "export function build() { return 2; }\n"),
    ]);
    let e = edge(&graph, &table, ("svc.ts", "run"), ("svc.ts", "build"))
        .expect("same-file edge");
    assert_eq!(e.reason, "same-file");
    assert!(edge(&graph, &table, ("svc.ts", "run"), ("other.ts", "build")).is_none());
}
