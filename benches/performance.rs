//! Pipeline throughput over a generated TypeScript tree.

use std::fmt::Write as _;
use std::fs;

use criterion::{criterion_group, criterion_main, Criterion};
use tempfile::TempDir;

use mycelium_analysis::pipeline;
use mycelium_core::cancel::CancellationToken;
use mycelium_core::config::AnalysisOptions;

fn generated_repo(file_count: usize, fns_per_file: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();

    for i in 0..file_count {
        let mut content = String::new();
        if i > 0 {
            writeln!(content, "import {{ fn_{}_0 }} from \"./mod_{}\";", i - 1, i - 1).unwrap();
        }
        for j in 0..fns_per_file {
            let callee = if j + 1 < fns_per_file {
                format!("fn_{i}_{}", j + 1)
            } else if i > 0 {
                format!("fn_{}_0", i - 1)
            } else {
                format!("fn_{i}_0")
            };
            writeln!(
                content,
                "export function fn_{i}_{j}(x: number): number {{\n  return {callee}(x) + 1;\n}}\n"
            )
            .unwrap();
        }
        fs::write(src.join(format!("mod_{i}.ts")), &content).unwrap();
    }
    dir
}

fn bench_pipeline(c: &mut Criterion) {
    let repo = generated_repo(40, 8);
    c.bench_function("pipeline_40_files", |b| {
        b.iter(|| {
            pipeline::run(
                repo.path(),
                &AnalysisOptions::default(),
                &CancellationToken::new(),
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
