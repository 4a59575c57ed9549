//! Benchmarks parsing plus call-graph extraction over a generated Python
//! module with cross-function calls, the per-file hot path of
//! `full_index`/`incremental_index`.
//!
//! Run with: cargo bench --bench callgraph_bench

use bombe::config::RuntimeConfig;
use bombe::indexing::callgraph::build_pending_call_edges;
use bombe::parsing::{extract_symbols, parse_file};
use bombe::types::Language;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::fs;
use tempfile::TempDir;

fn generate_module(num_functions: usize) -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let mut source = String::with_capacity(num_functions * 64);
    for i in 0..num_functions {
        source.push_str(&format!("def fn_{i}():\n"));
        if i > 0 {
            source.push_str(&format!("    fn_{}()\n", i - 1));
        }
        if i + 1 < num_functions {
            source.push_str(&format!("    fn_{}()\n", (i + 1) % num_functions));
        }
        source.push('\n');
    }
    let path = dir.path().join("module.py");
    fs::write(&path, source).expect("write fixture");
    (dir, path)
}

fn bench_callgraph(c: &mut Criterion) {
    let runtime = RuntimeConfig::default();
    let mut group = c.benchmark_group("callgraph");
    for size in [50usize, 200, 1_000] {
        let (_dir, path) = generate_module(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let parsed = parse_file(&path, Language::Python, &runtime).expect("parse fixture");
                let extraction = extract_symbols(&parsed);
                build_pending_call_edges(&parsed, &extraction.symbols, &extraction.symbols)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_callgraph);
criterion_main!(benches);
