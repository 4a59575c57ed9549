//! Benchmarks `recompute_pagerank` over synthetic call graphs of
//! increasing size, matching the scale the incremental indexer rebuilds
//! on every run.
//!
//! Run with: cargo bench --bench pagerank_bench

use bombe::relationship::{Edge, NodeType, RelationKind};
use bombe::storage::{FileRecord, GraphStore};
use bombe::symbol::Symbol;
use bombe::types::{Range, SymbolKind};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn build_store(num_symbols: usize) -> GraphStore {
    let mut store = GraphStore::open_in_memory().expect("open in-memory store");
    store
        .upsert_files(&[FileRecord {
            path: "bench.py".to_string(),
            language: "python".to_string(),
            content_hash: "0".repeat(64),
            size_bytes: Some(0),
        }])
        .expect("seed file row");

    let symbols: Vec<Symbol> = (0..num_symbols)
        .map(|i| {
            Symbol::new(
                format!("fn_{i}"),
                format!("bench.fn_{i}"),
                SymbolKind::Function,
                "bench.py",
                Range { start_line: i as u32, start_column: 0, end_line: i as u32, end_column: 1 },
            )
        })
        .collect();
    store.replace_file_symbols("bench.py", &symbols).expect("seed symbols");

    let ids: Vec<u32> = (0..num_symbols)
        .map(|i| {
            store
                .symbol_id_for(&format!("bench.fn_{i}"), "bench.py")
                .expect("lookup id")
                .expect("id present")
                .to_u32()
        })
        .collect();

    // Each function calls the next two (a fan-out chain), giving PageRank
    // a non-trivial in-degree distribution to converge over.
    let edges: Vec<Edge> = ids
        .iter()
        .enumerate()
        .flat_map(|(i, &source)| {
            [1usize, 2usize].into_iter().filter_map(move |offset| {
                ids.get(i + offset).map(|&target| {
                    Edge::new(source, target, NodeType::Symbol, NodeType::Symbol, RelationKind::Calls)
                        .with_location("bench.py".to_string(), i as u32)
                        .with_confidence(1.0)
                })
            })
        })
        .collect();
    store.replace_file_edges("bench.py", &edges).expect("seed edges");

    store
}

fn bench_pagerank(c: &mut Criterion) {
    let mut group = c.benchmark_group("pagerank");
    for size in [100usize, 1_000, 5_000] {
        let mut store = build_store(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                bombe::indexing::pagerank::recompute_pagerank(&mut store).expect("pagerank converges");
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pagerank);
criterion_main!(benches);
