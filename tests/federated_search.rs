//! Federated search fanning out across two shards.

use bombe::federation::catalog::{Shard, ShardCatalog};
use bombe::federation::executor::FederatedQueryExecutor;
use bombe::federation::planner::FederatedQueryPlanner;
use bombe::federation::router::ShardRouter;
use bombe::config::RuntimeConfig;
use bombe::query::SearchRequest;
use bombe::storage::GraphStore;
use bombe::symbol::Symbol;
use bombe::types::{Range, SymbolKind};
use std::sync::Arc;
use tempfile::TempDir;

fn seed_shard(db_path: &std::path::Path, function_name: &str) {
    let mut store = GraphStore::open(db_path).unwrap();
    store
        .upsert_files(&[bombe::storage::FileRecord {
            path: "service.py".to_string(),
            language: "python".to_string(),
            content_hash: "0".repeat(64),
            size_bytes: Some(0),
        }])
        .unwrap();
    let symbol = Symbol::new(
        function_name,
        format!("service.{function_name}"),
        SymbolKind::Function,
        "service.py",
        Range { start_line: 1, start_column: 0, end_line: 1, end_column: 1 },
    );
    store.replace_file_symbols("service.py", &[symbol]).unwrap();
}

#[tokio::test]
async fn search_fans_out_across_two_shards_and_merges_deterministically() {
    let dir = TempDir::new().unwrap();
    let shard_a_db = dir.path().join("shard_a.db");
    let shard_b_db = dir.path().join("shard_b.db");
    seed_shard(&shard_a_db, "handle_request");
    seed_shard(&shard_b_db, "handle_response");

    let catalog = Arc::new(ShardCatalog::open_in_memory().unwrap());
    catalog
        .register_shard(&Shard {
            repo_id: "repo-a".to_string(),
            repo_path: "/repos/a".to_string(),
            db_path: shard_a_db.to_string_lossy().to_string(),
            enabled: true,
            last_indexed_at: None,
            symbol_count: 1,
            edge_count: 0,
        })
        .unwrap();
    catalog
        .register_shard(&Shard {
            repo_id: "repo-b".to_string(),
            repo_path: "/repos/b".to_string(),
            db_path: shard_b_db.to_string_lossy().to_string(),
            enabled: true,
            last_indexed_at: None,
            symbol_count: 1,
            edge_count: 0,
        })
        .unwrap();

    let router = Arc::new(ShardRouter::new(catalog.clone(), 4));
    let planner = FederatedQueryPlanner::new(&router);
    let plan = planner.plan_search().unwrap();
    assert_eq!(plan.shard_ids.len(), 2);

    let executor = FederatedQueryExecutor::new(router.clone());
    let request = SearchRequest { query: "handle".to_string(), limit: 20, kind: None, file_pattern: None };
    let response = executor.execute_search(&plan, request, RuntimeConfig::default()).await;

    assert_eq!(response.shards_queried, 2);
    assert_eq!(response.shards_failed, 0);
    assert_eq!(response.hits.len(), 2);
    let uris: Vec<String> = response.hits.iter().map(|h| h.uri.clone()).collect();
    assert!(uris.iter().any(|u| u.starts_with("bombe://repo-a/")));
    assert!(uris.iter().any(|u| u.starts_with("bombe://repo-b/")));
}
