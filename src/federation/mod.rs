//! Cross-repo federation: a catalog of per-repo shards and
//! their exported symbols, a router that narrows a query to the shards
//! likely to answer it, and a planner/executor pair that fans a query out
//! across shards with per-shard timeouts and deterministic result merging.

pub mod catalog;
pub mod executor;
pub mod planner;
pub mod router;

pub use catalog::{CrossRepoEdge, ExportedSymbol, GlobalSymbolUri, Shard, ShardCatalog};
pub use executor::{FederatedQueryExecutor, ShardReport, ShardStatus};
pub use planner::{FanOutStrategy, FederatedQueryPlanner, ShardQueryPlan};
pub use router::ShardRouter;

/// `repo_id = SHA-256(canonical_repo_path)[:16]`, distinct
/// from the sync engine's raw-path `repo_id` (see `DESIGN.md`'s "repo_id
/// scheme" decision) — this one is embedded in cross-repo URIs and must be
/// short and stable under path relocation.
pub fn repo_id_for_path(canonical_path: &std::path::Path) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(canonical_path.to_string_lossy().as_bytes());
    format!("{digest:x}")[..16].to_string()
}

/// Run right after an incremental index: refreshes this
/// repo's exported-symbol rows in the catalog, then tries to resolve every
/// unresolved [`crate::storage::ExternalDep`] against other shards' exports,
/// upserting one [`CrossRepoEdge`] per hit and skipping self-repo matches.
pub fn post_index_cross_repo_sync(
    store: &crate::storage::GraphStore,
    catalog: &ShardCatalog,
    repo_id: &str,
) -> crate::error::FederationResult<usize> {
    use crate::error::FederationError;

    let conn = store.connection();
    let mut stmt = conn
        .prepare(
            "SELECT name, qualified_name, kind, file_path FROM symbols WHERE visibility = 'public';",
        )
        .map_err(|_| FederationError::UnknownShard { shard_id: repo_id.to_string() })?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ExportedSymbol {
                repo_id: repo_id.to_string(),
                name: row.get(0)?,
                kind: row.get(2)?,
                qualified_name: row.get(1)?,
                file_path: row.get(3)?,
                language: String::new(),
            })
        })
        .map_err(|_| FederationError::UnknownShard { shard_id: repo_id.to_string() })?;
    let mut exported = Vec::new();
    for row in rows {
        exported.push(row.map_err(|_| FederationError::UnknownShard { shard_id: repo_id.to_string() })?);
    }
    catalog.replace_exported_symbols(repo_id, &exported)?;

    let mut stmt = conn
        .prepare("SELECT file_path, module_name FROM external_deps;")
        .map_err(|_| FederationError::UnknownShard { shard_id: repo_id.to_string() })?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(|_| FederationError::UnknownShard { shard_id: repo_id.to_string() })?;
    let mut deps = Vec::new();
    for row in rows {
        deps.push(row.map_err(|_| FederationError::UnknownShard { shard_id: repo_id.to_string() })?);
    }
    drop(stmt);

    let mut new_edges = 0usize;
    for (file_path, module_name) in deps {
        let module_tail = module_name.rsplit(['.', '/']).next().unwrap_or(&module_name);
        for hit in catalog.resolve_external_import(module_tail, repo_id)? {
            let source = GlobalSymbolUri::new(repo_id, &file_path, &file_path);
            let target = GlobalSymbolUri::new(&hit.repo_id, &hit.qualified_name, &hit.file_path);
            let edge = CrossRepoEdge {
                source_uri: source.to_string(),
                target_uri: target.to_string(),
                relationship: crate::relationship::RelationKind::Imports.as_str().to_string(),
            };
            catalog.upsert_cross_repo_edge(&edge)?;
            new_edges += 1;
        }
    }
    Ok(new_edges)
}
