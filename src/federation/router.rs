//! `ShardRouter`: lazily opens per-shard [`GraphStore`] handles (bounded by
//! a connection-pool cap), tracks per-repo health, and narrows a symbol
//! lookup to the shards known to export it.

use super::catalog::ShardCatalog;
use crate::error::{FederationError, FederationResult};
use crate::storage::GraphStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardHealth {
    Unopened,
    Healthy,
    Failed,
}

struct RouterState {
    open: HashMap<String, Arc<Mutex<GraphStore>>>,
    health: HashMap<String, ShardHealth>,
}

/// Opens shard handles on demand and evicts the least-recently-opened one
/// once `max_open` is reached, the way the reference implementation bounds
/// concurrent SQLite connections across many federated repos.
pub struct ShardRouter {
    catalog: Arc<ShardCatalog>,
    max_open: usize,
    state: Mutex<RouterState>,
    open_order: Mutex<Vec<String>>,
}

impl ShardRouter {
    pub fn new(catalog: Arc<ShardCatalog>, max_open: usize) -> Self {
        Self {
            catalog,
            max_open: max_open.max(1),
            state: Mutex::new(RouterState {
                open: HashMap::new(),
                health: HashMap::new(),
            }),
            open_order: Mutex::new(Vec::new()),
        }
    }

    pub fn all_shard_ids(&self) -> FederationResult<Vec<String>> {
        self.catalog.enabled_shard_ids()
    }

    /// Opens (or returns the already-open handle for) `repo_id`'s shard
    /// database. Evicts the oldest open handle first if at capacity.
    pub fn open_shard(&self, repo_id: &str) -> FederationResult<Arc<Mutex<GraphStore>>> {
        {
            let state = self.state.lock();
            if let Some(existing) = state.open.get(repo_id) {
                return Ok(existing.clone());
            }
        }
        let shard = self
            .catalog
            .shard(repo_id)?
            .ok_or_else(|| FederationError::UnknownShard { shard_id: repo_id.to_string() })?;
        let store = GraphStore::open(&shard.db_path).map_err(|_| FederationError::UnknownShard {
            shard_id: repo_id.to_string(),
        })?;
        let handle = Arc::new(Mutex::new(store));

        let mut state = self.state.lock();
        let mut order = self.open_order.lock();
        if state.open.len() >= self.max_open {
            if let Some(oldest) = order.first().cloned() {
                state.open.remove(&oldest);
                order.retain(|id| id != &oldest);
            }
        }
        state.open.insert(repo_id.to_string(), handle.clone());
        state.health.insert(repo_id.to_string(), ShardHealth::Healthy);
        order.push(repo_id.to_string());
        Ok(handle)
    }

    pub fn mark_failed(&self, repo_id: &str) {
        self.state.lock().health.insert(repo_id.to_string(), ShardHealth::Failed);
    }

    pub fn mark_healthy(&self, repo_id: &str) {
        self.state.lock().health.insert(repo_id.to_string(), ShardHealth::Healthy);
    }

    pub fn shard_health(&self) -> HashMap<String, ShardHealth> {
        self.state.lock().health.clone()
    }

    /// Narrows a symbol-name query to the shards that export it, falling
    /// back to all enabled shards when nothing in the catalog matches
    /// -> repo_ids containing the
    /// symbol, else all shards`).
    pub fn route_symbol_query(&self, name: &str) -> FederationResult<Vec<String>> {
        let owners = self.catalog.repos_exporting(name)?;
        if owners.is_empty() {
            self.all_shard_ids()
        } else {
            Ok(owners)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federation::catalog::Shard;

    fn register(catalog: &ShardCatalog, id: &str, db_path: &std::path::Path) {
        catalog
            .register_shard(&Shard {
                repo_id: id.to_string(),
                repo_path: format!("/repos/{id}"),
                db_path: db_path.to_string_lossy().to_string(),
                enabled: true,
                last_indexed_at: None,
                symbol_count: 0,
                edge_count: 0,
            })
            .unwrap();
    }

    #[test]
    fn route_falls_back_to_all_shards_when_unrouted() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(ShardCatalog::open_in_memory().unwrap());
        register(&catalog, "aaa", &dir.path().join("aaa.db"));
        register(&catalog, "bbb", &dir.path().join("bbb.db"));
        let router = ShardRouter::new(catalog, 4);
        let routed = router.route_symbol_query("nothing_exports_this").unwrap();
        assert_eq!(routed.len(), 2);
    }

    #[test]
    fn pool_evicts_oldest_handle_at_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(ShardCatalog::open_in_memory().unwrap());
        for id in ["aaa", "bbb", "ccc"] {
            register(&catalog, id, &dir.path().join(format!("{id}.db")));
        }
        let router = ShardRouter::new(catalog, 2);
        router.open_shard("aaa").unwrap();
        router.open_shard("bbb").unwrap();
        router.open_shard("ccc").unwrap();
        assert_eq!(router.state.lock().open.len(), 2);
    }
}
