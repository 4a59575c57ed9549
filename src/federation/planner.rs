//! `FederatedQueryPlanner`: decides which shards a federated query touches
//! before the executor opens a single connection. Search
//! always fans out to every enabled shard; references/impact route through
//! the exported-symbol catalog; context routes by entry point when given
//! one, else fans out.

use super::router::ShardRouter;
use crate::error::FederationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOutStrategy {
    All,
    Routed,
}

#[derive(Debug, Clone)]
pub struct ShardQueryPlan {
    pub shard_ids: Vec<String>,
    pub fan_out_strategy: FanOutStrategy,
}

pub struct FederatedQueryPlanner<'a> {
    router: &'a ShardRouter,
}

impl<'a> FederatedQueryPlanner<'a> {
    pub fn new(router: &'a ShardRouter) -> Self {
        Self { router }
    }

    pub fn plan_search(&self) -> FederationResult<ShardQueryPlan> {
        Ok(ShardQueryPlan {
            shard_ids: self.router.all_shard_ids()?,
            fan_out_strategy: FanOutStrategy::All,
        })
    }

    pub fn plan_references_or_impact(&self, symbol_name: &str) -> FederationResult<ShardQueryPlan> {
        let routed = self.router.route_symbol_query(symbol_name)?;
        let all = self.router.all_shard_ids()?;
        let strategy = if routed.len() < all.len() { FanOutStrategy::Routed } else { FanOutStrategy::All };
        Ok(ShardQueryPlan {
            shard_ids: routed,
            fan_out_strategy: strategy,
        })
    }

    pub fn plan_context(&self, entry_points: &[String]) -> FederationResult<ShardQueryPlan> {
        if entry_points.is_empty() {
            return Ok(ShardQueryPlan {
                shard_ids: self.router.all_shard_ids()?,
                fan_out_strategy: FanOutStrategy::All,
            });
        }
        let mut shard_ids = Vec::new();
        for entry in entry_points {
            for id in self.router.route_symbol_query(entry)? {
                if !shard_ids.contains(&id) {
                    shard_ids.push(id);
                }
            }
        }
        Ok(ShardQueryPlan {
            shard_ids,
            fan_out_strategy: FanOutStrategy::Routed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federation::catalog::{Shard, ShardCatalog};
    use std::sync::Arc;

    fn make_router() -> ShardRouter {
        let catalog = Arc::new(ShardCatalog::open_in_memory().unwrap());
        for id in ["aaa", "bbb"] {
            catalog
                .register_shard(&Shard {
                    repo_id: id.to_string(),
                    repo_path: format!("/repos/{id}"),
                    db_path: format!("/repos/{id}/.bombe/graph.db"),
                    enabled: true,
                    last_indexed_at: None,
                    symbol_count: 0,
                    edge_count: 0,
                })
                .unwrap();
        }
        ShardRouter::new(catalog, 4)
    }

    #[test]
    fn search_always_fans_out() {
        let router = make_router();
        let planner = FederatedQueryPlanner::new(&router);
        let plan = planner.plan_search().unwrap();
        assert_eq!(plan.fan_out_strategy, FanOutStrategy::All);
        assert_eq!(plan.shard_ids.len(), 2);
    }

    #[test]
    fn context_with_no_entry_points_fans_out() {
        let router = make_router();
        let planner = FederatedQueryPlanner::new(&router);
        let plan = planner.plan_context(&[]).unwrap();
        assert_eq!(plan.fan_out_strategy, FanOutStrategy::All);
    }
}
