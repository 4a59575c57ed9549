//! `FederatedQueryExecutor`: runs a [`ShardQueryPlan`] concurrently across
//! shards with a per-shard timeout, merges results deterministically, and
//! never lets one shard's failure fail the whole query.

use super::catalog::GlobalSymbolUri;
use super::planner::ShardQueryPlan;
use super::router::ShardRouter;
use crate::config::RuntimeConfig;
use crate::query::{search_symbols, SearchHit, SearchRequest};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_SHARD_TIMEOUT: Duration = Duration::from_secs(5);
pub const MAX_MERGED_RESULTS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardStatus {
    Ok,
    Failed,
    Timeout,
}

#[derive(Debug, Clone)]
pub struct ShardReport {
    pub shard_id: String,
    pub status: ShardStatus,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct FederatedSearchHit {
    pub uri: String,
    pub hit: SearchHit,
}

#[derive(Debug, Clone, Default)]
pub struct FederatedSearchResponse {
    pub hits: Vec<FederatedSearchHit>,
    pub shard_reports: Vec<ShardReportSummary>,
    pub shards_queried: usize,
    pub shards_failed: usize,
}

#[derive(Debug, Clone)]
pub struct ShardReportSummary {
    pub shard_id: String,
    pub status: &'static str,
    pub elapsed_ms: u64,
}

pub struct FederatedQueryExecutor {
    router: Arc<ShardRouter>,
    shard_timeout: Duration,
}

impl FederatedQueryExecutor {
    pub fn new(router: Arc<ShardRouter>) -> Self {
        Self {
            router,
            shard_timeout: DEFAULT_SHARD_TIMEOUT,
        }
    }

    pub fn with_shard_timeout(mut self, timeout: Duration) -> Self {
        self.shard_timeout = timeout;
        self
    }

    /// Executes `search_symbols` across every shard in `plan`, concurrently,
    /// each bounded by `shard_timeout`. Blocking SQLite work runs on
    /// `spawn_blocking` so one slow shard can't stall the others.
    pub async fn execute_search(
        &self,
        plan: &ShardQueryPlan,
        request: SearchRequest,
        runtime: RuntimeConfig,
    ) -> FederatedSearchResponse {
        let mut tasks = Vec::new();
        for shard_id in &plan.shard_ids {
            let shard_id = shard_id.clone();
            let router = self.router.clone();
            let request = request.clone();
            let runtime = runtime.clone();
            let timeout = self.shard_timeout;
            tasks.push(tokio::spawn(async move {
                let start = Instant::now();
                let outcome = tokio::time::timeout(timeout, async {
                    let handle = router
                        .open_shard(&shard_id)
                        .map_err(|e| e.to_string())?;
                    tokio::task::spawn_blocking(move || {
                        let store = handle.lock();
                        search_symbols(&store, &runtime, &request).map_err(|e| e.to_string())
                    })
                    .await
                    .map_err(|e| e.to_string())?
                })
                .await;
                let elapsed_ms = start.elapsed().as_millis() as u64;
                match outcome {
                    Ok(Ok(Ok(response))) => {
                        router.mark_healthy(&shard_id);
                        (shard_id, ShardStatus::Ok, elapsed_ms, Some(response.hits))
                    }
                    Ok(Ok(Err(_))) | Ok(Err(_)) => {
                        router.mark_failed(&shard_id);
                        (shard_id, ShardStatus::Failed, elapsed_ms, None)
                    }
                    Err(_) => {
                        router.mark_failed(&shard_id);
                        (shard_id, ShardStatus::Timeout, elapsed_ms, None)
                    }
                }
            }));
        }

        let mut reports = Vec::new();
        let mut merged: Vec<FederatedSearchHit> = Vec::new();
        let mut shards_failed = 0usize;
        for task in tasks {
            let (shard_id, status, elapsed_ms, hits) = match task.await {
                Ok(result) => result,
                Err(_) => continue,
            };
            if status != ShardStatus::Ok {
                shards_failed += 1;
            }
            if let Some(hits) = hits {
                for hit in hits {
                    let uri = GlobalSymbolUri::new(shard_id.clone(), hit.qualified_name.clone(), hit.file_path.clone());
                    merged.push(FederatedSearchHit { uri: uri.to_string(), hit });
                }
            }
            reports.push(ShardReport { shard_id, status, elapsed_ms });
        }

        // Deterministic merge: score desc, then (qualified_name, file_path) -
        // matches the single-shard ordering and breaks cross-shard ties
        // reproducibly.
        merged.sort_by(|a, b| {
            b.hit
                .score
                .partial_cmp(&a.hit.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.hit.qualified_name.cmp(&b.hit.qualified_name))
                .then_with(|| a.hit.file_path.cmp(&b.hit.file_path))
        });
        merged.truncate(MAX_MERGED_RESULTS);

        let shards_queried = reports.len();
        FederatedSearchResponse {
            hits: merged,
            shard_reports: reports
                .into_iter()
                .map(|r| ShardReportSummary {
                    shard_id: r.shard_id,
                    status: match r.status {
                        ShardStatus::Ok => "ok",
                        ShardStatus::Failed => "failed",
                        ShardStatus::Timeout => "timeout",
                    },
                    elapsed_ms: r.elapsed_ms,
                })
                .collect(),
            shards_queried,
            shards_failed,
        }
    }
}
