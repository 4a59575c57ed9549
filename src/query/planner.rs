//! Time-bounded, LRU-capped query result cache wrapping every tool
//! invocation.
//!
//! Keyed by `(tool, version_token, canonical_payload)` so a mutation that
//! bumps the store's version token invalidates every cached entry without
//! the cache needing to know what changed.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
}

#[derive(Debug, Clone)]
pub struct QueryTrace {
    pub lookup_ms: f64,
    pub compute_ms: f64,
    pub total_ms: f64,
}

struct Entry {
    value: serde_json::Value,
    inserted_at: Instant,
    last_used: Instant,
}

pub struct QueryPlanner {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
    capacity: usize,
}

impl QueryPlanner {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity,
        }
    }

    fn key(tool: &str, version_token: u64, canonical_payload: &str) -> String {
        format!("{tool}\u{1f}{version_token}\u{1f}{canonical_payload}")
    }

    /// Runs `compute` unless a live cache entry exists for the key, tracking
    /// lookup/compute/total timings the way the planner's trace reports.
    pub fn get_or_compute<F>(
        &self,
        tool: &str,
        version_token: u64,
        canonical_payload: &str,
        compute: F,
    ) -> (serde_json::Value, CacheOutcome, QueryTrace)
    where
        F: FnOnce() -> serde_json::Value,
    {
        let total_start = Instant::now();
        let key = Self::key(tool, version_token, canonical_payload);
        let lookup_start = Instant::now();
        {
            let mut entries = self.entries.lock();
            if let Some(entry) = entries.get_mut(&key) {
                if entry.inserted_at.elapsed() <= self.ttl {
                    entry.last_used = Instant::now();
                    let lookup_ms = lookup_start.elapsed().as_secs_f64() * 1000.0;
                    let total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
                    return (
                        entry.value.clone(),
                        CacheOutcome::Hit,
                        QueryTrace {
                            lookup_ms,
                            compute_ms: 0.0,
                            total_ms,
                        },
                    );
                }
                entries.remove(&key);
            }
        }
        let lookup_ms = lookup_start.elapsed().as_secs_f64() * 1000.0;

        let compute_start = Instant::now();
        let value = compute();
        let compute_ms = compute_start.elapsed().as_secs_f64() * 1000.0;

        self.insert(key, value.clone());

        let total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
        (
            value,
            CacheOutcome::Miss,
            QueryTrace {
                lookup_ms,
                compute_ms,
                total_ms,
            },
        )
    }

    fn insert(&self, key: String, value: serde_json::Value) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            if let Some(oldest_key) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest_key);
            }
        }
        let now = Instant::now();
        entries.insert(
            key,
            Entry {
                value,
                inserted_at: now,
                last_used: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn invalidate_all(&self) {
        self.entries.lock().clear();
    }
}

impl Default for QueryPlanner {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), 512)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn second_call_is_a_cache_hit() {
        let planner = QueryPlanner::new(Duration::from_secs(60), 16);
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            serde_json::json!({"ok": true})
        };
        let (_, outcome1, _) = planner.get_or_compute("search", 1, "q", compute);
        let (_, outcome2, _) = planner.get_or_compute("search", 1, "q", compute);
        assert_eq!(outcome1, CacheOutcome::Miss);
        assert_eq!(outcome2, CacheOutcome::Hit);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn version_token_change_invalidates() {
        let planner = QueryPlanner::new(Duration::from_secs(60), 16);
        planner.get_or_compute("search", 1, "q", || serde_json::json!(1));
        let (_, outcome, _) = planner.get_or_compute("search", 2, "q", || serde_json::json!(2));
        assert_eq!(outcome, CacheOutcome::Miss);
    }

    #[test]
    fn lru_eviction_respects_capacity() {
        let planner = QueryPlanner::new(Duration::from_secs(60), 2);
        planner.get_or_compute("t", 1, "a", || serde_json::json!(1));
        planner.get_or_compute("t", 1, "b", || serde_json::json!(2));
        planner.get_or_compute("t", 1, "c", || serde_json::json!(3));
        assert_eq!(planner.len(), 2);
    }
}
