//! Compatibility gating and push/pull orchestration for a single transport
//!. Push and pull each run on a detached `tokio` task bounded
//! by a deadline; a timed-out task is simply dropped while the task itself
//! keeps running to completion in the background and frees its own
//! resources (REDESIGN FLAGS: replaces the reference client's two-thread
//! pool with per-call task spawning).

use super::breaker::CircuitBreaker;
use super::models::{ArtifactBundle, IndexDelta, ARTIFACT_SCHEMA_VERSION, DELTA_SCHEMA_VERSION};
use super::quarantine::ArtifactQuarantineStore;
use super::transport::{PullQuery, SyncTransport};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_MS: u64 = 500;

fn tool_major(version: &str) -> u32 {
    version
        .split('.')
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Schema/version/lineage gate applied before a delta or artifact is trusted
///.
pub struct CompatibilityPolicy {
    pub tool_version: String,
}

impl CompatibilityPolicy {
    pub fn new(tool_version: impl Into<String>) -> Self {
        Self {
            tool_version: tool_version.into(),
        }
    }

    pub fn evaluate_delta(&self, delta: &IndexDelta) -> Result<(), String> {
        if delta.header.schema_version != DELTA_SCHEMA_VERSION {
            return Err("delta_schema_mismatch".to_string());
        }
        if tool_major(&delta.header.tool_version) != tool_major(&self.tool_version) {
            return Err("delta_tool_mismatch".to_string());
        }
        Ok(())
    }

    pub fn evaluate_artifact(
        &self,
        artifact: &ArtifactBundle,
        repo_id: &str,
        known_snapshot: &str,
        known_parent: Option<&str>,
    ) -> Result<(), String> {
        if artifact.repo_id != repo_id {
            return Err("repo_mismatch".to_string());
        }
        if artifact.schema_version != ARTIFACT_SCHEMA_VERSION {
            return Err("artifact_schema_mismatch".to_string());
        }
        if tool_major(&artifact.tool_version) != tool_major(&self.tool_version) {
            return Err("artifact_tool_mismatch".to_string());
        }
        let lineage_ok = artifact.snapshot_id == known_snapshot
            || artifact.parent_snapshot.as_deref() == Some(known_snapshot)
            || Some(artifact.snapshot_id.as_str()) == known_parent
            || (artifact.parent_snapshot.is_some() && artifact.parent_snapshot.as_deref() == known_parent);
        if !lineage_ok {
            return Err("lineage_mismatch".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PushOutcome {
    pub ok: bool,
    pub mode: &'static str,
    pub reason: &'static str,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PullOutcome {
    pub mode: &'static str,
    pub reason: &'static str,
    pub artifact: Option<ArtifactBundle>,
}

pub struct SyncClient {
    transport: Arc<dyn SyncTransport>,
    policy: CompatibilityPolicy,
    timeout: Duration,
}

impl SyncClient {
    pub fn new(transport: Arc<dyn SyncTransport>, tool_version: impl Into<String>) -> Self {
        Self {
            transport,
            policy: CompatibilityPolicy::new(tool_version),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pushes `delta` through the breaker, falling back to local-only on any
    /// circuit-open, timeout, transport error, or rejection from the peer.
    pub async fn push_delta(&self, delta: IndexDelta, breaker: &mut CircuitBreaker) -> PushOutcome {
        let now = chrono::Utc::now();
        if breaker.check(now).is_err() {
            return PushOutcome {
                ok: false,
                mode: "local_fallback",
                reason: "circuit_open",
            };
        }

        if let Err(_reason) = self.policy.evaluate_delta(&delta) {
            return PushOutcome {
                ok: false,
                mode: "local_fallback",
                reason: "push_rejected",
            };
        }

        let transport = self.transport.clone();
        let task = tokio::spawn(async move { transport.push_delta(&delta).await });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(true))) => {
                breaker.record_success();
                PushOutcome {
                    ok: true,
                    mode: "hybrid",
                    reason: "pushed",
                }
            }
            Ok(Ok(Ok(false))) => {
                breaker.record_failure(now);
                PushOutcome {
                    ok: false,
                    mode: "local_fallback",
                    reason: "push_rejected",
                }
            }
            Ok(Ok(Err(_))) => {
                breaker.record_failure(now);
                PushOutcome {
                    ok: false,
                    mode: "local_fallback",
                    reason: "push_error",
                }
            }
            Ok(Err(_join_error)) => {
                breaker.record_failure(now);
                PushOutcome {
                    ok: false,
                    mode: "local_fallback",
                    reason: "push_error",
                }
            }
            Err(_elapsed) => {
                breaker.record_failure(now);
                PushOutcome {
                    ok: false,
                    mode: "local_fallback",
                    reason: "push_timeout",
                }
            }
        }
    }

    /// Pulls the latest artifact for `repo_id`, applying the compatibility
    /// policy and quarantine store before returning it to the caller.
    pub async fn pull_artifact(
        &self,
        repo_id: &str,
        known_snapshot: &str,
        known_parent: Option<&str>,
        breaker: &mut CircuitBreaker,
        quarantine: &mut ArtifactQuarantineStore,
    ) -> PullOutcome {
        let now = chrono::Utc::now();
        if breaker.check(now).is_err() {
            return PullOutcome {
                mode: "local_fallback",
                reason: "circuit_open",
                artifact: None,
            };
        }

        let transport = self.transport.clone();
        let query = PullQuery {
            repo_id: repo_id.to_string(),
            snapshot_id: known_snapshot.to_string(),
            parent_snapshot: known_parent.map(str::to_string),
        };
        let task = tokio::spawn(async move { transport.pull_latest_artifact(&query).await });

        let result = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(Some(artifact)))) => artifact,
            Ok(Ok(Ok(None))) => {
                breaker.record_success();
                return PullOutcome {
                    mode: "local_fallback",
                    reason: "no_artifact",
                    artifact: None,
                };
            }
            Ok(Ok(Err(_))) => {
                breaker.record_failure(now);
                return PullOutcome {
                    mode: "local_fallback",
                    reason: "pull_error",
                    artifact: None,
                };
            }
            Ok(Err(_join_error)) => {
                breaker.record_failure(now);
                return PullOutcome {
                    mode: "local_fallback",
                    reason: "pull_error",
                    artifact: None,
                };
            }
            Err(_elapsed) => {
                breaker.record_failure(now);
                return PullOutcome {
                    mode: "local_fallback",
                    reason: "pull_timeout",
                    artifact: None,
                };
            }
        };

        breaker.record_success();

        if quarantine.is_quarantined(&result.artifact_id) {
            return PullOutcome {
                mode: "local_fallback",
                reason: "artifact_quarantined",
                artifact: None,
            };
        }

        if let Err(reason_code) =
            self.policy
                .evaluate_artifact(&result, repo_id, known_snapshot, known_parent)
        {
            return PullOutcome {
                mode: "local_fallback",
                reason: reason_to_static(&reason_code),
                artifact: None,
            };
        }

        match super::checksum::validate_checksum(&result) {
            Ok(true) => {}
            _ => {
                quarantine.add(
                    result.artifact_id.clone(),
                    repo_id.to_string(),
                    "checksum_mismatch",
                    now.to_rfc3339(),
                );
                return PullOutcome {
                    mode: "local_fallback",
                    reason: "checksum_mismatch",
                    artifact: None,
                };
            }
        }

        PullOutcome {
            mode: "remote_artifact",
            reason: "pulled",
            artifact: Some(result),
        }
    }
}

fn reason_to_static(code: &str) -> &'static str {
    match code {
        "repo_mismatch" => "repo_mismatch",
        "artifact_schema_mismatch" => "artifact_schema_mismatch",
        "artifact_tool_mismatch" => "artifact_tool_mismatch",
        "lineage_mismatch" => "lineage_mismatch",
        _ => "pull_error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::models::DeltaHeader;

    fn sample_delta(schema_version: u32) -> IndexDelta {
        IndexDelta {
            header: DeltaHeader {
                repo_id: "repo-a".into(),
                parent_snapshot: None,
                local_snapshot: "snap-1".into(),
                tool_version: "0.1.0".into(),
                schema_version,
                created_at_utc: "2026-01-01T00:00:00Z".into(),
            },
            file_changes: Vec::new(),
            symbol_upserts: Vec::new(),
            symbol_deletes: Vec::new(),
            edge_upserts: Vec::new(),
            edge_deletes: Vec::new(),
            quality_stats: Default::default(),
        }
    }

    #[test]
    fn policy_rejects_schema_mismatch() {
        let policy = CompatibilityPolicy::new("0.1.0");
        let delta = sample_delta(99);
        assert_eq!(policy.evaluate_delta(&delta), Err("delta_schema_mismatch".to_string()));
    }

    #[test]
    fn policy_accepts_matching_major_tool_version() {
        let policy = CompatibilityPolicy::new("0.1.5");
        let delta = sample_delta(DELTA_SCHEMA_VERSION);
        assert!(policy.evaluate_delta(&delta).is_ok());
    }

    #[tokio::test]
    async fn push_through_file_transport_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let transport: Arc<dyn SyncTransport> =
            Arc::new(super::transport::FileTransport::new(dir.path()));
        let client = SyncClient::new(transport, "0.1.0");
        let mut breaker = CircuitBreaker::new("push");
        let outcome = client.push_delta(sample_delta(DELTA_SCHEMA_VERSION), &mut breaker).await;
        assert!(outcome.ok);
        assert_eq!(outcome.mode, "hybrid");
    }

    #[tokio::test]
    async fn pull_with_no_artifact_falls_back_locally() {
        let dir = tempfile::tempdir().unwrap();
        let transport: Arc<dyn SyncTransport> =
            Arc::new(super::transport::FileTransport::new(dir.path()));
        let client = SyncClient::new(transport, "0.1.0");
        let mut breaker = CircuitBreaker::new("pull");
        let mut quarantine = ArtifactQuarantineStore::new();
        let outcome = client
            .pull_artifact("repo-a", "snap-1", None, &mut breaker, &mut quarantine)
            .await;
        assert_eq!(outcome.mode, "local_fallback");
        assert_eq!(outcome.reason, "no_artifact");
    }
}
