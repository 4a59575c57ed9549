//! `run_sync_cycle`: the top-level hybrid sync entry point a CLI command or
//! watcher hook calls after an incremental index. Builds a delta, pushes
//! it, pulls back the control plane's latest artifact, reconciles and pins
//! it, and persists every state change
//! (queue, breaker, quarantine, events) so the next cycle resumes correctly.

use super::breaker::CircuitBreaker;
use super::client::SyncClient;
use super::delta::build_delta;
use super::promotion::{promote_delta, PromotionPolicy};
use super::quarantine::ArtifactQuarantineStore;
use super::reconcile::reconcile_artifact;
use super::store;
use super::transport::SyncTransport;
use crate::error::{SyncError, SyncResult};
use crate::indexing::FileChange;
use crate::storage::GraphStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Serialize)]
pub struct SyncCycleReport {
    pub repo_id: String,
    pub snapshot_id: String,
    pub parent_snapshot: Option<String>,
    pub queue_id: i64,
    pub push_ok: bool,
    pub push_mode: &'static str,
    pub push_reason: &'static str,
    pub pull_mode: &'static str,
    pub pull_reason: &'static str,
    pub pinned_artifact_id: Option<String>,
}

/// Resolves the current HEAD/HEAD^ commit via `git`, falling back to a
/// `local-{unix_timestamp}` pseudo-snapshot outside a git repo.
pub fn resolve_snapshot_lineage(repo_root: &std::path::Path) -> (String, Option<String>) {
    let head = git_rev_parse(repo_root, "HEAD");
    match head {
        Some(local_snapshot) => {
            let parent = git_rev_parse(repo_root, "HEAD^");
            (local_snapshot, parent)
        }
        None => {
            let unix = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            (format!("local-{unix}"), None)
        }
    }
}

fn git_rev_parse(repo_root: &std::path::Path, rev: &str) -> Option<String> {
    let output = std::process::Command::new("git")
        .arg("-C")
        .arg(repo_root)
        .arg("rev-parse")
        .arg(rev)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let sha = String::from_utf8(output.stdout).ok()?;
    let sha = sha.trim();
    if sha.is_empty() {
        None
    } else {
        Some(sha.to_string())
    }
}

pub fn canonical_repo_id(repo_root: &std::path::Path) -> String {
    repo_root
        .canonicalize()
        .unwrap_or_else(|_| repo_root.to_path_buf())
        .to_string_lossy()
        .to_string()
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Runs one push/pull hybrid sync cycle against `transport` for the changes
/// observed since the last snapshot.
pub async fn run_sync_cycle(
    repo_root: &std::path::Path,
    store: &mut GraphStore,
    transport: Arc<dyn SyncTransport>,
    changes: &[FileChange],
    timeout: Duration,
    signing_key: Option<&str>,
    signing_algo: crate::config::SigningAlgo,
    signing_key_id: Option<&str>,
) -> SyncResult<SyncCycleReport> {
    let repo_id = canonical_repo_id(repo_root);
    let (local_snapshot, parent_snapshot) = resolve_snapshot_lineage(repo_root);
    let created_at_utc = now_rfc3339();

    let delta = build_delta(
        store,
        &repo_id,
        parent_snapshot.as_deref(),
        &local_snapshot,
        TOOL_VERSION,
        &created_at_utc,
        changes,
    )
    .map_err(|e| SyncError::Transport(e.to_string()))?;

    let payload = serde_json::to_string(&delta).map_err(|e| SyncError::Transport(e.to_string()))?;
    let queue_id = store::enqueue(
        store.connection(),
        &repo_id,
        &local_snapshot,
        parent_snapshot.as_deref(),
        &payload,
    )?;

    let mut push_breaker = CircuitBreaker::load(store.connection(), "sync_push")?;
    let mut pull_breaker = CircuitBreaker::load(store.connection(), "sync_pull")?;
    let mut quarantine = ArtifactQuarantineStore::preload(store.connection())?;

    let client = SyncClient::new(transport, TOOL_VERSION).with_timeout(timeout);

    let push_outcome = client.push_delta(delta.clone(), &mut push_breaker).await;
    push_breaker.persist(store.connection())?;
    store::mark_queue_status(
        store.connection(),
        queue_id,
        if push_outcome.ok { "pushed" } else { "retry" },
    )?;
    store::record_event(store.connection(), &repo_id, "push", push_outcome.reason)?;

    let pull_outcome = client
        .pull_artifact(
            &repo_id,
            &local_snapshot,
            parent_snapshot.as_deref(),
            &mut pull_breaker,
            &mut quarantine,
        )
        .await;
    pull_breaker.persist(store.connection())?;
    let quarantined_ids: Vec<String> = quarantine.records().map(|r| r.artifact_id.clone()).collect();
    for artifact_id in &quarantined_ids {
        quarantine.persist(store.connection(), artifact_id)?;
    }
    store::record_event(store.connection(), &repo_id, "pull", pull_outcome.reason)?;

    let mut pinned_artifact_id = None;
    if let Some(artifact) = pull_outcome.artifact {
        let reconciled = reconcile_artifact(&delta, &artifact)
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        store::pin_artifact(store.connection(), &repo_id, &local_snapshot, &reconciled.artifact_id)?;
        store::record_event(store.connection(), &repo_id, "artifact_pinned", &reconciled.artifact_id)?;
        pinned_artifact_id = Some(reconciled.artifact_id);
    } else {
        // No remote artifact to reconcile against; promote the local delta
        // on its own so the next cycle (or another repo pulling from us)
        // has a pinned artifact to work with.
        let promotion = promote_delta(
            &delta,
            format!("{repo_id}-{local_snapshot}"),
            &created_at_utc,
            &PromotionPolicy::default(),
        )
        .map_err(|e| SyncError::Transport(e.to_string()))?;
        if let Some(mut artifact) = promotion.artifact {
            if let Some(key) = signing_key {
                artifact.signature_algo = Some(match signing_algo {
                    crate::config::SigningAlgo::Hmac => "hmac".to_string(),
                    crate::config::SigningAlgo::Ed25519 => "ed25519".to_string(),
                });
                artifact.signing_key_id = signing_key_id.map(str::to_string);
                artifact.checksum = Some(super::checksum::artifact_checksum(&artifact)?);
                artifact.signature = Some(super::checksum::sign_artifact(&artifact, key, signing_algo)?);
            }
            store::pin_artifact(store.connection(), &repo_id, &local_snapshot, &artifact.artifact_id)?;
            store::record_event(store.connection(), &repo_id, "artifact_pinned", &artifact.artifact_id)?;
            pinned_artifact_id = Some(artifact.artifact_id);
        }
    }

    Ok(SyncCycleReport {
        repo_id,
        snapshot_id: local_snapshot,
        parent_snapshot,
        queue_id,
        push_ok: push_outcome.ok,
        push_mode: push_outcome.mode,
        push_reason: push_outcome.reason,
        pull_mode: pull_outcome.mode,
        pull_reason: pull_outcome.reason,
        pinned_artifact_id,
    })
}
