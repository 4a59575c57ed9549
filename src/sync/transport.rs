//! Control-plane transports: a file-backed transport for
//! local/offline use and an HTTP transport for a real control plane.
//! Both implement [`SyncTransport`] so [`super::client::SyncClient`] stays
//! transport-agnostic.

use super::models::{ArtifactBundle, IndexDelta};
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct PullQuery {
    pub repo_id: String,
    pub snapshot_id: String,
    pub parent_snapshot: Option<String>,
}

/// Push/pull surface any control-plane implementation must expose.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn push_delta(&self, delta: &IndexDelta) -> SyncResult<bool>;
    async fn pull_latest_artifact(&self, query: &PullQuery) -> SyncResult<Option<ArtifactBundle>>;
}

fn repo_key(repo_id: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(repo_id.as_bytes()));
    digest[..24].to_string()
}

fn sanitize_component(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

/// Writes deltas and artifacts as JSON files under a root directory, mirroring
/// the reference implementation's on-disk layout so fixtures stay portable.
pub struct FileTransport {
    root: PathBuf,
    signing_key: Option<String>,
    signing_algo: crate::config::SigningAlgo,
    signing_key_id: Option<String>,
}

impl FileTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            signing_key: None,
            signing_algo: crate::config::SigningAlgo::Hmac,
            signing_key_id: None,
        }
    }

    pub fn with_signing(
        mut self,
        key: Option<String>,
        algo: crate::config::SigningAlgo,
        key_id: Option<String>,
    ) -> Self {
        self.signing_key = key;
        self.signing_algo = algo;
        self.signing_key_id = key_id;
        self
    }

    fn deltas_dir(&self, repo_id: &str) -> PathBuf {
        self.root.join("deltas").join(repo_key(repo_id))
    }

    fn artifacts_dir(&self, repo_id: &str) -> PathBuf {
        self.root.join("artifacts").join(repo_key(repo_id))
    }

    fn latest_pointer(&self, repo_id: &str) -> PathBuf {
        self.artifacts_dir(repo_id).join("latest.json")
    }
}

#[async_trait]
impl SyncTransport for FileTransport {
    async fn push_delta(&self, delta: &IndexDelta) -> SyncResult<bool> {
        let dir = self.deltas_dir(&delta.header.repo_id);
        std::fs::create_dir_all(&dir).map_err(|e| SyncError::Transport(e.to_string()))?;
        let file_name = format!("{}.json", sanitize_component(&delta.header.local_snapshot));
        let body = serde_json::to_vec(delta).map_err(|e| SyncError::Transport(e.to_string()))?;
        std::fs::write(dir.join(file_name), body).map_err(|e| SyncError::Transport(e.to_string()))?;
        Ok(true)
    }

    async fn pull_latest_artifact(&self, query: &PullQuery) -> SyncResult<Option<ArtifactBundle>> {
        let pointer = self.latest_pointer(&query.repo_id);
        if !pointer.exists() {
            return Ok(None);
        }
        let body = std::fs::read(&pointer).map_err(|e| SyncError::Transport(e.to_string()))?;
        let mut artifact: ArtifactBundle =
            serde_json::from_slice(&body).map_err(|e| SyncError::Transport(e.to_string()))?;
        if let Some(key) = &self.signing_key {
            artifact.signature_algo = Some(match self.signing_algo {
                crate::config::SigningAlgo::Hmac => "hmac".to_string(),
                crate::config::SigningAlgo::Ed25519 => "ed25519".to_string(),
            });
            artifact.signing_key_id = self.signing_key_id.clone();
            artifact.checksum = None;
            artifact.signature = None;
            artifact.checksum = Some(super::checksum::artifact_checksum(&artifact)?);
            artifact.signature =
                Some(super::checksum::sign_artifact(&artifact, key, self.signing_algo)?);
        }
        Ok(Some(artifact))
    }
}

impl FileTransport {
    /// Writes `artifact` as the control plane's response for `repo_id`,
    /// used by tests and local fixtures that stand in for a real server.
    pub fn seed_artifact(&self, artifact: &ArtifactBundle) -> SyncResult<()> {
        let dir = self.artifacts_dir(&artifact.repo_id);
        std::fs::create_dir_all(&dir).map_err(|e| SyncError::Transport(e.to_string()))?;
        let body = serde_json::to_vec(artifact).map_err(|e| SyncError::Transport(e.to_string()))?;
        std::fs::write(dir.join(format!("{}.json", artifact.artifact_id)), &body)
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        std::fs::write(self.latest_pointer(&artifact.repo_id), &body)
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Talks to a real control plane over HTTP (`POST /v1/deltas`,
/// `GET /v1/artifacts/latest`), authenticating with a bearer token.
pub struct HttpTransport {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token,
            client: reqwest::Client::new(),
        }
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl SyncTransport for HttpTransport {
    async fn push_delta(&self, delta: &IndexDelta) -> SyncResult<bool> {
        let url = format!("{}/v1/deltas", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({ "delta": delta });
        let request = self.authed(self.client.post(url).json(&body));
        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        Ok(response.status().is_success())
    }

    async fn pull_latest_artifact(&self, query: &PullQuery) -> SyncResult<Option<ArtifactBundle>> {
        let url = format!("{}/v1/artifacts/latest", self.base_url.trim_end_matches('/'));
        let mut request = self.authed(self.client.get(url)).query(&[
            ("repo_id", query.repo_id.as_str()),
            ("snapshot_id", query.snapshot_id.as_str()),
        ]);
        if let Some(parent) = &query.parent_snapshot {
            request = request.query(&[("parent_snapshot", parent.as_str())]);
        }
        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SyncError::Transport(format!(
                "control plane returned status {}",
                response.status()
            )));
        }
        let artifact = response
            .json::<ArtifactBundle>()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        Ok(Some(artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::models::DeltaHeader;

    fn sample_delta() -> IndexDelta {
        IndexDelta {
            header: DeltaHeader {
                repo_id: "repo-a".into(),
                parent_snapshot: None,
                local_snapshot: "snap-1".into(),
                tool_version: "0.1.0".into(),
                schema_version: 1,
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

    #[tokio::test]
    async fn file_transport_round_trips_delta_and_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FileTransport::new(dir.path());
        let delta = sample_delta();
        assert!(transport.push_delta(&delta).await.unwrap());

        let query = PullQuery {
            repo_id: "repo-a".into(),
            snapshot_id: "snap-1".into(),
            parent_snapshot: None,
        };
        assert!(transport.pull_latest_artifact(&query).await.unwrap().is_none());
    }
}
