//! Reference control-plane HTTP server: a trivial JSON
//! transport for `POST /v1/deltas` and `GET /v1/artifacts/latest`, standing
//! in as a thin external collaborator — this is deliberately the simplest
//! possible implementation, not a production control plane: in-memory
//! promotion, file-backed latest-artifact pointers, no auth beyond an
//! optional bearer token.

#![cfg(feature = "http-server")]

use crate::sync::promotion::{promote_delta, PromotionPolicy};
use crate::sync::{ArtifactBundle, IndexDelta};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

struct ControlPlaneState {
    root: PathBuf,
    token: Option<String>,
    policy: PromotionPolicy,
}

#[derive(Clone)]
pub struct ControlPlane {
    state: Arc<Mutex<ControlPlaneState>>,
}

impl ControlPlane {
    pub fn new(root: impl Into<PathBuf>, token: Option<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ControlPlaneState {
                root: root.into(),
                token,
                policy: PromotionPolicy::default(),
            })),
        }
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/v1/deltas", post(post_delta))
            .route("/v1/artifacts/latest", get(get_latest_artifact))
            .with_state(self.state)
    }
}

fn authorized(headers: &HeaderMap, expected: &Option<String>) -> bool {
    let Some(expected) = expected else { return true };
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {expected}"))
        .unwrap_or(false)
}

#[derive(Deserialize)]
struct PostDeltaBody {
    delta: IndexDelta,
}

#[derive(Serialize)]
struct PostDeltaResponse {
    accepted: bool,
    reason: &'static str,
}

async fn post_delta(
    State(state): State<Arc<Mutex<ControlPlaneState>>>,
    headers: HeaderMap,
    Json(body): Json<PostDeltaBody>,
) -> (StatusCode, Json<PostDeltaResponse>) {
    let state = state.lock().await;
    if !authorized(&headers, &state.token) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(PostDeltaResponse { accepted: false, reason: "unauthorized" }),
        );
    }

    let artifact_id = format!("artifact-{}-{}", body.delta.header.repo_id, body.delta.header.local_snapshot);
    let created_at = body.delta.header.created_at_utc.clone();
    let result = match promote_delta(&body.delta, artifact_id, created_at, &state.policy) {
        Ok(result) => result,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(PostDeltaResponse { accepted: false, reason: "promotion_failed" }),
            );
        }
    };

    if !result.promoted {
        return (
            StatusCode::OK,
            Json(PostDeltaResponse { accepted: false, reason: result.reason }),
        );
    }

    if let Some(artifact) = result.artifact {
        let dir = state.root.join("artifacts").join(&body.delta.header.repo_id);
        if std::fs::create_dir_all(&dir).is_ok() {
            if let Ok(bytes) = serde_json::to_vec(&artifact) {
                let _ = std::fs::write(dir.join("latest.json"), &bytes);
            }
        }
    }

    (StatusCode::OK, Json(PostDeltaResponse { accepted: true, reason: "promoted" }))
}

async fn get_latest_artifact(
    State(state): State<Arc<Mutex<ControlPlaneState>>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let state = state.lock().await;
    if !authorized(&headers, &state.token) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let Some(repo_id) = params.get("repo_id") else {
        return Err(StatusCode::BAD_REQUEST);
    };
    let path = state.root.join("artifacts").join(repo_id).join("latest.json");
    let bytes = std::fs::read(&path).map_err(|_| StatusCode::NOT_FOUND)?;
    let artifact: ArtifactBundle = serde_json::from_slice(&bytes).map_err(|_| StatusCode::NOT_FOUND)?;
    Ok(Json(serde_json::json!({ "artifact": artifact })))
}
