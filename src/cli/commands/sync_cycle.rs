//! `--hybrid-sync` modifier: runs one push/pull cycle against a local
//! file-backed transport rooted at `<repo>/.bombe/sync`. A real deployment
//! would point `FileTransport`/`HttpTransport` at a shared directory or a
//! control-plane URL; the CLI defaults to the local transport so
//! `--hybrid-sync` is useful standalone, matching how `sync/transport.rs`'s
//! tests exercise it.

use crate::indexing::FileChange;
use crate::storage::GraphStore;
use crate::sync::{run_sync_cycle, FileTransport, SyncCycleReport};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub async fn run(
    repo_root: &Path,
    store: &mut GraphStore,
    changes: &[FileChange],
    runtime: &crate::config::RuntimeConfig,
) -> crate::error::SyncResult<SyncCycleReport> {
    let transport: Arc<dyn crate::sync::SyncTransport> =
        Arc::new(FileTransport::new(repo_root.join(".bombe").join("sync")));

    run_sync_cycle(
        repo_root,
        store,
        transport,
        changes,
        Duration::from_secs(10),
        runtime.sync_signing_key.as_deref(),
        runtime.sync_signing_algo,
        runtime.sync_signing_key_id.as_deref(),
    )
    .await
}
