//! Hybrid push/pull round-trip (spec §8 scenario 5): an incremental index
//! followed by one `run_sync_cycle` against a file-backed transport should
//! leave behind a pushed queue row, a pinned artifact, a closed circuit
//! breaker, and at least two recorded sync events.

use bombe::config::Settings;
use bombe::indexing::{ChangeStatus, FileChange, IndexFacade};
use bombe::sync::orchestrator::run_sync_cycle;
use bombe::sync::transport::FileTransport;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn push_pull_round_trip_pins_artifact_and_closes_breaker() {
    let repo = TempDir::new().unwrap();
    fs::create_dir_all(repo.path().join("src")).unwrap();
    fs::write(
        repo.path().join("src/main.py"),
        "def helper():\n    return 1\n\ndef run():\n    helper()\n",
    )
    .unwrap();

    let mut settings = Settings::default();
    settings.db_path = "bombe.db".into();
    let mut facade = IndexFacade::open(repo.path(), settings).unwrap();
    let changes = [FileChange {
        status: ChangeStatus::Added,
        path: "src/main.py".to_string(),
        old_path: None,
    }];
    facade.incremental_index(&changes).unwrap();

    let transport_root = TempDir::new().unwrap();
    let transport = Arc::new(FileTransport::new(transport_root.path()));

    let report = run_sync_cycle(
        repo.path(),
        &mut facade.store,
        transport,
        &changes,
        Duration::from_millis(500),
        None,
        bombe::config::SigningAlgo::Hmac,
        None,
    )
    .await
    .unwrap();

    assert!(report.push_ok, "expected push to succeed against the file transport");
    assert_eq!(report.push_mode, "hybrid");
    let pinned = report.pinned_artifact_id.expect("expected a pinned artifact id");

    let conn = facade.store.connection();

    let queue_status: String = conn
        .query_row("SELECT status FROM sync_queue WHERE id = ?1;", [report.queue_id], |row| row.get(0))
        .unwrap();
    assert_eq!(queue_status, "pushed");

    let pinned_in_db: String = conn
        .query_row(
            "SELECT artifact_id FROM artifact_pins WHERE repo_id = ?1 AND snapshot_id = ?2;",
            rusqlite::params![report.repo_id, report.snapshot_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(pinned_in_db, pinned);

    let mut stmt = conn.prepare("SELECT state FROM circuit_breaker_state;").unwrap();
    let states: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(!states.is_empty());
    assert!(states.iter().all(|s| s == "closed"), "expected all breakers closed, got {states:?}");

    let event_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM sync_events WHERE repo_id = ?1;", [&report.repo_id], |row| row.get(0))
        .unwrap();
    assert!(event_count >= 2, "expected at least two sync events, got {event_count}");
}
