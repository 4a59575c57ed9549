//! Same-file call resolution and ambiguous global call resolution for
//! Python sources.

use bombe::config::Settings;
use bombe::indexing::IndexFacade;
use bombe::relationship::RelationKind;
use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, relative: &str, content: &str) {
    let path = dir.path().join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn same_file_call_resolves_over_distractor() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "app/service.py",
        "def caller():\n    bar()\n\ndef bar():\n    return 1\n",
    );
    write(&dir, "app/other/lib.py", "def bar():\n    return 2\n");

    let mut settings = Settings::default();
    settings.db_path = "bombe.db".into();
    let mut facade = IndexFacade::open(dir.path(), settings).unwrap();
    facade.full_index().unwrap();

    let caller_id = facade.store.symbol_id_for("app.service.caller", "app/service.py").unwrap().unwrap();

    let conn = facade.store.connection();
    let mut stmt = conn
        .prepare("SELECT s.qualified_name, e.confidence FROM edges e JOIN symbols s ON s.id = e.target_id WHERE e.source_id = ?1 AND e.relationship = ?2;")
        .unwrap();
    let rows: Vec<(String, f64)> = stmt
        .query_map(
            rusqlite::params![caller_id.to_u32(), RelationKind::Calls.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(rows.len(), 1, "expected exactly one resolved call edge, got {rows:?}");
    assert_eq!(rows[0].0, "app.service.bar");
    assert!((rows[0].1 - 1.0).abs() < 1e-9);
}

#[test]
fn ambiguous_global_call_emits_both_candidates_at_half_confidence() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app/caller.py", "def caller():\n    baz()\n");
    write(&dir, "pkg/one.py", "def baz():\n    return 1\n");
    write(&dir, "pkg/two.py", "def baz():\n    return 2\n");

    let mut settings = Settings::default();
    settings.db_path = "bombe.db".into();
    let mut facade = IndexFacade::open(dir.path(), settings).unwrap();
    facade.full_index().unwrap();

    let caller_id = facade.store.symbol_id_for("app.caller.caller", "app/caller.py").unwrap().unwrap();

    let conn = facade.store.connection();
    let mut stmt = conn
        .prepare("SELECT s.qualified_name, e.confidence FROM edges e JOIN symbols s ON s.id = e.target_id WHERE e.source_id = ?1 AND e.relationship = ?2;")
        .unwrap();
    let rows: Vec<(String, f64)> = stmt
        .query_map(
            rusqlite::params![caller_id.to_u32(), RelationKind::Calls.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(rows.len(), 2, "expected both ambiguous candidates, got {rows:?}");
    for (_, confidence) in &rows {
        assert!((confidence - 0.5).abs() < 1e-9);
    }
}
