//! Import-scoped alias resolution (spec §8 scenario 3): `from app.auth
//! import util as helper` followed by a call to `helper()` resolves to
//! `app.auth.util`, not to an unrelated `pkg.helper` distractor.

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
fn aliased_from_import_resolves_to_real_symbol_not_distractor() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app/auth.py", "def util():\n    return 1\n");
    write(
        &dir,
        "app/caller.py",
        "from app.auth import util as helper\n\ndef caller():\n    helper()\n",
    );
    write(&dir, "pkg/helper.py", "def helper():\n    return 2\n");

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

    assert_eq!(rows.len(), 1, "expected exactly one resolved call edge, got {rows:?}");
    assert_eq!(rows[0].0, "app.auth.util");
    assert!((rows[0].1 - 1.0).abs() < 1e-9);
}
