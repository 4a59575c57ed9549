//! Context assembly budget and connectedness (spec §8 scenario 6): a
//! `alpha -> beta -> gamma` call chain where PageRank makes `gamma`
//! dominant. A tight token budget rooted at `alpha` should still prefer the
//! graph-connected `beta` over the higher-ranked but unreached `gamma`.

use bombe::config::Settings;
use bombe::indexing::IndexFacade;
use bombe::query::{get_context, ContextRequest};
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
fn context_prefers_graph_neighbor_over_unreached_high_rank_node() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "graph.py",
        "def alpha():\n    beta()\n\ndef beta():\n    gamma()\n\ndef gamma():\n    return 1\n",
    );

    let mut settings = Settings::default();
    settings.db_path = "bombe.db".into();
    let mut facade = IndexFacade::open(dir.path(), settings).unwrap();
    facade.full_index().unwrap();

    let request = ContextRequest {
        query: "graph flow".to_string(),
        entry_points: vec!["graph.alpha".to_string()],
        token_budget: 7,
        expansion_depth: 2,
        signatures_only: true,
    };
    let response = get_context(&facade.store, &dir.path().to_path_buf(), &request).unwrap();

    let included: Vec<&str> = response
        .files
        .iter()
        .flat_map(|f| f.symbols.iter())
        .map(|s| s.qualified_name.as_str())
        .collect();

    assert!(included.contains(&"graph.alpha"), "expected seed alpha included, got {included:?}");
    assert!(included.contains(&"graph.beta"), "expected graph neighbor beta included, got {included:?}");
    assert!(!included.contains(&"graph.gamma"), "gamma should be excluded by the token budget, got {included:?}");
    assert!(response.quality.connectedness > 0.0, "expected positive connectedness, got {:?}", response.quality);
}
