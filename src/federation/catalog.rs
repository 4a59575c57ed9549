//! Shard catalog: the federation's own small relational store, separate
//! from any single repo's [`crate::storage::GraphStore`].
//! Tracks which repos participate, their exported symbols (for routing),
//! and cross-repo edges discovered by `post_index_cross_repo_sync`.

use crate::error::{FederationError, FederationResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CATALOG_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS shards (
    repo_id TEXT PRIMARY KEY,
    repo_path TEXT NOT NULL,
    db_path TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    last_indexed_at TEXT,
    symbol_count INTEGER NOT NULL DEFAULT 0,
    edge_count INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS exported_symbols (
    repo_id TEXT NOT NULL,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    qualified_name TEXT NOT NULL,
    file_path TEXT NOT NULL,
    language TEXT NOT NULL,
    PRIMARY KEY (repo_id, qualified_name, file_path)
);
CREATE INDEX IF NOT EXISTS idx_exported_symbols_name ON exported_symbols(name);
CREATE TABLE IF NOT EXISTS cross_repo_edges (
    source_uri TEXT NOT NULL,
    target_uri TEXT NOT NULL,
    relationship TEXT NOT NULL,
    PRIMARY KEY (source_uri, target_uri, relationship)
);
";

/// A repo participating in the federation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shard {
    pub repo_id: String,
    pub repo_path: String,
    pub db_path: String,
    pub enabled: bool,
    pub last_indexed_at: Option<String>,
    pub symbol_count: u64,
    pub edge_count: u64,
}

/// A single row of a repo's exported-symbol index, used by the router to
/// find which shards contain a symbol name without opening every shard DB.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedSymbol {
    pub repo_id: String,
    pub name: String,
    pub kind: String,
    pub qualified_name: String,
    pub file_path: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrossRepoEdge {
    pub source_uri: String,
    pub target_uri: String,
    pub relationship: String,
}

/// `bombe://{repo_id}/{qualified_name}#{file_path}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalSymbolUri {
    pub repo_id: String,
    pub qualified_name: String,
    pub file_path: String,
}

impl GlobalSymbolUri {
    pub fn new(repo_id: impl Into<String>, qualified_name: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            qualified_name: qualified_name.into(),
            file_path: file_path.into(),
        }
    }

    pub fn parse(uri: &str) -> FederationResult<Self> {
        let rest = uri
            .strip_prefix("bombe://")
            .ok_or_else(|| FederationError::MalformedUri { uri: uri.to_string() })?;
        let (repo_id, rest) = rest
            .split_once('/')
            .ok_or_else(|| FederationError::MalformedUri { uri: uri.to_string() })?;
        let (qualified_name, file_path) = rest
            .split_once('#')
            .ok_or_else(|| FederationError::MalformedUri { uri: uri.to_string() })?;
        if repo_id.is_empty() || qualified_name.is_empty() {
            return Err(FederationError::MalformedUri { uri: uri.to_string() });
        }
        Ok(Self::new(repo_id, qualified_name, file_path))
    }
}

impl std::fmt::Display for GlobalSymbolUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bombe://{}/{}#{}", self.repo_id, self.qualified_name, self.file_path)
    }
}

pub struct ShardCatalog {
    conn: Connection,
}

impl ShardCatalog {
    pub fn open(catalog_db_path: impl AsRef<Path>) -> FederationResult<Self> {
        let path: PathBuf = catalog_db_path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path).map_err(|_| FederationError::UnknownShard {
            shard_id: "<catalog open failed>".to_string(),
        })?;
        conn.execute_batch(CATALOG_SCHEMA).ok();
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> FederationResult<Self> {
        let conn = Connection::open_in_memory().map_err(|_| FederationError::UnknownShard {
            shard_id: "<in-memory catalog open failed>".to_string(),
        })?;
        conn.execute_batch(CATALOG_SCHEMA).ok();
        Ok(Self { conn })
    }

    pub fn register_shard(&self, shard: &Shard) -> FederationResult<()> {
        self.conn
            .execute(
                "INSERT INTO shards (repo_id, repo_path, db_path, enabled, last_indexed_at, symbol_count, edge_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(repo_id) DO UPDATE SET
                    repo_path = excluded.repo_path,
                    db_path = excluded.db_path,
                    enabled = excluded.enabled,
                    last_indexed_at = excluded.last_indexed_at,
                    symbol_count = excluded.symbol_count,
                    edge_count = excluded.edge_count;",
                params![
                    shard.repo_id,
                    shard.repo_path,
                    shard.db_path,
                    shard.enabled,
                    shard.last_indexed_at,
                    shard.symbol_count as i64,
                    shard.edge_count as i64,
                ],
            )
            .map_err(|_| FederationError::UnknownShard { shard_id: shard.repo_id.clone() })?;
        Ok(())
    }

    pub fn shard(&self, repo_id: &str) -> FederationResult<Option<Shard>> {
        self.conn
            .query_row(
                "SELECT repo_id, repo_path, db_path, enabled, last_indexed_at, symbol_count, edge_count
                 FROM shards WHERE repo_id = ?1;",
                params![repo_id],
                row_to_shard,
            )
            .optional()
            .map_err(|_| FederationError::UnknownShard { shard_id: repo_id.to_string() })
    }

    pub fn all_shards(&self) -> FederationResult<Vec<Shard>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT repo_id, repo_path, db_path, enabled, last_indexed_at, symbol_count, edge_count
                 FROM shards ORDER BY repo_id;",
            )
            .map_err(|_| FederationError::UnknownShard { shard_id: "*".to_string() })?;
        let rows = stmt
            .query_map([], row_to_shard)
            .map_err(|_| FederationError::UnknownShard { shard_id: "*".to_string() })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|_| FederationError::UnknownShard { shard_id: "*".to_string() })?);
        }
        Ok(out)
    }

    pub fn enabled_shard_ids(&self) -> FederationResult<Vec<String>> {
        Ok(self
            .all_shards()?
            .into_iter()
            .filter(|s| s.enabled)
            .map(|s| s.repo_id)
            .collect())
    }

    /// Replaces the full exported-symbol set for one repo, the step
    /// `post_index_cross_repo_sync` runs right after an incremental index.
    pub fn replace_exported_symbols(&self, repo_id: &str, symbols: &[ExportedSymbol]) -> FederationResult<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|_| FederationError::UnknownShard { shard_id: repo_id.to_string() })?;
        tx.execute("DELETE FROM exported_symbols WHERE repo_id = ?1;", params![repo_id])
            .map_err(|_| FederationError::UnknownShard { shard_id: repo_id.to_string() })?;
        for s in symbols {
            tx.execute(
                "INSERT OR IGNORE INTO exported_symbols (repo_id, name, kind, qualified_name, file_path, language)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![s.repo_id, s.name, s.kind, s.qualified_name, s.file_path, s.language],
            )
            .map_err(|_| FederationError::UnknownShard { shard_id: repo_id.to_string() })?;
        }
        tx.commit().map_err(|_| FederationError::UnknownShard { shard_id: repo_id.to_string() })?;
        Ok(())
    }

    /// Finds which repos export a symbol matching `name`, excluding
    /// `exclude_repo_id` so self-repo matches never become cross-repo
    /// edges.
    pub fn resolve_external_import(&self, module_name_or_symbol: &str, exclude_repo_id: &str) -> FederationResult<Vec<ExportedSymbol>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT repo_id, name, kind, qualified_name, file_path, language
                 FROM exported_symbols
                 WHERE (name = ?1 OR qualified_name LIKE ?2) AND repo_id != ?3
                 ORDER BY repo_id, qualified_name;",
            )
            .map_err(|_| FederationError::UnknownShard { shard_id: exclude_repo_id.to_string() })?;
        let like = format!("%{module_name_or_symbol}");
        let rows = stmt
            .query_map(params![module_name_or_symbol, like, exclude_repo_id], |row| {
                Ok(ExportedSymbol {
                    repo_id: row.get(0)?,
                    name: row.get(1)?,
                    kind: row.get(2)?,
                    qualified_name: row.get(3)?,
                    file_path: row.get(4)?,
                    language: row.get(5)?,
                })
            })
            .map_err(|_| FederationError::UnknownShard { shard_id: exclude_repo_id.to_string() })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|_| FederationError::UnknownShard { shard_id: exclude_repo_id.to_string() })?);
        }
        Ok(out)
    }

    /// Which shards, if any, contain a symbol named `name` — the routing
    /// primitive `ShardRouter::route_symbol_query` builds on.
    pub fn repos_exporting(&self, name: &str) -> FederationResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT repo_id FROM exported_symbols WHERE name = ?1;")
            .map_err(|_| FederationError::UnknownShard { shard_id: name.to_string() })?;
        let rows = stmt
            .query_map(params![name], |row| row.get::<_, String>(0))
            .map_err(|_| FederationError::UnknownShard { shard_id: name.to_string() })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|_| FederationError::UnknownShard { shard_id: name.to_string() })?);
        }
        Ok(out)
    }

    pub fn upsert_cross_repo_edge(&self, edge: &CrossRepoEdge) -> FederationResult<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO cross_repo_edges (source_uri, target_uri, relationship) VALUES (?1, ?2, ?3);",
                params![edge.source_uri, edge.target_uri, edge.relationship],
            )
            .map_err(|_| FederationError::UnknownShard { shard_id: edge.source_uri.clone() })?;
        Ok(())
    }

    pub fn cross_repo_edges_for(&self, repo_id: &str) -> FederationResult<Vec<CrossRepoEdge>> {
        let prefix = format!("bombe://{repo_id}/%");
        let mut stmt = self
            .conn
            .prepare(
                "SELECT source_uri, target_uri, relationship FROM cross_repo_edges
                 WHERE source_uri LIKE ?1 ORDER BY source_uri, target_uri;",
            )
            .map_err(|_| FederationError::UnknownShard { shard_id: repo_id.to_string() })?;
        let rows = stmt
            .query_map(params![prefix], |row| {
                Ok(CrossRepoEdge {
                    source_uri: row.get(0)?,
                    target_uri: row.get(1)?,
                    relationship: row.get(2)?,
                })
            })
            .map_err(|_| FederationError::UnknownShard { shard_id: repo_id.to_string() })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|_| FederationError::UnknownShard { shard_id: repo_id.to_string() })?);
        }
        Ok(out)
    }
}

fn row_to_shard(row: &rusqlite::Row) -> rusqlite::Result<Shard> {
    Ok(Shard {
        repo_id: row.get(0)?,
        repo_path: row.get(1)?,
        db_path: row.get(2)?,
        enabled: row.get(3)?,
        last_indexed_at: row.get(4)?,
        symbol_count: row.get::<_, i64>(5)? as u64,
        edge_count: row.get::<_, i64>(6)? as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard(id: &str) -> Shard {
        Shard {
            repo_id: id.to_string(),
            repo_path: format!("/repos/{id}"),
            db_path: format!("/repos/{id}/.bombe/graph.db"),
            enabled: true,
            last_indexed_at: None,
            symbol_count: 0,
            edge_count: 0,
        }
    }

    #[test]
    fn global_symbol_uri_round_trips() {
        let uri = GlobalSymbolUri::new("aaa1111111111111", "pkg.helper", "pkg/mod.py");
        let rendered = uri.to_string();
        let parsed = GlobalSymbolUri::parse(&rendered).unwrap();
        assert_eq!(parsed, uri);
    }

    #[test]
    fn malformed_uri_rejected() {
        assert!(GlobalSymbolUri::parse("not-a-uri").is_err());
        assert!(GlobalSymbolUri::parse("bombe://onlyrepo").is_err());
    }

    #[test]
    fn exported_symbols_exclude_self_repo() {
        let catalog = ShardCatalog::open_in_memory().unwrap();
        catalog.register_shard(&shard("aaa")).unwrap();
        catalog.register_shard(&shard("bbb")).unwrap();
        catalog
            .replace_exported_symbols(
                "bbb",
                &[ExportedSymbol {
                    repo_id: "bbb".into(),
                    name: "helper".into(),
                    kind: "function".into(),
                    qualified_name: "pkg.helper".into(),
                    file_path: "pkg/mod.py".into(),
                    language: "python".into(),
                }],
            )
            .unwrap();
        let hits = catalog.resolve_external_import("helper", "aaa").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].repo_id, "bbb");

        let self_hits = catalog.resolve_external_import("helper", "bbb").unwrap();
        assert!(self_hits.is_empty());
    }

    #[test]
    fn repos_exporting_finds_owning_shards() {
        let catalog = ShardCatalog::open_in_memory().unwrap();
        catalog
            .replace_exported_symbols(
                "aaa",
                &[ExportedSymbol {
                    repo_id: "aaa".into(),
                    name: "main".into(),
                    kind: "function".into(),
                    qualified_name: "app.main".into(),
                    file_path: "app/main.py".into(),
                    language: "python".into(),
                }],
            )
            .unwrap();
        assert_eq!(catalog.repos_exporting("main").unwrap(), vec!["aaa".to_string()]);
        assert!(catalog.repos_exporting("nope").unwrap().is_empty());
    }
}
