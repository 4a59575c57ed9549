//! Embedded relational graph store.
//!
//! A single SQLite file holds the full symbol/edge graph for one repository.
//! `symbols`, `edges`, `parameters`, `files`, and `external_deps` mirror the
//! shape the indexing pipeline produces; `symbol_fts` is an FTS5 shadow table
//! kept in sync with `symbols` and used by lexical search, with search
//! falling back to `LIKE` on platforms where FTS5 isn't compiled in.

mod schema;
mod sync_tables;

pub use schema::{SCHEMA_STATEMENTS, FTS_STATEMENTS};
pub use sync_tables::SYNC_SCHEMA_STATEMENTS;

use crate::error::{StorageError, StorageResult};
use crate::relationship::Edge;
use crate::symbol::Symbol;
use crate::types::{FileId, SymbolId};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: String,
    pub language: String,
    pub content_hash: String,
    pub size_bytes: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ExternalDep {
    pub file_path: String,
    pub import_statement: String,
    pub module_name: String,
    pub line_number: Option<u32>,
}

/// Owns the SQLite connection for one repository's graph.
pub struct GraphStore {
    conn: Connection,
    db_path: PathBuf,
    fts_available: bool,
}

impl GraphStore {
    pub fn open(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Database(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(&db_path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let mut store = Self {
            conn,
            db_path,
            fts_available: false,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let mut store = Self {
            conn,
            db_path: PathBuf::from(":memory:"),
            fts_available: false,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn fts_available(&self) -> bool {
        self.fts_available
    }

    fn init_schema(&mut self) -> StorageResult<()> {
        for statement in SCHEMA_STATEMENTS {
            self.conn.execute_batch(statement)?;
        }
        let mut fts_ok = true;
        for statement in FTS_STATEMENTS {
            if self.conn.execute_batch(statement).is_err() {
                fts_ok = false;
            }
        }
        self.fts_available = fts_ok;
        for statement in SYNC_SCHEMA_STATEMENTS {
            self.conn.execute_batch(statement)?;
        }
        Ok(())
    }

    /// Direct access for query-layer modules that need hand-written SQL
    /// beyond the bulk mutation helpers below.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn upsert_files(&self, records: &[FileRecord]) -> StorageResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        for r in records {
            self.conn.execute(
                "INSERT INTO files (path, language, content_hash, size_bytes)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(path) DO UPDATE SET
                    language = excluded.language,
                    content_hash = excluded.content_hash,
                    size_bytes = excluded.size_bytes,
                    last_indexed_at = CURRENT_TIMESTAMP;",
                params![r.path, r.language, r.content_hash, r.size_bytes],
            )?;
        }
        Ok(())
    }

    pub fn file_content_hash(&self, path: &str) -> StorageResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT content_hash FROM files WHERE path = ?1;",
                params![path],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn known_file_paths(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT path FROM files;")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Deletes every symbol, parameter, and FTS row scoped to `file_path`
    /// then reinserts `symbols`, assigning fresh AUTOINCREMENT ids.
    pub fn replace_file_symbols(&mut self, file_path: &str, symbols: &[Symbol]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare("SELECT id FROM symbols WHERE file_path = ?1;")?;
            let old_ids: Vec<i64> = stmt
                .query_map(params![file_path], |row| row.get(0))?
                .collect::<Result<_, _>>()?;
            drop(stmt);

            if self.fts_available {
                for id in &old_ids {
                    let _ = tx.execute("DELETE FROM symbol_fts WHERE symbol_id = ?1;", params![id]);
                }
            }
            tx.execute(
                "DELETE FROM parameters WHERE symbol_id IN (SELECT id FROM symbols WHERE file_path = ?1);",
                params![file_path],
            )?;
            tx.execute("DELETE FROM symbols WHERE file_path = ?1;", params![file_path])?;

            for symbol in symbols {
                tx.execute(
                    "INSERT INTO symbols (
                        name, qualified_name, kind, file_path, start_line, end_line, signature,
                        return_type, visibility, is_async, is_static, parent_symbol_id, docstring,
                        pagerank_score
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
                    params![
                        symbol.name,
                        symbol.qualified_name,
                        symbol.kind.as_str(),
                        symbol.file_path,
                        symbol.range.start_line,
                        symbol.range.end_line,
                        symbol.signature,
                        symbol.return_type,
                        symbol.visibility.as_str(),
                        symbol.is_async,
                        symbol.is_static,
                        symbol.parent_symbol_id.map(|id| id.to_u32() as i64),
                        symbol.docstring,
                        symbol.pagerank_score,
                    ],
                )?;
                let symbol_id = tx.last_insert_rowid();

                for param in &symbol.parameters {
                    tx.execute(
                        "INSERT INTO parameters (symbol_id, name, type, position, default_value)
                         VALUES (?1, ?2, ?3, ?4, ?5);",
                        params![
                            symbol_id,
                            param.name,
                            param.type_hint,
                            param.position,
                            param.default_value
                        ],
                    )?;
                }

                if self.fts_available {
                    let _ = tx.execute(
                        "INSERT INTO symbol_fts(symbol_id, name, qualified_name, docstring, signature)
                         VALUES (?1, ?2, ?3, ?4, ?5);",
                        params![
                            symbol_id,
                            symbol.name,
                            symbol.qualified_name,
                            symbol.docstring.as_deref().unwrap_or(""),
                            symbol.signature.as_deref().unwrap_or(""),
                        ],
                    );
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn replace_file_edges(&mut self, file_path: &str, edges: &[Edge]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM edges WHERE file_path = ?1;", params![file_path])?;
        for e in edges {
            tx.execute(
                "INSERT OR IGNORE INTO edges (
                    source_id, target_id, source_type, target_type, relationship,
                    file_path, line_number, confidence
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
                params![
                    e.source_id,
                    e.target_id,
                    e.source_type.as_str(),
                    e.target_type.as_str(),
                    e.relationship.as_str(),
                    e.file_path,
                    e.line_number,
                    e.confidence,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn replace_external_deps(&mut self, file_path: &str, deps: &[ExternalDep]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM external_deps WHERE file_path = ?1;",
            params![file_path],
        )?;
        for d in deps {
            tx.execute(
                "INSERT INTO external_deps (file_path, import_statement, module_name, line_number)
                 VALUES (?1, ?2, ?3, ?4);",
                params![d.file_path, d.import_statement, d.module_name, d.line_number],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Removes every row touching `file_path`: symbols (and their FTS rows
    /// and parameters), edges, external deps, and the file row itself.
    pub fn delete_file_graph(&mut self, file_path: &str) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare("SELECT id FROM symbols WHERE file_path = ?1;")?;
            let ids: Vec<i64> = stmt
                .query_map(params![file_path], |row| row.get(0))?
                .collect::<Result<_, _>>()?;
            drop(stmt);
            for id in ids {
                let _ = tx.execute("DELETE FROM symbol_fts WHERE symbol_id = ?1;", params![id]);
            }
        }
        tx.execute("DELETE FROM edges WHERE file_path = ?1;", params![file_path])?;
        tx.execute(
            "DELETE FROM external_deps WHERE file_path = ?1;",
            params![file_path],
        )?;
        tx.execute(
            "DELETE FROM parameters WHERE symbol_id IN (SELECT id FROM symbols WHERE file_path = ?1);",
            params![file_path],
        )?;
        tx.execute("DELETE FROM symbols WHERE file_path = ?1;", params![file_path])?;
        tx.execute("DELETE FROM files WHERE path = ?1;", params![file_path])?;
        tx.commit()?;
        Ok(())
    }

    /// Copies the `files` row from `old_path` to `new_path` (preserving
    /// `last_indexed_at`) and repoints `symbols`/`edges`/`external_deps`
    /// before dropping the old file row.
    pub fn rename_file(&mut self, old_path: &str, new_path: &str) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        let source: Option<(String, String, Option<i64>, String)> = tx
            .query_row(
                "SELECT language, content_hash, size_bytes, last_indexed_at FROM files WHERE path = ?1;",
                params![old_path],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;
        let Some((language, content_hash, size_bytes, last_indexed_at)) = source else {
            return Ok(());
        };
        tx.execute(
            "INSERT INTO files (path, language, content_hash, size_bytes, last_indexed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(path) DO UPDATE SET
                language = excluded.language,
                content_hash = excluded.content_hash,
                size_bytes = excluded.size_bytes,
                last_indexed_at = excluded.last_indexed_at;",
            params![new_path, language, content_hash, size_bytes, last_indexed_at],
        )?;
        tx.execute(
            "UPDATE symbols SET file_path = ?1 WHERE file_path = ?2;",
            params![new_path, old_path],
        )?;
        tx.execute(
            "UPDATE edges SET file_path = ?1 WHERE file_path = ?2;",
            params![new_path, old_path],
        )?;
        tx.execute(
            "UPDATE external_deps SET file_path = ?1 WHERE file_path = ?2;",
            params![new_path, old_path],
        )?;
        tx.execute("DELETE FROM files WHERE path = ?1;", params![old_path])?;
        tx.commit()?;
        Ok(())
    }

    pub fn symbol_count(&self) -> StorageResult<u64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM symbols;", [], |row| row.get::<_, i64>(0))?
            as u64)
    }

    pub fn edge_count(&self) -> StorageResult<u64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM edges;", [], |row| row.get::<_, i64>(0))?
            as u64)
    }

    pub fn file_count(&self) -> StorageResult<u64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM files;", [], |row| row.get::<_, i64>(0))?
            as u64)
    }

    pub fn symbol_id_for(&self, qualified_name: &str, file_path: &str) -> StorageResult<Option<SymbolId>> {
        let id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM symbols WHERE qualified_name = ?1 AND file_path = ?2;",
                params![qualified_name, file_path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.and_then(|v| SymbolId::new(v as u32)))
    }

    /// `files.path` is a `TEXT PRIMARY KEY`, so SQLite still keeps an
    /// implicit `rowid` alongside it; that rowid is what file-to-file edges
    /// use as their node id. It stays stable across incremental re-indexes
    /// as long as the row itself isn't dropped and reinserted (a rename
    /// does exactly that, via [`Self::rename_file`], which is why a rename
    /// also repoints the edges that reference the old path).
    pub fn file_id_for(&self, path: &str) -> StorageResult<Option<FileId>> {
        let rowid: Option<i64> = self
            .conn
            .query_row("SELECT rowid FROM files WHERE path = ?1;", params![path], |row| row.get(0))
            .optional()?;
        Ok(rowid.and_then(|v| FileId::new(v as u32)))
    }

    pub fn write_meta(&self, key: &str, value: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO repo_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn read_meta(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM repo_meta WHERE key = ?1;",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relationship::{NodeType, RelationKind};
    use crate::types::{Range, SymbolKind};

    fn sample_symbol() -> Symbol {
        Symbol::new(
            "run",
            "pkg.run",
            SymbolKind::Function,
            "pkg/mod.py",
            Range::new(1, 0, 3, 1),
        )
    }

    #[test]
    fn schema_initializes_cleanly() {
        let store = GraphStore::open_in_memory().unwrap();
        assert_eq!(store.symbol_count().unwrap(), 0);
    }

    #[test]
    fn replace_file_symbols_round_trips() {
        let mut store = GraphStore::open_in_memory().unwrap();
        store
            .upsert_files(&[FileRecord {
                path: "pkg/mod.py".into(),
                language: "python".into(),
                content_hash: "abc".into(),
                size_bytes: Some(10),
            }])
            .unwrap();
        store
            .replace_file_symbols("pkg/mod.py", &[sample_symbol()])
            .unwrap();
        assert_eq!(store.symbol_count().unwrap(), 1);
        let id = store.symbol_id_for("pkg.run", "pkg/mod.py").unwrap();
        assert!(id.is_some());

        // Re-running replace with zero symbols clears the file's symbols.
        store.replace_file_symbols("pkg/mod.py", &[]).unwrap();
        assert_eq!(store.symbol_count().unwrap(), 0);
    }

    #[test]
    fn replace_file_edges_ignores_duplicates() {
        let mut store = GraphStore::open_in_memory().unwrap();
        let edge = Edge::new(1, 2, NodeType::Symbol, NodeType::Symbol, RelationKind::Calls)
            .with_location("pkg/mod.py", 5);
        store
            .replace_file_edges("pkg/mod.py", &[edge.clone(), edge])
            .unwrap();
        assert_eq!(store.edge_count().unwrap(), 1);
    }

    #[test]
    fn rename_file_repoints_dependents() {
        let mut store = GraphStore::open_in_memory().unwrap();
        store
            .upsert_files(&[FileRecord {
                path: "old.py".into(),
                language: "python".into(),
                content_hash: "abc".into(),
                size_bytes: None,
            }])
            .unwrap();
        store.replace_file_symbols("old.py", &[sample_symbol()]).unwrap();
        store.rename_file("old.py", "new.py").unwrap();
        let id = store.symbol_id_for("pkg.run", "new.py").unwrap();
        assert!(id.is_some());
        assert!(store.symbol_id_for("pkg.run", "old.py").unwrap().is_none());
    }
}
