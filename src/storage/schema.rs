//! DDL for the core relational graph: files, symbols, parameters, edges,
//! external deps, plus the FTS5 shadow table used by lexical search.

pub const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS repo_meta (
        key TEXT PRIMARY KEY,
        value TEXT
    );",
    "CREATE TABLE IF NOT EXISTS files (
        path TEXT PRIMARY KEY,
        language TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        size_bytes INTEGER,
        last_indexed_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS symbols (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        qualified_name TEXT NOT NULL,
        kind TEXT NOT NULL,
        file_path TEXT NOT NULL REFERENCES files(path),
        start_line INTEGER NOT NULL,
        end_line INTEGER NOT NULL,
        signature TEXT,
        return_type TEXT,
        visibility TEXT,
        is_async BOOLEAN DEFAULT FALSE,
        is_static BOOLEAN DEFAULT FALSE,
        parent_symbol_id INTEGER REFERENCES symbols(id),
        docstring TEXT,
        pagerank_score REAL DEFAULT 0.0,
        UNIQUE(qualified_name, file_path)
    );",
    "CREATE TABLE IF NOT EXISTS parameters (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        symbol_id INTEGER NOT NULL REFERENCES symbols(id),
        name TEXT NOT NULL,
        type TEXT,
        position INTEGER NOT NULL,
        default_value TEXT,
        UNIQUE(symbol_id, position)
    );",
    "CREATE TABLE IF NOT EXISTS edges (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source_id INTEGER NOT NULL,
        target_id INTEGER NOT NULL,
        source_type TEXT NOT NULL,
        target_type TEXT NOT NULL,
        relationship TEXT NOT NULL,
        file_path TEXT,
        line_number INTEGER,
        confidence REAL DEFAULT 1.0,
        UNIQUE(source_id, target_id, source_type, target_type, relationship)
    );",
    "CREATE TABLE IF NOT EXISTS external_deps (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        file_path TEXT NOT NULL REFERENCES files(path),
        import_statement TEXT NOT NULL,
        module_name TEXT NOT NULL,
        line_number INTEGER
    );",
    "CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);",
    "CREATE INDEX IF NOT EXISTS idx_symbols_qualified ON symbols(qualified_name);",
    "CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file_path);",
    "CREATE INDEX IF NOT EXISTS idx_symbols_kind ON symbols(kind);",
    "CREATE INDEX IF NOT EXISTS idx_symbols_pagerank ON symbols(pagerank_score DESC);",
    "CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id, source_type);",
    "CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id, target_type);",
    "CREATE INDEX IF NOT EXISTS idx_edges_relationship ON edges(relationship);",
    "CREATE INDEX IF NOT EXISTS idx_files_hash ON files(content_hash);",
];

/// Attempted separately from `SCHEMA_STATEMENTS` because FTS5 may not be
/// compiled into a given SQLite build; callers fall back to `LIKE` search
/// when this fails.
pub const FTS_STATEMENTS: &[&str] = &[
    "CREATE VIRTUAL TABLE IF NOT EXISTS symbol_fts
     USING fts5(symbol_id UNINDEXED, name, qualified_name, docstring, signature);",
    "CREATE INDEX IF NOT EXISTS idx_symbol_fts_symbol_id ON symbol_fts(symbol_id);",
];
