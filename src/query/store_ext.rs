//! Read helpers shared by every query engine. The graph store itself (see
//! [`crate::storage::GraphStore`]) only exposes the mutation surface the
//! indexing pipeline needs; the query layer's reads are varied enough
//! (joins, filters, id lookups by either direction) that they live here
//! instead of growing the store's public API per query.

use crate::error::StorageResult;
use crate::relationship::RelationKind;
use crate::storage::GraphStore;
use crate::symbol::{Parameter, Symbol};
use crate::types::{Range, SymbolId, SymbolKind, Visibility};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub fn symbol_from_row(row: &Row) -> rusqlite::Result<Symbol> {
    let id: i64 = row.get("id")?;
    let kind: String = row.get("kind")?;
    let visibility: Option<String> = row.get("visibility")?;
    let parent: Option<i64> = row.get("parent_symbol_id")?;
    let mut symbol = Symbol::new(
        row.get::<_, String>("name")?,
        row.get::<_, String>("qualified_name")?,
        SymbolKind::parse(&kind).unwrap_or(SymbolKind::Function),
        row.get::<_, String>("file_path")?,
        Range::new(row.get("start_line")?, 0, row.get("end_line")?, 0),
    );
    symbol.id = SymbolId::new(id as u32);
    symbol.signature = row.get("signature")?;
    symbol.return_type = row.get("return_type")?;
    symbol.visibility = match visibility.as_deref() {
        Some("private") => Visibility::Private,
        Some("protected") => Visibility::Protected,
        Some("package") => Visibility::Package,
        _ => Visibility::Public,
    };
    symbol.is_async = row.get("is_async")?;
    symbol.is_static = row.get("is_static")?;
    symbol.parent_symbol_id = parent.and_then(|v| SymbolId::new(v as u32));
    symbol.docstring = row.get("docstring")?;
    symbol.pagerank_score = row.get("pagerank_score")?;
    Ok(symbol)
}

const SYMBOL_COLUMNS: &str = "id, name, qualified_name, kind, file_path, start_line, end_line, signature,
     return_type, visibility, is_async, is_static, parent_symbol_id, docstring, pagerank_score";

pub fn load_symbol(conn: &Connection, id: SymbolId) -> StorageResult<Option<Symbol>> {
    Ok(conn
        .query_row(
            &format!("SELECT {SYMBOL_COLUMNS} FROM symbols WHERE id = ?1;"),
            params![id.to_u32()],
            |row| symbol_from_row(row),
        )
        .optional()?)
}

pub fn load_parameters(conn: &Connection, id: SymbolId) -> StorageResult<Vec<Parameter>> {
    let mut stmt = conn.prepare(
        "SELECT name, type, position, default_value FROM parameters
         WHERE symbol_id = ?1 ORDER BY position;",
    )?;
    let rows = stmt.query_map(params![id.to_u32()], |row| {
        Ok(Parameter {
            name: row.get(0)?,
            type_hint: row.get(1)?,
            position: row.get::<_, i64>(2)? as u32,
            default_value: row.get(3)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn load_symbols_by_exact_name(conn: &Connection, name: &str) -> StorageResult<Vec<Symbol>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SYMBOL_COLUMNS} FROM symbols WHERE name = ?1 ORDER BY pagerank_score DESC;"
    ))?;
    let rows = stmt.query_map(params![name], |row| symbol_from_row(row))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn load_symbol_by_qualified_name(conn: &Connection, qualified_name: &str) -> StorageResult<Option<Symbol>> {
    Ok(conn
        .query_row(
            &format!("SELECT {SYMBOL_COLUMNS} FROM symbols WHERE qualified_name = ?1 LIMIT 1;"),
            params![qualified_name],
            |row| symbol_from_row(row),
        )
        .optional()?)
}

/// Resolves a query the way every query engine's "resolve a symbol"
/// step does: exact qualified name first, then by bare name (highest
/// PageRank wins on ties).
pub fn resolve_symbol(conn: &Connection, query: &str) -> StorageResult<Option<Symbol>> {
    if let Some(symbol) = load_symbol_by_qualified_name(conn, query)? {
        return Ok(Some(symbol));
    }
    let mut candidates = load_symbols_by_exact_name(conn, query)?;
    Ok(if candidates.is_empty() {
        None
    } else {
        Some(candidates.remove(0))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    Outbound,
    Inbound,
}

/// Loads `(neighbor_id, line_number, confidence)` for every symbol-to-symbol
/// edge of the given relationships touching `id`, in the given direction.
pub fn symbol_edges(
    conn: &Connection,
    id: SymbolId,
    relationships: &[RelationKind],
    direction: EdgeDirection,
) -> StorageResult<Vec<(SymbolId, Option<u32>, f64)>> {
    let rel_values: Vec<&'static str> = relationships.iter().map(|r| r.as_str()).collect();
    let placeholders = rel_values.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
    let (select_col, filter_col) = match direction {
        EdgeDirection::Outbound => ("target_id", "source_id"),
        EdgeDirection::Inbound => ("source_id", "target_id"),
    };
    let sql = format!(
        "SELECT {select_col}, line_number, confidence FROM edges
         WHERE {filter_col} = ? AND source_type = 'symbol' AND target_type = 'symbol'
           AND relationship IN ({placeholders});"
    );
    let mut stmt = conn.prepare(&sql)?;
    let id_value = id.to_u32();
    let mut param_values: Vec<&dyn rusqlite::ToSql> = vec![&id_value];
    for rel in &rel_values {
        param_values.push(rel);
    }
    let rows = stmt.query_map(param_values.as_slice(), |row| {
        let neighbor: i64 = row.get(0)?;
        let line: Option<i64> = row.get(1)?;
        let confidence: f64 = row.get(2)?;
        Ok((neighbor, line, confidence))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (neighbor, line, confidence) = row?;
        if let Some(sid) = SymbolId::new(neighbor as u32) {
            out.push((sid, line.map(|l| l as u32), confidence));
        }
    }
    Ok(out)
}

pub fn all_symbols(conn: &Connection) -> StorageResult<Vec<Symbol>> {
    let mut stmt = conn.prepare(&format!("SELECT {SYMBOL_COLUMNS} FROM symbols;"))?;
    let rows = stmt.query_map([], |row| symbol_from_row(row))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn symbols_under_prefix(conn: &Connection, prefix: &str) -> StorageResult<Vec<Symbol>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SYMBOL_COLUMNS} FROM symbols WHERE file_path LIKE ?1 ORDER BY pagerank_score DESC;"
    ))?;
    let like_pattern = format!("{prefix}%");
    let rows = stmt.query_map(params![like_pattern], |row| symbol_from_row(row))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn read_source_snippet(repo_root: &std::path::Path, file_path: &str, start_line: u32, end_line: u32) -> Option<String> {
    let content = std::fs::read_to_string(repo_root.join(file_path)).ok()?;
    let lines: Vec<&str> = content.lines().collect();
    let start = start_line.saturating_sub(1) as usize;
    let end = (end_line as usize).min(lines.len());
    if start >= end {
        return None;
    }
    Some(lines[start..end].join("\n"))
}

pub fn graph_store_conn(store: &GraphStore) -> &Connection {
    store.connection()
}
