//! Structured error types for the retrieval engine.
//!
//! Each subsystem gets its own `thiserror` enum with a `Result` alias;
//! `IndexError` additionally carries recovery suggestions the CLI prints
//! on failure, and `ErrorContext` lets any foreign error be folded into one
//! with a message or path attached.

use crate::types::{FileId, SymbolId};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {language} file '{path}': {reason}")]
    ParseError {
        path: PathBuf,
        language: String,
        reason: String,
    },

    #[error(
        "Unsupported file type '{extension}' for file '{path}'. Supported types: .py, .java, .ts, .tsx, .go"
    )]
    UnsupportedFileType { path: PathBuf, extension: String },

    #[error("Failed to persist index to '{path}': {source}")]
    PersistenceError {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to load index from '{path}': {source}")]
    LoadError {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Symbol '{name}' not found. Did you mean to index the repository first?")]
    SymbolNotFound { name: String },

    #[error("File ID {id:?} not found in index. The file may have been removed or not indexed.")]
    FileNotFound { id: FileId },

    #[error("Failed to create file ID: maximum file count reached")]
    FileIdExhausted,

    #[error("Failed to create symbol ID: maximum symbol count reached")]
    SymbolIdExhausted,

    #[error("Invalid configuration: {reason}")]
    ConfigError { reason: String },

    #[error("Storage operation failed during {operation}: {cause}")]
    StorageFailure { operation: String, cause: String },

    #[error("Transaction failed after operations: {operations:?}. Cause: {cause}")]
    TransactionFailed {
        operations: Vec<String>,
        cause: String,
    },

    #[error("Internal mutex was poisoned, likely due to a panic in another thread")]
    MutexPoisoned,

    #[error("Index appears to be corrupted: {reason}")]
    IndexCorrupted { reason: String },

    #[error("Storage error during indexing: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    General(String),
}

impl IndexError {
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::StorageFailure { .. } => vec![
                "Try running 'bombe index-full --force' to rebuild the graph store",
                "Check disk space and permissions in the database directory",
            ],
            Self::TransactionFailed { .. } => vec![
                "The operation was rolled back, your index is in a consistent state",
                "Retry the operation, it may succeed on a second attempt",
            ],
            Self::MutexPoisoned => vec![
                "Restart the process to clear the poisoned state",
                "If the problem persists, run 'bombe index-full --force'",
            ],
            Self::IndexCorrupted { .. } => vec![
                "Run 'bombe index-full --force' to rebuild from scratch",
                "Check for disk errors or filesystem corruption",
            ],
            Self::LoadError { .. } | Self::PersistenceError { .. } => vec![
                "The index will be rebuilt from source on next start",
                "Run 'bombe index-full --force' if the issue persists",
            ],
            Self::FileRead { .. } => vec![
                "Check that the file exists and you have read permissions",
                "Ensure the file is not locked by another process",
            ],
            Self::UnsupportedFileType { .. } => vec![
                "Only Python, Java, TypeScript, and Go files are indexed",
            ],
            _ => vec![],
        }
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to initialize {language} parser: {reason}")]
    ParserInit { language: String, reason: String },

    #[error("Failed to parse code at line {line}, column {column}: {reason}")]
    SyntaxError {
        line: u32,
        column: u32,
        reason: String,
    },

    #[error("Invalid UTF-8 in source file")]
    InvalidUtf8,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Symbol {id:?} not found in store")]
    SymbolNotFound { id: SymbolId },

    #[error("Schema migration failed: {reason}")]
    MigrationFailed { reason: String },
}

#[derive(Error, Debug)]
pub enum McpError {
    #[error("Failed to initialize MCP server: {reason}")]
    ServerInitError { reason: String },

    #[error("MCP client error: {reason}")]
    ClientError { reason: String },

    #[error("Invalid tool arguments: {reason}")]
    InvalidArguments { reason: String },
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Circuit breaker is open, retry after {retry_after_secs:.1}s")]
    CircuitOpen { retry_after_secs: f64 },

    #[error("Schema version mismatch: local {local}, remote {remote}")]
    SchemaMismatch { local: u32, remote: u32 },

    #[error("Tool major version mismatch: local {local}, remote {remote}")]
    ToolVersionMismatch { local: u32, remote: u32 },

    #[error("Lineage check failed: delta parent {parent} does not match known snapshot {known}")]
    LineageMismatch { parent: String, known: String },

    #[error("Artifact checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Artifact quarantined: {reason}")]
    Quarantined { reason: String },

    #[error("Transport timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Signature verification failed for key id {key_id:?}")]
    SignatureInvalid { key_id: Option<String> },
}

#[derive(Error, Debug)]
pub enum FederationError {
    #[error("Too many shards requested: {requested} exceeds limit {limit}")]
    TooManyShards { requested: usize, limit: usize },

    #[error("Shard '{shard_id}' timed out after {timeout_ms}ms")]
    ShardTimeout { shard_id: String, timeout_ms: u64 },

    #[error("Unknown shard '{shard_id}'")]
    UnknownShard { shard_id: String },

    #[error("Malformed global symbol URI: {uri}")]
    MalformedUri { uri: String },

    #[error("Cross-repo edge limit exceeded: {count} exceeds {limit}")]
    EdgeLimitExceeded { count: usize, limit: usize },
}

pub type IndexResult<T> = Result<T, IndexError>;
pub type ParseResult<T> = Result<T, ParseError>;
pub type StorageResult<T> = Result<T, StorageError>;
pub type McpResult<T> = Result<T, McpError>;
pub type SyncResult<T> = Result<T, SyncError>;
pub type FederationResult<T> = Result<T, FederationError>;

/// Attach ad hoc context to a foreign error without defining a new variant
/// for every call site.
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> Result<T, IndexError>;
    fn with_path(self, path: &std::path::Path) -> Result<T, IndexError>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: &str) -> Result<T, IndexError> {
        self.map_err(|e| IndexError::General(format!("{msg}: {e}")))
    }

    fn with_path(self, path: &std::path::Path) -> Result<T, IndexError> {
        self.map_err(|e| IndexError::General(format!("Error processing '{}': {e}", path.display())))
    }
}
