pub mod cli;
pub mod config;
pub mod error;
pub mod federation;
pub mod indexing;
pub mod logging;
pub mod mcp;
pub mod parsing;
pub mod project_resolver;
pub mod query;
pub mod relationship;
pub mod storage;
pub mod symbol;
pub mod sync;
pub mod types;
pub mod watcher;
pub mod workspace;

pub use config::Settings;
pub use error::{
    FederationError, FederationResult, IndexError, IndexResult, McpError, McpResult, ParseError,
    ParseResult, StorageError, StorageResult, SyncError, SyncResult,
};
pub use indexing::IndexFacade;
pub use relationship::{NodeType, RelationKind};
pub use storage::GraphStore;
pub use symbol::{Parameter, Symbol};
pub use types::{FileId, Language, Range, SymbolId, SymbolKind, Visibility};