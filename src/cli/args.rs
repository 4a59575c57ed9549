use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bombe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Structure-aware code retrieval for polyglot repositories")]
pub struct Cli {
    /// Repository root to operate on (defaults to the current directory)
    #[arg(long, global = true)]
    pub repo: Option<PathBuf>,

    /// Override the graph store's db path (relative to --repo)
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Override the configured log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the MCP server (default command when none is given)
    Serve {
        /// Run the control-plane HTTP server instead of stdio MCP
        #[arg(long)]
        http: bool,

        /// Bind address for --http
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
    },

    /// Build the graph store from scratch over every discovered file
    IndexFull {
        /// Write the default config file and exit without indexing
        #[arg(long)]
        init_only: bool,

        /// Run one hybrid sync cycle after indexing completes
        #[arg(long)]
        hybrid_sync: bool,
    },

    /// Re-index only files changed since the last indexed content hash
    IndexIncremental {
        /// Run one hybrid sync cycle after indexing completes
        #[arg(long)]
        hybrid_sync: bool,
    },

    /// Report store health: file/symbol/edge counts and last indexed time
    Status,

    /// Diagnose parser capability, workspace config, and schema version
    Doctor,

    /// Watch the repository and re-index on file changes
    Watch {
        /// Stop after this many re-index cycles (omit to watch forever)
        #[arg(long)]
        max_cycles: Option<usize>,

        /// Debounce window between a change and its re-index cycle
        #[arg(long, default_value_t = 300)]
        poll_interval_ms: u64,

        /// Run one trailing hybrid sync cycle covering every file touched
        /// once the watch loop stops (requires --max-cycles; an unbounded
        /// watch never reaches it)
        #[arg(long)]
        hybrid_sync: bool,
    },
}
