//! Hybrid control-plane sync: builds deltas from local
//! changes, pushes/pulls them through a breaker-guarded transport, and
//! reconciles the result back into a pinned, checksummed artifact.
//!
//! Module layout mirrors the reference implementation's `sync/` package:
//! wire models, checksum/signature, breaker, quarantine, transport, client
//! (compatibility policy + push/pull), promotion, reconciliation, and the
//! `run_sync_cycle` orchestrator that ties them together.

pub mod breaker;
pub mod checksum;
pub mod client;
pub mod delta;
pub mod models;
pub mod orchestrator;
pub mod promotion;
pub mod quarantine;
pub mod reconcile;
pub mod store;
pub mod transport;

pub use breaker::{BreakerSnapshot, BreakerState, CircuitBreaker};
pub use client::{CompatibilityPolicy, PullOutcome, PushOutcome, SyncClient};
pub use models::{ArtifactBundle, EdgeContract, IndexDelta, SymbolKey, SymbolRecord};
pub use orchestrator::{run_sync_cycle, SyncCycleReport};
pub use promotion::{promote_delta, PromotionPolicy, PromotionResult};
pub use quarantine::ArtifactQuarantineStore;
pub use reconcile::reconcile_artifact;
pub use transport::{FileTransport, HttpTransport, PullQuery, SyncTransport};
