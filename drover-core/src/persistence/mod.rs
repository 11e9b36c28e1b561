//! Where agent results and activation state go
//!
//! The core only talks to the traits in this module. Shipped backends:
//!
//! - [`MemoryStore`]: everything in memory, with failure injection for tests
//! - [`JsonlLogSink`]: append-only JSONL logs and de-duplicated payload files
//! - [`FileActivationStore`]: the set of active tenants in one JSON file

mod activation;
mod jsonl;
mod memory;
mod types;

use async_trait::async_trait;

use crate::agent::{AgentKind, AgentOutput};
use crate::error::PersistenceError;

pub use activation::FileActivationStore;
pub use jsonl::JsonlLogSink;
pub use memory::{MemoryStore, SavedPayload};
pub use types::{AgentLogRow, StoredItem};

/// Receives the side effects of agent events
///
/// Delivery is at-least-once, so both calls must tolerate duplicates.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Store the structured items of a completed run
    ///
    /// Items whose natural key was already stored are skipped.
    async fn save_completed_payload(
        &self,
        kind: AgentKind,
        payload: &AgentOutput,
        tenant_id: &str,
    ) -> Result<(), PersistenceError>;

    /// Append one normalized log row
    async fn append_log(&self, row: AgentLogRow) -> Result<(), PersistenceError>;
}

/// Read side of the agent log
#[async_trait]
pub trait LogQuery: Send + Sync {
    /// Newest rows first, at most `limit`
    async fn recent_logs(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> Result<Vec<AgentLogRow>, PersistenceError>;
}

/// Durable per-tenant "agents should be running" flag
#[async_trait]
pub trait ActivationStore: Send + Sync {
    async fn active_tenant_ids(&self) -> Result<Vec<String>, PersistenceError>;

    async fn set_active(&self, tenant_id: &str, active: bool) -> Result<(), PersistenceError>;
}
