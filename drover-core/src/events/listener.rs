//! Per-agent event listener

use async_trait::async_trait;

use super::AgentEvent;

/// Observer installed on exactly one agent at construction
///
/// `on_event` is awaited inline by the emitting agent, so a slow listener
/// delays the end of the run it observes. It cannot fail: implementations
/// handle and log their own errors.
#[async_trait]
pub trait AgentListener: Send + Sync {
    async fn on_event(&self, event: &AgentEvent);
}
