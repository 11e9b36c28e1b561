//! Agent lifecycle events
//!
//! Agents emit [`AgentEvent`]s to the single [`AgentListener`] installed when
//! they were built; the scheduler driving them republishes every event on its
//! broadcast channel.

mod listener;
mod recorder;
mod types;

pub use listener::AgentListener;
pub use recorder::EventRecorder;
pub use types::{AgentEvent, AgentEventKind, AgentEventPayload};
