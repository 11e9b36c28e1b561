//! Agents: named, independently schedulable units of work
//!
//! - [`AgentConfig`] / [`AgentKind`] / [`Schedule`]: static identity
//! - [`Agent`]: runtime status, in-flight guard and event emission
//! - [`AgentOutput`] / [`ExecutionResult`]: what a run produces

mod output;
mod runtime;
mod types;

pub use output::{AgentOutput, Alert, ExecutionResult, RunDisposition};
pub use runtime::{Agent, AgentBuilder};
pub use types::{AgentConfig, AgentInfo, AgentKind, AgentStatus, Schedule};
