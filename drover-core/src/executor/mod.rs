//! Task executors: what an agent actually does when it runs
//!
//! The scheduling core is agnostic to executor internals. Each agent kind is
//! backed by a [`TaskExecutor`] produced by an [`ExecutorFactory`]; agents that
//! need sub-analysis from others receive them as [`Analyzable`] capabilities.

pub mod command;
pub mod mock;
pub mod traits;

pub use command::{CommandExecutor, CommandExecutorFactory};
pub use mock::{MockExecutor, MockExecutorFactory};
pub use traits::{Analyzable, Delegates, ExecutorContext, ExecutorFactory, TaskExecutor};
