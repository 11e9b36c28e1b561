//! Urgent-condition notifications
//!
//! Agents raise [`Alert`](crate::agent::Alert)s; the tenant's event logger
//! turns them into [`Notification`]s for the configured [`Notifier`].

mod service;
mod types;

pub use service::{LogNotifier, Notifier};
pub use types::{Notification, NotifyOptions, Priority};
