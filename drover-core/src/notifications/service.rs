//! Notification channel

use async_trait::async_trait;
use tracing::{info, warn};

use super::{NotifyOptions, Priority};
use crate::error::NotifyError;

/// Delivers urgent messages to a human
///
/// Optional collaborator. A failed delivery is logged by the caller and never
/// changes agent status.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str, options: &NotifyOptions) -> Result<(), NotifyError>;
}

/// Notifier that writes notifications to the tracing log
///
/// Useful as a default when no push channel is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    /// Notifications below this priority are dropped
    min_priority: Priority,
}

impl LogNotifier {
    pub fn new(min_priority: Priority) -> Self {
        Self { min_priority }
    }

    /// Whether a notification of `priority` would be delivered
    pub fn accepts(&self, priority: Priority) -> bool {
        priority >= self.min_priority
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str, options: &NotifyOptions) -> Result<(), NotifyError> {
        if !self.accepts(options.priority) {
            return Ok(());
        }
        match options.priority {
            Priority::High | Priority::Urgent => {
                warn!(title = %options.title, priority = options.priority.as_str(), "{}", message)
            }
            Priority::Low | Priority::Normal => {
                info!(title = %options.title, priority = options.priority.as_str(), "{}", message)
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_notifier_filters_by_priority() {
        let notifier = LogNotifier::new(Priority::High);
        assert!(!notifier.accepts(Priority::Normal));
        assert!(notifier.accepts(Priority::High));
        assert!(notifier.accepts(Priority::Urgent));
    }

    #[tokio::test]
    async fn log_notifier_never_fails() {
        let notifier = LogNotifier::default();
        let options = NotifyOptions {
            title: "Large transfer".to_string(),
            priority: Priority::Urgent,
        };
        assert!(notifier.notify("1,000,000 USDC received", &options).await.is_ok());
    }
}
