//! Per-agent listener that turns events into persisted rows

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::agent::{AgentKind, AgentOutput};
use crate::events::{AgentEvent, AgentEventPayload, AgentListener};
use crate::notifications::{Notification, Notifier};
use crate::persistence::{AgentLogRow, PersistenceSink};

/// Listener installed on exactly one agent of one tenant
///
/// Carries the tenant id so log rows are attributed correctly without the
/// agent knowing which tenant it belongs to. Collaborator failures are logged
/// here and never reach the agent.
pub struct TenantEventLogger {
    tenant_id: String,
    kind: AgentKind,
    agent_name: String,
    sink: Arc<dyn PersistenceSink>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl TenantEventLogger {
    pub fn new(
        tenant_id: impl Into<String>,
        kind: AgentKind,
        agent_name: impl Into<String>,
        sink: Arc<dyn PersistenceSink>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            kind,
            agent_name: agent_name.into(),
            sink,
            notifier,
        }
    }

    async fn on_completed(&self, event: &AgentEvent, output: &AgentOutput, duration_ms: u64) {
        if !output.items.is_empty()
            && let Err(e) = self
                .sink
                .save_completed_payload(self.kind, output, &self.tenant_id)
                .await
        {
            error!(
                tenant_id = %self.tenant_id,
                agent_id = %event.agent_id,
                "Failed to save completed payload: {}",
                e
            );
        }

        self.notify_alerts(event, output).await;

        let row = self.row(event, true, duration_ms, output.processed_count(), output.details.clone(), None);
        self.append(row).await;
    }

    async fn notify_alerts(&self, event: &AgentEvent, output: &AgentOutput) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        for alert in &output.alerts {
            let notification = Notification::from_alert(&event.agent_id, alert);
            if let Err(e) = notifier
                .notify(&notification.message, &notification.options)
                .await
            {
                warn!(tag = %notification.tag, "Failed to deliver alert: {}", e);
            }
        }
    }

    fn row(
        &self,
        event: &AgentEvent,
        success: bool,
        duration_ms: u64,
        processed_count: usize,
        details: Value,
        error: Option<String>,
    ) -> AgentLogRow {
        AgentLogRow {
            tenant_id: self.tenant_id.clone(),
            agent_id: event.agent_id.clone(),
            agent_name: self.agent_name.clone(),
            event_type: event.kind(),
            success,
            duration_ms,
            processed_count,
            details,
            error,
            timestamp: event.timestamp,
        }
    }

    async fn append(&self, row: AgentLogRow) {
        let agent_id = row.agent_id.clone();
        if let Err(e) = self.sink.append_log(row).await {
            error!(tenant_id = %self.tenant_id, %agent_id, "Failed to append agent log: {}", e);
        }
    }
}

#[async_trait]
impl AgentListener for TenantEventLogger {
    async fn on_event(&self, event: &AgentEvent) {
        match &event.payload {
            AgentEventPayload::Completed {
                result,
                duration_ms,
            } => self.on_completed(event, result, *duration_ms).await,
            AgentEventPayload::Failed { error, duration_ms } => {
                let row = self.row(event, false, *duration_ms, 0, Value::Null, Some(error.clone()));
                self.append(row).await;
            }
            AgentEventPayload::Started { .. } | AgentEventPayload::Paused => {
                debug!(
                    tenant_id = %self.tenant_id,
                    agent_id = %event.agent_id,
                    event = event.kind().as_str(),
                    "Lifecycle event"
                );
            }
        }
    }
}
