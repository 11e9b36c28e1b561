//! Listener that keeps every event it sees

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{AgentEvent, AgentEventKind, AgentListener};

/// In-memory [`AgentListener`], mostly for tests and debugging
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Mutex<Vec<AgentEvent>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().await.clone()
    }

    /// Number of recorded events of one kind
    pub async fn count(&self, kind: AgentEventKind) -> usize {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.kind() == kind)
            .count()
    }

    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }
}

#[async_trait]
impl AgentListener for EventRecorder {
    async fn on_event(&self, event: &AgentEvent) {
        self.events.lock().await.push(event.clone());
    }
}
