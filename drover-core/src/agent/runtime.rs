//! The runtime half of an agent: status, run accounting and the in-flight guard

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{RwLock, broadcast};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::output::{ExecutionResult, RunDisposition};
use super::types::{AgentConfig, AgentInfo, AgentStatus, Schedule};
use crate::error::ExecutorError;
use crate::events::{AgentEvent, AgentListener};
use crate::executor::{Analyzable, TaskExecutor};

#[derive(Debug, Default)]
struct RuntimeState {
    status: AgentStatus,
    /// Set by scheduler start, cleared by stop
    started: bool,
    run_count: u64,
    last_run: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// One schedulable unit of work
///
/// Wraps an immutable [`AgentConfig`], the [`TaskExecutor`] doing the actual
/// work and at most one [`AgentListener`]. Status only changes through the
/// crate-internal calls a [`Scheduler`](crate::scheduler::Scheduler) makes.
pub struct Agent {
    config: AgentConfig,
    executor: Arc<dyn TaskExecutor>,
    listener: Option<Arc<dyn AgentListener>>,
    state: RwLock<RuntimeState>,
    busy: AtomicBool,
}

/// Releases the in-flight flag however the run ends
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Agent {
    pub fn builder(config: AgentConfig, executor: Arc<dyn TaskExecutor>) -> AgentBuilder {
        AgentBuilder {
            config,
            executor,
            listener: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn schedule(&self) -> Schedule {
        self.config.schedule
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Snapshot of config and runtime state
    pub async fn info(&self) -> AgentInfo {
        let state = self.state.read().await;
        AgentInfo {
            config: self.config.clone(),
            status: state.status,
            run_count: state.run_count,
            last_run: state.last_run,
            busy: self.is_busy(),
            last_error: state.last_error.clone(),
        }
    }

    pub async fn status(&self) -> AgentStatus {
        self.state.read().await.status
    }

    /// Call the executor once and time it
    ///
    /// The executor runs on its own task so a panic surfaces as a failed
    /// result instead of unwinding through the caller. No state is touched.
    pub async fn execute(&self, input: Option<Value>) -> ExecutionResult {
        let started = Instant::now();
        let executor = Arc::clone(&self.executor);
        let outcome = match tokio::spawn(async move { executor.execute(input).await }).await {
            Ok(outcome) => outcome,
            Err(join_error) => Err(ExecutorError::Panicked(panic_message(join_error))),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(data) => ExecutionResult::Success { data, duration_ms },
            Err(e) => ExecutionResult::Failure {
                error: e.to_string(),
                duration_ms,
            },
        }
    }

    /// Mark started and emit `started`; false if it already was
    pub(crate) async fn mark_started(
        &self,
        scheduled: bool,
        events: &broadcast::Sender<AgentEvent>,
    ) -> bool {
        {
            let mut state = self.state.write().await;
            if state.started {
                return false;
            }
            state.started = true;
            state.status = AgentStatus::Running;
        }
        self.emit(AgentEvent::started(self.id(), scheduled), events)
            .await;
        true
    }

    /// Mark stopped and emit `paused`; false if there was nothing to stop
    pub(crate) async fn mark_stopped(&self, events: &broadcast::Sender<AgentEvent>) -> bool {
        {
            let mut state = self.state.write().await;
            if !state.started && state.status == AgentStatus::Stopped {
                return false;
            }
            state.started = false;
            state.status = AgentStatus::Stopped;
        }
        self.emit(AgentEvent::paused(self.id()), events).await;
        true
    }

    /// One guarded run: execute, record, emit
    ///
    /// Returns [`RunDisposition::Skipped`] without calling the executor when a
    /// run is already in flight.
    pub(crate) async fn run(
        &self,
        input: Option<Value>,
        events: &broadcast::Sender<AgentEvent>,
    ) -> RunDisposition {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(agent_id = %self.id(), "Run already in flight, skipping trigger");
            return RunDisposition::Skipped;
        }
        let _guard = BusyGuard(&self.busy);

        let result = self.execute(input).await;
        self.record(&result).await;

        let event = match &result {
            ExecutionResult::Success { data, duration_ms } => {
                AgentEvent::completed(self.id(), data.clone(), *duration_ms)
            }
            ExecutionResult::Failure { error, duration_ms } => {
                warn!(agent_id = %self.id(), "Run failed: {}", error);
                AgentEvent::failed(self.id(), error.clone(), *duration_ms)
            }
        };
        self.emit(event, events).await;

        RunDisposition::Completed(result)
    }

    async fn record(&self, result: &ExecutionResult) {
        let mut state = self.state.write().await;
        state.run_count += 1;
        state.last_run = Some(Utc::now());

        let armed = state.started && self.config.schedule.is_interval();
        match result.error() {
            None => {
                state.last_error = None;
                state.status = if state.started {
                    AgentStatus::Running
                } else {
                    AgentStatus::Stopped
                };
            }
            Some(error) => {
                state.last_error = Some(error.to_string());
                // An armed timer keeps retrying, so the failure is visible as
                // `error` until the next good tick. Anything else drops back
                // to stopped and has to be started again.
                if armed {
                    state.status = AgentStatus::Error;
                } else {
                    state.started = false;
                    state.status = AgentStatus::Stopped;
                }
            }
        }
    }

    /// Hand the event to the listener, then republish it
    async fn emit(&self, event: AgentEvent, events: &broadcast::Sender<AgentEvent>) {
        if let Some(listener) = &self.listener {
            listener.on_event(&event).await;
        }
        // No receivers is fine
        let _ = events.send(event);
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("config", &self.config)
            .field("has_listener", &self.listener.is_some())
            .field("busy", &self.is_busy())
            .finish()
    }
}

#[async_trait]
impl Analyzable for Agent {
    async fn analyze(&self, input: Value) -> Result<Value, ExecutorError> {
        self.executor.analyze(input).await
    }
}

fn panic_message(join_error: tokio::task::JoinError) -> String {
    if !join_error.is_panic() {
        return join_error.to_string();
    }
    let payload = join_error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Builds an [`Agent`]; the listener can only be set here
pub struct AgentBuilder {
    config: AgentConfig,
    executor: Arc<dyn TaskExecutor>,
    listener: Option<Arc<dyn AgentListener>>,
}

impl AgentBuilder {
    pub fn listener(mut self, listener: Arc<dyn AgentListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn build(self) -> Agent {
        Agent {
            config: self.config,
            executor: self.executor,
            listener: self.listener,
            state: RwLock::new(RuntimeState::default()),
            busy: AtomicBool::new(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentOutput;
    use crate::events::{AgentEventKind, EventRecorder};
    use crate::executor::MockExecutor;
    use serde_json::json;
    use std::time::Duration;

    fn channel() -> broadcast::Sender<AgentEvent> {
        broadcast::channel(16).0
    }

    fn agent_with(mock: MockExecutor, schedule: Schedule) -> (Agent, Arc<EventRecorder>) {
        let recorder = Arc::new(EventRecorder::new());
        let agent = Agent::builder(
            AgentConfig::new("task-agent-t1", "Task Agent", schedule),
            Arc::new(mock),
        )
        .listener(recorder.clone())
        .build();
        (agent, recorder)
    }

    #[tokio::test]
    async fn new_agent_is_stopped_and_idle() {
        let (agent, _) = agent_with(MockExecutor::default(), Schedule::Manual);
        let info = agent.info().await;
        assert_eq!(info.status, AgentStatus::Stopped);
        assert_eq!(info.run_count, 0);
        assert!(info.last_run.is_none());
        assert!(!info.busy);
    }

    #[tokio::test]
    async fn successful_run_emits_completed_with_output() {
        let output = AgentOutput::with_items(vec![json!({"id": 1}), json!({"id": 2})]);
        let (agent, recorder) = agent_with(MockExecutor::new(output), Schedule::Manual);

        let disposition = agent.run(None, &channel()).await;
        let result = disposition.result().unwrap();
        assert!(result.is_success());
        assert_eq!(result.output().unwrap().processed_count(), 2);

        let events = recorder.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), AgentEventKind::Completed);

        let info = agent.info().await;
        assert_eq!(info.run_count, 1);
        assert!(info.last_run.is_some());
    }

    #[tokio::test]
    async fn executor_error_becomes_failure_event() {
        let (agent, recorder) =
            agent_with(MockExecutor::default().always_failing(), Schedule::Manual);

        let disposition = agent.run(None, &channel()).await;
        assert!(!disposition.result().unwrap().is_success());
        assert_eq!(recorder.count(AgentEventKind::Failed).await, 1);

        let info = agent.info().await;
        assert_eq!(info.status, AgentStatus::Stopped);
        assert_eq!(info.run_count, 1);
        assert!(info.last_error.unwrap().contains("mock failure"));
    }

    #[tokio::test]
    async fn executor_panic_becomes_failure() {
        let (agent, recorder) = agent_with(MockExecutor::default().panicking(), Schedule::Manual);

        let result = agent.execute(None).await;
        assert!(result.error().unwrap().contains("panicked"));
        assert!(recorder.events().await.is_empty());

        let disposition = agent.run(None, &channel()).await;
        assert!(!disposition.result().unwrap().is_success());
        assert!(!agent.is_busy());
    }

    #[tokio::test]
    async fn failure_on_started_interval_agent_sets_error_then_recovers() {
        let mock = MockExecutor::default().failing_on_call(1);
        let (agent, _) = agent_with(mock, Schedule::Interval { minutes: 1 });
        let tx = channel();

        assert!(agent.mark_started(true, &tx).await);
        agent.run(None, &tx).await;
        assert_eq!(agent.status().await, AgentStatus::Error);

        agent.run(None, &tx).await;
        assert_eq!(agent.status().await, AgentStatus::Running);
        assert!(agent.info().await.last_error.is_none());
    }

    #[tokio::test]
    async fn failure_on_started_manual_agent_allows_a_fresh_start() {
        let mock = MockExecutor::default().failing_on_call(1);
        let (agent, recorder) = agent_with(mock, Schedule::Manual);
        let tx = channel();

        assert!(agent.mark_started(false, &tx).await);
        agent.run(None, &tx).await;
        assert_eq!(agent.status().await, AgentStatus::Stopped);

        // Already stopped, so there is nothing to pause
        assert!(!agent.mark_stopped(&tx).await);
        assert_eq!(recorder.count(AgentEventKind::Paused).await, 0);

        assert!(agent.mark_started(false, &tx).await);
        assert_eq!(agent.status().await, AgentStatus::Running);
        assert_eq!(recorder.count(AgentEventKind::Started).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_run_is_skipped() {
        let mock = MockExecutor::default().with_delay(Duration::from_secs(30));
        let (agent, recorder) = agent_with(mock, Schedule::Manual);
        let tx = channel();

        let (first, second) = tokio::join!(agent.run(None, &tx), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            agent.run(None, &tx).await
        });

        assert!(!first.is_skipped());
        assert!(second.is_skipped());
        assert_eq!(agent.info().await.run_count, 1);
        assert_eq!(recorder.count(AgentEventKind::Completed).await, 1);
    }

    #[tokio::test]
    async fn start_and_stop_emit_once() {
        let (agent, recorder) = agent_with(MockExecutor::default(), Schedule::Manual);
        let tx = channel();
        let mut rx = tx.subscribe();

        assert!(agent.mark_started(false, &tx).await);
        assert!(!agent.mark_started(false, &tx).await);
        assert_eq!(agent.status().await, AgentStatus::Running);

        assert!(agent.mark_stopped(&tx).await);
        assert!(!agent.mark_stopped(&tx).await);
        assert_eq!(agent.status().await, AgentStatus::Stopped);

        assert_eq!(recorder.count(AgentEventKind::Started).await, 1);
        assert_eq!(recorder.count(AgentEventKind::Paused).await, 1);
        assert_eq!(rx.recv().await.unwrap().kind(), AgentEventKind::Started);
        assert_eq!(rx.recv().await.unwrap().kind(), AgentEventKind::Paused);
    }

    #[tokio::test]
    async fn analyze_forwards_to_executor() {
        let (agent, _) = agent_with(MockExecutor::default(), Schedule::Manual);
        let answer = agent.analyze(json!({"id": "doc-1"})).await.unwrap();
        assert_eq!(answer["analyzed"]["id"], "doc-1");
        assert_eq!(agent.info().await.run_count, 0);
    }
}
