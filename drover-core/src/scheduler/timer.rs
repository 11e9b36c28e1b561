//! Repeating timer task for interval agents

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::agent::{Agent, ExecutionResult, RunDisposition};
use crate::events::AgentEvent;

/// One armed interval timer
///
/// Cancelling (or dropping) the timer stops future ticks. A run already in
/// progress is left to finish and still emits its event.
pub(crate) struct IntervalTimer {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl IntervalTimer {
    /// Spawn the tick loop; the first tick fires one `period` from now
    pub(crate) fn arm(
        agent: Arc<Agent>,
        period: Duration,
        events: broadcast::Sender<AgentEvent>,
    ) -> Self {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            let agent_id = agent.id().to_string();
            info!(agent_id = %agent_id, period_secs = period.as_secs(), "Timer armed");

            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                // Failures are already converted to events by the agent; the
                // loop only logs and keeps going
                match agent.run(None, &events).await {
                    RunDisposition::Skipped => {
                        debug!(agent_id = %agent_id, "Tick skipped, previous run still in flight");
                    }
                    RunDisposition::Completed(ExecutionResult::Failure { .. }) => {
                        debug!(agent_id = %agent_id, "Tick failed, timer stays armed");
                    }
                    RunDisposition::Completed(ExecutionResult::Success { .. }) => {}
                }
            }

            info!(agent_id = %agent_id, "Timer disarmed");
        });

        Self { token, handle }
    }

    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for IntervalTimer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentConfig, AgentOutput, Schedule};
    use crate::executor::MockExecutor;

    fn agent(mock: Arc<MockExecutor>) -> Arc<Agent> {
        Arc::new(
            Agent::builder(
                AgentConfig::new("email-agent-t1", "Email Agent", Schedule::Interval { minutes: 1 }),
                mock,
            )
            .build(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let mock = Arc::new(MockExecutor::new(AgentOutput::default()));
        let (tx, _) = broadcast::channel(16);
        let _timer = IntervalTimer::arm(agent(mock.clone()), Duration::from_secs(60), tx);

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(mock.call_count(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(mock.call_count(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_timer_stops_ticks() {
        let mock = Arc::new(MockExecutor::new(AgentOutput::default()));
        let (tx, _) = broadcast::channel(16);
        let timer = IntervalTimer::arm(agent(mock.clone()), Duration::from_secs(60), tx);

        tokio::time::sleep(Duration::from_secs(61)).await;
        drop(timer);
        tokio::time::sleep(Duration::from_secs(600)).await;

        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_finishes_the_task() {
        let mock = Arc::new(MockExecutor::new(AgentOutput::default()));
        let (tx, _) = broadcast::channel(16);
        let timer = IntervalTimer::arm(agent(mock), Duration::from_secs(60), tx);

        timer.cancel();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(timer.is_finished());
    }
}
