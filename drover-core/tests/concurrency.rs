//! Concurrency tests for agents and the agent manager
//!
//! These tests validate that:
//! - An agent never runs two executions at once, whoever triggers them
//! - Racing rebuilds of one tenant leave exactly one live set and no stray timers
//! - Racing start and stop never leave a running agent without its timer
//! - Tenants run independently of each other

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use drover_core::{
    Agent, AgentConfig, AgentKind, AgentManager, AgentOutput, AgentSettings, AgentStatus,
    ConfigError, ConfigProvider, GlobalConfig, MemoryStore, MockExecutor, MockExecutorFactory,
    Schedule, Scheduler, StaticConfigProvider, TenantPhase, UserConfig,
};

const MINUTE: Duration = Duration::from_secs(60);

fn slow_mock(delay: Duration) -> Arc<MockExecutor> {
    Arc::new(MockExecutor::new(AgentOutput::default()).with_delay(delay))
}

#[tokio::test(start_paused = true)]
async fn overlapping_run_once_calls_never_execute_concurrently() {
    let scheduler = Arc::new(Scheduler::new("t1"));
    let mock = slow_mock(Duration::from_secs(20));
    scheduler
        .register(Arc::new(
            Agent::builder(AgentConfig::new("a", "a", Schedule::Manual), mock.clone()).build(),
        ))
        .await
        .unwrap();

    let s1 = Arc::clone(&scheduler);
    let s2 = Arc::clone(&scheduler);
    let (first, second) = tokio::join!(
        async move { s1.run_once("a", None).await },
        async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            s2.run_once("a", None).await
        },
    );

    let dispositions = [first.unwrap(), second.unwrap()];
    assert_eq!(dispositions.iter().filter(|d| d.is_skipped()).count(), 1);
    assert_eq!(mock.max_concurrency(), 1);
    assert_eq!(mock.call_count(), 1);
    assert_eq!(scheduler.agent("a").await.unwrap().run_count, 1);
}

#[tokio::test(start_paused = true)]
async fn timer_tick_during_manual_run_is_dropped() {
    let scheduler = Scheduler::new("t1");
    let mock = slow_mock(Duration::from_secs(80));
    scheduler
        .register(Arc::new(
            Agent::builder(
                AgentConfig::new("a", "a", Schedule::Interval { minutes: 1 }),
                mock.clone(),
            )
            .build(),
        ))
        .await
        .unwrap();
    scheduler.start("a").await.unwrap();

    // Manual run from 0:30 to 1:50 covers the tick at 1:00
    tokio::time::sleep(Duration::from_secs(30)).await;
    let disposition = scheduler.run_once("a", None).await.unwrap();
    assert!(!disposition.is_skipped());

    assert_eq!(mock.max_concurrency(), 1);
    assert_eq!(mock.call_count(), 1);
    assert!(!scheduler.armed().await.is_empty());
}

fn tenant_config() -> UserConfig {
    UserConfig::default()
        .with_settings(AgentKind::Email, AgentSettings::enabled().every(1))
        .with_settings(AgentKind::Task, AgentSettings::enabled())
        .with_gmail_credentials()
}

fn manager(factory: Arc<MockExecutorFactory>) -> AgentManager {
    let config = Arc::new(
        StaticConfigProvider::new(GlobalConfig::fully_provisioned())
            .with_tenant("t1", tenant_config())
            .with_tenant("t2", tenant_config()),
    );
    let store = Arc::new(MemoryStore::new());
    AgentManager::new(config, factory, store.clone(), store)
}

#[tokio::test(start_paused = true)]
async fn racing_initializations_leave_one_set() {
    let factory = Arc::new(MockExecutorFactory::new(AgentOutput::default()));
    let manager = Arc::new(manager(factory.clone()));

    let m1 = Arc::clone(&manager);
    let m2 = Arc::clone(&manager);
    let m3 = Arc::clone(&manager);
    let (r1, r2, r3) = tokio::join!(
        async move { m1.initialize_for_user("t1").await },
        async move { m2.initialize_for_user("t1").await },
        async move { m3.start_agent("t1", AgentKind::Email).await },
    );
    assert!(r1.is_ok() && r2.is_ok() && r3.is_ok());
    assert_eq!(manager.tenant_phase("t1").await, TenantPhase::Active);

    tokio::time::sleep(3 * MINUTE + Duration::from_secs(1)).await;

    // However many sets were built, only the surviving one ticks
    let email_calls: u64 = factory
        .built()
        .await
        .iter()
        .filter(|b| b.kind == AgentKind::Email)
        .map(|b| b.executor.call_count())
        .sum();
    assert_eq!(email_calls, 3);
}

#[tokio::test(start_paused = true)]
async fn tenants_progress_independently() {
    let factory = Arc::new(MockExecutorFactory::from_template(|kind| match kind {
        AgentKind::Task => MockExecutor::default().with_delay(10 * MINUTE),
        _ => MockExecutor::default(),
    }));
    let manager = Arc::new(manager(factory.clone()));
    manager.initialize_for_user("t1").await.unwrap();
    manager.initialize_for_user("t2").await.unwrap();

    // t1's task agent is stuck in a long run; t2 keeps ticking
    let stuck = manager
        .run_agent_once("t1", AgentKind::Task, None)
        .await
        .unwrap();
    tokio::time::sleep(2 * MINUTE + Duration::from_secs(1)).await;

    let t2_email = factory.executor_for("t2", AgentKind::Email).await.unwrap();
    assert_eq!(t2_email.call_count(), 2);
    assert!(!stuck.is_finished());

    // Stopping t1 does not cancel the run already in flight
    manager.stop_for_user("t1").await;
    let disposition = stuck.await.unwrap().unwrap();
    assert!(disposition.result().unwrap().is_success());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_start_and_stop_keep_timer_and_status_in_step() {
    let scheduler = Arc::new(Scheduler::new("t1"));
    scheduler
        .register(Arc::new(
            Agent::builder(
                AgentConfig::new("a", "a", Schedule::Interval { minutes: 1 }),
                Arc::new(MockExecutor::default()),
            )
            .build(),
        ))
        .await
        .unwrap();

    for round in 0..50 {
        let starter = Arc::clone(&scheduler);
        let stopper = Arc::clone(&scheduler);
        let (started, stopped) = tokio::join!(
            tokio::spawn(async move { starter.start("a").await }),
            tokio::spawn(async move { stopper.stop("a").await }),
        );
        started.unwrap().unwrap();
        stopped.unwrap().unwrap();

        let status = scheduler.agent("a").await.unwrap().status;
        let armed = scheduler.armed().await.contains(&"a".to_string());
        assert_eq!(
            armed,
            status == AgentStatus::Running,
            "round {round}: status {status:?}, armed {armed}"
        );
    }
}

/// Holds every tenant config read until a permit is released; the first
/// read fails
struct GatedProvider {
    inner: StaticConfigProvider,
    gate: Semaphore,
    reads: AtomicU64,
}

impl GatedProvider {
    fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    async fn wait_for_reads(&self, n: u64) {
        while self.reads() < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl ConfigProvider for GatedProvider {
    async fn load_user_config(&self, tenant_id: &str) -> Result<UserConfig, ConfigError> {
        let read = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        self.gate
            .acquire()
            .await
            .map_err(|e| ConfigError::Unavailable(e.to_string()))?
            .forget();
        if read == 1 {
            return Err(ConfigError::Unavailable("config store restarting".to_string()));
        }
        self.inner.load_user_config(tenant_id).await
    }

    async fn load_global_config(&self) -> Result<GlobalConfig, ConfigError> {
        self.inner.load_global_config().await
    }
}

#[tokio::test]
async fn tenant_stays_building_until_the_last_racing_build_ends() {
    let provider = Arc::new(GatedProvider {
        inner: StaticConfigProvider::new(GlobalConfig::fully_provisioned()).with_tenant(
            "t1",
            UserConfig::default().with_settings(AgentKind::Task, AgentSettings::enabled()),
        ),
        gate: Semaphore::new(0),
        reads: AtomicU64::new(0),
    });
    let store = Arc::new(MemoryStore::new());
    let manager = Arc::new(AgentManager::new(
        provider.clone(),
        Arc::new(MockExecutorFactory::new(AgentOutput::default())),
        store.clone(),
        store,
    ));

    let m1 = Arc::clone(&manager);
    let failing = tokio::spawn(async move { m1.initialize_for_user("t1").await });
    provider.wait_for_reads(1).await;
    let m2 = Arc::clone(&manager);
    let succeeding = tokio::spawn(async move { m2.initialize_for_user("t1").await });
    provider.wait_for_reads(2).await;
    assert_eq!(manager.tenant_phase("t1").await, TenantPhase::Building);

    provider.gate.add_permits(1);
    assert!(failing.await.unwrap().is_err());
    assert_eq!(manager.tenant_phase("t1").await, TenantPhase::Building);

    provider.gate.add_permits(1);
    succeeding.await.unwrap().unwrap();
    assert_eq!(manager.tenant_phase("t1").await, TenantPhase::Active);
}
