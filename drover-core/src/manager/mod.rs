//! Process-wide agent manager
//!
//! Maps tenant id to [`TenantAgentSet`]. Sets are never patched in place:
//! every (re)initialization stops the current set and builds a fresh one from
//! the config provider, so a config change can only ever leave the set the
//! new config implies.
//!
//! ```text
//! absent ──initialize──▶ building ──▶ active ──stop──▶ absent
//! ```

mod enablement;
mod logger;
mod tenant;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::agent::{Agent, AgentConfig, AgentInfo, AgentKind, RunDisposition};
use crate::config::{ConfigProvider, GlobalConfig, UserConfig};
use crate::error::{ManagerError, SchedulerError};
use crate::executor::{Delegates, ExecutorContext, ExecutorFactory};
use crate::notifications::Notifier;
use crate::persistence::{ActivationStore, PersistenceSink};
use crate::scheduler::Scheduler;

pub use enablement::{Skip, check as check_enablement};
pub use logger::TenantEventLogger;
pub use tenant::{NamedAgents, TenantAgentSet, TenantPhase};

/// Outcome of [`AgentManager::auto_start_agents`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoStartReport {
    pub started: Vec<String>,
    /// Tenant id and error message
    pub failed: Vec<(String, String)>,
}

/// Root orchestrator of every tenant's agents
pub struct AgentManager {
    config: Arc<dyn ConfigProvider>,
    executors: Arc<dyn ExecutorFactory>,
    sink: Arc<dyn PersistenceSink>,
    activation: Arc<dyn ActivationStore>,
    notifier: Option<Arc<dyn Notifier>>,
    tenants: RwLock<HashMap<String, Arc<TenantAgentSet>>>,
    /// In-flight builds per tenant; a tenant is building while its count is
    /// above zero
    building: Mutex<HashMap<String, usize>>,
}

impl AgentManager {
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        executors: Arc<dyn ExecutorFactory>,
        sink: Arc<dyn PersistenceSink>,
        activation: Arc<dyn ActivationStore>,
    ) -> Self {
        Self {
            config,
            executors,
            sink,
            activation,
            notifier: None,
            tenants: RwLock::new(HashMap::new()),
            building: Mutex::new(HashMap::new()),
        }
    }

    /// Deliver agent alerts through `notifier`
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Stop whatever the tenant has, then build and start a fresh set
    ///
    /// A kind whose prerequisites are missing, or whose executor cannot be
    /// built, is skipped; the other kinds still come up.
    #[instrument(skip(self))]
    pub async fn initialize_for_user(&self, tenant_id: &str) -> Result<(), ManagerError> {
        self.stop_for_user(tenant_id).await;

        self.begin_build(tenant_id).await;
        let built = self.build_set(tenant_id).await;
        let set = match built {
            Ok(set) => Arc::new(set),
            Err(e) => {
                self.end_build(tenant_id).await;
                return Err(e);
            }
        };

        if let Err(e) = set.scheduler().start_all().await {
            warn!("Some agents failed to start: {}", e);
        }

        let displaced = self
            .tenants
            .write()
            .await
            .insert(tenant_id.to_string(), Arc::clone(&set));
        self.end_build(tenant_id).await;

        // Another initialize raced us; ours is the set that stays
        if let Some(old) = displaced {
            debug!("Stopping displaced agent set");
            stop_set(&old).await;
        }

        info!(agents = ?set.agents().kinds(), "Tenant agents initialized");
        Ok(())
    }

    async fn begin_build(&self, tenant_id: &str) {
        *self
            .building
            .lock()
            .await
            .entry(tenant_id.to_string())
            .or_default() += 1;
    }

    async fn end_build(&self, tenant_id: &str) {
        let mut building = self.building.lock().await;
        if let Some(count) = building.get_mut(tenant_id) {
            *count -= 1;
            if *count == 0 {
                building.remove(tenant_id);
            }
        }
    }

    async fn load_configs(&self, tenant_id: &str) -> Result<(UserConfig, GlobalConfig), ManagerError> {
        let to_manager_error = |source| ManagerError::Config {
            tenant_id: tenant_id.to_string(),
            source,
        };
        let user = self
            .config
            .load_user_config(tenant_id)
            .await
            .map_err(to_manager_error)?;
        let global = self
            .config
            .load_global_config()
            .await
            .map_err(to_manager_error)?;
        Ok((user, global))
    }

    async fn build_set(&self, tenant_id: &str) -> Result<TenantAgentSet, ManagerError> {
        let (user, global) = self.load_configs(tenant_id).await?;
        let scheduler = Scheduler::new(tenant_id);
        let mut named = NamedAgents::default();

        for kind in AgentKind::BUILD_ORDER {
            let settings = match enablement::check(kind, &user, &global) {
                Ok(settings) => settings.clone(),
                Err(skip) => {
                    debug!(agent = %kind, "Agent not built: {}", skip);
                    continue;
                }
            };

            let delegates = match kind {
                AgentKind::Email => named.delegates(),
                _ => Delegates::default(),
            };
            let ctx = ExecutorContext {
                tenant_id: tenant_id.to_string(),
                kind,
                settings,
                global: global.clone(),
                delegates,
            };
            let executor = match self.executors.build(&ctx).await {
                Ok(executor) => executor,
                Err(e) => {
                    error!(agent = %kind, "Failed to build executor: {}", e);
                    continue;
                }
            };

            let config = AgentConfig::for_kind(kind, tenant_id, ctx.settings.schedule(kind));
            let listener = TenantEventLogger::new(
                tenant_id,
                kind,
                config.name.clone(),
                Arc::clone(&self.sink),
                self.notifier.clone(),
            );
            let agent = Arc::new(
                Agent::builder(config, executor)
                    .listener(Arc::new(listener))
                    .build(),
            );

            scheduler.register(Arc::clone(&agent)).await?;
            named.set(kind, agent);
        }

        Ok(TenantAgentSet::new(tenant_id, scheduler, named))
    }

    /// Stop and forget the tenant's set; false if there was none
    #[instrument(skip(self))]
    pub async fn stop_for_user(&self, tenant_id: &str) -> bool {
        let removed = self.tenants.write().await.remove(tenant_id);
        match removed {
            Some(set) => {
                stop_set(&set).await;
                info!("Tenant agents stopped");
                true
            }
            None => false,
        }
    }

    /// Current set for a tenant, if active
    pub async fn tenant(&self, tenant_id: &str) -> Option<Arc<TenantAgentSet>> {
        self.tenants.read().await.get(tenant_id).cloned()
    }

    /// The tenant's set, building it first if needed
    async fn ensure_set(&self, tenant_id: &str) -> Result<Arc<TenantAgentSet>, ManagerError> {
        if let Some(set) = self.tenant(tenant_id).await {
            return Ok(set);
        }
        self.initialize_for_user(tenant_id).await?;
        // A concurrent stop can remove the set we just built
        self.tenant(tenant_id).await.ok_or_else(|| {
            ManagerError::Scheduler(SchedulerError::AgentNotFound(format!(
                "no agents for tenant {tenant_id}"
            )))
        })
    }

    /// Start one agent, building the tenant's set on first use
    #[instrument(skip(self))]
    pub async fn start_agent(&self, tenant_id: &str, kind: AgentKind) -> Result<(), ManagerError> {
        let set = self.ensure_set(tenant_id).await?;
        set.scheduler().start(&kind.agent_id(tenant_id)).await?;
        Ok(())
    }

    /// Stop one agent; a tenant with no set has nothing to stop
    #[instrument(skip(self))]
    pub async fn stop_agent(&self, tenant_id: &str, kind: AgentKind) -> Result<(), ManagerError> {
        let Some(set) = self.tenant(tenant_id).await else {
            debug!("No agent set, nothing to stop");
            return Ok(());
        };
        set.scheduler().stop(&kind.agent_id(tenant_id)).await?;
        Ok(())
    }

    /// Trigger one run in the background and return at once
    ///
    /// Fails up front if the agent does not exist. The outcome is only
    /// observable later through the log and the agent snapshot.
    #[instrument(skip(self, input))]
    pub async fn run_agent_once(
        &self,
        tenant_id: &str,
        kind: AgentKind,
        input: Option<Value>,
    ) -> Result<JoinHandle<Result<RunDisposition, SchedulerError>>, ManagerError> {
        let set = self.ensure_set(tenant_id).await?;
        let agent_id = kind.agent_id(tenant_id);
        if set.scheduler().get(&agent_id).await.is_none() {
            return Err(SchedulerError::AgentNotFound(agent_id).into());
        }

        Ok(tokio::spawn(async move {
            set.scheduler().run_once(&agent_id, input).await
        }))
    }

    /// Run once and wait for the result
    pub async fn run_agent(
        &self,
        tenant_id: &str,
        kind: AgentKind,
        input: Option<Value>,
    ) -> Result<RunDisposition, ManagerError> {
        let set = self.ensure_set(tenant_id).await?;
        Ok(set
            .scheduler()
            .run_once(&kind.agent_id(tenant_id), input)
            .await?)
    }

    /// Record whether the tenant's agents should be running after a restart
    pub async fn set_agents_active_state(
        &self,
        tenant_id: &str,
        active: bool,
    ) -> Result<(), ManagerError> {
        self.activation.set_active(tenant_id, active).await?;
        debug!(tenant_id, active, "Activation state saved");
        Ok(())
    }

    /// Mark active, then (re)build and start every agent
    pub async fn start_all_for_user(&self, tenant_id: &str) -> Result<(), ManagerError> {
        self.set_agents_active_state(tenant_id, true).await?;
        self.initialize_for_user(tenant_id).await
    }

    /// Mark inactive, then stop the tenant's set
    pub async fn stop_all_for_user(&self, tenant_id: &str) -> Result<(), ManagerError> {
        self.set_agents_active_state(tenant_id, false).await?;
        self.stop_for_user(tenant_id).await;
        Ok(())
    }

    /// Resume every tenant marked active, one at a time
    ///
    /// Per-tenant failures are logged and reported; they do not stop the
    /// batch. Only failing to read the activation store is an error.
    pub async fn auto_start_agents(&self) -> Result<AutoStartReport, ManagerError> {
        let tenant_ids = self.activation.active_tenant_ids().await?;
        info!(count = tenant_ids.len(), "Auto-starting active tenants");

        let mut report = AutoStartReport::default();
        for tenant_id in tenant_ids {
            match self.initialize_for_user(&tenant_id).await {
                Ok(()) => report.started.push(tenant_id),
                Err(e) => {
                    error!(tenant_id = %tenant_id, "Auto-start failed: {}", e);
                    report.failed.push((tenant_id, e.to_string()));
                }
            }
        }
        Ok(report)
    }

    /// Snapshots of the tenant's agents; empty when the tenant has no set
    pub async fn agents_for_user(&self, tenant_id: &str) -> Vec<AgentInfo> {
        match self.tenant(tenant_id).await {
            Some(set) => set.scheduler().agents().await,
            None => Vec::new(),
        }
    }

    pub async fn tenant_phase(&self, tenant_id: &str) -> TenantPhase {
        if self.tenants.read().await.contains_key(tenant_id) {
            TenantPhase::Active
        } else if self.building.lock().await.contains_key(tenant_id) {
            TenantPhase::Building
        } else {
            TenantPhase::Absent
        }
    }

    /// Tenants with a live set, sorted
    pub async fn active_tenants(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tenants.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Stop every tenant's set; activation state is left untouched
    pub async fn shutdown(&self) {
        let sets: Vec<Arc<TenantAgentSet>> =
            self.tenants.write().await.drain().map(|(_, set)| set).collect();
        for set in &sets {
            stop_set(set).await;
        }
        info!(tenants = sets.len(), "Agent manager shut down");
    }
}

impl std::fmt::Debug for AgentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentManager")
            .field("has_notifier", &self.notifier.is_some())
            .finish_non_exhaustive()
    }
}

async fn stop_set(set: &TenantAgentSet) {
    if let Err(e) = set.scheduler().stop_all().await {
        warn!(tenant_id = %set.tenant_id(), "Some agents failed to stop: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentOutput, AgentStatus, Schedule};
    use crate::config::{AgentSettings, StaticConfigProvider};
    use crate::executor::MockExecutorFactory;
    use crate::persistence::MemoryStore;
    use serde_json::json;

    struct Fixture {
        manager: AgentManager,
        config: Arc<StaticConfigProvider>,
        factory: Arc<MockExecutorFactory>,
        store: Arc<MemoryStore>,
    }

    fn all_kinds() -> UserConfig {
        AgentKind::BUILD_ORDER
            .into_iter()
            .fold(UserConfig::default(), |config, kind| {
                config.with_settings(kind, AgentSettings::enabled())
            })
            .with_gmail_credentials()
    }

    fn fixture_with(factory: MockExecutorFactory, store: MemoryStore) -> Fixture {
        let config = Arc::new(
            StaticConfigProvider::new(GlobalConfig::fully_provisioned())
                .with_tenant("t1", all_kinds())
                .with_tenant("t2", all_kinds()),
        );
        let factory = Arc::new(factory);
        let store = Arc::new(store);
        let manager = AgentManager::new(
            config.clone(),
            factory.clone(),
            store.clone(),
            store.clone(),
        );
        Fixture {
            manager,
            config,
            factory,
            store,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(
            MockExecutorFactory::new(AgentOutput::with_items(vec![json!({"id": "x"})])),
            MemoryStore::new(),
        )
    }

    #[tokio::test]
    async fn initialize_builds_every_enabled_kind() {
        let f = fixture();
        f.manager.initialize_for_user("t1").await.unwrap();

        let ids: Vec<String> = f
            .manager
            .agents_for_user("t1")
            .await
            .into_iter()
            .map(|info| info.config.id)
            .collect();
        assert_eq!(
            ids,
            vec![
                "email-agent-t1",
                "financial-agent-t1",
                "legal-agent-t1",
                "stablecoin-agent-t1",
                "task-agent-t1"
            ]
        );
        assert_eq!(f.manager.tenant_phase("t1").await, TenantPhase::Active);
        assert!(
            f.manager
                .agents_for_user("t1")
                .await
                .iter()
                .all(|info| info.status == AgentStatus::Running)
        );
    }

    #[tokio::test]
    async fn email_executor_receives_delegates() {
        let f = fixture();
        f.manager.initialize_for_user("t1").await.unwrap();

        let built = f.factory.built().await;
        let email = built.iter().find(|b| b.kind == AgentKind::Email).unwrap();
        assert_eq!(
            email.delegate_kinds,
            vec![AgentKind::Legal, AgentKind::Financial, AgentKind::Task]
        );
        let legal = built.iter().find(|b| b.kind == AgentKind::Legal).unwrap();
        assert!(legal.delegate_kinds.is_empty());
    }

    #[tokio::test]
    async fn executor_build_failure_skips_only_that_kind() {
        let f = fixture_with(
            MockExecutorFactory::new(AgentOutput::default()).failing_for(AgentKind::Stablecoin),
            MemoryStore::new(),
        );
        f.manager.initialize_for_user("t1").await.unwrap();

        let set = f.manager.tenant("t1").await.unwrap();
        assert!(set.agent(AgentKind::Stablecoin).is_none());
        assert_eq!(set.agents().kinds().len(), 4);
    }

    #[tokio::test]
    async fn configured_schedule_is_used() {
        let f = fixture();
        f.config
            .set_user_config(
                "t1",
                UserConfig::default()
                    .with_settings(AgentKind::Task, AgentSettings::enabled().every(15)),
            )
            .await;
        f.manager.initialize_for_user("t1").await.unwrap();

        let info = f.manager.agents_for_user("t1").await;
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].config.schedule, Schedule::Interval { minutes: 15 });
    }

    #[tokio::test]
    async fn stop_for_user_is_idempotent() {
        let f = fixture();
        f.manager.initialize_for_user("t1").await.unwrap();
        let set = f.manager.tenant("t1").await.unwrap();

        assert!(f.manager.stop_for_user("t1").await);
        assert!(!f.manager.stop_for_user("t1").await);
        assert_eq!(f.manager.tenant_phase("t1").await, TenantPhase::Absent);
        assert!(set.scheduler().armed().await.is_empty());
    }

    #[tokio::test]
    async fn start_agent_builds_cold_tenant() {
        let f = fixture();
        f.manager.start_agent("t2", AgentKind::Legal).await.unwrap();
        assert_eq!(f.manager.tenant_phase("t2").await, TenantPhase::Active);
    }

    #[tokio::test]
    async fn stop_agent_on_absent_tenant_is_ok() {
        let f = fixture();
        f.manager.stop_agent("t1", AgentKind::Email).await.unwrap();
        assert_eq!(f.manager.tenant_phase("t1").await, TenantPhase::Absent);
    }

    #[tokio::test]
    async fn disabled_kind_is_not_found() {
        let f = fixture();
        f.config
            .set_user_config(
                "t1",
                UserConfig::default().with_settings(AgentKind::Task, AgentSettings::enabled()),
            )
            .await;

        let err = f
            .manager
            .start_agent("t1", AgentKind::Email)
            .await
            .unwrap_err();
        assert!(err.is_client_error());

        let err = f
            .manager
            .run_agent_once("t1", AgentKind::Legal, None)
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn run_agent_once_runs_in_background() {
        let f = fixture();
        let handle = f
            .manager
            .run_agent_once("t1", AgentKind::Task, Some(json!({"note": "call bank"})))
            .await
            .unwrap();

        let disposition = handle.await.unwrap().unwrap();
        assert!(disposition.result().unwrap().is_success());

        let executor = f.factory.executor_for("t1", AgentKind::Task).await.unwrap();
        assert_eq!(executor.call_count(), 1);
        assert_eq!(f.store.logs_for("task-agent-t1").await.len(), 1);
    }

    #[tokio::test]
    async fn start_all_and_stop_all_write_activation() {
        let f = fixture();
        f.manager.start_all_for_user("t1").await.unwrap();
        assert!(f.store.is_active("t1").await);
        assert_eq!(f.manager.active_tenants().await, vec!["t1".to_string()]);

        f.manager.stop_all_for_user("t1").await.unwrap();
        assert!(!f.store.is_active("t1").await);
        assert!(f.manager.active_tenants().await.is_empty());
    }

    #[tokio::test]
    async fn auto_start_reports_each_tenant() {
        let f = fixture_with(
            MockExecutorFactory::new(AgentOutput::default()),
            MemoryStore::with_active(["t1", "t2"]),
        );
        let report = f.manager.auto_start_agents().await.unwrap();
        assert_eq!(report.started, vec!["t1".to_string(), "t2".to_string()]);
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn shutdown_stops_every_tenant() {
        let f = fixture();
        f.manager.initialize_for_user("t1").await.unwrap();
        f.manager.initialize_for_user("t2").await.unwrap();
        let t1 = f.manager.tenant("t1").await.unwrap();

        f.manager.shutdown().await;

        assert!(f.manager.active_tenants().await.is_empty());
        assert!(t1.scheduler().armed().await.is_empty());
        assert!(
            t1.scheduler()
                .agents()
                .await
                .iter()
                .all(|info| info.status == AgentStatus::Stopped)
        );
    }
}
