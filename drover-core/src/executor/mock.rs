//! Mock executors for testing
//!
//! `MockExecutor` returns a fixed output after an optional delay and records
//! how it was driven: call count, the highest number of concurrent calls, and
//! which calls it was told to fail. `MockExecutorFactory` hands out one fresh
//! mock per build so tests can inspect exactly what a tenant's agent ran.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use super::traits::{ExecutorContext, ExecutorFactory, TaskExecutor};
use crate::agent::{AgentKind, AgentOutput};
use crate::error::ExecutorError;

/// Scriptable executor
#[derive(Debug, Default)]
pub struct MockExecutor {
    output: AgentOutput,
    delay: Duration,
    /// 1-based call numbers that fail
    fail_on: HashSet<u64>,
    always_fail: bool,
    panic: bool,
    calls: AtomicU64,
    analyses: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    inputs: Mutex<Vec<Option<Value>>>,
}

impl MockExecutor {
    pub fn new(output: AgentOutput) -> Self {
        Self {
            output,
            ..Self::default()
        }
    }

    /// Sleep this long inside every `execute`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the `n`th call (1-based)
    pub fn failing_on_call(mut self, n: u64) -> Self {
        self.fail_on.insert(n);
        self
    }

    pub fn always_failing(mut self) -> Self {
        self.always_fail = true;
        self
    }

    /// Panic inside `execute` instead of returning
    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }

    /// Number of `execute` calls started
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn analyze_count(&self) -> u64 {
        self.analyses.load(Ordering::SeqCst)
    }

    /// Inputs of every `execute` call, in call order
    pub async fn inputs(&self) -> Vec<Option<Value>> {
        self.inputs.lock().await.clone()
    }

    /// Highest number of `execute` calls ever in flight at once
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskExecutor for MockExecutor {
    async fn execute(&self, input: Option<Value>) -> Result<AgentOutput, ExecutorError> {
        self.inputs.lock().await.push(input);
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panic {
            panic!("mock executor panicked on call {call}");
        }
        if self.always_fail || self.fail_on.contains(&call) {
            return Err(ExecutorError::Failed(format!("mock failure on call {call}")));
        }
        Ok(self.output.clone())
    }

    async fn analyze(&self, input: Value) -> Result<Value, ExecutorError> {
        self.analyses.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "analyzed": input }))
    }
}

/// Record of one executor the factory built
#[derive(Debug, Clone)]
pub struct BuiltExecutor {
    pub tenant_id: String,
    pub kind: AgentKind,
    pub delegate_kinds: Vec<AgentKind>,
    pub executor: Arc<MockExecutor>,
}

type Template = dyn Fn(AgentKind) -> MockExecutor + Send + Sync;

/// Factory that builds a fresh [`MockExecutor`] per request
pub struct MockExecutorFactory {
    template: Box<Template>,
    failing_kinds: HashSet<AgentKind>,
    built: Mutex<Vec<BuiltExecutor>>,
}

impl MockExecutorFactory {
    /// Every kind gets an executor returning `output` instantly
    pub fn new(output: AgentOutput) -> Self {
        Self::from_template(move |_| MockExecutor::new(output.clone()))
    }

    pub fn from_template(
        template: impl Fn(AgentKind) -> MockExecutor + Send + Sync + 'static,
    ) -> Self {
        Self {
            template: Box::new(template),
            failing_kinds: HashSet::new(),
            built: Mutex::new(Vec::new()),
        }
    }

    /// Make `build` fail for `kind`
    pub fn failing_for(mut self, kind: AgentKind) -> Self {
        self.failing_kinds.insert(kind);
        self
    }

    pub async fn built(&self) -> Vec<BuiltExecutor> {
        self.built.lock().await.clone()
    }

    /// Most recently built executor for a tenant's kind
    pub async fn executor_for(&self, tenant_id: &str, kind: AgentKind) -> Option<Arc<MockExecutor>> {
        self.built
            .lock()
            .await
            .iter()
            .rev()
            .find(|b| b.tenant_id == tenant_id && b.kind == kind)
            .map(|b| Arc::clone(&b.executor))
    }
}

#[async_trait]
impl ExecutorFactory for MockExecutorFactory {
    async fn build(&self, ctx: &ExecutorContext) -> Result<Arc<dyn TaskExecutor>, ExecutorError> {
        if self.failing_kinds.contains(&ctx.kind) {
            return Err(ExecutorError::Failed(format!(
                "mock factory refuses {}",
                ctx.kind
            )));
        }
        let executor = Arc::new((self.template)(ctx.kind));
        self.built.lock().await.push(BuiltExecutor {
            tenant_id: ctx.tenant_id.clone(),
            kind: ctx.kind,
            delegate_kinds: ctx.delegates.kinds(),
            executor: Arc::clone(&executor),
        });
        Ok(executor)
    }
}
