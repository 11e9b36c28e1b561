//! Executor that runs an external command
//!
//! The command receives one JSON request on stdin and must print one JSON
//! document on stdout. For `execute` the document is an [`AgentOutput`]; for
//! `analyze` it is returned as-is.
//!
//! Request shape:
//!
//! ```json
//! {"mode": "execute", "tenant_id": "t1", "agent": "email", "input": null, "settings": {}}
//! ```
//!
//! Items in an execute response may carry `"route": "legal" | "financial" |
//! "task"`. When the executor was built with a delegate of that kind, the item
//! is analyzed inline and the answer stored under `"analysis"`.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use super::traits::{Delegates, ExecutorContext, ExecutorFactory, TaskExecutor};
use crate::agent::{AgentKind, AgentOutput};
use crate::error::ExecutorError;

/// Longest stderr excerpt carried into an error message
const STDERR_EXCERPT: usize = 512;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum Mode {
    Execute,
    Analyze,
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    mode: Mode,
    tenant_id: &'a str,
    agent: AgentKind,
    input: &'a Value,
    settings: &'a Map<String, Value>,
}

/// Runs `program args...` once per call
pub struct CommandExecutor {
    program: String,
    args: Vec<String>,
    tenant_id: String,
    kind: AgentKind,
    settings: Map<String, Value>,
    delegates: Delegates,
}

impl CommandExecutor {
    /// Build from a command line; the first element is the program
    pub fn new(command_line: &[String], ctx: &ExecutorContext) -> Result<Self, ExecutorError> {
        let (program, args) = command_line
            .split_first()
            .ok_or_else(|| ExecutorError::Unsupported("empty command line".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            tenant_id: ctx.tenant_id.clone(),
            kind: ctx.kind,
            settings: ctx.settings.extra.clone(),
            delegates: ctx.delegates.clone(),
        })
    }

    /// Build the command for a request
    ///
    /// Extracted so command construction can be checked without spawning.
    pub fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env("DROVER_TENANT_ID", &self.tenant_id)
            .env("DROVER_AGENT", self.kind.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn invoke(&self, mode: Mode, input: &Value) -> Result<Value, ExecutorError> {
        let request = Request {
            mode,
            tenant_id: &self.tenant_id,
            agent: self.kind,
            input,
            settings: &self.settings,
        };
        let payload = serde_json::to_vec(&request)
            .map_err(|e| ExecutorError::Output(format!("failed to encode request: {e}")))?;

        let mut child = self.build_command().spawn().map_err(ExecutorError::Spawn)?;
        let stdin = child.stdin.take();
        let write_request = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            // stdin drops at the end of this block, so the command sees EOF
            match stdin.write_all(&payload).await {
                // The command exited without reading its input; its exit
                // status decides the outcome
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        };

        // Feed stdin while draining stdout and stderr so neither side can
        // block on a full pipe
        let (written, output) = tokio::join!(write_request, child.wait_with_output());
        let output = output.map_err(ExecutorError::Spawn)?;
        written.map_err(ExecutorError::Spawn)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
            return Err(ExecutorError::Failed(format!(
                "{} exited with {}: {}",
                self.program, output.status, excerpt
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ExecutorError::Output(format!("{} printed invalid JSON: {e}", self.program)))
    }

    /// Run routed items through their delegate
    async fn delegate_routed_items(&self, output: &mut AgentOutput) {
        if self.delegates.is_empty() {
            return;
        }
        for item in output.items.iter_mut() {
            let Some(route) = item
                .get("route")
                .and_then(Value::as_str)
                .and_then(AgentKind::parse)
            else {
                continue;
            };
            let Some(delegate) = self.delegates.get(route) else {
                debug!(%route, "No delegate wired for routed item");
                continue;
            };
            let Some(fields) = item.as_object_mut() else {
                continue;
            };
            match delegate.analyze(Value::Object(fields.clone())).await {
                Ok(analysis) => {
                    fields.insert("analysis".to_string(), analysis);
                }
                Err(e) => {
                    warn!(%route, "Delegate analysis failed: {}", e);
                    fields.insert("analysis_error".to_string(), Value::String(e.to_string()));
                }
            }
        }
    }
}

#[async_trait]
impl TaskExecutor for CommandExecutor {
    #[instrument(name = "executor::command", skip(self, input), fields(tenant_id = %self.tenant_id, agent = %self.kind))]
    async fn execute(&self, input: Option<Value>) -> Result<AgentOutput, ExecutorError> {
        let input = input.unwrap_or(Value::Null);
        let raw = self.invoke(Mode::Execute, &input).await?;
        let mut output: AgentOutput = serde_json::from_value(raw)
            .map_err(|e| ExecutorError::Output(format!("unexpected output shape: {e}")))?;
        self.delegate_routed_items(&mut output).await;
        Ok(output)
    }

    async fn analyze(&self, input: Value) -> Result<Value, ExecutorError> {
        self.invoke(Mode::Analyze, &input).await
    }
}

/// Builds [`CommandExecutor`]s from tenant settings and global defaults
///
/// A tenant's `command` wins over the global `[commands]` entry for the kind.
#[derive(Debug, Default, Clone)]
pub struct CommandExecutorFactory;

impl CommandExecutorFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExecutorFactory for CommandExecutorFactory {
    async fn build(&self, ctx: &ExecutorContext) -> Result<Arc<dyn TaskExecutor>, ExecutorError> {
        let command_line = ctx
            .settings
            .command
            .as_ref()
            .or_else(|| ctx.global.command_for(ctx.kind))
            .ok_or_else(|| {
                ExecutorError::Unsupported(format!("no command configured for {}", ctx.kind))
            })?;
        Ok(Arc::new(CommandExecutor::new(command_line, ctx)?))
    }
}
