//! Per-tenant agent control handlers

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use drover_core::{AgentInfo, AgentKind, AgentLogRow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AppState, ServerError};

const DEFAULT_LOG_LIMIT: usize = 50;
const MAX_LOG_LIMIT: usize = 500;

/// Response for GET /api/tenants/:tenant/agents
#[derive(Debug, Serialize, Deserialize)]
pub struct AgentListResponse {
    pub tenant_id: String,
    pub agents: Vec<AgentInfo>,
}

/// Response for the start/stop endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    pub tenant_id: String,
    /// Agent the action applied to, absent for tenant-wide actions
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub agent_id: Option<String>,
    pub action: String,
}

/// Response for POST /api/tenants/:tenant/agents/:kind/run
#[derive(Debug, Serialize, Deserialize)]
pub struct RunAcceptedResponse {
    pub tenant_id: String,
    pub agent_id: String,
    pub accepted: bool,
}

/// Query string for the log endpoint
#[derive(Debug, Deserialize)]
pub struct LogParams {
    pub limit: Option<usize>,
}

/// Response for GET /api/tenants/:tenant/logs
#[derive(Debug, Serialize, Deserialize)]
pub struct LogListResponse {
    pub tenant_id: String,
    pub logs: Vec<AgentLogRow>,
}

fn parse_kind(kind: &str) -> Result<AgentKind, ServerError> {
    AgentKind::parse(kind).ok_or_else(|| ServerError::UnknownKind(kind.to_string()))
}

/// An empty body means "no input"
fn parse_input(body: &[u8]) -> Result<Option<Value>, ServerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| ServerError::BadRequest(format!("body is not valid JSON: {e}")))
}

/// GET /api/tenants/:tenant/agents - Snapshot of the tenant's agents
pub async fn list_agents(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
) -> Json<AgentListResponse> {
    let agents = state.manager.agents_for_user(&tenant_id).await;
    Json(AgentListResponse { tenant_id, agents })
}

/// POST /api/tenants/:tenant/start-all - Mark active and (re)build every agent
pub async fn start_all(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<ActionResponse>, ServerError> {
    state.manager.start_all_for_user(&tenant_id).await?;
    Ok(Json(ActionResponse {
        tenant_id,
        agent_id: None,
        action: "start_all".to_string(),
    }))
}

/// POST /api/tenants/:tenant/stop-all - Mark inactive and stop every agent
pub async fn stop_all(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<ActionResponse>, ServerError> {
    state.manager.stop_all_for_user(&tenant_id).await?;
    Ok(Json(ActionResponse {
        tenant_id,
        agent_id: None,
        action: "stop_all".to_string(),
    }))
}

/// POST /api/tenants/:tenant/agents/:kind/start
pub async fn start_agent(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, kind)): Path<(String, String)>,
) -> Result<Json<ActionResponse>, ServerError> {
    let kind = parse_kind(&kind)?;
    state.manager.start_agent(&tenant_id, kind).await?;
    Ok(Json(ActionResponse {
        agent_id: Some(kind.agent_id(&tenant_id)),
        tenant_id,
        action: "start".to_string(),
    }))
}

/// POST /api/tenants/:tenant/agents/:kind/stop
pub async fn stop_agent(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, kind)): Path<(String, String)>,
) -> Result<Json<ActionResponse>, ServerError> {
    let kind = parse_kind(&kind)?;
    state.manager.stop_agent(&tenant_id, kind).await?;
    Ok(Json(ActionResponse {
        agent_id: Some(kind.agent_id(&tenant_id)),
        tenant_id,
        action: "stop".to_string(),
    }))
}

/// POST /api/tenants/:tenant/agents/:kind/run - Trigger a run in the background
///
/// Responds 202 as soon as the run is scheduled. The outcome shows up in the
/// agent snapshot and the run log.
pub async fn run_agent(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, kind)): Path<(String, String)>,
    body: Bytes,
) -> Result<impl IntoResponse, ServerError> {
    let kind = parse_kind(&kind)?;
    let input = parse_input(&body)?;
    // Detached; the run reports through its listener
    let _handle = state
        .manager
        .run_agent_once(&tenant_id, kind, input)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(RunAcceptedResponse {
            agent_id: kind.agent_id(&tenant_id),
            tenant_id,
            accepted: true,
        }),
    ))
}

/// GET /api/tenants/:tenant/logs - Most recent run log rows, newest first
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
    Query(params): Query<LogParams>,
) -> Result<Json<LogListResponse>, ServerError> {
    let logs = state
        .logs
        .as_ref()
        .ok_or(ServerError::NotConfigured("run log queries"))?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LOG_LIMIT)
        .min(MAX_LOG_LIMIT);

    let logs = logs
        .recent_logs(&tenant_id, limit)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(Json(LogListResponse { tenant_id, logs }))
}
