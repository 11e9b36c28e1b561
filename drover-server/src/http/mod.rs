//! HTTP server module

mod api;
mod tenants;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub use api::HealthResponse;
pub use tenants::{ActionResponse, AgentListResponse, LogListResponse, RunAcceptedResponse};

/// Create the HTTP router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/tenants/:tenant/agents", get(tenants::list_agents))
        .route("/api/tenants/:tenant/logs", get(tenants::list_logs))
        .route("/api/tenants/:tenant/start-all", post(tenants::start_all))
        .route("/api/tenants/:tenant/stop-all", post(tenants::stop_all))
        .route(
            "/api/tenants/:tenant/agents/:kind/start",
            post(tenants::start_agent),
        )
        .route(
            "/api/tenants/:tenant/agents/:kind/stop",
            post(tenants::stop_agent),
        )
        .route(
            "/api/tenants/:tenant/agents/:kind/run",
            post(tenants::run_agent),
        )
        .with_state(state)
}
