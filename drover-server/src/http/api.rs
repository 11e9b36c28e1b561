//! REST API handlers for server-wide endpoints

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the server
    pub status: String,
    /// Server version
    pub version: String,
    /// Seconds since server started
    pub uptime_seconds: i64,
    /// Number of tenants with a live agent set
    pub active_tenants: usize,
}

/// Health check endpoint
///
/// Returns server status, version, uptime, and active tenant count.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let active_tenants = state.manager.active_tenants().await.len();

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        active_tenants,
    })
}
