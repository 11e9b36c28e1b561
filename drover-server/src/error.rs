//! Server error types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use drover_core::{ManagerError, SchedulerError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in the drover server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Path segment is not a known agent kind
    #[error("Unknown agent kind: {0}")]
    UnknownKind(String),

    /// Request body could not be used
    #[error("invalid request: {0}")]
    BadRequest(String),

    /// Optional component not wired into this server
    #[error("{0} not configured")]
    NotConfigured(&'static str),

    /// Failure reported by the agent manager
    #[error(transparent)]
    Manager(#[from] ManagerError),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnknownKind(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Manager(ManagerError::UnknownAgentKind(_)) => StatusCode::BAD_REQUEST,
            Self::Manager(ManagerError::Scheduler(SchedulerError::AgentNotFound(_))) => {
                StatusCode::NOT_FOUND
            }
            Self::Manager(_) | Self::Bind { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
