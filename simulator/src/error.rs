use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lotto_types::{api::ErrorResponse, ConfigError, RunProgress};
use std::sync::Arc;
use thiserror::Error as ThisError;

#[derive(Debug, Clone, ThisError)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Validation(#[from] ConfigError),
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error("simulation {run_id} is already running")]
    Conflict { run_id: u64 },
    #[error("report not ready (run status: {phase})")]
    NotReady { phase: &'static str },
    #[error("no simulation is running")]
    NotRunning,
    #[error("simulation {run_id} was cancelled")]
    Cancelled { run_id: u64 },
    #[error("simulation failed at round {round}: {message}")]
    Internal {
        round: u64,
        message: String,
        /// Last snapshot published before the failure.
        progress: Option<Arc<RunProgress>>,
    },
}

impl SimulationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } | Self::NotReady { .. } | Self::Cancelled { .. } => {
                StatusCode::CONFLICT
            }
            Self::NotRunning => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SimulationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = ErrorResponse::new(self.to_string());
        if let Self::Internal {
            progress: Some(progress),
            ..
        } = self
        {
            body = body.with_progress(progress.as_ref().clone());
        }
        (status, Json(body)).into_response()
    }
}
