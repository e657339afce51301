use ai_llm_service::AiLlmError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;
use triage::TriageError;
use triage_store::StoreError;

use crate::core::http::response_envelope::{ApiErrorDetail, ApiResponse};

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("invalid {var}: {reason}")]
    InvalidEnv { var: &'static str, reason: String },

    #[error(transparent)]
    Llm(#[from] AiLlmError),

    // --- IO / server ---
    #[error("failed to bind listener on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request ---
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("missing or blank X-User-Id header")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Triage(#[from] TriageError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("database task did not finish")]
    StoreTask(#[source] tokio::task::JoinError),

    /// Rich HTTP error with an explicit status & code.
    #[error("{message}")]
    Http {
        status: StatusCode,
        code: &'static str,
        message: String,
    },
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Triage(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::Invalid { .. }) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::DuplicateRun { .. }) => StatusCode::CONFLICT,
            AppError::Http { status, .. } => *status,

            // startup-only or internal
            AppError::InvalidEnv { .. }
            | AppError::Llm(_)
            | AppError::Bind { .. }
            | AppError::Server(_)
            | AppError::Store(_)
            | AppError::StoreTask(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidEnv { .. } => "CONFIG_ERROR",
            AppError::Llm(_) => "LLM_CONFIG_ERROR",
            AppError::Bind { .. } => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest(_) | AppError::Triage(_) => "BAD_REQUEST",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Store(StoreError::NotFound { .. }) => "NOT_FOUND",
            AppError::Store(StoreError::Invalid { .. }) => "BAD_REQUEST",
            AppError::Store(StoreError::DuplicateRun { .. }) => "DUPLICATE_RUN",
            AppError::Store(_) | AppError::StoreTask(_) => "DB_ERROR",
            AppError::Http { code, .. } => code,
        }
    }

    fn details(&self) -> Vec<ApiErrorDetail> {
        let field = match self {
            AppError::Triage(TriageError::EmptyDump) => Some(("input_text", "Enter some text before processing.")),
            AppError::Triage(TriageError::InvalidEnergy(_)) => {
                Some(("energy_level", "Use one of: low, medium, high."))
            }
            AppError::Unauthorized => Some(("X-User-Id", "Send the caller id in the X-User-Id header.")),
            _ => None,
        };
        field
            .map(|(path, hint)| ApiErrorDetail::field(path, hint))
            .into_iter()
            .collect()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, code = self.error_code(), "request failed");
        }
        ApiResponse::<()>::error(self.error_code(), self.to_string(), self.details())
            .into_response_with_status(status)
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

impl From<axum::extract::rejection::QueryRejection> for AppError {
    fn from(err: axum::extract::rejection::QueryRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

impl From<axum::extract::rejection::PathRejection> for AppError {
    fn from(err: axum::extract::rejection::PathRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}
