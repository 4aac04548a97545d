use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use backend::BackendError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use ticketcheck::ConfigLoadError;
use validation::{ClaimError, ValidationError};

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("{0}")]
    Claim(#[from] ClaimError),

    #[error("Unprocessable request: {0}")]
    Unprocessable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Claim(_) | ServerError::Unprocessable(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            ServerError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ServerError::Internal(_) | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::Claim(_) => "INVALID_CLAIM",
            ServerError::Unprocessable(_) => "UNPROCESSABLE_REQUEST",
            ServerError::NotFound(_) => "NOT_FOUND",
            ServerError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            ServerError::UpstreamTimeout(_) => "UPSTREAM_TIMEOUT",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code().to_string();
        let message = self.to_string();

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<ValidationError> for ServerError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Claim(claim) => ServerError::Claim(claim),
            ValidationError::UpstreamUnavailable { .. } => {
                ServerError::UpstreamUnavailable(err.to_string())
            }
            ValidationError::UpstreamTimeout { .. } => ServerError::UpstreamTimeout(err.to_string()),
            ValidationError::InternalInconsistency { .. } | ValidationError::Snapshot(_) => {
                ServerError::Internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::Unprocessable(rejection.body_text())
    }
}

impl From<ConfigLoadError> for ServerError {
    fn from(err: ConfigLoadError) -> Self {
        ServerError::Config(err.to_string())
    }
}

impl From<BackendError> for ServerError {
    fn from(err: BackendError) -> Self {
        ServerError::Config(format!("Backend setup failed: {err}"))
    }
}

impl From<std::net::AddrParseError> for ServerError {
    fn from(err: std::net::AddrParseError) -> Self {
        ServerError::Config(format!("Invalid address: {err}"))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}
