use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::response;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A transport failure talking to the upstream.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The upstream answered with a non-success status.
    #[error("Upstream returned {status}: {message}")]
    Upstream {
        status: StatusCode,
        message: String,
    },

    /// No session, or the session does not map to a stored token.
    #[error("Unauthorized")]
    Unauthenticated,

    /// Missing or invalid input parameters.
    #[error("{0}")]
    BadRequest(String),

    /// Required settings are missing.
    #[error("{0}")]
    Configuration(String),

    /// An internal server error.
    #[error("{0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// The status code this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Redis(_) | AppError::Transport(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Upstream { status, .. } => {
                if status.is_client_error() || status.is_server_error() {
                    *status
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) | AppError::Configuration(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Redis(ref e) => {
                tracing::error!("Redis error: {}", e);
                "Token store error".to_string()
            }

            AppError::Transport(ref e) => {
                tracing::error!("Upstream transport error: {}", e);
                e.to_string()
            }

            AppError::Upstream { status, ref message } => {
                tracing::error!("Upstream returned {}: {}", status, message);
                message.clone()
            }

            AppError::Unauthenticated => {
                tracing::warn!("Request without a valid session");
                "Unauthorized".to_string()
            }

            AppError::BadRequest(ref msg) => {
                tracing::debug!("Bad request: {}", msg);
                msg.clone()
            }

            AppError::Configuration(ref msg) => {
                tracing::error!("Configuration error: {}", msg);
                msg.clone()
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                msg.clone()
            }
        };

        response::message(status, &message)
    }
}
