//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use oasis_core::auth::AuthError;
use thiserror::Error;
use tracing::{debug, error};

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method {0} not allowed")]
    MethodNotAllowed(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::Forbidden => "INSUFFICIENT_PERMISSIONS",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            AppError::Auth(e) => e.code(),
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::AuthenticationRequired | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Auth(e) => {
                StatusCode::from_u16(e.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to send to the client. Server-side details stay in the log.
    fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => "Internal server error".into(),
            AppError::Auth(AuthError::Internal(_)) => "Internal server error".into(),
            AppError::Auth(AuthError::DatabaseUnavailable(_)) => {
                "User database is unavailable".into()
            }
            AppError::Auth(AuthError::TokenStoreUnavailable(_)) => {
                "Token store is unavailable".into()
            }
            AppError::Auth(AuthError::ResetDelivery(_)) => {
                "Failed to process password reset request".into()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "request failed");
        } else {
            debug!(code = self.code(), error = %self, "request rejected");
        }
        let body = Json(ErrorResponse::new(self.code(), self.public_message()));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_core_errors_with_their_status() {
        let err = AppError::from(AuthError::EmailAlreadyExists);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "EMAIL_ALREADY_EXISTS");

        let err = AppError::from(AuthError::DatabaseUnavailable("pool timed out".into()));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.public_message().contains("pool"));
    }

    #[test]
    fn api_codes() {
        assert_eq!(AppError::Forbidden.code(), "INSUFFICIENT_PERMISSIONS");
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        let err = AppError::MethodNotAllowed("GET".into());
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.code(), "METHOD_NOT_ALLOWED");
        assert_eq!(
            AppError::Internal("secret detail".into()).public_message(),
            "Internal server error"
        );
    }
}
