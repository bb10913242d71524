//! Authentication and session lifecycle.
//!
//! Password hashing, signed tokens, the single-slot token store, the
//! dual-backend user repository and the session service that composes them.
//! Shared by `oasis_api` and anything else that needs a verified identity.

pub mod clock;
pub mod jwt;
pub mod password;
pub mod repository;
pub mod reset;
pub mod session;
pub mod token_store;
pub mod validation;

use thiserror::Error;

use self::repository::RepositoryError;
use self::token_store::TokenStoreError;

/// Authentication errors.
///
/// Each variant maps to a stable wire code and HTTP status; see [`AuthError::code`]
/// and [`AuthError::status`].
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Email is already registered")]
    EmailAlreadyExists,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Invalid access token")]
    InvalidAccessToken,

    #[error("Access token has expired")]
    TokenExpired,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Reset token is invalid or has expired")]
    InvalidResetToken,

    #[error("Current password is incorrect")]
    InvalidOldPassword,

    #[error("User not found")]
    UserNotFound,

    #[error("Failed to deliver password reset: {0}")]
    ResetDelivery(String),

    #[error("Database unavailable: {0}")]
    DatabaseUnavailable(String),

    #[error("Token store unavailable: {0}")]
    TokenStoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::EmailAlreadyExists => "EMAIL_ALREADY_EXISTS",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::AccountDisabled => "ACCOUNT_DISABLED",
            AuthError::InvalidAccessToken => "INVALID_ACCESS_TOKEN",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            AuthError::InvalidResetToken => "INVALID_RESET_TOKEN",
            AuthError::InvalidOldPassword => "INVALID_OLD_PASSWORD",
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::ResetDelivery(_) => "PASSWORD_RESET_REQUEST_ERROR",
            AuthError::DatabaseUnavailable(_) => "DATABASE_UNAVAILABLE",
            AuthError::TokenStoreUnavailable(_) => "TOKEN_STORE_UNAVAILABLE",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status the error surfaces with.
    pub fn status(&self) -> u16 {
        match self {
            AuthError::Validation(_)
            | AuthError::EmailAlreadyExists
            | AuthError::InvalidOldPassword
            | AuthError::InvalidResetToken => 400,
            AuthError::InvalidCredentials
            | AuthError::AccountDisabled
            | AuthError::InvalidAccessToken
            | AuthError::TokenExpired
            | AuthError::InvalidRefreshToken => 401,
            AuthError::UserNotFound => 404,
            AuthError::ResetDelivery(_) | AuthError::Internal(_) => 500,
            AuthError::DatabaseUnavailable(_) | AuthError::TokenStoreUnavailable(_) => 503,
        }
    }

    /// True for failures of infrastructure rather than of the caller's input.
    pub fn is_infrastructure(&self) -> bool {
        self.status() >= 500
    }
}

impl From<RepositoryError> for AuthError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::DuplicateEmail => AuthError::EmailAlreadyExists,
            RepositoryError::Unavailable(msg) => AuthError::DatabaseUnavailable(msg),
            RepositoryError::Decode(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<TokenStoreError> for AuthError {
    fn from(e: TokenStoreError) -> Self {
        match e {
            TokenStoreError::Unavailable(msg) => AuthError::TokenStoreUnavailable(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_statuses() {
        assert_eq!(AuthError::InvalidCredentials.code(), "INVALID_CREDENTIALS");
        assert_eq!(AuthError::InvalidCredentials.status(), 401);
        assert_eq!(AuthError::EmailAlreadyExists.status(), 400);
        assert_eq!(AuthError::UserNotFound.status(), 404);
        assert_eq!(
            AuthError::DatabaseUnavailable("down".into()).status(),
            503
        );
        assert!(AuthError::TokenStoreUnavailable("down".into()).is_infrastructure());
        assert!(!AuthError::InvalidResetToken.is_infrastructure());
    }

    #[test]
    fn repository_errors_convert() {
        assert!(matches!(
            AuthError::from(RepositoryError::DuplicateEmail),
            AuthError::EmailAlreadyExists
        ));
        assert_eq!(
            AuthError::from(RepositoryError::Unavailable("x".into())).code(),
            "DATABASE_UNAVAILABLE"
        );
    }
}
