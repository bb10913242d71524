//! Request and response bodies.
//!
//! Field names are camelCase on the wire. Request types implement
//! [`Validate`] so handlers receive them already checked.

use chrono::{DateTime, Utc};
use oasis_core::auth::validation::{
    require_non_empty, validate_avatar_url, validate_email, validate_name, validate_password,
};
use oasis_core::models::auth::User;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;

/// Input checks run after a body deserializes.
pub trait Validate {
    fn validate(&self) -> AppResult<()>;
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// `{ success: true, data?, message? }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn data_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// `{ success: false, error: { code, message } }`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorBody {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub avatar: Option<String>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> AppResult<()> {
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        validate_name(&self.name)?;
        if let Some(avatar) = &self.avatar {
            validate_avatar_url(avatar)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> AppResult<()> {
        validate_email(&self.email)?;
        require_non_empty("password", &self.password)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl Validate for RefreshRequest {
    fn validate(&self) -> AppResult<()> {
        require_non_empty("refreshToken", &self.refresh_token)?;
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub avatar: Option<String>,
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> AppResult<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(avatar) = &self.avatar {
            validate_avatar_url(avatar)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

impl Validate for ChangePasswordRequest {
    fn validate(&self) -> AppResult<()> {
        require_non_empty("oldPassword", &self.old_password)?;
        validate_password(&self.new_password)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequest {
    pub email: String,
}

impl Validate for PasswordResetRequest {
    fn validate(&self) -> AppResult<()> {
        validate_email(&self.email)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    #[serde(alias = "newPassword")]
    pub password: String,
}

impl Validate for ResetPasswordRequest {
    fn validate(&self) -> AppResult<()> {
        require_non_empty("token", &self.token)?;
        validate_password(&self.password)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Session payload returned by register, login and refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    pub user: User,
    pub token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Identity as seen by the bearer middleware.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

impl From<&AuthenticatedUser> for SessionUser {
    fn from(user: &AuthenticatedUser) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTokenData {
    pub valid: bool,
    pub user: SessionUser,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub user: SessionUser,
    pub is_authenticated: bool,
    pub session_expiry: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub user_backend: &'static str,
    pub token_store: &'static str,
    pub version: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_omits_absent_fields() {
        let body = serde_json::to_value(ApiResponse::message("Logged out")).unwrap();
        assert_eq!(body, json!({ "success": true, "message": "Logged out" }));

        let body = serde_json::to_value(ErrorResponse::new("NOT_FOUND", "gone")).unwrap();
        assert_eq!(
            body,
            json!({ "success": false, "error": { "code": "NOT_FOUND", "message": "gone" } })
        );
    }

    #[test]
    fn register_validation() {
        let ok = RegisterRequest {
            email: "alice@example.com".into(),
            password: "Passw0rd1".into(),
            name: "Alice".into(),
            avatar: None,
        };
        assert!(ok.validate().is_ok());

        let bad_avatar = RegisterRequest {
            avatar: Some("not-a-url".into()),
            ..ok
        };
        assert_eq!(bad_avatar.validate().unwrap_err().code(), "VALIDATION_ERROR");
    }

    #[test]
    fn reset_password_accepts_new_password_alias() {
        let req: ResetPasswordRequest =
            serde_json::from_value(json!({ "token": "t", "newPassword": "Passw0rd1" })).unwrap();
        assert_eq!(req.password, "Passw0rd1");
    }

    #[test]
    fn login_requires_password() {
        let req = LoginRequest {
            email: "alice@example.com".into(),
            password: "   ".into(),
        };
        assert!(req.validate().is_err());
    }
}
