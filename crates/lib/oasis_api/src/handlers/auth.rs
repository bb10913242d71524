//! Authentication request handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use oasis_core::models::auth::User;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::ValidatedJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    ApiResponse, AuthData, ChangePasswordRequest, LoginRequest, PasswordResetRequest,
    RefreshRequest, RegisterRequest, ResetPasswordRequest, SessionData, SessionUser,
    UpdateProfileRequest, VerifyTokenData,
};
use crate::services::auth;

/// Sent whether or not the email belongs to an account.
pub const RESET_REQUESTED_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent";

/// `POST /auth/register`: create an account and open a session.
pub async fn register_handler(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthData>>)> {
    let data = auth::register(&state, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data_with_message(data, "Registration successful")),
    ))
}

/// `POST /auth/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthData>>> {
    let data = auth::login(&state, body).await?;
    Ok(Json(ApiResponse::data_with_message(data, "Login successful")))
}

/// `POST /auth/refresh-token`: exchange a refresh token for a new pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RefreshRequest>,
) -> AppResult<Json<ApiResponse<AuthData>>> {
    let data = auth::refresh(&state, body).await?;
    Ok(Json(ApiResponse::data(data)))
}

/// `POST /auth/logout`: revoke the caller's refresh token.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<ApiResponse<()>>> {
    auth::logout(&state, &user.id).await?;
    Ok(Json(ApiResponse::message("Logged out successfully")))
}

/// `GET /auth/profile`
pub async fn get_profile_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<ApiResponse<User>>> {
    let profile = auth::profile(&state, &user.id).await?;
    Ok(Json(ApiResponse::data(profile)))
}

/// `PUT /auth/profile`: update name and/or avatar.
pub async fn update_profile_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(body): ValidatedJson<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let profile = auth::update_profile(&state, &user.id, body).await?;
    Ok(Json(ApiResponse::data_with_message(
        profile,
        "Profile updated successfully",
    )))
}

/// `POST /auth/change-password`: also signs the user out of other sessions.
pub async fn change_password_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(body): ValidatedJson<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    auth::change_password(&state, &user.id, body).await?;
    Ok(Json(ApiResponse::message("Password changed successfully")))
}

/// `POST /auth/request-password-reset`
pub async fn request_password_reset_handler(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<PasswordResetRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    auth::request_password_reset(&state, body).await?;
    Ok(Json(ApiResponse::message(RESET_REQUESTED_MESSAGE)))
}

/// `POST /auth/reset-password`
pub async fn reset_password_handler(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    auth::reset_password(&state, body).await?;
    Ok(Json(ApiResponse::message("Password reset successfully")))
}

/// `GET /auth/verify-token`
pub async fn verify_token_handler(
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<ApiResponse<VerifyTokenData>> {
    Json(ApiResponse::data(VerifyTokenData {
        valid: true,
        user: SessionUser::from(&user),
    }))
}

/// `GET /auth/session`
pub async fn session_handler(
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<ApiResponse<SessionData>> {
    Json(ApiResponse::data(SessionData {
        user: SessionUser::from(&user),
        is_authenticated: true,
        session_expiry: user.expires_at,
    }))
}
