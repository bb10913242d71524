//! Authentication service: maps request bodies onto `oasis_core`'s
//! [`SessionService`](oasis_core::auth::session::SessionService) and its
//! results onto response bodies.

use oasis_core::auth::session::Registration;
use oasis_core::models::auth::{AuthSession, ProfileUpdate, User};

use crate::AppState;
use crate::error::AppResult;
use crate::models::{
    AuthData, ChangePasswordRequest, LoginRequest, PasswordResetRequest, RefreshRequest,
    RegisterRequest, ResetPasswordRequest, UpdateProfileRequest,
};

impl From<AuthSession> for AuthData {
    fn from(session: AuthSession) -> Self {
        Self {
            user: session.user,
            token: session.access_token,
            refresh_token: session.refresh_token,
            expires_in: session.expires_in,
        }
    }
}

pub async fn register(state: &AppState, body: RegisterRequest) -> AppResult<AuthData> {
    let session = state
        .sessions
        .register(Registration {
            email: body.email,
            password: body.password,
            name: body.name,
            avatar: body.avatar,
        })
        .await?;
    Ok(session.into())
}

pub async fn login(state: &AppState, body: LoginRequest) -> AppResult<AuthData> {
    let session = state.sessions.login(&body.email, &body.password).await?;
    Ok(session.into())
}

pub async fn refresh(state: &AppState, body: RefreshRequest) -> AppResult<AuthData> {
    let session = state.sessions.refresh(&body.refresh_token).await?;
    Ok(session.into())
}

pub async fn logout(state: &AppState, user_id: &str) -> AppResult<()> {
    state.sessions.logout(user_id).await?;
    Ok(())
}

pub async fn profile(state: &AppState, user_id: &str) -> AppResult<User> {
    Ok(state.sessions.profile(user_id).await?)
}

pub async fn update_profile(
    state: &AppState,
    user_id: &str,
    body: UpdateProfileRequest,
) -> AppResult<User> {
    let update = ProfileUpdate {
        name: body.name,
        avatar: body.avatar,
    };
    Ok(state.sessions.update_profile(user_id, update).await?)
}

pub async fn change_password(
    state: &AppState,
    user_id: &str,
    body: ChangePasswordRequest,
) -> AppResult<()> {
    state
        .sessions
        .change_password(user_id, &body.old_password, &body.new_password)
        .await?;
    Ok(())
}

pub async fn request_password_reset(state: &AppState, body: PasswordResetRequest) -> AppResult<()> {
    state.sessions.request_password_reset(&body.email).await?;
    Ok(())
}

pub async fn reset_password(state: &AppState, body: ResetPasswordRequest) -> AppResult<()> {
    state
        .sessions
        .reset_password(&body.token, &body.password)
        .await?;
    Ok(())
}
