//! Authentication middleware: Bearer token extraction, identity resolution
//! and role gates.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use oasis_core::models::auth::Identity;
use tracing::{debug, warn};

use crate::AppState;
use crate::error::{AppError, AppResult};

/// Roles allowed through [`require_admin`].
pub const ADMIN_ROLES: &[&str] = &["admin", "super_admin"];

/// Any signed-in role.
pub const USER_OR_ADMIN_ROLES: &[&str] = &["user", "admin", "super_admin"];

/// Caller identity stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    /// When the presented access token expires.
    pub expires_at: DateTime<Utc>,
}

impl From<Identity> for AuthenticatedUser {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.user_id,
            email: identity.email,
            name: identity.name,
            role: identity.role,
            expires_at: identity.expires_at,
        }
    }
}

/// `Authorization: Bearer <token>` → token, if present and non-empty.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let token = headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Axum middleware: extracts the bearer token, resolves it to a live
/// identity, and injects [`AuthenticatedUser`] into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or(AppError::AuthenticationRequired)?;

    let identity = state.sessions.authenticate(&token).await.map_err(|e| {
        if e.is_infrastructure() {
            AppError::Auth(e)
        } else {
            debug!(code = e.code(), "bearer token rejected");
            AppError::InvalidToken
        }
    })?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(identity));
    Ok(next.run(request).await)
}

/// Like [`require_auth`] but never rejects; the identity is attached only
/// when the token checks out.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(request.headers()) {
        match state.sessions.authenticate(&token).await {
            Ok(identity) => {
                request
                    .extensions_mut()
                    .insert(AuthenticatedUser::from(identity));
            }
            Err(e) if e.is_infrastructure() => {
                warn!(error = %e, "optional auth skipped");
            }
            Err(e) => debug!(code = e.code(), "optional bearer token ignored"),
        }
    }
    next.run(request).await
}

/// Fail with `INSUFFICIENT_PERMISSIONS` unless the user's role is in `allowed`.
pub fn ensure_role(user: &AuthenticatedUser, allowed: &[&str]) -> AppResult<()> {
    if allowed.contains(&user.role.as_str()) {
        Ok(())
    } else {
        debug!(user_id = %user.id, role = %user.role, "role not permitted");
        Err(AppError::Forbidden)
    }
}

/// Axum middleware for admin-only routes. Must run after [`require_auth`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or(AppError::AuthenticationRequired)?;
    ensure_role(user, ADMIN_ROLES)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn user(role: &str) -> AuthenticatedUser {
        AuthenticatedUser {
            id: "u1".into(),
            email: "a@example.com".into(),
            name: "Alice".into(),
            role: role.into(),
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn role_gate() {
        assert!(ensure_role(&user("admin"), ADMIN_ROLES).is_ok());
        assert!(ensure_role(&user("super_admin"), ADMIN_ROLES).is_ok());
        assert!(matches!(
            ensure_role(&user("user"), ADMIN_ROLES),
            Err(AppError::Forbidden)
        ));
        assert!(ensure_role(&user("user"), USER_OR_ADMIN_ROLES).is_ok());
        assert!(ensure_role(&user("guest"), USER_OR_ADMIN_ROLES).is_err());
    }
}
