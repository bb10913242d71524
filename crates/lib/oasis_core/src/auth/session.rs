//! Session service: register, login, refresh, logout, password change and
//! reset, profile, and access-token authentication.
//!
//! Composes the user repository, token store, token issuer and password
//! hasher. Every refresh token and reset token lives in a single slot per user
//! in the token store; replacing or deleting that slot is how tokens are
//! revoked. Access tokens are not revocable and stay valid until they expire.

use std::sync::Arc;

use tracing::{debug, info};

use super::AuthError;
use super::jwt::{TokenIssuer, timestamp_to_datetime};
use super::password::PasswordHasher;
use super::repository::{UserBackend, UserRepository, default_avatar_url};
use super::reset::{ResetDelivery, ResetNotice};
use super::token_store::{TokenStore, refresh_key, reset_key};
use super::validation;
use crate::models::auth::{
    AuthSession, DEFAULT_ROLE, Identity, NewUser, ProfileUpdate, User,
};

/// Registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub avatar: Option<String>,
}

/// Orchestrates the authentication protocols.
pub struct SessionService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenStore>,
    issuer: TokenIssuer,
    hasher: PasswordHasher,
    delivery: Arc<dyn ResetDelivery>,
}

impl SessionService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenStore>,
        issuer: TokenIssuer,
        hasher: PasswordHasher,
        delivery: Arc<dyn ResetDelivery>,
    ) -> Self {
        Self {
            users,
            tokens,
            issuer,
            hasher,
            delivery,
        }
    }

    /// Which user backend was selected at startup.
    pub fn user_backend(&self) -> UserBackend {
        self.users.backend()
    }

    /// Name of the token store in use.
    pub fn token_store_name(&self) -> &'static str {
        self.tokens.name()
    }

    /// Access token lifetime in seconds.
    pub fn access_ttl_secs(&self) -> i64 {
        self.issuer.access_ttl().num_seconds()
    }

    /// Create an account and open its first session.
    pub async fn register(&self, registration: Registration) -> Result<AuthSession, AuthError> {
        validation::validate_password(&registration.password)?;
        let email = validation::normalize_email(&registration.email);

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailAlreadyExists);
        }

        let password_hash = self.hasher.hash(&registration.password).await?;
        let name = registration.name.trim().to_string();
        let avatar = registration
            .avatar
            .unwrap_or_else(|| default_avatar_url(&name));

        // A concurrent registration of the same email surfaces here as
        // EmailAlreadyExists via the unique constraint.
        let user = self
            .users
            .create(NewUser {
                email,
                password_hash,
                name,
                avatar: Some(avatar),
                role: DEFAULT_ROLE.to_string(),
            })
            .await?;

        info!(user_id = %user.id, "user registered");
        self.start_session(user).await
    }

    /// Authenticate with email + password.
    ///
    /// Unknown email and wrong password fail identically, after comparable
    /// bcrypt work.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = validation::normalize_email(email);

        let Some(record) = self.users.find_by_email(&email).await? else {
            self.hasher.verify_dummy(password).await?;
            return Err(AuthError::InvalidCredentials);
        };

        if !record.user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        if !self.hasher.verify(password, &record.password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let now = self.issuer.clock().now();
        self.users.touch_last_login(&record.user.id, now).await?;

        let mut user = record.user;
        user.last_login_at = Some(now);
        debug!(user_id = %user.id, "user logged in");
        self.start_session(user).await
    }

    /// Exchange a refresh token for a new pair. The presented token is
    /// consumed: a second use fails even though its signature still verifies.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let claims = self.issuer.verify_refresh_token(refresh_token)?;
        let user_id = claims.body.user_id;
        let key = refresh_key(&user_id);

        match self.tokens.get(&key).await? {
            Some(stored) if stored == refresh_token => {}
            _ => {
                debug!(%user_id, "refresh token does not match the stored one");
                return Err(AuthError::InvalidRefreshToken);
            }
        }

        let record = self
            .users
            .find_by_id(&user_id)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;
        if !record.user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let access = self.issuer.issue_access_token(&record.user)?;
        let next = self.issuer.issue_refresh_token(&user_id)?;

        // Only one caller can swap out a given token; the others lose here.
        let swapped = self
            .tokens
            .replace_if(&key, refresh_token, &next.token, self.issuer.refresh_ttl())
            .await?;
        if !swapped {
            debug!(%user_id, "refresh token was rotated concurrently");
            return Err(AuthError::InvalidRefreshToken);
        }

        Ok(AuthSession {
            user: record.user,
            access_token: access.token,
            refresh_token: next.token,
            expires_in: self.access_ttl_secs(),
        })
    }

    /// Revoke the user's refresh token. Outstanding access tokens remain
    /// valid until they expire.
    pub async fn logout(&self, user_id: &str) -> Result<(), AuthError> {
        self.tokens.delete(&refresh_key(user_id)).await?;
        info!(%user_id, "user logged out");
        Ok(())
    }

    /// Change the password and force re-login everywhere.
    pub async fn change_password(
        &self,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validation::validate_password(new_password)?;

        let record = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self.hasher.verify(old_password, &record.password_hash).await? {
            return Err(AuthError::InvalidOldPassword);
        }

        let password_hash = self.hasher.hash(new_password).await?;
        self.users.update_password(user_id, &password_hash).await?;
        self.tokens.delete(&refresh_key(user_id)).await?;

        info!(%user_id, "password changed");
        Ok(())
    }

    /// Issue a reset token and hand it to the delivery hook.
    ///
    /// Succeeds silently for unknown emails so callers cannot probe which
    /// accounts exist.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = validation::normalize_email(email);

        let Some(record) = self.users.find_by_email(&email).await? else {
            debug!("password reset requested for unknown email");
            return Ok(());
        };
        let user = record.user;

        let issued = self.issuer.issue_reset_token(&user.id, &user.email)?;
        self.tokens
            .set(&reset_key(&user.id), &issued.token, self.issuer.reset_ttl())
            .await?;

        let notice = ResetNotice {
            user_id: user.id.clone(),
            email: user.email,
            name: user.name,
            token: issued.token,
            expires_at: issued.expires_at,
        };
        self.delivery
            .deliver(&notice)
            .await
            .map_err(AuthError::ResetDelivery)?;

        info!(user_id = %user.id, "password reset token issued");
        Ok(())
    }

    /// Set a new password with a reset token. The token works once.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        validation::validate_password(new_password)?;

        let claims = self.issuer.verify_reset_token(token)?;
        let user_id = claims.body.user_id;

        // Consume before writing so two concurrent resets cannot both succeed.
        if !self.tokens.remove_if(&reset_key(&user_id), token).await? {
            return Err(AuthError::InvalidResetToken);
        }

        let password_hash = self.hasher.hash(new_password).await?;
        self.users.update_password(&user_id, &password_hash).await?;
        self.tokens.delete(&refresh_key(&user_id)).await?;

        info!(%user_id, "password reset");
        Ok(())
    }

    pub async fn profile(&self, user_id: &str) -> Result<User, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|record| record.user)
            .ok_or(AuthError::UserNotFound)
    }

    /// Update name and/or avatar. Email and role cannot change here.
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<User, AuthError> {
        if let Some(name) = &update.name {
            validation::validate_name(name)?;
        }
        if let Some(avatar) = &update.avatar {
            validation::validate_avatar_url(avatar)?;
        }
        if update.is_empty() {
            return self.profile(user_id).await;
        }

        let update = ProfileUpdate {
            name: update.name.map(|n| n.trim().to_string()),
            avatar: update.avatar,
        };
        self.users
            .update_profile(user_id, &update)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Verify an access token and check that its user still exists and is
    /// active. A disabled account loses access at once, before its token expires.
    pub async fn authenticate(&self, access_token: &str) -> Result<Identity, AuthError> {
        let claims = self.issuer.verify_access_token(access_token)?;

        let record = self
            .users
            .find_by_id(&claims.body.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !record.user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        Ok(Identity {
            user_id: claims.body.user_id,
            email: claims.body.email,
            name: claims.body.name,
            role: claims.body.role,
            expires_at: timestamp_to_datetime(claims.exp),
        })
    }

    /// Mint a token pair and store the refresh token, replacing any previous one.
    async fn start_session(&self, user: User) -> Result<AuthSession, AuthError> {
        let access = self.issuer.issue_access_token(&user)?;
        let refresh = self.issuer.issue_refresh_token(&user.id)?;
        self.tokens
            .set(
                &refresh_key(&user.id),
                &refresh.token,
                self.issuer.refresh_ttl(),
            )
            .await?;

        Ok(AuthSession {
            user,
            access_token: access.token,
            refresh_token: refresh.token,
            expires_in: self.access_ttl_secs(),
        })
    }
}
