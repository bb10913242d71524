//! JWT token generation and verification.
//!
//! One signing primitive ([`TokenSigner`]) serves access, refresh and reset
//! tokens; [`TokenIssuer`] holds one signer per family, each with its own
//! secret and lifetime.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;
use uuid::Uuid;

use super::AuthError;
use super::clock::Clock;
use crate::models::auth::{AccessClaims, Claims, RefreshClaims, ResetClaims, TokenKind, User};

/// Default access token lifetime: 24 hours.
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 24 * 60 * 60;

/// Default refresh token lifetime: 7 days.
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Password reset token lifetime: 1 hour.
pub const RESET_TTL_SECS: i64 = 60 * 60;

/// Why a token failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    /// Bad signature, malformed, wrong family.
    Invalid,
    /// Well-formed and correctly signed, but past `exp`.
    Expired,
}

/// A freshly minted token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// HS256 signer/verifier for one token family.
#[derive(Clone)]
pub struct TokenSigner {
    kind: TokenKind,
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(kind: TokenKind, secret: &[u8], ttl: Duration) -> Self {
        Self {
            kind,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign `body` with this family's kind, a fresh `jti` and `now + ttl` expiry.
    pub fn sign<T: Serialize>(&self, body: T, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AuthError::Internal("token expiry out of range".into()))?;
        let claims = Claims {
            body,
            kind: self.kind,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Verify signature, family and expiry against `now`.
    pub fn verify<T: DeserializeOwned>(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Claims<T>, TokenRejection> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against the injected clock.
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = decode::<Claims<T>>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenRejection::Expired,
                _ => TokenRejection::Invalid,
            })?
            .claims;

        if claims.kind != self.kind {
            return Err(TokenRejection::Invalid);
        }
        if now.timestamp() >= claims.exp {
            return Err(TokenRejection::Expired);
        }
        Ok(claims)
    }
}

/// Secrets used by the issuer. Each family gets its own so a leaked access
/// secret cannot mint refresh or reset tokens.
#[derive(Clone)]
pub struct TokenSecrets {
    pub access: String,
    pub refresh: String,
    pub reset: String,
}

/// Mints and verifies access, refresh and reset tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    access: TokenSigner,
    refresh: TokenSigner,
    reset: TokenSigner,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(
        secrets: &TokenSecrets,
        access_ttl_secs: i64,
        refresh_ttl_secs: i64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            access: TokenSigner::new(
                TokenKind::Access,
                secrets.access.as_bytes(),
                ttl_from_secs(access_ttl_secs),
            ),
            refresh: TokenSigner::new(
                TokenKind::Refresh,
                secrets.refresh.as_bytes(),
                ttl_from_secs(refresh_ttl_secs),
            ),
            reset: TokenSigner::new(
                TokenKind::Reset,
                secrets.reset.as_bytes(),
                Duration::seconds(RESET_TTL_SECS),
            ),
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn access_ttl(&self) -> Duration {
        self.access.ttl()
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh.ttl()
    }

    pub fn reset_ttl(&self) -> Duration {
        self.reset.ttl()
    }

    /// Sign `{userId, email, name, role}` with the access secret.
    pub fn issue_access_token(&self, user: &User) -> Result<IssuedToken, AuthError> {
        let body = AccessClaims {
            user_id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.clone(),
        };
        self.access.sign(body, self.clock.now())
    }

    /// Sign `{userId}` with the refresh secret.
    pub fn issue_refresh_token(&self, user_id: &str) -> Result<IssuedToken, AuthError> {
        let body = RefreshClaims {
            user_id: user_id.to_string(),
        };
        self.refresh.sign(body, self.clock.now())
    }

    /// Sign `{userId, email}` with the reset secret and a one hour lifetime.
    pub fn issue_reset_token(&self, user_id: &str, email: &str) -> Result<IssuedToken, AuthError> {
        let body = ResetClaims {
            user_id: user_id.to_string(),
            email: email.to_string(),
        };
        self.reset.sign(body, self.clock.now())
    }

    /// Stateless access-token check. Liveness of the user is checked by
    /// [`SessionService::authenticate`](super::session::SessionService::authenticate).
    pub fn verify_access_token(&self, token: &str) -> Result<Claims<AccessClaims>, AuthError> {
        self.access
            .verify(token, self.clock.now())
            .map_err(|r| match r {
                TokenRejection::Expired => AuthError::TokenExpired,
                TokenRejection::Invalid => AuthError::InvalidAccessToken,
            })
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<Claims<RefreshClaims>, AuthError> {
        self.refresh
            .verify(token, self.clock.now())
            .map_err(|_| AuthError::InvalidRefreshToken)
    }

    pub fn verify_reset_token(&self, token: &str) -> Result<Claims<ResetClaims>, AuthError> {
        self.reset
            .verify(token, self.clock.now())
            .map_err(|_| AuthError::InvalidResetToken)
    }
}

/// Seconds to a lifetime, saturating instead of panicking on huge values.
fn ttl_from_secs(secs: i64) -> Duration {
    Duration::try_seconds(secs).unwrap_or(Duration::MAX)
}

/// Convert a unix timestamp claim into a `DateTime`.
pub fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Resolve a signing secret: env var `env_var` → persisted file `file_name`
/// in the data dir → freshly generated and persisted.
pub fn resolve_secret(env_var: &str, file_name: &str) -> String {
    if let Ok(secret) = std::env::var(env_var)
        && !secret.is_empty()
    {
        return secret;
    }
    let secret_path = secret_path(file_name);
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), env_var, "generated new signing secret");
    secret
}

/// Path to a persisted secret file.
fn secret_path(file_name: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("oasis")
        .join(file_name)
}
