//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! shapes in `oasis_api::models`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role assigned to every self-registered account.
pub const DEFAULT_ROLE: &str = "user";

/// Domain user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// User with password hash (for internal auth flows).
#[derive(Debug, Clone)]
pub struct UserWithPassword {
    pub user: User,
    pub password_hash: String,
}

/// Input for creating a user record.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Already normalized (trimmed, lower-cased).
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub avatar: Option<String>,
    pub role: String,
}

/// Fields a user may change on their own profile. Email and role are not here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub avatar: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.avatar.is_none()
    }
}

/// Discriminates the three token families signed by the issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
    Reset,
}

/// Signed envelope shared by every token family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims<T> {
    #[serde(flatten)]
    pub body: T,
    pub kind: TokenKind,
    /// Random token id; keeps two tokens minted in the same second distinct.
    pub jti: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// Payload of an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

/// Payload of a refresh token: subject only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshClaims {
    pub user_id: String,
}

/// Payload of a password-reset token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetClaims {
    pub user_id: String,
    pub email: String,
}

/// Result of register, login and refresh.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Identity resolved from a verified, live access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_claims_flatten_into_envelope() {
        let claims = Claims {
            body: AccessClaims {
                user_id: "u1".into(),
                email: "a@b.io".into(),
                name: "Ann".into(),
                role: "user".into(),
            },
            kind: TokenKind::Access,
            jti: "j".into(),
            iat: 1,
            exp: 2,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["kind"], "access");
        assert_eq!(json["exp"], 2);
    }

    #[test]
    fn user_serializes_without_password() {
        let user = User {
            id: "u1".into(),
            email: "a@b.io".into(),
            name: "Ann".into(),
            avatar: None,
            role: DEFAULT_ROLE.into(),
            is_active: true,
            created_at: Utc::now(),
            last_login_at: None,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["isActive"], true);
    }

    #[test]
    fn empty_profile_update() {
        assert!(ProfileUpdate::default().is_empty());
        let update = ProfileUpdate {
            name: Some("Bob".into()),
            avatar: None,
        };
        assert!(!update.is_empty());
    }
}
