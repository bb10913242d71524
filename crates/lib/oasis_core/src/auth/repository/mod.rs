//! User repository: one contract, several backends.
//!
//! The server probes connectivity once at startup and picks exactly one
//! implementation for the life of the process. There is no per-request
//! fallback: a failing backend is a hard `DATABASE_UNAVAILABLE` error, never a
//! silent write to the other store.

pub mod memory;
pub mod postgres;
pub mod rest;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::auth::{NewUser, ProfileUpdate, User, UserWithPassword};

pub use memory::MemoryUserRepository;
pub use postgres::PgUserRepository;
pub use rest::RestUserRepository;

/// Repository errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("{0}")]
    Unavailable(String),

    #[error("Malformed user record: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::DuplicateEmail
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                RepositoryError::Decode(e.to_string())
            }
            _ => RepositoryError::Unavailable(e.to_string()),
        }
    }
}

impl From<reqwest::Error> for RepositoryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RepositoryError::Decode(e.to_string())
        } else {
            RepositoryError::Unavailable(e.to_string())
        }
    }
}

/// Which implementation is serving user data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserBackend {
    /// PostgreSQL through the sqlx pool.
    Primary,
    /// PostgREST-style HTTP API.
    Fallback,
    /// In-process map (tests, local experiments).
    Memory,
    /// Nothing answered the startup probe.
    Unavailable,
}

impl UserBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserBackend::Primary => "primary",
            UserBackend::Fallback => "fallback",
            UserBackend::Memory => "memory",
            UserBackend::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for UserBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User persistence contract. Emails passed in are already normalized.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithPassword>, RepositoryError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<UserWithPassword>, RepositoryError>;

    /// Insert a user. A taken email yields [`RepositoryError::DuplicateEmail`].
    async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError>;

    async fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> Result<(), RepositoryError>;

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<(), RepositoryError>;

    /// Apply a profile update. Returns `None` if the user does not exist.
    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, RepositoryError>;

    fn backend(&self) -> UserBackend;
}

/// Stand-in used when no backend answered the startup probe.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableUserRepository;

impl UnavailableUserRepository {
    fn error() -> RepositoryError {
        RepositoryError::Unavailable("no user backend is connected".into())
    }
}

#[async_trait]
impl UserRepository for UnavailableUserRepository {
    async fn find_by_email(&self, _email: &str) -> Result<Option<UserWithPassword>, RepositoryError> {
        Err(Self::error())
    }

    async fn find_by_id(&self, _id: &str) -> Result<Option<UserWithPassword>, RepositoryError> {
        Err(Self::error())
    }

    async fn create(&self, _new_user: NewUser) -> Result<User, RepositoryError> {
        Err(Self::error())
    }

    async fn touch_last_login(&self, _id: &str, _at: DateTime<Utc>) -> Result<(), RepositoryError> {
        Err(Self::error())
    }

    async fn update_password(&self, _id: &str, _password_hash: &str) -> Result<(), RepositoryError> {
        Err(Self::error())
    }

    async fn update_profile(
        &self,
        _id: &str,
        _update: &ProfileUpdate,
    ) -> Result<Option<User>, RepositoryError> {
        Err(Self::error())
    }

    fn backend(&self) -> UserBackend {
        UserBackend::Unavailable
    }
}

/// Generated avatar URL for users who did not supply one.
pub fn default_avatar_url(name: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(name.as_bytes()).collect();
    format!(
        "https://ui-avatars.com/api/?name={encoded}&background=2F6A53&color=ffffff&size=128"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_avatar_encodes_name() {
        let url = default_avatar_url("Ann Lee");
        assert!(url.starts_with("https://ui-avatars.com/api/?name=Ann+Lee&"));
        assert!(url.ends_with("size=128"));
    }

    #[tokio::test]
    async fn unavailable_repository_always_fails() {
        let repo = UnavailableUserRepository;
        assert!(matches!(
            repo.find_by_email("a@b.io").await,
            Err(RepositoryError::Unavailable(_))
        ));
        assert_eq!(repo.backend(), UserBackend::Unavailable);
    }

    #[test]
    fn backend_names() {
        assert_eq!(UserBackend::Primary.to_string(), "primary");
        assert_eq!(UserBackend::Fallback.as_str(), "fallback");
    }
}
