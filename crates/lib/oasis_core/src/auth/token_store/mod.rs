//! Single-slot, TTL-backed token store.
//!
//! Holds the one currently valid refresh token and password-reset token per
//! user. Overwriting a slot revokes whatever was there. Lookups are always by
//! key, never by token value.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;

pub use memory::MemoryTokenStore;
pub use postgres::PgTokenStore;

/// Token store errors.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("{0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for TokenStoreError {
    fn from(e: sqlx::Error) -> Self {
        TokenStoreError::Unavailable(e.to_string())
    }
}

/// Key of the refresh-token slot for a user.
pub fn refresh_key(user_id: &str) -> String {
    format!("refresh_token:{user_id}")
}

/// Key of the password-reset slot for a user.
pub fn reset_key(user_id: &str) -> String {
    format!("password_reset:{user_id}")
}

/// Keyed store with per-entry expiry. Expired entries read as absent.
///
/// Writes are last-writer-wins per key. The two conditional operations are
/// atomic per key and are what make refresh rotation and reset consumption
/// race-free.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Store `value` under `key` for `ttl`, replacing any previous value.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), TokenStoreError>;

    /// Current live value under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, TokenStoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), TokenStoreError>;

    /// Replace the value under `key` only if the live value equals `expected`.
    /// Returns whether the swap happened.
    async fn replace_if(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, TokenStoreError>;

    /// Remove `key` only if the live value equals `expected`.
    /// Returns whether the entry was removed.
    async fn remove_if(&self, key: &str, expected: &str) -> Result<bool, TokenStoreError>;

    /// Short name for logs and health output.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(refresh_key("u1"), "refresh_token:u1");
        assert_eq!(reset_key("u1"), "password_reset:u1");
    }
}
