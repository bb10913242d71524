//! Password hashing via bcrypt.
//!
//! Hashing and verification run on the blocking pool; at cost 12 a single
//! call takes long enough to stall an async worker.

use std::sync::Arc;

use super::AuthError;

/// Default bcrypt cost factor.
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

/// Lowest cost bcrypt accepts.
pub const MIN_COST: u32 = 4;

/// Highest cost bcrypt accepts.
pub const MAX_COST: u32 = 31;

/// bcrypt hasher with a fixed cost.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    /// Hash of a throwaway password, verified when the account does not exist
    /// so the miss costs the same as a wrong password.
    dummy_hash: Arc<str>,
}

impl PasswordHasher {
    /// Build a hasher. The cost is clamped to bcrypt's accepted range.
    pub fn new(cost: u32) -> Result<Self, AuthError> {
        let cost = cost.clamp(MIN_COST, MAX_COST);
        let dummy_hash = bcrypt::hash("oasis-dummy-password", cost)
            .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))?;
        Ok(Self {
            cost,
            dummy_hash: Arc::from(dummy_hash),
        })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password with a fresh random salt.
    pub async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AuthError::Internal(format!("bcrypt task: {e}")))?
            .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
    }

    /// Verify a password against a bcrypt hash.
    ///
    /// A malformed stored hash verifies as `false` rather than erroring.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("bcrypt task: {e}")))?;
        match outcome {
            Ok(valid) => Ok(valid),
            Err(e) => {
                tracing::warn!("bcrypt verify: {e}");
                Ok(false)
            }
        }
    }

    /// Spend one verification's worth of work and discard the result.
    pub async fn verify_dummy(&self, password: &str) -> Result<(), AuthError> {
        let dummy = Arc::clone(&self.dummy_hash);
        self.verify(password, &dummy).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(MIN_COST).unwrap()
    }

    #[tokio::test]
    async fn hash_then_verify() {
        let hasher = hasher();
        let hash = hasher.hash("Passw0rd1").await.unwrap();
        assert_ne!(hash, "Passw0rd1");
        assert!(hasher.verify("Passw0rd1", &hash).await.unwrap());
        assert!(!hasher.verify("Passw0rd2", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn hashes_are_salted() {
        let hasher = hasher();
        let a = hasher.hash("Passw0rd1").await.unwrap();
        let b = hasher.hash("Passw0rd1").await.unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("Passw0rd1", &a).await.unwrap());
        assert!(hasher.verify("Passw0rd1", &b).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_is_a_mismatch() {
        let hasher = hasher();
        assert!(!hasher.verify("Passw0rd1", "not-a-hash").await.unwrap());
    }

    #[tokio::test]
    async fn dummy_verify_succeeds() {
        hasher().verify_dummy("anything").await.unwrap();
    }

    #[test]
    fn cost_is_clamped() {
        assert_eq!(PasswordHasher::new(1).unwrap().cost(), MIN_COST);
    }
}
