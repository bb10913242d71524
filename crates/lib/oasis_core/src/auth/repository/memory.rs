//! In-process user repository for tests and local experiments.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RepositoryError, UserBackend, UserRepository};
use crate::models::auth::{NewUser, ProfileUpdate, User, UserWithPassword};

/// [`UserRepository`] keeping users in a map keyed by id.
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<String, UserWithPassword>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable an account. Returns false if the user does not exist.
    pub async fn set_active(&self, id: &str, active: bool) -> bool {
        let mut users = self.users.write().await;
        match users.get_mut(id) {
            Some(record) => {
                record.user.is_active = active;
                true
            }
            None => false,
        }
    }

    /// Change a user's role. Returns false if the user does not exist.
    pub async fn set_role(&self, id: &str, role: &str) -> bool {
        let mut users = self.users.write().await;
        match users.get_mut(id) {
            Some(record) => {
                record.user.role = role.to_string();
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithPassword>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|r| r.user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserWithPassword>, RepositoryError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|r| r.user.email.eq_ignore_ascii_case(&new_user.email))
        {
            return Err(RepositoryError::DuplicateEmail);
        }
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: new_user.email,
            name: new_user.name,
            avatar: new_user.avatar,
            role: new_user.role,
            is_active: true,
            created_at: Utc::now(),
            last_login_at: None,
        };
        users.insert(
            user.id.clone(),
            UserWithPassword {
                user: user.clone(),
                password_hash: new_user.password_hash,
            },
        );
        Ok(user)
    }

    async fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        if let Some(record) = self.users.write().await.get_mut(id) {
            record.user.last_login_at = Some(at);
        }
        Ok(())
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<(), RepositoryError> {
        if let Some(record) = self.users.write().await.get_mut(id) {
            record.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, RepositoryError> {
        let mut users = self.users.write().await;
        let Some(record) = users.get_mut(id) else {
            return Ok(None);
        };
        if let Some(name) = &update.name {
            record.user.name = name.clone();
        }
        if let Some(avatar) = &update.avatar {
            record.user.avatar = Some(avatar.clone());
        }
        Ok(Some(record.user.clone()))
    }

    fn backend(&self) -> UserBackend {
        UserBackend::Memory
    }
}
