//! Primary user repository on PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::{RepositoryError, UserBackend, UserRepository};
use crate::models::auth::{NewUser, ProfileUpdate, User, UserWithPassword};

/// Columns selected for every user read.
const USER_COLUMNS: &str = "id::text AS id, email, password_hash, name, avatar_url, role, \
                            is_active, created_at, last_login_at";

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    email: String,
    password_hash: String,
    name: String,
    avatar_url: Option<String>,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for UserWithPassword {
    fn from(row: UserRow) -> Self {
        UserWithPassword {
            user: User {
                id: row.id,
                email: row.email,
                name: row.name,
                avatar: row.avatar_url,
                role: row.role,
                is_active: row.is_active,
                created_at: row.created_at,
                last_login_at: row.last_login_at,
            },
            password_hash: row.password_hash,
        }
    }
}

/// [`UserRepository`] over the sqlx pool.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connectivity probe used at startup.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithPassword>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UserWithPassword::from))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserWithPassword>, RepositoryError> {
        // Ids that are not UUIDs cannot exist; avoid a cast error from PG.
        if uuid::Uuid::parse_str(id).is_err() {
            return Ok(None);
        }
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1::uuid"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UserWithPassword::from))
    }

    async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (email, password_hash, name, avatar_url, role, is_active) \
             VALUES ($1, $2, $3, $4, $5, TRUE) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.name)
        .bind(&new_user.avatar)
        .bind(&new_user.role)
        .fetch_one(&self.pool)
        .await?;
        Ok(UserWithPassword::from(row).user)
    }

    async fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1::uuid")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1::uuid")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, RepositoryError> {
        if uuid::Uuid::parse_str(id).is_err() {
            return Ok(None);
        }
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET \
                 name = COALESCE($2, name), \
                 avatar_url = COALESCE($3, avatar_url), \
                 updated_at = now() \
             WHERE id = $1::uuid \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&update.name)
        .bind(&update.avatar)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| UserWithPassword::from(r).user))
    }

    fn backend(&self) -> UserBackend {
        UserBackend::Primary
    }
}
