//! Fallback user repository over a PostgREST-style HTTP API (e.g. Supabase).
//!
//! Talks to `{base_url}/rest/v1/users` with the service-role key. Same table
//! and columns as the primary backend, so switching is invisible to callers.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{RepositoryError, UserBackend, UserRepository};
use crate::models::auth::{NewUser, ProfileUpdate, User, UserWithPassword};

/// Per-request timeout for the REST backend.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct RestUserRow {
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

impl From<RestUserRow> for UserWithPassword {
    fn from(row: RestUserRow) -> Self {
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

#[derive(Debug, Serialize)]
struct InsertUser<'a> {
    email: &'a str,
    password_hash: &'a str,
    name: &'a str,
    avatar_url: Option<&'a str>,
    role: &'a str,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// [`UserRepository`] over HTTP.
#[derive(Clone)]
pub struct RestUserRepository {
    client: Client,
    users_url: String,
    service_key: String,
}

impl RestUserRepository {
    /// `base_url` is the project URL, e.g. `https://xyz.supabase.co`.
    pub fn new(base_url: &str, service_key: &str) -> Result<Self, RepositoryError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            users_url: format!("{}/rest/v1/users", base_url.trim_end_matches('/')),
            service_key: service_key.to_string(),
        })
    }

    /// Connectivity probe used at startup: fetch at most one id.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        let response = self
            .authorized(self.client.get(&self.users_url))
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn select(&self, column: &str, filter: String) -> Result<Vec<RestUserRow>, RepositoryError> {
        let response = self
            .authorized(self.client.get(&self.users_url))
            .query(&[("select", "*".to_string()), (column, filter)])
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn patch(
        &self,
        id: &str,
        body: serde_json::Value,
    ) -> Result<Option<UserWithPassword>, RepositoryError> {
        let response = self
            .authorized(self.client.patch(&self.users_url))
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{id}"))])
            .json(&body)
            .send()
            .await?;
        let rows: Vec<RestUserRow> = check_status(response).await?.json().await?;
        Ok(rows.into_iter().next().map(UserWithPassword::from))
    }
}

/// `ilike` pattern matching `email` literally. PostgREST reads `*` as `%`,
/// so a literal `*` becomes the one-character wildcard and the caller
/// compares the returned rows exactly.
fn email_pattern(email: &str) -> String {
    let mut pattern = String::with_capacity(email.len() + 8);
    for c in email.chars() {
        match c {
            '\\' | '%' | '_' => {
                pattern.push('\\');
                pattern.push(c);
            }
            '*' => pattern.push('_'),
            _ => pattern.push(c),
        }
    }
    pattern
}

/// Turn non-2xx responses into repository errors.
async fn check_status(response: Response) -> Result<Response, RepositoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!(%status, body, "REST user backend returned an error");
    match status {
        StatusCode::CONFLICT => Err(RepositoryError::DuplicateEmail),
        _ => Err(RepositoryError::Unavailable(format!(
            "REST backend returned {status}"
        ))),
    }
}

#[async_trait]
impl UserRepository for RestUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithPassword>, RepositoryError> {
        let wanted = email.to_lowercase();
        let rows = self
            .select("email", format!("ilike.{}", email_pattern(email)))
            .await?;
        Ok(rows
            .into_iter()
            .find(|row| row.email.to_lowercase() == wanted)
            .map(UserWithPassword::from))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserWithPassword>, RepositoryError> {
        if uuid::Uuid::parse_str(id).is_err() {
            return Ok(None);
        }
        let rows = self.select("id", format!("eq.{id}")).await?;
        Ok(rows.into_iter().next().map(UserWithPassword::from))
    }

    async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let now = Utc::now();
        let body = InsertUser {
            email: &new_user.email,
            password_hash: &new_user.password_hash,
            name: &new_user.name,
            avatar_url: new_user.avatar.as_deref(),
            role: &new_user.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let response = self
            .authorized(self.client.post(&self.users_url))
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await?;
        let rows: Vec<RestUserRow> = check_status(response).await?.json().await?;
        rows.into_iter()
            .next()
            .map(|row| UserWithPassword::from(row).user)
            .ok_or_else(|| RepositoryError::Decode("insert returned no rows".into()))
    }

    async fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        self.patch(id, json!({ "last_login_at": at })).await?;
        Ok(())
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<(), RepositoryError> {
        self.patch(
            id,
            json!({ "password_hash": password_hash, "updated_at": Utc::now() }),
        )
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
        let mut body = json!({ "updated_at": Utc::now() });
        if let Some(name) = &update.name {
            body["name"] = json!(name);
        }
        if let Some(avatar) = &update.avatar {
            body["avatar_url"] = json!(avatar);
        }
        Ok(self.patch(id, body).await?.map(|u| u.user))
    }

    fn backend(&self) -> UserBackend {
        UserBackend::Fallback
    }
}
