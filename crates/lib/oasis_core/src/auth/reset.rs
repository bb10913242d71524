//! Password-reset delivery hook.
//!
//! The core only mints and stores reset tokens; getting the link to the user
//! (email, chat, ...) is the job of a [`ResetDelivery`] supplied by the host.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

/// Everything a delivery channel needs to send a reset link.
#[derive(Debug, Clone)]
pub struct ResetNotice {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Sends a reset notice to its recipient.
#[async_trait]
pub trait ResetDelivery: Send + Sync {
    async fn deliver(&self, notice: &ResetNotice) -> Result<(), String>;
}

/// Delivery that writes the reset link to the log. Suitable for development.
#[derive(Debug, Clone)]
pub struct LogResetDelivery {
    url_base: String,
}

impl LogResetDelivery {
    /// `url_base` is the front-end reset page, e.g. `http://localhost:3000/reset-password`.
    pub fn new(url_base: impl Into<String>) -> Self {
        Self {
            url_base: url_base.into(),
        }
    }

    pub fn reset_link(&self, token: &str) -> String {
        format!("{}?token={token}", self.url_base)
    }
}

#[async_trait]
impl ResetDelivery for LogResetDelivery {
    async fn deliver(&self, notice: &ResetNotice) -> Result<(), String> {
        info!(
            email = %notice.email,
            expires_at = %notice.expires_at,
            link = %self.reset_link(&notice.token),
            "password reset link issued"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_link_appends_token() {
        let delivery = LogResetDelivery::new("http://localhost:3000/reset-password");
        assert_eq!(
            delivery.reset_link("abc"),
            "http://localhost:3000/reset-password?token=abc"
        );
    }
}
