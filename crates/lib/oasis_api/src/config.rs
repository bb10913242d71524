//! API server configuration.

use oasis_core::auth::jwt::{
    DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS, TokenSecrets, resolve_secret,
};
use oasis_core::auth::password::DEFAULT_COST;

/// Default front-end page that receives password-reset links.
pub const DEFAULT_RESET_URL_BASE: &str = "http://localhost:3000/reset-password";

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// PostgREST-style fallback backend, if configured.
    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
    /// Signing secrets for access, refresh and reset tokens.
    pub access_secret: String,
    pub refresh_secret: String,
    pub reset_secret: String,
    /// Access token lifetime in seconds.
    pub access_ttl_secs: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_ttl_secs: i64,
    /// bcrypt cost factor.
    pub bcrypt_cost: u32,
    /// Front-end reset page; the token is appended as `?token=`.
    pub reset_url_base: String,
    /// Force a token store (`memory` or `postgres`); `None` follows the user backend.
    pub token_store: Option<String>,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                    | Default                                   |
    /// |-----------------------------|-------------------------------------------|
    /// | `BIND_ADDR`                 | `127.0.0.1:3100`                          |
    /// | `DATABASE_URL`              | `postgres://localhost:5432/oasis`         |
    /// | `SUPABASE_URL`              | unset                                     |
    /// | `SUPABASE_SERVICE_ROLE_KEY` | unset                                     |
    /// | `JWT_SECRET`                | generated & persisted to file             |
    /// | `JWT_REFRESH_SECRET`        | generated & persisted to file             |
    /// | `PASSWORD_RESET_SECRET`     | generated & persisted to file             |
    /// | `JWT_EXPIRES_IN`            | `24h`                                     |
    /// | `JWT_REFRESH_EXPIRES_IN`    | `7d`                                      |
    /// | `BCRYPT_SALT_ROUNDS`        | `12`                                      |
    /// | `RESET_URL_BASE`            | `http://localhost:3000/reset-password`    |
    /// | `TOKEN_STORE`               | follows the user backend                  |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3100".into()),
            pg_connection_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/oasis".into()),
            supabase_url: non_empty_var("SUPABASE_URL"),
            supabase_service_key: non_empty_var("SUPABASE_SERVICE_ROLE_KEY"),
            access_secret: resolve_secret("JWT_SECRET", "jwt_secret"),
            refresh_secret: resolve_secret("JWT_REFRESH_SECRET", "jwt_refresh_secret"),
            reset_secret: resolve_secret("PASSWORD_RESET_SECRET", "password_reset_secret"),
            access_ttl_secs: non_empty_var("JWT_EXPIRES_IN")
                .and_then(|v| parse_expires_in(&v))
                .unwrap_or(DEFAULT_ACCESS_TTL_SECS),
            refresh_ttl_secs: non_empty_var("JWT_REFRESH_EXPIRES_IN")
                .and_then(|v| parse_expires_in(&v))
                .unwrap_or(DEFAULT_REFRESH_TTL_SECS),
            bcrypt_cost: non_empty_var("BCRYPT_SALT_ROUNDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_COST),
            reset_url_base: non_empty_var("RESET_URL_BASE")
                .unwrap_or_else(|| DEFAULT_RESET_URL_BASE.into()),
            token_store: non_empty_var("TOKEN_STORE").map(|v| v.to_lowercase()),
        }
    }

    pub fn token_secrets(&self) -> TokenSecrets {
        TokenSecrets {
            access: self.access_secret.clone(),
            refresh: self.refresh_secret.clone(),
            reset: self.reset_secret.clone(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Longest accepted token lifetime: ten years.
pub const MAX_EXPIRES_IN_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Parse a duration like `90`, `30s`, `15m`, `24h` or `7d` into seconds.
///
/// Returns `None` for anything else, including zero and anything longer
/// than [`MAX_EXPIRES_IN_SECS`].
pub fn parse_expires_in(value: &str) -> Option<i64> {
    let value = value.trim();
    let (digits, unit) = match value.char_indices().last()? {
        (i, c) if c.is_ascii_alphabetic() => (&value[..i], c.to_ascii_lowercase()),
        _ => (value, 's'),
    };
    let amount: i64 = digits.parse().ok()?;
    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        _ => return None,
    };
    amount
        .checked_mul(multiplier)
        .filter(|secs| (1..=MAX_EXPIRES_IN_SECS).contains(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_suffixed_durations() {
        assert_eq!(parse_expires_in("24h"), Some(86_400));
        assert_eq!(parse_expires_in("7d"), Some(604_800));
        assert_eq!(parse_expires_in("15m"), Some(900));
        assert_eq!(parse_expires_in("30s"), Some(30));
        assert_eq!(parse_expires_in("3600"), Some(3600));
        assert_eq!(parse_expires_in(" 2H "), Some(7200));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert_eq!(parse_expires_in(""), None);
        assert_eq!(parse_expires_in("h"), None);
        assert_eq!(parse_expires_in("10w"), None);
        assert_eq!(parse_expires_in("-5m"), None);
        assert_eq!(parse_expires_in("0"), None);
        assert_eq!(parse_expires_in("abc"), None);
    }

    #[test]
    fn rejects_lifetimes_beyond_ten_years() {
        assert_eq!(parse_expires_in("3650d"), Some(MAX_EXPIRES_IN_SECS));
        assert_eq!(parse_expires_in("3651d"), None);
        assert_eq!(parse_expires_in("300000000d"), None);
        assert_eq!(parse_expires_in("9223372036854775807"), None);
    }
}
