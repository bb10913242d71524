//! Oasis authentication API server binary.
//!
//! Picks the user backend once at startup: PostgreSQL if it answers, else
//! the PostgREST fallback if configured and reachable, else a stand-in that
//! fails every call with `DATABASE_UNAVAILABLE` so the process still serves
//! `/health`.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use oasis_api::config::ApiConfig;
use oasis_core::auth::clock::SystemClock;
use oasis_core::auth::jwt::TokenIssuer;
use oasis_core::auth::password::PasswordHasher;
use oasis_core::auth::repository::{
    PgUserRepository, RestUserRepository, UnavailableUserRepository, UserRepository,
};
use oasis_core::auth::reset::LogResetDelivery;
use oasis_core::auth::session::SessionService;
use oasis_core::auth::token_store::{MemoryTokenStore, PgTokenStore, TokenStore};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, error, info, warn};

/// How often expired rows are purged from the SQL token store.
const TOKEN_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "oasis_api_server", about = "Oasis authentication API server")]
struct Args {
    /// Port to listen on; overrides the port in `BIND_ADDR`.
    #[arg(long)]
    port: Option<u16>,

    /// Host to listen on; overrides the host in `BIND_ADDR`.
    #[arg(long)]
    host: Option<String>,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/oasis"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(
                    "info,oasis_api=debug,oasis_core=debug",
                )),
        )
        .init();

    let args = Args::parse();
    let mut config = ApiConfig::from_env();
    config.pg_connection_url = args.database_url.clone();
    config.bind_addr = bind_addr(&config.bind_addr, args.host.as_deref(), args.port);

    info!(bind_addr = %config.bind_addr, "starting oasis_api_server");

    let (users, tokens) = select_backends(&config, args.max_connections).await?;
    info!(
        user_backend = %users.backend(),
        token_store = tokens.name(),
        "backends selected"
    );

    let issuer = TokenIssuer::new(
        &config.token_secrets(),
        config.access_ttl_secs,
        config.refresh_ttl_secs,
        Arc::new(SystemClock),
    );
    let hasher = PasswordHasher::new(config.bcrypt_cost)?;
    let delivery = Arc::new(LogResetDelivery::new(config.reset_url_base.clone()));
    let sessions = SessionService::new(users, tokens, issuer, hasher, delivery);

    let app = oasis_api::router(oasis_api::AppState::new(sessions));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Apply `--host` / `--port` overrides to a `host:port` string.
fn bind_addr(base: &str, host: Option<&str>, port: Option<u16>) -> String {
    let (base_host, base_port) = base.rsplit_once(':').unwrap_or((base, "3100"));
    let host = host.unwrap_or(base_host);
    match port {
        Some(port) => format!("{host}:{port}"),
        None => format!("{host}:{base_port}"),
    }
}

/// Probe the primary database, then the REST fallback.
async fn select_backends(
    config: &ApiConfig,
    max_connections: u32,
) -> Result<(Arc<dyn UserRepository>, Arc<dyn TokenStore>), Box<dyn std::error::Error>> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(&config.pg_connection_url)?;

    let primary = PgUserRepository::new(pool.clone());
    match primary.ping().await {
        Ok(()) => {
            info!("running database migrations");
            oasis_core::migrate::migrate(&pool).await?;
            let tokens = match config.token_store.as_deref() {
                Some(store) if store.eq_ignore_ascii_case("memory") => memory_token_store(),
                Some(store) if !store.eq_ignore_ascii_case("postgres") => {
                    warn!(token_store = store, "unknown TOKEN_STORE; using postgres");
                    pg_token_store(pool)
                }
                _ => pg_token_store(pool),
            };
            return Ok((Arc::new(primary), tokens));
        }
        Err(e) => warn!(error = %e, "primary database unreachable"),
    }

    let users: Arc<dyn UserRepository> =
        match (&config.supabase_url, &config.supabase_service_key) {
            (Some(url), Some(key)) => {
                let fallback = RestUserRepository::new(url, key)?;
                match fallback.ping().await {
                    Ok(()) => {
                        warn!(url = %url, "using fallback REST user backend");
                        Arc::new(fallback)
                    }
                    Err(e) => {
                        error!(error = %e, "fallback user backend unreachable");
                        Arc::new(UnavailableUserRepository)
                    }
                }
            }
            _ => {
                error!("no fallback user backend configured");
                Arc::new(UnavailableUserRepository)
            }
        };

    if let Some(requested) = ignored_token_store(config.token_store.as_deref()) {
        warn!(
            token_store = requested,
            "TOKEN_STORE needs the primary database; using the in-memory token store"
        );
    }
    Ok((users, memory_token_store()))
}

/// The `TOKEN_STORE` value, if it asked for something other than the
/// in-memory store. Without the primary database only that store exists.
fn ignored_token_store(requested: Option<&str>) -> Option<&str> {
    requested.filter(|store| !store.eq_ignore_ascii_case("memory"))
}

fn memory_token_store() -> Arc<dyn TokenStore> {
    let store = Arc::new(MemoryTokenStore::new());
    let _ = store.spawn_cleanup_task();
    store
}

fn pg_token_store(pool: PgPool) -> Arc<dyn TokenStore> {
    let store = Arc::new(PgTokenStore::new(pool));
    let purger = Arc::clone(&store);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TOKEN_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match purger.purge_expired().await {
                Ok(0) => {}
                Ok(n) => debug!(purged = n, "expired tokens purged"),
                Err(e) => warn!(error = %e, "token purge failed"),
            }
        }
    });
    store
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_overrides() {
        assert_eq!(bind_addr("127.0.0.1:3100", None, None), "127.0.0.1:3100");
        assert_eq!(bind_addr("127.0.0.1:3100", None, Some(8080)), "127.0.0.1:8080");
        assert_eq!(
            bind_addr("127.0.0.1:3100", Some("0.0.0.0"), None),
            "0.0.0.0:3100"
        );
    }

    #[test]
    fn forced_token_store_without_primary_database() {
        assert_eq!(ignored_token_store(None), None);
        assert_eq!(ignored_token_store(Some("memory")), None);
        assert_eq!(ignored_token_store(Some("Memory")), None);
        assert_eq!(ignored_token_store(Some("postgres")), Some("postgres"));
    }
}
