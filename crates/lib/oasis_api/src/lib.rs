//! # oasis_api
//!
//! HTTP API library for Oasis authentication.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use oasis_core::auth::session::SessionService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, health};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session lifecycle over the backends chosen at startup.
    pub sessions: Arc<SessionService>,
}

impl AppState {
    pub fn new(sessions: SessionService) -> Self {
        Self {
            sessions: Arc::new(sessions),
        }
    }
}

/// The `/auth` routes, before state is attached.
pub fn auth_router(state: &AppState) -> Router<AppState> {
    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::POST_REGISTER, post(auth::register_handler))
        .route(routes::POST_LOGIN, post(auth::login_handler))
        .route(routes::POST_REFRESH_TOKEN, post(auth::refresh_handler))
        .route(
            routes::POST_REQUEST_PASSWORD_RESET,
            post(auth::request_password_reset_handler),
        )
        .route(routes::POST_RESET_PASSWORD, post(auth::reset_password_handler))
        .method_not_allowed_fallback(method_not_allowed);

    // Protected routes (require auth)
    let protected = Router::new()
        .route(routes::POST_LOGOUT, post(auth::logout_handler))
        .route(
            routes::PROFILE,
            get(auth::get_profile_handler).put(auth::update_profile_handler),
        )
        .route(
            routes::POST_CHANGE_PASSWORD,
            post(auth::change_password_handler),
        )
        .route(routes::GET_VERIFY_TOKEN, get(auth::verify_token_handler))
        .route(routes::GET_SESSION, get(auth::session_handler))
        .method_not_allowed_fallback(method_not_allowed)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new().merge(public).merge(protected)
}

async fn not_found(uri: axum::http::Uri) -> error::AppError {
    error::AppError::NotFound(uri.path().to_string())
}

async fn method_not_allowed(method: axum::http::Method) -> error::AppError {
    error::AppError::MethodNotAllowed(method.to_string())
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(routes::GET_HEALTH, get(health::health_handler))
        .nest(routes::AUTH_PREFIX, auth_router(&state))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
