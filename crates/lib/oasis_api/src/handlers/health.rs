//! Liveness and backend status.

use axum::Json;
use axum::extract::State;
use oasis_core::auth::repository::UserBackend;

use crate::AppState;
use crate::models::HealthResponse;

/// `GET /health`: reports which user backend and token store are serving.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend = state.sessions.user_backend();
    let status = match backend {
        UserBackend::Unavailable => "degraded",
        _ => "ok",
    };
    Json(HealthResponse {
        status,
        user_backend: backend.as_str(),
        token_store: state.sessions.token_store_name(),
        version: oasis_core::version(),
    })
}
