//! API handlers

pub mod auth;

use axum::{extract::State, Json};

use crate::models::HealthResponse;
use crate::state::AppState;

pub use auth::*;

// Re-export AuthenticatedUser from middleware for handler use
pub use crate::middleware::auth::AuthenticatedUser;

/// GET /health - Liveness and challenge backlog
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        pending_challenges: state.auth_service.pending_challenges().await,
    })
}
