//! Route definitions

mod auth;

use axum::{routing::get, Router};

use crate::handlers::health_check;
use crate::middleware::request_tracing;
use crate::state::AppState;

pub use auth::auth_routes;

/// Assemble the full application router
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(request_tracing))
}
