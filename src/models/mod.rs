//! Data models for the HTTP API

pub mod auth;
pub use auth::*;

/// Health check response
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub pending_challenges: usize,
}
