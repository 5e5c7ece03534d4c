//! Authentication HTTP handlers
//!
//! Endpoints for wallet-based authentication.

use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use super::AuthenticatedUser;
use crate::auth::AuthenticatedIdentity;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    AuthResponse, ChallengeRequest, ChallengeResponse, StatusResponse, VerifyRequest,
};
use crate::state::AppState;

/// POST /auth/challenge - Request a challenge to sign
pub async fn request_challenge(
    State(state): State<AppState>,
    Json(req): Json<ChallengeRequest>,
) -> ApiResult<Json<ChallengeResponse>> {
    req.validate()?;

    let challenge = state.auth_service.request_challenge(&req.address).await?;

    Ok(Json(challenge.into()))
}

/// POST /auth/verify - Verify a signed challenge and issue a token
pub async fn verify_signature(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let outcome = state
        .auth_service
        .verify_and_authenticate(&req.address, &req.signature, &req.challenge)
        .await?;

    Ok(Json(outcome.into()))
}

/// GET /auth/me - Profile of the authenticated caller
pub async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<AuthenticatedIdentity>> {
    let identity = state.auth_service.profile(user.address.as_str()).await?;

    Ok(Json(identity))
}

/// GET /auth/ens/:address - ENS profile for any address
pub async fn get_ens_profile(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<AuthenticatedIdentity>> {
    let identity = state
        .auth_service
        .profile(&address)
        .await
        .map_err(|_| ApiError::BadRequest("Invalid Ethereum address".to_string()))?;

    Ok(Json(identity))
}

/// GET /auth/test - Smoke test
pub async fn auth_status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        message: "Auth module is working".to_string(),
    })
}
