//! Authentication middleware
//!
//! Extractor for bearer-token verification.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::auth::{Address, AuthService};
use crate::error::ApiError;

/// Authenticated caller extracted from a bearer credential
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub address: Address,
    pub jti: String,
}

/// Extractor for authenticated users
///
/// Verifies the credential from the `Authorization: Bearer` header.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(user: AuthenticatedUser) -> impl IntoResponse {
///     format!("Hello, {}", user.address)
/// }
/// ```
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::Unauthorized(
                        "Authorization header with Bearer token required".to_string(),
                    )
                })?;

        let auth_service = Arc::<AuthService>::from_ref(state);
        let claims = auth_service.validate_token(bearer.token())?;

        Ok(AuthenticatedUser {
            address: claims.sub,
            jti: claims.jti,
        })
    }
}
