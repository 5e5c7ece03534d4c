//! Authentication request and response bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::{AuthOutcome, AuthenticatedIdentity, Challenge};

/// Request for authentication challenge
#[derive(Debug, Deserialize, Validate)]
pub struct ChallengeRequest {
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,
}

/// Response containing the challenge to sign
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub challenge: String,
    pub expires_at: DateTime<Utc>,
}

impl From<Challenge> for ChallengeResponse {
    fn from(challenge: Challenge) -> Self {
        Self {
            challenge: challenge.text,
            expires_at: challenge.expires_at,
        }
    }
}

/// Request to verify a signed challenge
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyRequest {
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,
    /// Hex-encoded 65-byte signature
    #[validate(length(min = 1, message = "signature is required"))]
    pub signature: String,
    #[validate(length(min = 1, message = "challenge is required"))]
    pub challenge: String,
}

/// Auth token response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthenticatedIdentity,
}

impl From<AuthOutcome> for AuthResponse {
    fn from(outcome: AuthOutcome) -> Self {
        Self {
            access_token: outcome.access_token,
            token_type: "Bearer".to_string(),
            expires_at: outcome.expires_at,
            user: outcome.user,
        }
    }
}

/// Smoke-test response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_request_requires_fields() {
        let req: VerifyRequest = serde_json::from_value(serde_json::json!({
            "address": "0x742d35cc6634c0532925a3b844bc9e7595f0beb0",
            "signature": "",
            "challenge": "text"
        }))
        .unwrap();

        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("signature"));
    }

    #[test]
    fn test_challenge_request_validates() {
        let req = ChallengeRequest {
            address: "0x742d35cc6634c0532925a3b844bc9e7595f0beb0".to_string(),
        };
        assert!(req.validate().is_ok());
    }
}
