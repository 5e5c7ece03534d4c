//! JWT credential issuance and validation
//!
//! Credentials are HS256 tokens signed with a process-wide secret. Expiry is
//! checked against the injected clock rather than by `jsonwebtoken`, so
//! tests and the orchestrator agree on what "now" is.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::address::Address;
use super::clock::Clock;

/// JWT-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,
}

/// Credential claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (normalized address)
    pub sub: Address,
    /// Authenticated address, same value as `sub`
    pub address: Address,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Token ID, for log correlation only
    pub jti: String,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Signs and verifies credentials
pub struct CredentialCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl CredentialCodec {
    /// Create a codec from the signing secret
    ///
    /// # Arguments
    /// * `secret` - HMAC secret, loaded once at startup
    /// * `ttl` - Lifetime of issued credentials
    /// * `clock` - Time source for `iat`/`exp` and expiry checks
    pub fn new(secret: &[u8], ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
            clock,
        }
    }

    /// Build claims for `address` valid from now for the configured TTL
    pub fn claims_for(&self, address: &Address) -> Claims {
        let now = self.clock.now();
        let exp = now
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Claims {
            sub: address.clone(),
            address: address.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Sign `claims` into a compact token
    pub fn issue(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    /// Verify a token and return its claims
    ///
    /// # Returns
    /// * `Ok(Claims)` if the signature verifies and `now <= exp`
    /// * `Err(JwtError::TokenExpired)` if `now > exp`
    /// * `Err(JwtError::InvalidToken)` for any other failure
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "sub".to_string()]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| JwtError::InvalidToken(e.to_string()))?;

        let claims = token_data.claims;

        if claims.sub != claims.address {
            return Err(JwtError::InvalidToken("Subject mismatch".to_string()));
        }

        if self.clock.now().timestamp() > claims.exp {
            return Err(JwtError::TokenExpired);
        }

        Ok(claims)
    }
}
