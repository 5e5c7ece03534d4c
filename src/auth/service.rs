//! Authentication service
//!
//! Drives the two-phase wallet login: issue a challenge, then accept a
//! signature over it and mint a credential.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::address::Address;
use super::challenge::{Challenge, ChallengeStore};
use super::crypto::{CryptoError, SignatureVerifier};
use super::identity::{AuthenticatedIdentity, IdentityEnricher, IdentityProfile};
use super::jwt::{Claims, CredentialCodec, JwtError};

/// Auth service errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid Ethereum address: {0}")]
    InvalidAddress(String),

    #[error("Invalid or expired challenge")]
    ChallengeInvalid,

    #[error("Invalid signature format: {0}")]
    SignatureFormat(String),

    #[error("Invalid signature")]
    SignatureInvalid,

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Credential expired")]
    CredentialExpired,

    #[error("Token encoding failed: {0}")]
    TokenEncoding(String),
}

impl From<CryptoError> for AuthError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidSignatureFormat(msg) => AuthError::SignatureFormat(msg),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::EncodingFailed(msg) => AuthError::TokenEncoding(msg),
            JwtError::InvalidToken(msg) => AuthError::InvalidCredential(msg),
            JwtError::TokenExpired => AuthError::CredentialExpired,
        }
    }
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthenticatedIdentity,
}

/// Authentication service
pub struct AuthService {
    challenges: Arc<dyn ChallengeStore>,
    verifier: Arc<dyn SignatureVerifier>,
    identity: Arc<dyn IdentityEnricher>,
    credentials: CredentialCodec,
    enrichment_timeout: Duration,
}

impl AuthService {
    /// Create a new AuthService from its collaborators
    pub fn new(
        challenges: Arc<dyn ChallengeStore>,
        verifier: Arc<dyn SignatureVerifier>,
        identity: Arc<dyn IdentityEnricher>,
        credentials: CredentialCodec,
        enrichment_timeout: Duration,
    ) -> Self {
        Self {
            challenges,
            verifier,
            identity,
            credentials,
            enrichment_timeout,
        }
    }

    /// Generate a challenge for `address` to sign
    pub async fn request_challenge(&self, address: &str) -> Result<Challenge, AuthError> {
        let address = self.parse_address(address)?;
        let challenge = self.challenges.issue(&address).await;

        tracing::info!(address = %address, "Challenge requested");

        Ok(challenge)
    }

    /// Verify a signed challenge and issue a credential
    ///
    /// The challenge is consumed before the signature is checked, so a
    /// failed attempt still burns it and the client must request a new one.
    pub async fn verify_and_authenticate(
        &self,
        address: &str,
        signature: &str,
        challenge: &str,
    ) -> Result<AuthOutcome, AuthError> {
        let address = self.parse_address(address)?;

        if !self.challenges.validate_and_consume(&address, challenge).await {
            tracing::warn!(address = %address, "Rejected login: challenge missing, mismatched or expired");
            return Err(AuthError::ChallengeInvalid);
        }

        let valid = self
            .verifier
            .verify(&address, signature, challenge)
            .map_err(|e| {
                tracing::warn!(address = %address, error = %e, "Rejected login: malformed signature");
                AuthError::from(e)
            })?;

        if !valid {
            tracing::warn!(address = %address, "Rejected login: signature from another key");
            return Err(AuthError::SignatureInvalid);
        }

        let profile = self.enrich(&address).await;

        let claims = self.credentials.claims_for(&address);
        let access_token = self.credentials.issue(&claims)?;

        tracing::info!(address = %address, jti = %claims.jti, "Login succeeded");

        Ok(AuthOutcome {
            access_token,
            expires_at: claims.expires_at(),
            user: AuthenticatedIdentity::new(address, profile),
        })
    }

    /// Validate a credential and return its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.credentials.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Credential rejected");
            AuthError::from(e)
        })
    }

    /// Best-effort identity for any well-formed address
    pub async fn profile(&self, address: &str) -> Result<AuthenticatedIdentity, AuthError> {
        let address = self.parse_address(address)?;
        let profile = self.enrich(&address).await;
        Ok(AuthenticatedIdentity::new(address, profile))
    }

    /// Number of challenges awaiting a signature
    pub async fn pending_challenges(&self) -> usize {
        self.challenges.pending().await
    }

    fn parse_address(&self, address: &str) -> Result<Address, AuthError> {
        if !self.verifier.is_valid_address_format(address) {
            return Err(AuthError::InvalidAddress(address.to_string()));
        }

        Address::parse(address).map_err(|e| AuthError::InvalidAddress(e.to_string()))
    }

    /// Resolve display metadata, swallowing failures and timeouts
    async fn enrich(&self, address: &Address) -> IdentityProfile {
        match tokio::time::timeout(self.enrichment_timeout, self.identity.resolve(address)).await {
            Ok(Ok(profile)) => profile,
            Ok(Err(e)) => {
                tracing::warn!(address = %address, error = %e, "Identity lookup failed");
                IdentityProfile::default()
            }
            Err(_) => {
                tracing::warn!(
                    address = %address,
                    timeout_ms = self.enrichment_timeout.as_millis() as u64,
                    "Identity lookup timed out"
                );
                IdentityProfile::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::challenge::InMemoryChallengeStore;
    use crate::auth::clock::{ManualClock, OsRandom};
    use crate::auth::crypto::{address_from_verifying_key, eip191_hash, Eip191Verifier};
    use crate::auth::identity::{IdentityError, NoopEnricher};
    use async_trait::async_trait;
    use k256::ecdsa::SigningKey;

    struct FailingEnricher;

    #[async_trait]
    impl IdentityEnricher for FailingEnricher {
        async fn resolve(&self, _address: &Address) -> Result<IdentityProfile, IdentityError> {
            Err(IdentityError::Rpc("connection refused".to_string()))
        }
    }

    struct SlowEnricher;

    #[async_trait]
    impl IdentityEnricher for SlowEnricher {
        async fn resolve(&self, _address: &Address) -> Result<IdentityProfile, IdentityError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(IdentityProfile {
                display_name: Some("late.eth".to_string()),
                avatar_url: None,
            })
        }
    }

    struct FixedEnricher;

    #[async_trait]
    impl IdentityEnricher for FixedEnricher {
        async fn resolve(&self, _address: &Address) -> Result<IdentityProfile, IdentityError> {
            Ok(IdentityProfile {
                display_name: Some("alice.eth".to_string()),
                avatar_url: Some("https://example.com/alice.png".to_string()),
            })
        }
    }

    fn create_service(identity: Arc<dyn IdentityEnricher>) -> (Arc<ManualClock>, AuthService) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = InMemoryChallengeStore::new(
            chrono::Duration::minutes(5),
            clock.clone(),
            Arc::new(OsRandom),
        );
        let codec = CredentialCodec::new(b"test-secret", chrono::Duration::days(7), clock.clone());

        let service = AuthService::new(
            Arc::new(store),
            Arc::new(Eip191Verifier),
            identity,
            codec,
            Duration::from_millis(50),
        );
        (clock, service)
    }

    fn sign(key: &SigningKey, message: &str) -> String {
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(&eip191_hash(message.as_bytes()))
            .unwrap();
        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte() + 27);
        format!("0x{}", hex::encode(bytes))
    }

    #[tokio::test]
    async fn test_login_flow() {
        let (_, service) = create_service(Arc::new(NoopEnricher));
        let key = SigningKey::from_slice(&[3u8; 32]).unwrap();
        let address = address_from_verifying_key(key.verifying_key());

        let challenge = service.request_challenge(address.as_str()).await.unwrap();
        let signature = sign(&key, &challenge.text);

        let outcome = service
            .verify_and_authenticate(address.as_str(), &signature, &challenge.text)
            .await
            .unwrap();

        assert_eq!(outcome.user.address, address);
        let claims = service.validate_token(&outcome.access_token).unwrap();
        assert_eq!(claims.sub, address);
        assert_eq!(claims.expires_at(), outcome.expires_at);
    }

    #[tokio::test]
    async fn test_wrong_signature_burns_challenge() {
        let (_, service) = create_service(Arc::new(NoopEnricher));
        let key = SigningKey::from_slice(&[3u8; 32]).unwrap();
        let other = SigningKey::from_slice(&[4u8; 32]).unwrap();
        let address = address_from_verifying_key(key.verifying_key());

        let challenge = service.request_challenge(address.as_str()).await.unwrap();

        let result = service
            .verify_and_authenticate(address.as_str(), &sign(&other, &challenge.text), &challenge.text)
            .await;
        assert_eq!(result.unwrap_err(), AuthError::SignatureInvalid);

        // The right signature no longer helps: the challenge is gone
        let result = service
            .verify_and_authenticate(address.as_str(), &sign(&key, &challenge.text), &challenge.text)
            .await;
        assert_eq!(result.unwrap_err(), AuthError::ChallengeInvalid);
    }

    #[tokio::test]
    async fn test_malformed_signature_burns_challenge() {
        let (_, service) = create_service(Arc::new(NoopEnricher));
        let key = SigningKey::from_slice(&[3u8; 32]).unwrap();
        let address = address_from_verifying_key(key.verifying_key());

        let challenge = service.request_challenge(address.as_str()).await.unwrap();

        let result = service
            .verify_and_authenticate(address.as_str(), "0x1234", &challenge.text)
            .await;
        assert!(matches!(result, Err(AuthError::SignatureFormat(_))));
        assert_eq!(service.pending_challenges().await, 0);
    }

    #[tokio::test]
    async fn test_enrichment_failure_does_not_fail_login() {
        let (_, service) = create_service(Arc::new(FailingEnricher));
        let key = SigningKey::from_slice(&[5u8; 32]).unwrap();
        let address = address_from_verifying_key(key.verifying_key());

        let challenge = service.request_challenge(address.as_str()).await.unwrap();
        let outcome = service
            .verify_and_authenticate(address.as_str(), &sign(&key, &challenge.text), &challenge.text)
            .await
            .unwrap();

        assert_eq!(outcome.user.ens_name, None);
        assert_eq!(outcome.user.ens_avatar, None);
    }

    #[tokio::test]
    async fn test_enrichment_timeout_does_not_fail_login() {
        let (_, service) = create_service(Arc::new(SlowEnricher));
        let key = SigningKey::from_slice(&[6u8; 32]).unwrap();
        let address = address_from_verifying_key(key.verifying_key());

        let challenge = service.request_challenge(address.as_str()).await.unwrap();
        let outcome = service
            .verify_and_authenticate(address.as_str(), &sign(&key, &challenge.text), &challenge.text)
            .await
            .unwrap();

        assert_eq!(outcome.user.ens_name, None);
    }

    #[tokio::test]
    async fn test_enrichment_fields_populated() {
        let (_, service) = create_service(Arc::new(FixedEnricher));
        let key = SigningKey::from_slice(&[7u8; 32]).unwrap();
        let address = address_from_verifying_key(key.verifying_key());

        let challenge = service.request_challenge(address.as_str()).await.unwrap();
        let outcome = service
            .verify_and_authenticate(address.as_str(), &sign(&key, &challenge.text), &challenge.text)
            .await
            .unwrap();

        assert_eq!(outcome.user.ens_name.as_deref(), Some("alice.eth"));
        assert_eq!(
            outcome.user.ens_avatar.as_deref(),
            Some("https://example.com/alice.png")
        );
    }

    #[tokio::test]
    async fn test_invalid_address_rejected_before_lookup() {
        let (_, service) = create_service(Arc::new(NoopEnricher));

        let result = service.request_challenge("0xInvalid").await;
        assert!(matches!(result, Err(AuthError::InvalidAddress(_))));

        let result = service
            .verify_and_authenticate("0xInvalid", "0x00", "challenge")
            .await;
        assert!(matches!(result, Err(AuthError::InvalidAddress(_))));

        let result = service.profile("not-an-address").await;
        assert!(matches!(result, Err(AuthError::InvalidAddress(_))));

        assert_eq!(service.pending_challenges().await, 0);
    }

    #[tokio::test]
    async fn test_validate_token_errors() {
        let (clock, service) = create_service(Arc::new(NoopEnricher));
        let key = SigningKey::from_slice(&[8u8; 32]).unwrap();
        let address = address_from_verifying_key(key.verifying_key());

        assert!(matches!(
            service.validate_token("garbage"),
            Err(AuthError::InvalidCredential(_))
        ));

        let challenge = service.request_challenge(address.as_str()).await.unwrap();
        let outcome = service
            .verify_and_authenticate(address.as_str(), &sign(&key, &challenge.text), &challenge.text)
            .await
            .unwrap();

        clock.advance(chrono::Duration::days(7) + chrono::Duration::seconds(1));
        assert_eq!(
            service.validate_token(&outcome.access_token).unwrap_err(),
            AuthError::CredentialExpired
        );
    }
}
