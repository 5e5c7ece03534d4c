//! Optional display metadata for authenticated addresses

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use super::address::Address;

/// Identity lookup errors
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("RPC request failed: {0}")]
    Rpc(String),

    #[error("Malformed RPC response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for IdentityError {
    fn from(e: reqwest::Error) -> Self {
        IdentityError::Rpc(e.to_string())
    }
}

/// Display metadata for an address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityProfile {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Identity returned to the caller after authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedIdentity {
    pub address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ens_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ens_avatar: Option<String>,
}

impl AuthenticatedIdentity {
    pub fn new(address: Address, profile: IdentityProfile) -> Self {
        Self {
            address,
            ens_name: profile.display_name,
            ens_avatar: profile.avatar_url,
        }
    }
}

/// Resolves display metadata for an address
///
/// Callers treat every error as "no metadata".
#[async_trait]
pub trait IdentityEnricher: Send + Sync {
    async fn resolve(&self, address: &Address) -> Result<IdentityProfile, IdentityError>;
}

/// Enricher that never finds anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEnricher;

#[async_trait]
impl IdentityEnricher for NoopEnricher {
    async fn resolve(&self, _address: &Address) -> Result<IdentityProfile, IdentityError> {
        Ok(IdentityProfile::default())
    }
}
