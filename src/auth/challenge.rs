//! One-time authentication challenges
//!
//! Each address holds at most one live challenge. Issuing a new one replaces
//! the previous entry, and a challenge is deleted the moment it is matched.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use super::address::Address;
use super::clock::{Clock, RandomSource};

/// Default challenge lifetime
pub const DEFAULT_CHALLENGE_TTL_SECONDS: i64 = 300;

/// Bytes of entropy in each nonce
const NONCE_BYTES: usize = 32;

/// An issued challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub text: String,
    pub owner: Address,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Storage for pending challenges
///
/// `validate_and_consume` must be atomic per address: for one stored
/// challenge, at most one caller observes `true`.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Mint and store a fresh challenge for `address`, replacing any prior one
    async fn issue(&self, address: &Address) -> Challenge;

    /// Check `presented` against the stored challenge and delete it on match
    ///
    /// Returns `false` when no challenge exists, when the text differs, or
    /// when the challenge has expired (the expired entry is purged).
    async fn validate_and_consume(&self, address: &Address, presented: &str) -> bool;

    /// Remove every expired entry, returning how many were removed
    async fn sweep_expired(&self) -> usize;

    /// Number of challenges currently held
    async fn pending(&self) -> usize;
}

/// Process-local challenge store
pub struct InMemoryChallengeStore {
    entries: RwLock<HashMap<Address, Challenge>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
}

impl InMemoryChallengeStore {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>, random: Arc<dyn RandomSource>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
            random,
        }
    }

    fn generate_nonce(&self) -> String {
        let mut bytes = [0u8; NONCE_BYTES];
        self.random.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

#[async_trait]
impl ChallengeStore for InMemoryChallengeStore {
    async fn issue(&self, address: &Address) -> Challenge {
        let nonce = self.generate_nonce();
        let issued_at = self.clock.now();
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let challenge = Challenge {
            text: compose_challenge_text(address, &nonce, issued_at),
            owner: address.clone(),
            issued_at,
            expires_at,
        };

        let replaced = self
            .entries
            .write()
            .await
            .insert(address.clone(), challenge.clone())
            .is_some();

        tracing::debug!(
            address = %address,
            replaced,
            expires_at = %expires_at,
            "Challenge issued"
        );

        challenge
    }

    async fn validate_and_consume(&self, address: &Address, presented: &str) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        let Some(stored) = entries.get(address) else {
            tracing::debug!(address = %address, "No pending challenge");
            return false;
        };

        if stored.text != presented {
            tracing::debug!(address = %address, "Presented challenge does not match");
            return false;
        }

        if stored.is_expired_at(now) {
            entries.remove(address);
            tracing::debug!(address = %address, "Challenge expired");
            return false;
        }

        entries.remove(address);
        true
    }

    async fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();

        entries.retain(|_, challenge| !challenge.is_expired_at(now));

        before - entries.len()
    }

    async fn pending(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Build the human-readable text the wallet owner signs
fn compose_challenge_text(address: &Address, nonce: &str, issued_at: DateTime<Utc>) -> String {
    format!(
        "Please sign this message to authenticate.\n\nAddress: {}\nNonce: {}\nTimestamp: {}",
        address,
        nonce,
        issued_at.timestamp_millis()
    )
}

/// Periodically purge expired challenges
///
/// Expiry is already enforced at validation time; this only reclaims memory.
pub async fn challenge_sweeper(store: Arc<dyn ChallengeStore>, interval: StdDuration) {
    tracing::info!(interval_secs = interval.as_secs(), "Starting challenge sweeper");

    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let removed = store.sweep_expired().await;
        if removed > 0 {
            tracing::info!(removed, "Swept expired challenges");
        }
    }
}
