//! Wallet signature authentication
//!
//! - Challenge-response login with one-time, expiring challenges
//! - EIP-191 signature recovery over secp256k1
//! - JWT credential issuance and validation
//! - Optional ENS profile enrichment

mod address;
mod challenge;
mod clock;
mod crypto;
mod ens;
mod identity;
mod jwt;
mod service;

pub use address::{is_valid_address_format, Address, AddressError};
pub use challenge::{
    challenge_sweeper, Challenge, ChallengeStore, InMemoryChallengeStore,
    DEFAULT_CHALLENGE_TTL_SECONDS,
};
pub use clock::{Clock, ManualClock, OsRandom, RandomSource, SystemClock};
pub use crypto::{
    address_from_verifying_key, eip191_hash, recover_signer, CryptoError, Eip191Verifier,
    SignatureVerifier,
};
pub use ens::{namehash, EnsResolver};
pub use identity::{
    AuthenticatedIdentity, IdentityEnricher, IdentityError, IdentityProfile, NoopEnricher,
};
pub use jwt::{Claims, CredentialCodec, JwtError};
pub use service::{AuthError, AuthOutcome, AuthService};
