//! Ethereum signature verification
//!
//! Recovers the signer of an EIP-191 `personal_sign` message from a
//! secp256k1 recoverable signature and compares it to a claimed address.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use sha3::{Digest, Keccak256};
use thiserror::Error;

use super::address::{is_valid_address_format, Address};

/// Length of an `r || s || v` signature
const SIGNATURE_LEN: usize = 65;

/// Errors that can occur during signature verification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid signature format: {0}")]
    InvalidSignatureFormat(String),
}

/// Verifies that a message was signed by the owner of an address
pub trait SignatureVerifier: Send + Sync {
    /// Syntactic address check, no cryptographic work
    fn is_valid_address_format(&self, text: &str) -> bool {
        is_valid_address_format(text)
    }

    /// Recover the signer of `message` and compare it to `address`
    ///
    /// # Returns
    /// * `Ok(true)` if the recovered signer is `address`
    /// * `Ok(false)` if the signature is well-formed but from another key
    /// * `Err(CryptoError)` if the signature cannot be parsed or recovered
    fn verify(&self, address: &Address, signature: &str, message: &str)
        -> Result<bool, CryptoError>;
}

/// EIP-191 `personal_sign` verifier
#[derive(Debug, Default, Clone, Copy)]
pub struct Eip191Verifier;

impl SignatureVerifier for Eip191Verifier {
    fn verify(
        &self,
        address: &Address,
        signature: &str,
        message: &str,
    ) -> Result<bool, CryptoError> {
        let recovered = recover_signer(message, signature)?;
        Ok(&recovered == address)
    }
}

/// Recover the address that produced `signature_hex` over `message`
pub fn recover_signer(message: &str, signature_hex: &str) -> Result<Address, CryptoError> {
    let (signature, recovery_id) = parse_signature(signature_hex)?;
    let digest = eip191_hash(message.as_bytes());

    let verifying_key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))?;

    Ok(address_from_verifying_key(&verifying_key))
}

/// Hash a message the way wallets do for `personal_sign`
pub fn eip191_hash(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// Keccak-256 of `data`
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Derive the account address of a public key
///
/// The address is the last 20 bytes of the Keccak-256 hash of the
/// uncompressed point without its `0x04` tag.
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = PublicKey::from(key).to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);

    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    Address::from_bytes(bytes)
}

/// Parse a hex `r || s || v` signature
fn parse_signature(signature_hex: &str) -> Result<(Signature, RecoveryId), CryptoError> {
    let trimmed = signature_hex.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    let bytes = hex::decode(stripped)
        .map_err(|e| CryptoError::InvalidSignatureFormat(format!("Invalid hex: {}", e)))?;

    if bytes.len() != SIGNATURE_LEN {
        return Err(CryptoError::InvalidSignatureFormat(format!(
            "Expected {} bytes, got {}",
            SIGNATURE_LEN,
            bytes.len()
        )));
    }

    let mut signature = Signature::from_slice(&bytes[..64])
        .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))?;

    // Wallets emit v as 27/28; raw recovery ids 0/1 are also accepted
    let mut v = match bytes[64] {
        27 | 28 => bytes[64] - 27,
        0 | 1 => bytes[64],
        other => {
            return Err(CryptoError::InvalidSignatureFormat(format!(
                "Invalid recovery id: {}",
                other
            )))
        }
    };

    // High-s signatures recover the same key once s is negated and the parity flipped
    if let Some(normalized) = signature.normalize_s() {
        signature = normalized;
        v ^= 1;
    }

    let recovery_id = RecoveryId::from_byte(v).ok_or_else(|| {
        CryptoError::InvalidSignatureFormat(format!("Invalid recovery id: {}", v))
    })?;

    Ok((signature, recovery_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    fn signing_key(seed: u8) -> SigningKey {
        SigningKey::from_slice(&[seed; 32]).unwrap()
    }

    fn sign(key: &SigningKey, message: &str) -> String {
        let digest = eip191_hash(message.as_bytes());
        let (signature, recovery_id) = key.sign_prehash_recoverable(&digest).unwrap();

        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte() + 27);
        format!("0x{}", hex::encode(bytes))
    }

    #[test]
    fn test_address_from_known_key() {
        // Private key / address pair from the web3.js account docs
        let key = SigningKey::from_slice(
            &hex::decode("4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318")
                .unwrap(),
        )
        .unwrap();

        let address = address_from_verifying_key(key.verifying_key());
        assert_eq!(
            address.as_str(),
            "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23"
        );
    }

    #[test]
    fn test_verify_valid_signature() {
        let key = signing_key(7);
        let address = address_from_verifying_key(key.verifying_key());
        let message = "Please sign this message to authenticate.";

        let signature = sign(&key, message);
        assert_eq!(Eip191Verifier.verify(&address, &signature, message), Ok(true));
    }

    #[test]
    fn test_verify_accepts_raw_recovery_id_without_prefix() {
        let key = signing_key(9);
        let address = address_from_verifying_key(key.verifying_key());
        let message = "hello";

        let digest = eip191_hash(message.as_bytes());
        let (signature, recovery_id) = key.sign_prehash_recoverable(&digest).unwrap();
        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte());

        let result = Eip191Verifier.verify(&address, &hex::encode(bytes), message);
        assert_eq!(result, Ok(true));
    }

    #[test]
    fn test_verify_wrong_signer_is_false() {
        let signer = signing_key(7);
        let claimed = address_from_verifying_key(signing_key(8).verifying_key());
        let message = "test message";

        let signature = sign(&signer, message);
        assert_eq!(Eip191Verifier.verify(&claimed, &signature, message), Ok(false));
    }

    #[test]
    fn test_verify_different_message_is_false() {
        let key = signing_key(7);
        let address = address_from_verifying_key(key.verifying_key());

        let signature = sign(&key, "test message");
        assert_eq!(
            Eip191Verifier.verify(&address, &signature, "wrong message"),
            Ok(false)
        );
    }

    #[test]
    fn test_verify_is_case_insensitive_on_claimed_address() {
        let key = signing_key(7);
        let recovered = address_from_verifying_key(key.verifying_key());
        let claimed = Address::parse(&recovered.as_str().to_ascii_uppercase().replacen("0X", "0x", 1))
            .unwrap();

        let signature = sign(&key, "msg");
        assert_eq!(Eip191Verifier.verify(&claimed, &signature, "msg"), Ok(true));
    }

    #[test]
    fn test_verify_accepts_high_s() {
        let key = signing_key(11);
        let address = address_from_verifying_key(key.verifying_key());
        let message = "malleable";

        let digest = eip191_hash(message.as_bytes());
        let (signature, recovery_id) = key.sign_prehash_recoverable(&digest).unwrap();
        let negated_s = (-*signature.s()).to_bytes();

        let mut bytes = signature.to_bytes()[..32].to_vec();
        bytes.extend_from_slice(&negated_s);
        bytes.push((recovery_id.to_byte() ^ 1) + 27);

        let result = Eip191Verifier.verify(&address, &hex::encode(bytes), message);
        assert_eq!(result, Ok(true));
    }

    #[test]
    fn test_invalid_hex() {
        let address = Address::parse("0x2c7536e3605d9c16a7a3d7b1898e529396a65c23").unwrap();
        let result = Eip191Verifier.verify(&address, "0xnot-hex", "msg");
        assert!(matches!(result, Err(CryptoError::InvalidSignatureFormat(_))));
    }

    #[test]
    fn test_invalid_length() {
        let address = Address::parse("0x2c7536e3605d9c16a7a3d7b1898e529396a65c23").unwrap();
        let result = Eip191Verifier.verify(&address, &format!("0x{}", "ab".repeat(64)), "msg");
        assert!(matches!(result, Err(CryptoError::InvalidSignatureFormat(_))));
    }

    #[test]
    fn test_invalid_recovery_id() {
        let key = signing_key(7);
        let address = address_from_verifying_key(key.verifying_key());
        let mut signature = sign(&key, "msg");
        signature.truncate(signature.len() - 2);
        signature.push_str("05");

        let result = Eip191Verifier.verify(&address, &signature, "msg");
        assert!(matches!(result, Err(CryptoError::InvalidSignatureFormat(_))));
    }

    #[test]
    fn test_zero_signature_rejected() {
        let address = Address::parse("0x2c7536e3605d9c16a7a3d7b1898e529396a65c23").unwrap();
        let signature = format!("0x{}1b", "00".repeat(64));

        let result = Eip191Verifier.verify(&address, &signature, "msg");
        assert!(matches!(result, Err(CryptoError::InvalidSignatureFormat(_))));
    }

    #[test]
    fn test_eip191_hash_includes_length_prefix() {
        let expected = keccak256(b"\x19Ethereum Signed Message:\n5hello");
        assert_eq!(eip191_hash(b"hello"), expected);
    }
}
