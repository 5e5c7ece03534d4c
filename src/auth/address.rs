//! Account addresses
//!
//! An address is 20 bytes rendered as `0x` followed by 40 hex digits.
//! Input is accepted in any hex case; the stored form is always lowercase.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of the textual form: `0x` + 40 hex digits
const ADDRESS_TEXT_LEN: usize = 42;

/// Address parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid Ethereum address: {0}")]
    InvalidFormat(String),
}

/// A normalized (lowercase) account address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Parse and normalize an address
    ///
    /// # Returns
    /// * `Ok(Address)` holding the lowercase form
    /// * `Err(AddressError)` if the text is not `0x` + 40 hex digits
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        if !is_valid_address_format(text) {
            return Err(AddressError::InvalidFormat(text.to_string()));
        }

        Ok(Self(text.to_ascii_lowercase()))
    }

    /// Build an address from its raw 20 bytes
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// The lowercase textual form, including the `0x` prefix
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 40 lowercase hex digits without the prefix
    pub fn hex_digits(&self) -> &str {
        &self.0[2..]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Check that `text` is `0x` followed by exactly 40 hex digits
///
/// Purely syntactic: no checksum, no network access.
pub fn is_valid_address_format(text: &str) -> bool {
    text.len() == ADDRESS_TEXT_LEN
        && text.starts_with("0x")
        && text[2..].bytes().all(|b| b.is_ascii_hexdigit())
}
