//! ENS profile resolution over Ethereum JSON-RPC
//!
//! Looks up the primary name of an address through the reverse registrar,
//! confirms the name resolves back to the same address, and reads its
//! `avatar` text record. Every call is a plain `eth_call`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::address::Address;
use super::crypto::keccak256;
use super::identity::{IdentityEnricher, IdentityError, IdentityProfile};

/// ENS registry, same address on mainnet and testnets
const ENS_REGISTRY: &str = "0x00000000000c2e074ec69a0dfb2997ba6c7d2e1e";

const IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// ENS-backed identity enricher
#[derive(Clone)]
pub struct EnsResolver {
    client: reqwest::Client,
    rpc_url: String,
}

impl EnsResolver {
    /// Create a resolver against `rpc_url`, bounding each RPC call by `timeout`
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
        })
    }

    /// Primary ENS name of `address`, if set and forward-verified
    pub async fn lookup_name(&self, address: &Address) -> Result<Option<String>, IdentityError> {
        let reverse_node = namehash(&format!("{}.addr.reverse", address.hex_digits()));

        let Some(resolver) = self.resolver_of(&reverse_node).await? else {
            return Ok(None);
        };

        let data = encode_call("name(bytes32)", &[&reverse_node]);
        let name = match decode_string(&self.eth_call(&resolver, &data).await?)? {
            Some(name) if !name.is_empty() => name,
            _ => return Ok(None),
        };

        // A reverse record is only trusted if the name points back here
        match self.lookup_address(&name).await? {
            Some(forward) if &forward == address => Ok(Some(name)),
            _ => {
                tracing::debug!(address = %address, name = %name, "ENS reverse record not forward-verified");
                Ok(None)
            }
        }
    }

    /// Address an ENS name resolves to
    pub async fn lookup_address(&self, name: &str) -> Result<Option<Address>, IdentityError> {
        let node = namehash(name);

        let Some(resolver) = self.resolver_of(&node).await? else {
            return Ok(None);
        };

        let data = encode_call("addr(bytes32)", &[&node]);
        Ok(decode_address(&self.eth_call(&resolver, &data).await?))
    }

    /// Avatar URL of an ENS name
    pub async fn lookup_avatar(&self, name: &str) -> Result<Option<String>, IdentityError> {
        let node = namehash(name);

        let Some(resolver) = self.resolver_of(&node).await? else {
            return Ok(None);
        };

        let data = encode_text_call(&node, "avatar");
        let record = decode_string(&self.eth_call(&resolver, &data).await?)?;

        Ok(record.and_then(|r| avatar_url(&r)))
    }

    async fn resolver_of(&self, node: &[u8; 32]) -> Result<Option<Address>, IdentityError> {
        let data = encode_call("resolver(bytes32)", &[node]);
        let registry = Address::parse(ENS_REGISTRY)
            .map_err(|e| IdentityError::MalformedResponse(e.to_string()))?;

        Ok(decode_address(&self.eth_call(&registry, &data).await?))
    }

    async fn eth_call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>, IdentityError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                { "to": to.as_str(), "data": format!("0x{}", hex::encode(data)) },
                "latest"
            ]
        });

        let response: RpcResponse = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(IdentityError::Rpc(format!(
                "{} (code {})",
                error.message, error.code
            )));
        }

        let result = response
            .result
            .ok_or_else(|| IdentityError::MalformedResponse("missing result".to_string()))?;

        let stripped = result.strip_prefix("0x").unwrap_or(&result);
        hex::decode(stripped).map_err(|e| IdentityError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl IdentityEnricher for EnsResolver {
    async fn resolve(&self, address: &Address) -> Result<IdentityProfile, IdentityError> {
        let Some(name) = self.lookup_name(address).await? else {
            return Ok(IdentityProfile::default());
        };

        let avatar_url = self.lookup_avatar(&name).await?;

        Ok(IdentityProfile {
            display_name: Some(name),
            avatar_url,
        })
    }
}

/// EIP-137 namehash
pub fn namehash(name: &str) -> [u8; 32] {
    let mut node = [0u8; 32];

    if name.is_empty() {
        return node;
    }

    for label in name.rsplit('.') {
        let label_hash = keccak256(label.to_lowercase().as_bytes());

        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(&node);
        buf[32..].copy_from_slice(&label_hash);
        node = keccak256(&buf);
    }

    node
}

/// 4-byte function selector
fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Encode a call whose arguments are all static 32-byte words
fn encode_call(signature: &str, words: &[&[u8; 32]]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32 * words.len());
    data.extend_from_slice(&selector(signature));
    for word in words {
        data.extend_from_slice(*word);
    }
    data
}

/// Encode `text(bytes32,string)`
fn encode_text_call(node: &[u8; 32], key: &str) -> Vec<u8> {
    let key_bytes = key.as_bytes();
    let padded_len = key_bytes.len().div_ceil(32) * 32;

    let mut data = Vec::with_capacity(4 + 32 * 3 + padded_len);
    data.extend_from_slice(&selector("text(bytes32,string)"));
    data.extend_from_slice(node);
    data.extend_from_slice(&u256_word(64));
    data.extend_from_slice(&u256_word(key_bytes.len()));
    data.extend_from_slice(key_bytes);
    data.resize(4 + 32 * 3 + padded_len, 0);
    data
}

fn u256_word(value: usize) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

/// Read a 32-byte word at `offset` as a length or offset
fn read_usize(data: &[u8], offset: usize) -> Result<usize, IdentityError> {
    let word = offset
        .checked_add(32)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| IdentityError::MalformedResponse("truncated word".to_string()))?;

    if word[..24].iter().any(|b| *b != 0) {
        return Err(IdentityError::MalformedResponse(
            "word out of range".to_string(),
        ));
    }

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[24..]);
    usize::try_from(u64::from_be_bytes(bytes))
        .map_err(|_| IdentityError::MalformedResponse("word out of range".to_string()))
}

/// Decode an `address` return value, mapping the zero address to `None`
fn decode_address(data: &[u8]) -> Option<Address> {
    if data.len() < 32 {
        return None;
    }

    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&data[12..32]);

    if bytes.iter().all(|b| *b == 0) {
        None
    } else {
        Some(Address::from_bytes(bytes))
    }
}

/// Decode a dynamic `string` return value
///
/// Empty return data (no contract or no such function) decodes to `None`.
fn decode_string(data: &[u8]) -> Result<Option<String>, IdentityError> {
    if data.is_empty() {
        return Ok(None);
    }

    let offset = read_usize(data, 0)?;
    let len = read_usize(data, offset)?;
    let start = offset + 32;

    let bytes = start
        .checked_add(len)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| IdentityError::MalformedResponse("truncated string".to_string()))?;

    String::from_utf8(bytes.to_vec())
        .map(Some)
        .map_err(|e| IdentityError::MalformedResponse(e.to_string()))
}

/// Turn an `avatar` text record into a fetchable URL
///
/// NFT references (`eip155:...`) are not resolved.
fn avatar_url(record: &str) -> Option<String> {
    let record = record.trim();

    if record.starts_with("https://") || record.starts_with("http://") || record.starts_with("data:") {
        Some(record.to_string())
    } else if let Some(path) = record.strip_prefix("ipfs://") {
        let path = path.strip_prefix("ipfs/").unwrap_or(path);
        Some(format!("{}{}", IPFS_GATEWAY, path))
    } else {
        None
    }
}
