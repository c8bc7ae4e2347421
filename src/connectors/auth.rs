//! Node credentials and the wallet signing key.
//!
//! The node authenticates with a static API token header. Transactions are
//! signed with the wallet's ed25519 key, which is loaded either from a
//! 25-word mnemonic or from a base64 private key (seed followed by public key).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::{Signer, SigningKey};
use sha2::{Digest, Sha512_256};
use thiserror::Error;

use super::address::Address;

/// Header the node expects the API token in.
pub const API_TOKEN_HEADER: &str = "X-Algo-API-Token";

const MNEMONIC_WORDS: usize = 25;
const SEED_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Mnemonic must have 25 words, got {0}")]
    WrongWordCount(usize),

    #[error("Unknown mnemonic word: {0}")]
    UnknownWord(String),

    #[error("Mnemonic checksum mismatch")]
    ChecksumMismatch,

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),
}

/// Credentials for the node's REST API.
#[derive(Clone, Default)]
pub struct NodeCredentials {
    pub api_token: String,
}

impl NodeCredentials {
    pub fn new(api_token: String) -> Self {
        Self { api_token }
    }

    /// Header pair to attach to every request, if a token is configured.
    pub fn auth_header(&self) -> Option<(&'static str, &str)> {
        if self.api_token.is_empty() {
            None
        } else {
            Some((API_TOKEN_HEADER, self.api_token.as_str()))
        }
    }
}

/// The wallet's signing key together with its derived address.
#[derive(Clone)]
pub struct WalletKey {
    signing_key: SigningKey,
    address: Address,
}

impl WalletKey {
    pub fn from_seed(seed: [u8; SEED_LEN]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let address = Address::from_public_key(signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            address,
        }
    }

    /// Parses a 25-word mnemonic.
    ///
    /// The first 24 words carry 11 bits each, packed little-endian, yielding
    /// the 32-byte seed plus a zero pad byte. The last word is the first 11
    /// bits of SHA-512/256 of the seed.
    pub fn from_mnemonic(phrase: &str) -> Result<Self, KeyError> {
        let words: Vec<String> = phrase
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect();
        if words.len() != MNEMONIC_WORDS {
            return Err(KeyError::WrongWordCount(words.len()));
        }

        let indices = words
            .iter()
            .map(|w| word_index(w).ok_or_else(|| KeyError::UnknownWord(w.clone())))
            .collect::<Result<Vec<u16>, _>>()?;

        let bytes = from_11_bit(&indices[..MNEMONIC_WORDS - 1]);
        if bytes.len() != SEED_LEN + 1 || bytes[SEED_LEN] != 0 {
            return Err(KeyError::ChecksumMismatch);
        }

        let mut seed = [0u8; SEED_LEN];
        seed.copy_from_slice(&bytes[..SEED_LEN]);

        if checksum_index(&seed) != indices[MNEMONIC_WORDS - 1] {
            return Err(KeyError::ChecksumMismatch);
        }

        Ok(Self::from_seed(seed))
    }

    /// Parses a base64 private key: 32-byte seed followed by the 32-byte
    /// public key. The public half must match the seed.
    pub fn from_private_key_base64(encoded: &str) -> Result<Self, KeyError> {
        let raw = BASE64
            .decode(encoded.trim())
            .map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))?;
        if raw.len() != 64 {
            return Err(KeyError::InvalidPrivateKey(format!(
                "expected 64 bytes, got {}",
                raw.len()
            )));
        }

        let mut seed = [0u8; SEED_LEN];
        seed.copy_from_slice(&raw[..SEED_LEN]);
        let key = Self::from_seed(seed);

        if key.address.as_bytes()[..] != raw[SEED_LEN..] {
            return Err(KeyError::InvalidPrivateKey(
                "public key does not match seed".to_string(),
            ));
        }
        Ok(key)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Signs `message` and returns the raw 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

fn word_index(word: &str) -> Option<u16> {
    bip39::Language::English
        .word_list()
        .iter()
        .position(|candidate| *candidate == word)
        .map(|i| i as u16)
}

fn checksum_index(seed: &[u8; SEED_LEN]) -> u16 {
    let digest = Sha512_256::digest(seed);
    to_11_bit(&digest[..2])[0]
}

/// Packs bytes into 11-bit groups, least significant bits first.
fn to_11_bit(bytes: &[u8]) -> Vec<u16> {
    let mut out = Vec::with_capacity(bytes.len() * 8 / 11 + 1);
    let mut buffer: u32 = 0;
    let mut bits = 0;

    for &byte in bytes {
        buffer |= (byte as u32) << bits;
        bits += 8;
        if bits >= 11 {
            out.push((buffer & 0x7ff) as u16);
            buffer >>= 11;
            bits -= 11;
        }
    }
    if bits != 0 {
        out.push((buffer & 0x7ff) as u16);
    }
    out
}

/// Inverse of [`to_11_bit`].
fn from_11_bit(values: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 11 / 8 + 1);
    let mut buffer: u32 = 0;
    let mut bits = 0;

    for &value in values {
        buffer |= (value as u32) << bits;
        bits += 11;
        while bits >= 8 {
            out.push((buffer & 0xff) as u8);
            buffer >>= 8;
            bits -= 8;
        }
    }
    if bits != 0 {
        out.push((buffer & 0xff) as u8);
    }
    out
}

impl std::fmt::Debug for NodeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeCredentials")
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

impl std::fmt::Debug for WalletKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletKey")
            .field("address", &self.address)
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}
