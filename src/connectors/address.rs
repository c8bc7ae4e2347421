//! Account address encoding.
//!
//! An address is the base32 (no padding) encoding of the 32-byte public key
//! followed by the last 4 bytes of its SHA-512/256 digest, 58 characters total.

use data_encoding::BASE32_NOPAD;
use sha2::{Digest, Sha512_256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const CHECKSUM_LEN: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("Address is not valid base32: {0}")]
    InvalidEncoding(String),

    #[error("Address decodes to {0} bytes, expected 36")]
    InvalidLength(usize),

    #[error("Address checksum mismatch")]
    ChecksumMismatch,
}

/// A decoded 32-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 32]);

impl Address {
    pub fn from_public_key(key: [u8; 32]) -> Self {
        Self(key)
    }

    /// The raw public key bytes, as used in box names and transaction fields.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        let digest = Sha512_256::digest(self.0);
        let mut checksum = [0u8; CHECKSUM_LEN];
        checksum.copy_from_slice(&digest[digest.len() - CHECKSUM_LEN..]);
        checksum
    }

    pub fn encode(&self) -> String {
        let mut raw = Vec::with_capacity(32 + CHECKSUM_LEN);
        raw.extend_from_slice(&self.0);
        raw.extend_from_slice(&self.checksum());
        BASE32_NOPAD.encode(&raw)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = BASE32_NOPAD
            .decode(s.trim().as_bytes())
            .map_err(|e| AddressError::InvalidEncoding(e.to_string()))?;

        if raw.len() != 32 + CHECKSUM_LEN {
            return Err(AddressError::InvalidLength(raw.len()));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&raw[..32]);
        let address = Address(key);

        if address.checksum()[..] != raw[32..] {
            return Err(AddressError::ChecksumMismatch);
        }

        Ok(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: &str = "7TL5PKBGPH4W7LEZW5SW5BGC4TH32XVFV5NVTXE4HTTPVK2JUJODCVTHSU";

    #[test]
    fn test_known_address_round_trips() {
        let address: Address = CONTRACT.parse().unwrap();
        assert_eq!(address.encode(), CONTRACT);
        assert_eq!(address.encode().len(), 58);
    }

    #[test]
    fn test_zero_address() {
        let zero = Address::from_public_key([0u8; 32]);
        assert_eq!(
            zero.encode(),
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ"
        );
    }

    #[test]
    fn test_rejects_bad_checksum() {
        let mut tampered = CONTRACT.to_string();
        tampered.replace_range(0..1, "A");
        assert_eq!(tampered.parse::<Address>(), Err(AddressError::ChecksumMismatch));
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(matches!(
            "AAAA".parse::<Address>(),
            Err(AddressError::InvalidLength(_)) | Err(AddressError::InvalidEncoding(_))
        ));
        assert!(matches!(
            "lowercase-not-base32".parse::<Address>(),
            Err(AddressError::InvalidEncoding(_))
        ));
    }
}
