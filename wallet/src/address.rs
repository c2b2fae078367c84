// Ledger address type
// base58(sha256(public key) || checksum), checksum = first 4 bytes of sha256(digest)

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of the raw address digest in bytes
pub const ADDRESS_DIGEST_LEN: usize = 32;

const CHECKSUM_LEN: usize = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid base58 encoding: {0}")]
    InvalidEncoding(String),

    #[error("Invalid address length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid address checksum")]
    InvalidChecksum,

    #[error("Unable to convert {0} into an address. The address needs to be a base58 encoded value")]
    Unconvertible(String),
}

/// Ledger address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    digest: [u8; ADDRESS_DIGEST_LEN],
}

impl Address {
    /// Derive the address of a serialized public key
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let mut digest = [0u8; ADDRESS_DIGEST_LEN];
        digest.copy_from_slice(&Sha256::digest(public_key));
        Self { digest }
    }

    /// Parse the base58 rendering of an address, verifying its checksum
    pub fn parse(encoded: &str) -> Result<Self, AddressError> {
        let raw = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| AddressError::InvalidEncoding(e.to_string()))?;

        let expected = ADDRESS_DIGEST_LEN + CHECKSUM_LEN;
        if raw.len() != expected {
            return Err(AddressError::InvalidLength {
                expected,
                actual: raw.len(),
            });
        }

        let (body, checksum) = raw.split_at(ADDRESS_DIGEST_LEN);
        if checksum != &Self::checksum(body)[..] {
            return Err(AddressError::InvalidChecksum);
        }

        let mut digest = [0u8; ADDRESS_DIGEST_LEN];
        digest.copy_from_slice(body);
        Ok(Self { digest })
    }

    /// Raw 32 byte digest
    pub fn as_bytes(&self) -> &[u8; ADDRESS_DIGEST_LEN] {
        &self.digest
    }

    fn checksum(body: &[u8]) -> [u8; CHECKSUM_LEN] {
        let hash = Sha256::digest(body);
        let mut checksum = [0u8; CHECKSUM_LEN];
        checksum.copy_from_slice(&hash[..CHECKSUM_LEN]);
        checksum
    }
}

/// Parse an address supplied by the user, collapsing every failure into one
/// readable message.
pub fn checked_address(encoded: &str) -> Result<Address, AddressError> {
    Address::parse(encoded).map_err(|_| AddressError::Unconvertible(encoded.to_string()))
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw = Vec::with_capacity(ADDRESS_DIGEST_LEN + CHECKSUM_LEN);
        raw.extend_from_slice(&self.digest);
        raw.extend_from_slice(&Self::checksum(&self.digest));
        f.write_str(&bs58::encode(raw).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Address::parse(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_parse_round_trip() {
        let address = Address::from_public_key(b"some public key bytes");
        let rendered = address.to_string();

        let parsed = Address::parse(&rendered).unwrap();
        assert_eq!(parsed, address);
        assert_eq!(parsed.to_string(), rendered);
    }

    #[test]
    fn test_rendering_is_stable() {
        let a = Address::from_public_key(&[7u8; 33]);
        let b = Address::from_public_key(&[7u8; 33]);
        assert_eq!(a.to_string(), b.to_string());
        assert_ne!(a, Address::from_public_key(&[8u8; 33]));
    }

    #[test]
    fn test_invalid_address_exception() {
        let err = checked_address("foo-bar-baz").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to convert foo-bar-baz into an address. The address needs to be a base58 encoded value"
        );
    }

    #[test]
    fn test_wrong_length_rejected() {
        let short = bs58::encode([1u8; 10]).into_string();
        assert!(matches!(
            Address::parse(&short),
            Err(AddressError::InvalidLength { actual: 10, .. })
        ));
    }

    #[test]
    fn test_checksum_mismatch_rejected() {
        let address = Address::from_public_key(b"key");
        let mut raw = bs58::decode(address.to_string()).into_vec().unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;

        let tampered = bs58::encode(raw).into_string();
        assert_eq!(Address::parse(&tampered), Err(AddressError::InvalidChecksum));
    }

    #[test]
    fn test_serde_uses_string_form() {
        let address = Address::from_public_key(b"serde");
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{}\"", address));

        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }
}
