//! Address types for PrivatePay.
//!
//! - [`EthAddress`]: 20-byte account address with EIP-55 checksum display
//! - [`TxHash`]: 32-byte transaction hash
//! - [`MetaAddress`]: The publishable (spend key, viewing key) pair
//! - [`RegisteredMetaAddress`]: A meta-address as stored by the on-chain registry

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use super::keys::decode_hex;
use super::SecpPublicKey;
use crate::constants::{
    COMPRESSED_PUBLIC_KEY_SIZE, ETH_ADDRESS_SIZE, META_ADDRESS_SERIALIZED_SIZE,
    MIN_PROTOCOL_VERSION, PROTOCOL_VERSION, TX_HASH_SIZE,
};
use crate::error::{PrivatePayError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// ETHEREUM ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// A 20-byte EVM address.
///
/// Displayed with the EIP-55 mixed-case checksum. Parsing accepts all-lower
/// and all-upper hex as-is; mixed-case input must carry a valid checksum.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EthAddress {
    bytes: [u8; ETH_ADDRESS_SIZE],
}

impl EthAddress {
    /// Creates an address from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ETH_ADDRESS_SIZE {
            return Err(PrivatePayError::InvalidAddress(format!(
                "expected {} bytes, got {}",
                ETH_ADDRESS_SIZE,
                bytes.len()
            )));
        }

        let mut arr = [0u8; ETH_ADDRESS_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Creates from a fixed-size array.
    pub const fn from_array(bytes: [u8; ETH_ADDRESS_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the fixed-size array.
    pub fn to_array(&self) -> [u8; ETH_ADDRESS_SIZE] {
        self.bytes
    }

    /// Returns checksummed hex string (EIP-55).
    pub fn to_checksum_string(&self) -> String {
        let lower = hex::encode(self.bytes);
        let hash = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(2 + 2 * ETH_ADDRESS_SIZE);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Returns the lowercase `0x`-prefixed hex string.
    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.bytes))
    }

    /// Parses from hex string (with or without 0x prefix).
    ///
    /// # Errors
    /// `InvalidAddress` on bad length, bad hex, or a failed EIP-55 checksum.
    pub fn from_hex(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if body.len() != 2 * ETH_ADDRESS_SIZE {
            return Err(PrivatePayError::InvalidAddress(format!(
                "expected {} hex characters, got {}",
                2 * ETH_ADDRESS_SIZE,
                body.len()
            )));
        }

        let bytes =
            hex::decode(body).map_err(|e| PrivatePayError::InvalidAddress(e.to_string()))?;
        let address = Self::from_bytes(&bytes)?;

        let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && address.to_checksum_string()[2..] != *body {
            return Err(PrivatePayError::InvalidAddress(format!(
                "EIP-55 checksum mismatch for {}",
                trimmed
            )));
        }

        Ok(address)
    }

    /// Returns the zero address.
    pub const fn zero() -> Self {
        Self {
            bytes: [0u8; ETH_ADDRESS_SIZE],
        }
    }

    /// Returns true if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    /// Shortened display form, e.g. `0x6F40...0590669`.
    pub fn short(&self, chars: usize) -> String {
        let full = self.to_checksum_string();
        let chars = chars.min(20);
        format!("{}...{}", &full[..2 + chars], &full[full.len() - chars..])
    }
}

impl std::fmt::Debug for EthAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EthAddress({})", self.to_checksum_string())
    }
}

impl std::fmt::Display for EthAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_checksum_string())
    }
}

impl std::str::FromStr for EthAddress {
    type Err = PrivatePayError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for EthAddress {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_checksum_string())
    }
}

impl<'de> Deserialize<'de> for EthAddress {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSACTION HASH
// ═══════════════════════════════════════════════════════════════════════════════

/// A 32-byte transaction hash, rendered as `0x` + 64 hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash {
    bytes: [u8; TX_HASH_SIZE],
}

impl TxHash {
    /// Creates a hash from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != TX_HASH_SIZE {
            return Err(PrivatePayError::InvalidTxHash(format!(
                "expected {} bytes, got {}",
                TX_HASH_SIZE,
                bytes.len()
            )));
        }
        let mut arr = [0u8; TX_HASH_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Creates from a fixed-size array.
    pub const fn from_array(bytes: [u8; TX_HASH_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; TX_HASH_SIZE] {
        &self.bytes
    }

    /// Returns the `0x`-prefixed lowercase hex string.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.bytes))
    }

    /// Parses a `0x`-prefixed (or bare) 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = decode_hex(s).map_err(|e| PrivatePayError::InvalidTxHash(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TxHash({})", self.to_hex())
    }
}

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for TxHash {
    type Err = PrivatePayError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for TxHash {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// META-ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// A recipient's publishable identity for receiving stealth payments.
///
/// # Structure
/// - `version`: Wire format version
/// - `spend_public_key`: Tweaked per payment to produce the stealth public key
/// - `viewing_public_key`: Combined with the sender's ephemeral key via ECDH
///
/// # Wire format
/// ```text
/// version (1) || spend_pk (33) || viewing_pk (33)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetaAddress {
    /// Wire format version
    pub version: u8,
    /// Spend public key
    pub spend_public_key: SecpPublicKey,
    /// Viewing public key
    pub viewing_public_key: SecpPublicKey,
}

impl MetaAddress {
    /// Creates a new meta-address with the current protocol version.
    pub fn new(spend_public_key: SecpPublicKey, viewing_public_key: SecpPublicKey) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            spend_public_key,
            viewing_public_key,
        }
    }

    /// Validates the meta-address structure.
    pub fn validate(&self) -> Result<()> {
        if self.version < MIN_PROTOCOL_VERSION || self.version > PROTOCOL_VERSION {
            return Err(PrivatePayError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                actual: self.version,
            });
        }

        if self.spend_public_key == self.viewing_public_key {
            return Err(PrivatePayError::InvalidMetaAddress(
                "spend and viewing keys must differ".into(),
            ));
        }

        Ok(())
    }

    /// Serializes to the 67-byte wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(META_ADDRESS_SERIALIZED_SIZE);
        bytes.push(self.version);
        bytes.extend_from_slice(self.spend_public_key.as_bytes());
        bytes.extend_from_slice(self.viewing_public_key.as_bytes());
        bytes
    }

    /// Deserializes from the 67-byte wire format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != META_ADDRESS_SERIALIZED_SIZE {
            return Err(PrivatePayError::InvalidMetaAddress(format!(
                "expected {} bytes, got {}",
                META_ADDRESS_SERIALIZED_SIZE,
                bytes.len()
            )));
        }

        let split = 1 + COMPRESSED_PUBLIC_KEY_SIZE;
        let meta = Self {
            version: bytes[0],
            spend_public_key: SecpPublicKey::from_bytes(&bytes[1..split])?,
            viewing_public_key: SecpPublicKey::from_bytes(&bytes[split..])?,
        };

        meta.validate()?;
        Ok(meta)
    }

    /// Encodes to a `0x`-prefixed hex string.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    /// Decodes from a hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes =
            decode_hex(s).map_err(|e| PrivatePayError::InvalidMetaAddress(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

/// A meta-address as stored by the registry contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredMetaAddress {
    /// Wallet that registered the meta-address
    pub owner: EthAddress,
    /// Per-owner index (0 for the first registration)
    pub index: u64,
    /// The published keys
    pub meta_address: MetaAddress,
    /// Registration timestamp (Unix seconds)
    pub created_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn pk(prefix: u8, fill: u8) -> SecpPublicKey {
        let mut bytes = [fill; COMPRESSED_PUBLIC_KEY_SIZE];
        bytes[0] = prefix;
        SecpPublicKey::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn test_meta_address_creation() {
        let meta = MetaAddress::new(pk(0x02, 1), pk(0x03, 2));
        assert_eq!(meta.version, PROTOCOL_VERSION);
        assert!(meta.validate().is_ok());
    }

    #[test]
    fn test_meta_address_bytes_layout() {
        let meta = MetaAddress::new(pk(0x02, 0xAA), pk(0x03, 0xBB));
        let bytes = meta.to_bytes();
        assert_eq!(bytes.len(), META_ADDRESS_SERIALIZED_SIZE);
        assert_eq!(bytes[0], PROTOCOL_VERSION);
        assert_eq!(bytes[1], 0x02);
        assert_eq!(bytes[34], 0x03);
        assert_eq!(MetaAddress::from_bytes(&bytes).unwrap(), meta);
    }

    #[test]
    fn test_meta_address_hex_roundtrip() {
        let meta = MetaAddress::new(pk(0x02, 0x12), pk(0x02, 0x34));
        let hex = meta.to_hex();
        assert!(hex.starts_with("0x01"));
        assert_eq!(MetaAddress::from_hex(&hex).unwrap(), meta);
    }

    #[test]
    fn test_meta_address_validation() {
        let same = MetaAddress::new(pk(0x02, 7), pk(0x02, 7));
        assert!(matches!(
            same.validate(),
            Err(PrivatePayError::InvalidMetaAddress(_))
        ));

        let mut future = MetaAddress::new(pk(0x02, 1), pk(0x03, 2));
        future.version = 9;
        assert!(matches!(
            future.validate(),
            Err(PrivatePayError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_meta_address_wrong_length() {
        assert!(matches!(
            MetaAddress::from_bytes(&[1u8; 40]),
            Err(PrivatePayError::InvalidMetaAddress(_))
        ));
    }

    // Vectors from EIP-55.
    #[test_case("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")]
    #[test_case("0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359")]
    #[test_case("0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB")]
    #[test_case("0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb")]
    fn test_eip55_checksum(expected: &str) {
        let addr = EthAddress::from_hex(&expected.to_lowercase()).unwrap();
        assert_eq!(addr.to_checksum_string(), expected);
        assert_eq!(EthAddress::from_hex(expected).unwrap(), addr);
    }

    #[test]
    fn test_eip55_rejects_bad_checksum() {
        let result = EthAddress::from_hex("0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        assert!(matches!(result, Err(PrivatePayError::InvalidAddress(_))));
    }

    #[test_case("0x1234" ; "too short")]
    #[test_case("0xgggggggggggggggggggggggggggggggggggggggg" ; "not hex")]
    #[test_case("" ; "empty")]
    fn test_eth_address_invalid(input: &str) {
        assert!(matches!(
            EthAddress::from_hex(input),
            Err(PrivatePayError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_eth_address_formatting() {
        let addr = EthAddress::from_array([0xAB; 20]);
        let s = addr.to_checksum_string();
        assert!(s.starts_with("0x"));
        assert_eq!(s.len(), 42);
        assert_eq!(addr.to_lower_hex(), format!("0x{}", "ab".repeat(20)));
    }

    #[test]
    fn test_eth_address_zero() {
        assert!(EthAddress::zero().is_zero());
        assert!(!EthAddress::from_array([1; 20]).is_zero());
    }

    #[test]
    fn test_eth_address_short() {
        let addr = EthAddress::from_hex("0x6F40A56250fbB57F5a17C815BE66A36804590669").unwrap();
        assert_eq!(addr.short(4), "0x6F40...0669");
    }

    #[test]
    fn test_eth_address_serde_uses_checksum() {
        let addr = EthAddress::from_hex("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed\"");
        let back: EthAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_tx_hash_format() {
        let hash = TxHash::from_array([0x0f; 32]);
        let s = hash.to_hex();
        assert_eq!(s.len(), 66);
        assert_eq!(TxHash::from_hex(&s).unwrap(), hash);
        assert!(matches!(
            TxHash::from_hex("0x1234"),
            Err(PrivatePayError::InvalidTxHash(_))
        ));
    }
}
