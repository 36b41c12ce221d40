//! Key types for PrivatePay.
//!
//! This module defines the secp256k1 key containers used in the protocol:
//!
//! - [`SecpPublicKey`]: SEC1 compressed public key (33 bytes)
//! - [`SecpSecretKey`]: 32-byte scalar, zeroized on drop
//! - [`KeyPair`]: Combined public + secret key
//! - [`MetaAddressKeys`]: The spend and viewing key pairs behind a meta-address
//! - [`SharedSecret`]: ECDH output, zeroized on drop
//!
//! These are byte containers with structural checks only. Curve membership is
//! verified by `privatepay-crypto` when the bytes are turned into points.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::MetaAddress;
use crate::constants::{COMPRESSED_PUBLIC_KEY_SIZE, SECRET_KEY_SIZE, SHARED_SECRET_SIZE};
use crate::error::{PrivatePayError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// PUBLIC KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// A secp256k1 public key in SEC1 compressed form.
///
/// Safe to share. Meta-addresses, ephemeral keys, and stealth public keys all
/// travel in this encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SecpPublicKey {
    bytes: [u8; COMPRESSED_PUBLIC_KEY_SIZE],
}

impl SecpPublicKey {
    /// Creates a public key from 33 compressed bytes.
    ///
    /// # Errors
    /// Returns `InvalidPublicKey` if the length or the SEC1 prefix is wrong.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != COMPRESSED_PUBLIC_KEY_SIZE {
            return Err(PrivatePayError::InvalidPublicKey(format!(
                "expected {} bytes, got {}",
                COMPRESSED_PUBLIC_KEY_SIZE,
                bytes.len()
            )));
        }
        if bytes[0] != 0x02 && bytes[0] != 0x03 {
            return Err(PrivatePayError::InvalidPublicKey(format!(
                "invalid SEC1 prefix 0x{:02x}",
                bytes[0]
            )));
        }

        let mut arr = [0u8; COMPRESSED_PUBLIC_KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Returns the raw bytes of the public key.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the public key as a fixed-size array reference.
    pub fn as_array(&self) -> &[u8; COMPRESSED_PUBLIC_KEY_SIZE] {
        &self.bytes
    }

    /// Returns the `0x`-prefixed hex encoding.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.bytes))
    }

    /// Parses a hex string, with or without `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = decode_hex(s).map_err(|e| PrivatePayError::InvalidPublicKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for SecpPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SecpPublicKey({}...{})",
            hex::encode(&self.bytes[..6]),
            hex::encode(&self.bytes[COMPRESSED_PUBLIC_KEY_SIZE - 4..])
        )
    }
}

impl std::fmt::Display for SecpPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for SecpPublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SecpPublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SECRET KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// A secp256k1 secret scalar.
///
/// Zeroized when dropped. Never printed by `Debug`; export only through
/// [`SecpSecretKey::to_hex`] when the caller explicitly asks for it.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecpSecretKey {
    bytes: [u8; SECRET_KEY_SIZE],
}

impl SecpSecretKey {
    /// Creates a secret key from 32 bytes.
    ///
    /// # Errors
    /// Returns `InvalidSecretKey` on a wrong length or an all-zero scalar.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SECRET_KEY_SIZE {
            return Err(PrivatePayError::InvalidSecretKey(format!(
                "expected {} bytes, got {}",
                SECRET_KEY_SIZE,
                bytes.len()
            )));
        }
        if bytes.iter().all(|&b| b == 0) {
            return Err(PrivatePayError::InvalidSecretKey("scalar is zero".into()));
        }

        let mut arr = [0u8; SECRET_KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Creates a secret key from a fixed-size array.
    pub fn from_array(bytes: [u8; SECRET_KEY_SIZE]) -> Result<Self> {
        Self::from_bytes(&bytes)
    }

    /// Returns the raw bytes of the secret key.
    ///
    /// # Security
    /// Handle the returned bytes carefully - do not log or expose them.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the secret key as a fixed-size array reference.
    pub fn as_array(&self) -> &[u8; SECRET_KEY_SIZE] {
        &self.bytes
    }

    /// Exports the key as `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.bytes))
    }

    /// Parses a hex string, with or without `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self> {
        let mut bytes =
            decode_hex(s).map_err(|e| PrivatePayError::InvalidSecretKey(e.to_string()))?;
        let key = Self::from_bytes(&bytes);
        bytes.zeroize();
        key
    }
}

impl std::fmt::Debug for SecpSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecpSecretKey([REDACTED])")
    }
}

/// Private key controlling a single stealth address.
pub type StealthPrivateKey = SecpSecretKey;

// ═══════════════════════════════════════════════════════════════════════════════
// KEY PAIR
// ═══════════════════════════════════════════════════════════════════════════════

/// A secp256k1 key pair (public + secret).
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    /// Public key (safe to share)
    #[zeroize(skip)]
    pub public: SecpPublicKey,
    /// Secret key (keep private, auto-zeroized)
    pub secret: SecpSecretKey,
}

impl KeyPair {
    /// Creates a new key pair from public and secret keys.
    pub fn new(public: SecpPublicKey, secret: SecpSecretKey) -> Self {
        Self { public, secret }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// META-ADDRESS KEYS
// ═══════════════════════════════════════════════════════════════════════════════

/// The recipient's full key material: spend and viewing key pairs.
///
/// The two pairs are generated independently, so handing out the viewing
/// secret (e.g. to an auditor) never reveals the spend secret.
#[derive(Clone, ZeroizeOnDrop)]
pub struct MetaAddressKeys {
    /// Keys that authorize spending from stealth addresses
    pub spend: KeyPair,
    /// Keys that allow scanning announcements
    pub viewing: KeyPair,
}

impl MetaAddressKeys {
    /// Creates a key set from its two pairs.
    pub fn new(spend: KeyPair, viewing: KeyPair) -> Self {
        Self { spend, viewing }
    }

    /// Returns the publishable meta-address.
    pub fn meta_address(&self) -> MetaAddress {
        MetaAddress::new(self.spend.public, self.viewing.public)
    }
}

impl std::fmt::Debug for MetaAddressKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaAddressKeys")
            .field("spend", &self.spend)
            .field("viewing", &self.viewing)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED SECRET
// ═══════════════════════════════════════════════════════════════════════════════

/// ECDH shared secret between an ephemeral key and a viewing key.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret {
    bytes: [u8; SHARED_SECRET_SIZE],
}

impl SharedSecret {
    /// Wraps a 32-byte secret.
    pub fn new(bytes: [u8; SHARED_SECRET_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_SIZE] {
        &self.bytes
    }

    /// The view hint carried by announcements: the first byte of the secret.
    pub fn view_hint(&self) -> u8 {
        self.bytes[0]
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedSecret([REDACTED])")
    }
}

pub(crate) fn decode_hex(s: &str) -> std::result::Result<Vec<u8>, hex::FromHexError> {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    hex::decode(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pk(prefix: u8, fill: u8) -> SecpPublicKey {
        let mut bytes = [fill; COMPRESSED_PUBLIC_KEY_SIZE];
        bytes[0] = prefix;
        SecpPublicKey::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn test_public_key_from_bytes() {
        let pk = sample_pk(0x02, 0x42);
        assert_eq!(pk.as_bytes()[0], 0x02);
        assert_eq!(pk.as_bytes()[1..], [0x42; 32]);
    }

    #[test]
    fn test_public_key_wrong_size() {
        let result = SecpPublicKey::from_bytes(&[0x02; 32]);
        assert!(matches!(result, Err(PrivatePayError::InvalidPublicKey(_))));
    }

    #[test]
    fn test_public_key_rejects_bad_prefix() {
        let mut bytes = [0x11; COMPRESSED_PUBLIC_KEY_SIZE];
        bytes[0] = 0x04;
        assert!(matches!(
            SecpPublicKey::from_bytes(&bytes),
            Err(PrivatePayError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_public_key_hex_roundtrip() {
        let pk = sample_pk(0x03, 0xAB);
        let hex = pk.to_hex();
        assert!(hex.starts_with("0x03"));
        assert_eq!(SecpPublicKey::from_hex(&hex).unwrap(), pk);
        assert_eq!(SecpPublicKey::from_hex(&hex[2..]).unwrap(), pk);
    }

    #[test]
    fn test_public_key_bad_hex_is_invalid_public_key() {
        assert!(matches!(
            SecpPublicKey::from_hex("0xzz"),
            Err(PrivatePayError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_public_key_serde() {
        let pk = sample_pk(0x02, 0x12);
        let json = serde_json::to_string(&pk).unwrap();
        assert!(json.contains("0x02"));
        let pk2: SecpPublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(pk, pk2);
    }

    #[test]
    fn test_secret_key_rejects_zero() {
        assert!(matches!(
            SecpSecretKey::from_bytes(&[0u8; 32]),
            Err(PrivatePayError::InvalidSecretKey(_))
        ));
    }

    #[test]
    fn test_secret_key_debug_redacted() {
        let sk = SecpSecretKey::from_bytes(&[0x5A; 32]).unwrap();
        let debug = format!("{:?}", sk);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("5a"));
    }

    #[test]
    fn test_secret_key_hex_roundtrip() {
        let sk = SecpSecretKey::from_bytes(&[0x07; 32]).unwrap();
        let sk2 = SecpSecretKey::from_hex(&sk.to_hex()).unwrap();
        assert_eq!(sk.as_bytes(), sk2.as_bytes());
    }

    #[test]
    fn test_shared_secret_view_hint() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xC3;
        let secret = SharedSecret::new(bytes);
        assert_eq!(secret.view_hint(), 0xC3);
        assert!(format!("{:?}", secret).contains("REDACTED"));
    }

    #[test]
    fn test_meta_address_keys_expose_public_halves() {
        let keys = MetaAddressKeys::new(
            KeyPair::new(sample_pk(0x02, 1), SecpSecretKey::from_bytes(&[1; 32]).unwrap()),
            KeyPair::new(sample_pk(0x03, 2), SecpSecretKey::from_bytes(&[2; 32]).unwrap()),
        );
        let meta = keys.meta_address();
        assert_eq!(meta.spend_public_key, keys.spend.public);
        assert_eq!(meta.viewing_public_key, keys.viewing.public);
        assert_eq!(format!("{:?}", keys).matches("REDACTED").count(), 2);
    }
}
