//! secp256k1 key generation and parsing.
//!
//! Randomness comes from the operating system (`OsRng`) unless the caller
//! passes its own `CryptoRng`. Seeded derivation exists for reproducible
//! fixtures and deterministic wallets.

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{FieldBytes, PublicKey, SecretKey};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use privatepay_core::constants::{MAX_KEYGEN_ATTEMPTS, SECRET_KEY_SIZE};
use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::types::{KeyPair, SecpPublicKey, SecpSecretKey};

use crate::hash::keccak256_multi;

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Parses a SEC1 public key (33 or 65 bytes) and checks it is on the curve.
///
/// # Errors
///
/// `InvalidPublicKey` for any other length, a bad prefix, a point off the
/// curve, or the identity.
pub fn parse_public_key(bytes: &[u8]) -> Result<PublicKey> {
    if bytes.len() != 33 && bytes.len() != 65 {
        return Err(PrivatePayError::InvalidPublicKey(format!(
            "expected 33 or 65 bytes, got {}",
            bytes.len()
        )));
    }
    PublicKey::from_sec1_bytes(bytes)
        .map_err(|_| PrivatePayError::InvalidPublicKey("not a point on secp256k1".into()))
}

/// Converts a secret key container into a curve scalar.
///
/// # Errors
///
/// `InvalidSecretKey` if the scalar is not below the curve order.
pub fn parse_secret_key(secret: &SecpSecretKey) -> Result<SecretKey> {
    SecretKey::from_bytes(&FieldBytes::from(*secret.as_array()))
        .map_err(|_| PrivatePayError::InvalidSecretKey("scalar out of range".into()))
}

/// Encodes a public key in the compressed container form.
pub fn to_compressed(public: &PublicKey) -> Result<SecpPublicKey> {
    SecpPublicKey::from_bytes(public.to_encoded_point(true).as_bytes())
}

/// Wraps a curve secret key into a [`KeyPair`].
pub fn keypair_from_secret(secret: &SecretKey) -> Result<KeyPair> {
    let mut bytes = [0u8; SECRET_KEY_SIZE];
    bytes.copy_from_slice(&secret.to_bytes());
    let container = SecpSecretKey::from_array(bytes);
    bytes.zeroize();
    Ok(KeyPair::new(to_compressed(&secret.public_key())?, container?))
}

/// Derives the compressed public key of a secret key container.
pub fn public_key_of(secret: &SecpSecretKey) -> Result<SecpPublicKey> {
    to_compressed(&parse_secret_key(secret)?.public_key())
}

// ═══════════════════════════════════════════════════════════════════════════════
// GENERATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Generates a key pair from the operating system's secure random source.
///
/// # Errors
///
/// `KeyGenerationError` if the random source is unavailable.
pub fn generate_keypair() -> Result<KeyPair> {
    generate_keypair_with_rng(&mut OsRng)
}

/// Generates a key pair from a caller-provided cryptographic RNG.
///
/// Rejection-samples 32-byte candidates until one is a valid scalar. A
/// failing RNG aborts immediately and no key material is returned.
pub fn generate_keypair_with_rng<R: CryptoRng + RngCore>(rng: &mut R) -> Result<KeyPair> {
    let mut candidate = [0u8; SECRET_KEY_SIZE];

    for _ in 0..MAX_KEYGEN_ATTEMPTS {
        if let Err(e) = rng.try_fill_bytes(&mut candidate) {
            candidate.zeroize();
            return Err(PrivatePayError::KeyGenerationError(format!(
                "secure random source unavailable: {}",
                e
            )));
        }

        if let Ok(secret) = SecretKey::from_bytes(&FieldBytes::from(candidate)) {
            candidate.zeroize();
            return keypair_from_secret(&secret);
        }
    }

    candidate.zeroize();
    Err(PrivatePayError::KeyGenerationError(format!(
        "no valid scalar after {} attempts",
        MAX_KEYGEN_ATTEMPTS
    )))
}

/// Deterministically derives a key pair from a seed.
///
/// The first counter `i` for which `H(domain, seed, le32(i))` is a valid
/// scalar becomes the secret key. Different domains give independent keys
/// from the same seed.
pub fn keypair_from_seed(domain: &[u8], seed: &[u8]) -> Result<KeyPair> {
    for counter in 0..MAX_KEYGEN_ATTEMPTS as u32 {
        let mut candidate = keccak256_multi(domain, &[seed, &counter.to_le_bytes()]);
        let parsed = SecretKey::from_bytes(&FieldBytes::from(candidate));
        candidate.zeroize();

        if let Ok(secret) = parsed {
            return keypair_from_secret(&secret);
        }
    }

    Err(PrivatePayError::KeyGenerationError(
        "seed did not yield a valid scalar".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use privatepay_core::constants::{DOMAIN_SPEND_SEED, DOMAIN_VIEW_SEED};

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            Err(rand::Error::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                "entropy source offline",
            )))
        }
    }

    impl CryptoRng for BrokenRng {}

    /// Always returns 0xFF bytes, which are above the curve order.
    struct SaturatedRng;

    impl RngCore for SaturatedRng {
        fn next_u32(&mut self) -> u32 {
            u32::MAX
        }
        fn next_u64(&mut self) -> u64 {
            u64::MAX
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0xFF);
        }
        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            dest.fill(0xFF);
            Ok(())
        }
    }

    impl CryptoRng for SaturatedRng {}

    #[test]
    fn test_generate_keypair_is_consistent() {
        let pair = generate_keypair().unwrap();
        assert_eq!(public_key_of(&pair.secret).unwrap(), pair.public);
    }

    #[test]
    fn test_generate_keypair_fresh_each_call() {
        let a = generate_keypair().unwrap();
        let b = generate_keypair().unwrap();
        assert_ne!(a.public, b.public);
        assert_ne!(a.secret.as_bytes(), b.secret.as_bytes());
    }

    #[test]
    fn test_seeded_rng_reproducible() {
        let a = generate_keypair_with_rng(&mut ChaCha20Rng::seed_from_u64(7)).unwrap();
        let b = generate_keypair_with_rng(&mut ChaCha20Rng::seed_from_u64(7)).unwrap();
        let c = generate_keypair_with_rng(&mut ChaCha20Rng::seed_from_u64(8)).unwrap();
        assert_eq!(a.public, b.public);
        assert_ne!(a.public, c.public);
    }

    #[test]
    fn test_broken_rng_is_key_generation_error() {
        let result = generate_keypair_with_rng(&mut BrokenRng);
        assert!(matches!(result, Err(PrivatePayError::KeyGenerationError(_))));
    }

    #[test]
    fn test_out_of_range_candidates_exhaust_attempts() {
        let result = generate_keypair_with_rng(&mut SaturatedRng);
        assert!(matches!(result, Err(PrivatePayError::KeyGenerationError(_))));
    }

    #[test]
    fn test_seeded_keys_deterministic_and_domain_separated() {
        let spend = keypair_from_seed(DOMAIN_SPEND_SEED, b"seed").unwrap();
        let spend_again = keypair_from_seed(DOMAIN_SPEND_SEED, b"seed").unwrap();
        let view = keypair_from_seed(DOMAIN_VIEW_SEED, b"seed").unwrap();
        assert_eq!(spend.public, spend_again.public);
        assert_ne!(spend.public, view.public);
    }

    #[test]
    fn test_secret_key_one_is_generator() {
        let mut one = [0u8; 32];
        one[31] = 1;
        let public = public_key_of(&SecpSecretKey::from_array(one).unwrap()).unwrap();
        assert_eq!(
            public.to_hex(),
            "0x0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
    }

    #[test]
    fn test_parse_public_key_accepts_both_encodings() {
        let pair = generate_keypair().unwrap();
        let compressed = parse_public_key(pair.public.as_bytes()).unwrap();
        let uncompressed = compressed.to_encoded_point(false);
        let reparsed = parse_public_key(uncompressed.as_bytes()).unwrap();
        assert_eq!(compressed, reparsed);
    }

    #[test]
    fn test_parse_public_key_rejects_malformed() {
        assert!(matches!(
            parse_public_key(&[0x02; 20]),
            Err(PrivatePayError::InvalidPublicKey(_))
        ));
        // x = 5 has no square root mod p on secp256k1
        let mut off_curve = [0u8; 33];
        off_curve[0] = 0x02;
        off_curve[32] = 5;
        assert!(matches!(
            parse_public_key(&off_curve),
            Err(PrivatePayError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_parse_secret_key_rejects_order() {
        let order = hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141")
            .unwrap();
        let container = SecpSecretKey::from_bytes(&order).unwrap();
        assert!(matches!(
            parse_secret_key(&container),
            Err(PrivatePayError::InvalidSecretKey(_))
        ));
    }
}
