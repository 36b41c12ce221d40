//! Stealth key and address derivation.
//!
//! ## Derivation Flow
//!
//! ```text
//! shared_secret
//!       ↓
//! t = H(DOMAIN_STEALTH_TWEAK, shared_secret) mod n
//!       ↓
//! stealth_pk = spend_pk + t·G
//!       ↓
//! address = keccak256(uncompressed(stealth_pk)[1..])[12..32]
//! ```
//!
//! ## Private Key Derivation
//!
//! ```text
//! stealth_sk = spend_sk + t  (mod n)
//! ```
//!
//! Scalar addition on the private side mirrors point addition on the public
//! side, so `stealth_sk · G == stealth_pk`.

use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{FieldBytes, ProjectivePoint, PublicKey, Scalar, SecretKey, U256};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use privatepay_core::constants::{DOMAIN_STEALTH_TWEAK, ETH_ADDRESS_SIZE, SECRET_KEY_SIZE};
use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::types::{EthAddress, SecpSecretKey, SharedSecret, StealthPrivateKey};

use crate::hash::{keccak256, keccak256_multi};
use crate::keys::parse_secret_key;

// ═══════════════════════════════════════════════════════════════════════════════
// TWEAK
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives the scalar tweak from a shared secret.
///
/// # Errors
///
/// `StealthDerivationError` if the hash reduces to zero (probability ~2^-256).
pub fn stealth_tweak(shared_secret: &SharedSecret) -> Result<Scalar> {
    let digest = keccak256_multi(DOMAIN_STEALTH_TWEAK, &[shared_secret.as_bytes()]);
    let tweak = <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(digest));

    if bool::from(tweak.is_zero()) {
        return Err(PrivatePayError::StealthDerivationError(
            "tweak reduced to zero".into(),
        ));
    }
    Ok(tweak)
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH PUBLIC KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives the stealth public key `spend_pk + t·G`.
///
/// # Errors
///
/// `StealthDerivationError` if the sum is the point at infinity, which
/// only happens when `t·G == -spend_pk`.
pub fn derive_stealth_public_key(spend_pk: &PublicKey, tweak: &Scalar) -> Result<PublicKey> {
    let point = spend_pk.to_projective() + ProjectivePoint::GENERATOR * tweak;
    PublicKey::from_affine(point.to_affine()).map_err(|_| {
        PrivatePayError::StealthDerivationError("stealth public key is the identity".into())
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH PRIVATE KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives the stealth private key `spend_sk + t mod n`.
///
/// # Security
///
/// Handles spend key material. The result zeroizes on drop.
pub fn derive_stealth_private_key(
    spend_sk: &SecpSecretKey,
    tweak: &Scalar,
) -> Result<StealthPrivateKey> {
    let spend = parse_secret_key(spend_sk)?;
    let sum = *spend.to_nonzero_scalar() + tweak;

    if bool::from(sum.is_zero()) {
        return Err(PrivatePayError::StealthDerivationError(
            "stealth private key is zero".into(),
        ));
    }

    let mut bytes = [0u8; SECRET_KEY_SIZE];
    bytes.copy_from_slice(&sum.to_bytes());
    let key = SecpSecretKey::from_array(bytes);
    bytes.zeroize();
    key
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESSES
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives the EVM address of a public key.
///
/// ```text
/// address = keccak256(x || y)[12..32]
/// ```
pub fn address_from_public_key(public: &PublicKey) -> EthAddress {
    let encoded = public.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);

    let mut bytes = [0u8; ETH_ADDRESS_SIZE];
    bytes.copy_from_slice(&hash[32 - ETH_ADDRESS_SIZE..]);
    EthAddress::from_array(bytes)
}

/// Derives the EVM address controlled by a secret key.
pub fn address_from_secret_key(secret: &SecpSecretKey) -> Result<EthAddress> {
    let secret: SecretKey = parse_secret_key(secret)?;
    Ok(address_from_public_key(&secret.public_key()))
}

/// Returns true if `secret` controls `expected`, compared in constant time.
pub fn verify_stealth_key(secret: &SecpSecretKey, expected: &EthAddress) -> Result<bool> {
    let derived = address_from_secret_key(secret)?;
    Ok(derived.as_bytes().ct_eq(expected.as_bytes()).into())
}
