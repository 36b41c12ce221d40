//! Recoverable ECDSA over 32-byte digests.
//!
//! Used to sign transactions from stealth addresses. Signatures are always
//! low-S, so `v` is the parity of the nonce point's `y` coordinate.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::PublicKey;
use serde::{Deserialize, Serialize};

use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::types::{EthAddress, SecpSecretKey};

use crate::derive::address_from_public_key;
use crate::keys::parse_secret_key;

/// Legacy `v` offset used by `eth_sign` style signatures.
const LEGACY_V_OFFSET: u8 = 27;

/// A secp256k1 signature with its recovery id.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverableSignature {
    /// `r` component, big-endian
    #[serde(with = "hex::serde")]
    pub r: [u8; 32],
    /// `s` component, big-endian and low-S
    #[serde(with = "hex::serde")]
    pub s: [u8; 32],
    /// Recovery id (0 or 1)
    pub recovery_id: u8,
}

impl RecoverableSignature {
    /// Serialized length: `r || s || v`.
    pub const SIZE: usize = 65;

    /// Encodes as `r || s || (27 + recovery_id)`.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = LEGACY_V_OFFSET + self.recovery_id;
        out
    }

    /// Decodes `r || s || v`, accepting `v` as 0/1 or 27/28.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(PrivatePayError::SigningError(format!(
                "signature must be {} bytes, got {}",
                Self::SIZE,
                bytes.len()
            )));
        }
        let recovery_id = match bytes[64] {
            v @ 0..=1 => v,
            v @ 27..=28 => v - LEGACY_V_OFFSET,
            v => {
                return Err(PrivatePayError::SigningError(format!(
                    "invalid recovery byte {v}"
                )))
            }
        };
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self { r, s, recovery_id })
    }

    /// EIP-155 `v` for a legacy transaction on `chain_id`.
    pub fn eip155_v(&self, chain_id: u64) -> u64 {
        u64::from(self.recovery_id) + 35 + chain_id * 2
    }

    fn to_parts(self) -> Result<(Signature, RecoveryId)> {
        let signature = Signature::from_scalars(self.r, self.s)
            .map_err(|e| PrivatePayError::SigningError(format!("invalid signature: {e}")))?;
        let recovery_id = RecoveryId::from_byte(self.recovery_id)
            .ok_or_else(|| PrivatePayError::SigningError("invalid recovery id".into()))?;
        Ok((signature, recovery_id))
    }
}

impl std::fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoverableSignature")
            .field("r", &hex::encode(&self.r[..8]))
            .field("s", &hex::encode(&self.s[..8]))
            .field("recovery_id", &self.recovery_id)
            .finish()
    }
}

/// Signs a 32-byte digest (RFC 6979 deterministic nonce).
pub fn sign_prehash(secret: &SecpSecretKey, digest: &[u8; 32]) -> Result<RecoverableSignature> {
    let signing_key = SigningKey::from(parse_secret_key(secret)?);
    let (mut signature, mut recovery_id) = signing_key
        .sign_prehash_recoverable(digest)
        .map_err(|e| PrivatePayError::SigningError(e.to_string()))?;

    if let Some(normalized) = signature.normalize_s() {
        signature = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let bytes = signature.to_bytes();
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&bytes[..32]);
    s.copy_from_slice(&bytes[32..]);

    Ok(RecoverableSignature {
        r,
        s,
        recovery_id: recovery_id.to_byte(),
    })
}

/// Recovers the address that produced `signature` over `digest`.
pub fn recover_signer(digest: &[u8; 32], signature: &RecoverableSignature) -> Result<EthAddress> {
    let (signature, recovery_id) = signature.to_parts()?;
    let verifying_key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
        .map_err(|e| PrivatePayError::SigningError(format!("recovery failed: {e}")))?;
    Ok(address_from_public_key(&PublicKey::from(&verifying_key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::address_from_secret_key;
    use crate::hash::keccak256;
    use crate::keys::generate_keypair;

    #[test]
    fn test_sign_and_recover() {
        let kp = generate_keypair().unwrap();
        let digest = keccak256(b"withdraw");

        let sig = sign_prehash(&kp.secret, &digest).unwrap();
        let signer = recover_signer(&digest, &sig).unwrap();

        assert_eq!(signer, address_from_secret_key(&kp.secret).unwrap());
        assert!(sig.recovery_id <= 1);
    }

    #[test]
    fn test_signature_is_deterministic() {
        let kp = generate_keypair().unwrap();
        let digest = keccak256(b"same message");
        assert_eq!(
            sign_prehash(&kp.secret, &digest).unwrap(),
            sign_prehash(&kp.secret, &digest).unwrap()
        );
    }

    #[test]
    fn test_wrong_digest_recovers_other_address() {
        let kp = generate_keypair().unwrap();
        let sig = sign_prehash(&kp.secret, &keccak256(b"a")).unwrap();
        let other = recover_signer(&keccak256(b"b"), &sig).unwrap();
        assert_ne!(other, address_from_secret_key(&kp.secret).unwrap());
    }

    #[test]
    fn test_bytes_encoding() {
        let kp = generate_keypair().unwrap();
        let sig = sign_prehash(&kp.secret, &keccak256(b"x")).unwrap();

        let bytes = sig.to_bytes();
        assert!(bytes[64] == 27 || bytes[64] == 28);
        assert_eq!(RecoverableSignature::from_bytes(&bytes).unwrap(), sig);

        let mut raw = bytes;
        raw[64] -= 27;
        assert_eq!(RecoverableSignature::from_bytes(&raw).unwrap(), sig);

        raw[64] = 5;
        assert!(RecoverableSignature::from_bytes(&raw).is_err());
        assert!(RecoverableSignature::from_bytes(&bytes[..64]).is_err());
    }

    #[test]
    fn test_eip155_v() {
        let sig = RecoverableSignature {
            r: [1; 32],
            s: [1; 32],
            recovery_id: 1,
        };
        assert_eq!(sig.eip155_v(1), 38);
        assert_eq!(sig.eip155_v(5003), 5003 * 2 + 36);
    }
}
