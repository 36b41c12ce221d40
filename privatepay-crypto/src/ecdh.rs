//! Elliptic-curve Diffie-Hellman between ephemeral and viewing keys.
//!
//! The sender computes `r·V`, the recipient `v·R`; both equal `r·v·G`. The
//! compressed point is hashed together with the derivation index `k`, so the
//! same key pair yields unrelated secrets for different `k`.

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{ProjectivePoint, PublicKey, SecretKey};

use privatepay_core::constants::DOMAIN_SHARED_SECRET;
use privatepay_core::types::SharedSecret;

use crate::hash::keccak256_multi;

/// Computes the raw ECDH point `secret · public`.
pub fn shared_point(secret: &SecretKey, public: &PublicKey) -> ProjectivePoint {
    public.to_projective() * *secret.to_nonzero_scalar()
}

/// Computes the shared secret for derivation index `k`.
///
/// ```text
/// shared_secret = H(DOMAIN_SHARED_SECRET, compress(secret · public), be32(k))
/// ```
///
/// Symmetric: `compute_shared_secret(r, V, k) == compute_shared_secret(v, R, k)`.
pub fn compute_shared_secret(secret: &SecretKey, public: &PublicKey, k: u32) -> SharedSecret {
    let point = shared_point(secret, public).to_affine();
    let encoded = point.to_encoded_point(true);
    SharedSecret::new(keccak256_multi(
        DOMAIN_SHARED_SECRET,
        &[encoded.as_bytes(), &k.to_be_bytes()],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_keypair, parse_public_key, parse_secret_key};

    fn pair() -> (SecretKey, PublicKey) {
        let kp = generate_keypair().unwrap();
        (
            parse_secret_key(&kp.secret).unwrap(),
            parse_public_key(kp.public.as_bytes()).unwrap(),
        )
    }

    #[test]
    fn test_shared_secret_symmetric() {
        let (r, r_pub) = pair();
        let (v, v_pub) = pair();

        let sender = compute_shared_secret(&r, &v_pub, 0);
        let recipient = compute_shared_secret(&v, &r_pub, 0);
        assert_eq!(sender, recipient);
    }

    #[test]
    fn test_shared_secret_depends_on_k() {
        let (r, _) = pair();
        let (_, v_pub) = pair();

        let k0 = compute_shared_secret(&r, &v_pub, 0);
        let k1 = compute_shared_secret(&r, &v_pub, 1);
        assert_ne!(k0, k1);
    }

    #[test]
    fn test_third_party_gets_different_secret() {
        let (r, _) = pair();
        let (_, v_pub) = pair();
        let (eve, eve_pub) = pair();

        let real = compute_shared_secret(&r, &v_pub, 0);
        let guess = compute_shared_secret(&eve, &eve_pub, 0);
        assert_ne!(real, guess);
    }
}
