//! Keccak-256 with domain separation.
//!
//! Every hash in the derivation path is domain-separated and every input part
//! is length-prefixed, so no two (domain, parts) tuples share a preimage:
//!
//! ```text
//! H(domain, p1..pn) = keccak256(le32(|domain|) || domain || le64(|p1|) || p1 || ...)
//! ```
//!
//! Plain [`keccak256`] is used where Ethereum fixes the preimage: addresses,
//! ABI selectors, transaction digests.

use sha3::{Digest, Keccak256};

use privatepay_core::constants::KECCAK256_SIZE;

/// Computes Keccak-256 (Ethereum's hash, not SHA3-256).
pub fn keccak256(input: &[u8]) -> [u8; KECCAK256_SIZE] {
    Keccak256::digest(input).into()
}

/// Computes domain-separated Keccak-256 over several inputs.
///
/// # Arguments
///
/// * `domain` - Domain separator bytes (unique per use case)
/// * `inputs` - Slice of input byte slices, each length-prefixed
pub fn keccak256_multi(domain: &[u8], inputs: &[&[u8]]) -> [u8; KECCAK256_SIZE] {
    let mut hasher = Keccak256::new();

    hasher.update((domain.len() as u32).to_le_bytes());
    hasher.update(domain);

    for input in inputs {
        hasher.update((input.len() as u64).to_le_bytes());
        hasher.update(input);
    }

    hasher.finalize().into()
}

/// Domain-separated hash of a single input.
pub fn hash_with_domain(domain: &[u8], input: &[u8]) -> [u8; KECCAK256_SIZE] {
    keccak256_multi(domain, &[input])
}

#[cfg(test)]
mod tests {
    use super::*;
    use privatepay_core::constants::*;

    #[test]
    fn test_keccak256_known_vectors() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(
            hex::encode(keccak256(b"hello")),
            "1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn test_domain_separation() {
        let a = hash_with_domain(b"domain1", b"input");
        let b = hash_with_domain(b"domain2", b"input");
        assert_ne!(a, b);
        assert_eq!(a, hash_with_domain(b"domain1", b"input"));
    }

    #[test]
    fn test_multi_is_not_concatenation() {
        let multi = keccak256_multi(b"domain", &[b"part1", b"part2"]);
        let single = hash_with_domain(b"domain", b"part1part2");
        assert_ne!(multi, single);

        // Moving a byte across the part boundary changes the hash
        let shifted = keccak256_multi(b"domain", &[b"part", b"1part2"]);
        assert_ne!(multi, shifted);
    }

    #[test]
    fn test_protocol_domains_produce_different_outputs() {
        let input = [0u8; 32];
        let secret = hash_with_domain(DOMAIN_SHARED_SECRET, &input);
        let tweak = hash_with_domain(DOMAIN_STEALTH_TWEAK, &input);
        let spend = hash_with_domain(DOMAIN_SPEND_SEED, &input);
        assert_ne!(secret, tweak);
        assert_ne!(secret, spend);
        assert_ne!(tweak, spend);
    }
}
