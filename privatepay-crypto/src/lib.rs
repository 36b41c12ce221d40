//! # PrivatePay Cryptography
//!
//! secp256k1 and Keccak-256 primitives behind PrivatePay stealth addresses.
//!
//! This crate provides:
//!
//! - **Hash**: Keccak-256 with length-prefixed domain separation
//! - **Keys**: Key generation (OS randomness, caller RNG, or seed), SEC1 parsing
//! - **ECDH**: Shared secret between an ephemeral key and a viewing key
//! - **View Hints**: One-byte scan filter and its distribution statistics
//! - **Derivation**: Scalar tweak, stealth public/private keys, addresses
//! - **Signing**: Recoverable ECDSA over 32-byte digests
//!
//! ## Construction
//!
//! ```text
//! S      = r·V = v·R
//! secret = H(DOMAIN_SHARED_SECRET, compress(S), be32(k))
//! hint   = secret[0]
//! t      = H(DOMAIN_STEALTH_TWEAK, secret) mod n
//! P'     = P_spend + t·G          address = keccak256(P')[12..]
//! p'     = p_spend + t  (mod n)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use privatepay_crypto::{
//!     compute_shared_secret, derive, generate_keypair, parse_public_key, parse_secret_key,
//! };
//!
//! let spend = generate_keypair().unwrap();
//! let view = generate_keypair().unwrap();
//! let ephemeral = generate_keypair().unwrap();
//!
//! // Sender side
//! let view_pk = parse_public_key(view.public.as_bytes()).unwrap();
//! let eph_sk = parse_secret_key(&ephemeral.secret).unwrap();
//! let secret = compute_shared_secret(&eph_sk, &view_pk, 0);
//! let tweak = derive::stealth_tweak(&secret).unwrap();
//! let spend_pk = parse_public_key(spend.public.as_bytes()).unwrap();
//! let stealth_pk = derive::derive_stealth_public_key(&spend_pk, &tweak).unwrap();
//!
//! // Recipient side
//! let stealth_sk = derive::derive_stealth_private_key(&spend.secret, &tweak).unwrap();
//! assert_eq!(
//!     derive::address_from_secret_key(&stealth_sk).unwrap(),
//!     derive::address_from_public_key(&stealth_pk),
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod derive;
pub mod ecdh;
pub mod hash;
pub mod keys;
pub mod sign;
pub mod view_hint;

// Re-export main functions at crate root
pub use derive::{address_from_public_key, address_from_secret_key, stealth_tweak};
pub use ecdh::compute_shared_secret;
pub use hash::{keccak256, keccak256_multi};
pub use keys::{
    generate_keypair, generate_keypair_with_rng, keypair_from_seed, parse_public_key,
    parse_secret_key,
};
pub use sign::{recover_signer, sign_prehash, RecoverableSignature};
pub use view_hint::{compute_view_hint, verify_view_hint};
