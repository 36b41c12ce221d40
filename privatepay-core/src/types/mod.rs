//! Domain types for PrivatePay.
//!
//! - [`SecpPublicKey`] / [`SecpSecretKey`]: secp256k1 key containers
//! - [`MetaAddress`]: Published (spend, viewing) key pair
//! - [`EthAddress`] / [`TxHash`]: chain identifiers
//! - [`PaymentAnnouncement`]: Published ephemeral key + view hint
//! - [`StealthDerivation`] / [`MatchedPayment`]: per-payment artifacts
//! - [`TransactionRecord`]: off-chain bookkeeping

mod address;
mod announcement;
mod keys;
mod payment;
mod records;
mod units;

pub use address::*;
pub use announcement::*;
pub use keys::*;
pub use payment::*;
pub use records::*;
pub use units::*;

/// Serde adapter for byte strings rendered as `0x`-prefixed hex.
pub mod hex_prefixed {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes bytes as `0x`-prefixed hex.
    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    /// Deserializes bytes from hex, with or without prefix.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::keys::decode_hex(&s).map_err(serde::de::Error::custom)
    }
}
