//! Per-payment artifacts on both sides of a stealth payment.
//!
//! - [`StealthDerivation`]: what the sender produces for one payment
//! - [`MatchedPayment`]: an announcement recognized by a viewing key
//! - [`DiscoveredPayment`]: a match plus the recovered spending key

use serde::{Deserialize, Serialize};

use super::{EthAddress, PaymentAnnouncement, SecpPublicKey, SecpSecretKey, SharedSecret};

// ═══════════════════════════════════════════════════════════════════════════════
// SENDER SIDE
// ═══════════════════════════════════════════════════════════════════════════════

/// The one-time artifact produced by the sender for a single payment.
///
/// Secret fields are skipped by serde and redacted by `Debug`; only the
/// announcement-safe fields ever leave the process.
#[derive(Clone, Serialize, Deserialize)]
pub struct StealthDerivation {
    /// Address the sender pays
    pub stealth_address: EthAddress,
    /// Tweaked spend public key behind `stealth_address`
    pub stealth_public_key: SecpPublicKey,
    /// Ephemeral public key to announce
    pub ephemeral_public_key: SecpPublicKey,
    /// View hint to announce
    pub view_hint: u8,
    /// Derivation index to announce
    pub k: u32,
    /// Ephemeral secret, held by the sender only
    #[serde(skip)]
    pub ephemeral_private_key: Option<SecpSecretKey>,
    /// ECDH shared secret
    #[serde(skip)]
    pub shared_secret: Option<SharedSecret>,
}

impl StealthDerivation {
    /// Drops the secret halves, keeping what is safe to publish.
    pub fn into_public(mut self) -> Self {
        self.ephemeral_private_key = None;
        self.shared_secret = None;
        self
    }
}

impl std::fmt::Debug for StealthDerivation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StealthDerivation")
            .field("stealth_address", &self.stealth_address)
            .field("ephemeral_public_key", &self.ephemeral_public_key)
            .field("view_hint", &self.view_hint)
            .field("k", &self.k)
            .field("ephemeral_private_key", &"[REDACTED]")
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECIPIENT SIDE
// ═══════════════════════════════════════════════════════════════════════════════

/// An announcement whose stealth address was reproduced by the viewing key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedPayment {
    /// The matching announcement
    pub announcement: PaymentAnnouncement,
    /// Recomputed stealth address (equals `announcement.stealth_address`)
    pub stealth_address: EthAddress,
    /// Recomputed stealth public key
    pub stealth_public_key: SecpPublicKey,
    /// Derivation index used
    pub k: u32,
}

/// A matched payment together with the key that spends it.
///
/// Only produced when the spend secret is available.
#[derive(Clone)]
pub struct DiscoveredPayment {
    /// The match
    pub matched: MatchedPayment,
    /// Private key controlling `matched.stealth_address`
    pub private_key: SecpSecretKey,
}

impl DiscoveredPayment {
    /// Stealth address of the payment.
    pub fn address(&self) -> EthAddress {
        self.matched.stealth_address
    }

    /// Amount in wei.
    pub fn amount(&self) -> u128 {
        self.matched.announcement.amount
    }
}

impl std::fmt::Debug for DiscoveredPayment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveredPayment")
            .field("matched", &self.matched)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pk(fill: u8) -> SecpPublicKey {
        let mut bytes = [fill; 33];
        bytes[0] = 0x02;
        SecpPublicKey::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn test_derivation_serde_skips_secrets() {
        let derivation = StealthDerivation {
            stealth_address: EthAddress::from_array([9; 20]),
            stealth_public_key: pk(1),
            ephemeral_public_key: pk(2),
            view_hint: 0xEE,
            k: 3,
            ephemeral_private_key: Some(SecpSecretKey::from_bytes(&[0x77; 32]).unwrap()),
            shared_secret: Some(SharedSecret::new([0x88; 32])),
        };

        let json = serde_json::to_string(&derivation).unwrap();
        assert!(!json.contains("7777"));
        assert!(!json.contains("ephemeral_private_key"));

        let back: StealthDerivation = serde_json::from_str(&json).unwrap();
        assert!(back.ephemeral_private_key.is_none());
        assert_eq!(back.view_hint, 0xEE);

        let public = derivation.into_public();
        assert!(public.shared_secret.is_none());
        assert!(format!("{:?}", public).contains("REDACTED"));
    }
}
