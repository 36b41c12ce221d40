//! Payment discovery (recipient scan).

use k256::{PublicKey, SecretKey};

use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::types::{MatchedPayment, PaymentAnnouncement, SecpPublicKey, SecpSecretKey};
use privatepay_crypto::derive::{address_from_public_key, derive_stealth_public_key, stealth_tweak};
use privatepay_crypto::keys::{parse_public_key, parse_secret_key, to_compressed};
use privatepay_crypto::{compute_shared_secret, verify_view_hint};

/// Result of scanning a single announcement.
#[derive(Debug)]
pub enum ScanResult {
    /// Hint and address both matched - payment is ours
    Matched(MatchedPayment),
    /// View hint didn't match - not for this recipient
    HintMismatch,
    /// Hint matched by chance but the address differs (1/256 false positive)
    AddressMismatch,
    /// Announcement could not be processed
    Invalid(PrivatePayError),
}

impl ScanResult {
    /// Returns true if a payment was matched.
    pub fn is_match(&self) -> bool {
        matches!(self, ScanResult::Matched(_))
    }

    /// Returns the match if present.
    pub fn into_match(self) -> Option<MatchedPayment> {
        match self {
            ScanResult::Matched(matched) => Some(matched),
            _ => None,
        }
    }
}

/// Statistics for scanning operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Total announcements scanned
    pub total_scanned: u64,
    /// Number of view hint matches (true and false positives)
    pub view_hint_matches: u64,
    /// Hint matches rejected by the address comparison
    pub address_mismatches: u64,
    /// Number of payments matched
    pub matches: u64,
    /// Malformed announcements skipped
    pub invalid: u64,
    /// Duration of the scan in milliseconds
    pub duration_ms: u64,
}

impl ScanStats {
    /// Creates a new stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a scan result.
    pub fn record(&mut self, result: &ScanResult) {
        self.total_scanned += 1;
        match result {
            ScanResult::Matched(_) => {
                self.view_hint_matches += 1;
                self.matches += 1;
            }
            ScanResult::AddressMismatch => {
                self.view_hint_matches += 1;
                self.address_mismatches += 1;
            }
            ScanResult::Invalid(_) => {
                self.invalid += 1;
            }
            ScanResult::HintMismatch => {}
        }
    }

    /// Folds another batch's counters into this one.
    pub fn merge(&mut self, other: &ScanStats) {
        self.total_scanned += other.total_scanned;
        self.view_hint_matches += other.view_hint_matches;
        self.address_mismatches += other.address_mismatches;
        self.matches += other.matches;
        self.invalid += other.invalid;
        self.duration_ms += other.duration_ms;
    }

    /// Returns the scan rate (announcements per second).
    pub fn rate(&self) -> f64 {
        if self.duration_ms == 0 {
            0.0
        } else {
            (self.total_scanned as f64 / self.duration_ms as f64) * 1000.0
        }
    }

    /// Returns the filter efficiency (percentage of announcements filtered by the hint).
    pub fn filter_efficiency(&self) -> f64 {
        if self.total_scanned == 0 {
            0.0
        } else {
            ((self.total_scanned - self.view_hint_matches) as f64 / self.total_scanned as f64)
                * 100.0
        }
    }
}

/// Viewing secret and spend public key parsed once for a whole scan.
///
/// `Send + Sync`, so one instance can be shared across scanning tasks.
#[derive(Clone)]
pub struct ScanKeys {
    viewing: SecretKey,
    spend: PublicKey,
    max_derivation_index: u32,
}

impl ScanKeys {
    /// Parses the recipient's scanning keys.
    pub fn new(
        viewing_sk: &SecpSecretKey,
        spend_pk: &SecpPublicKey,
        max_derivation_index: u32,
    ) -> Result<Self> {
        Ok(Self {
            viewing: parse_secret_key(viewing_sk)?,
            spend: parse_public_key(spend_pk.as_bytes())?,
            max_derivation_index,
        })
    }

    /// ECDH with the ephemeral key, compare hints, then confirm the address.
    pub fn scan(&self, announcement: &PaymentAnnouncement) -> ScanResult {
        if let Err(e) = announcement.validate() {
            return ScanResult::Invalid(e);
        }
        if announcement.k > self.max_derivation_index {
            return ScanResult::Invalid(PrivatePayError::InvalidDerivationIndex {
                k: announcement.k,
                max: self.max_derivation_index,
            });
        }

        let ephemeral = match parse_public_key(&announcement.ephemeral_pub_key) {
            Ok(pk) => pk,
            Err(e) => return ScanResult::Invalid(e),
        };

        let secret = compute_shared_secret(&self.viewing, &ephemeral, announcement.k);
        if !verify_view_hint(&secret, announcement.view_hint) {
            return ScanResult::HintMismatch;
        }

        let stealth_pk = match stealth_tweak(&secret)
            .and_then(|tweak| derive_stealth_public_key(&self.spend, &tweak))
        {
            Ok(pk) => pk,
            Err(e) => return ScanResult::Invalid(e),
        };

        let stealth_address = address_from_public_key(&stealth_pk);
        if stealth_address != announcement.stealth_address {
            return ScanResult::AddressMismatch;
        }

        match to_compressed(&stealth_pk) {
            Ok(stealth_public_key) => ScanResult::Matched(MatchedPayment {
                announcement: announcement.clone(),
                stealth_address,
                stealth_public_key,
                k: announcement.k,
            }),
            Err(e) => ScanResult::Invalid(e),
        }
    }
}

impl std::fmt::Debug for ScanKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanKeys")
            .field("viewing", &"[REDACTED]")
            .field("max_derivation_index", &self.max_derivation_index)
            .finish()
    }
}
