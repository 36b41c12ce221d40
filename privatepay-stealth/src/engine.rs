//! The stealth address engine.
//!
//! [`StealthAddressEngine`] bundles every operation of the scheme behind one
//! immutable parameter set:
//!
//! | Side      | Operation                                   |
//! |-----------|---------------------------------------------|
//! | Recipient | [`generate_meta_address`](StealthAddressEngine::generate_meta_address) |
//! | Sender    | [`generate_stealth_address`](StealthAddressEngine::generate_stealth_address) |
//! | Recipient | [`scan_announcement`](StealthAddressEngine::scan_announcement), [`scan_announcements`](StealthAddressEngine::scan_announcements) |
//! | Recipient | [`recover_stealth_private_key`](StealthAddressEngine::recover_stealth_private_key) |
//!
//! The engine holds no key material; it is `Send + Sync` and cheap to clone.

use rand::{CryptoRng, RngCore};
use tracing::debug;

use privatepay_core::config::StealthParams;
use privatepay_core::constants::{DOMAIN_SPEND_SEED, DOMAIN_VIEW_SEED};
use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::types::{
    DiscoveredPayment, EthAddress, MatchedPayment, MetaAddressKeys, PaymentAnnouncement,
    SecpPublicKey, SecpSecretKey, StealthDerivation, StealthPrivateKey,
};
use privatepay_crypto::derive::{
    address_from_public_key, address_from_secret_key, derive_stealth_private_key,
    derive_stealth_public_key, stealth_tweak,
};
use privatepay_crypto::keys::{
    generate_keypair, generate_keypair_with_rng, keypair_from_seed, parse_public_key,
    parse_secret_key, to_compressed,
};
use privatepay_crypto::{compute_shared_secret, compute_view_hint};

use crate::discovery::{ScanKeys, ScanResult, ScanStats};

/// Generates, derives, scans and recovers stealth addresses.
#[derive(Clone, Debug, Default)]
pub struct StealthAddressEngine {
    params: StealthParams,
}

impl StealthAddressEngine {
    /// Creates an engine with explicit parameters.
    pub fn new(params: StealthParams) -> Self {
        Self { params }
    }

    /// Returns the engine parameters.
    pub fn params(&self) -> &StealthParams {
        &self.params
    }

    /// Rejects derivation indices above the configured maximum.
    pub fn check_index(&self, k: u32) -> Result<()> {
        if k > self.params.max_derivation_index {
            return Err(PrivatePayError::InvalidDerivationIndex {
                k,
                max: self.params.max_derivation_index,
            });
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // META-ADDRESS GENERATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Generates independent spend and viewing key pairs from the OS RNG.
    ///
    /// # Errors
    ///
    /// `KeyGenerationError` if the RNG fails. No partial key material is
    /// returned.
    pub fn generate_meta_address(&self) -> Result<MetaAddressKeys> {
        let spend = generate_keypair()?;
        let viewing = generate_keypair()?;
        Ok(MetaAddressKeys::new(spend, viewing))
    }

    /// Generates a meta-address from a caller-supplied RNG.
    pub fn generate_meta_address_with_rng<R: CryptoRng + RngCore>(
        &self,
        rng: &mut R,
    ) -> Result<MetaAddressKeys> {
        let spend = generate_keypair_with_rng(rng)?;
        let viewing = generate_keypair_with_rng(rng)?;
        Ok(MetaAddressKeys::new(spend, viewing))
    }

    /// Deterministically derives a meta-address from a seed.
    ///
    /// Spend and viewing keys come from separate hash domains, so neither
    /// reveals the other.
    pub fn generate_meta_address_from_seed(&self, seed: &[u8]) -> Result<MetaAddressKeys> {
        if seed.is_empty() {
            return Err(PrivatePayError::KeyGenerationError("seed is empty".into()));
        }
        let spend = keypair_from_seed(DOMAIN_SPEND_SEED, seed)?;
        let viewing = keypair_from_seed(DOMAIN_VIEW_SEED, seed)?;
        Ok(MetaAddressKeys::new(spend, viewing))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SENDER SIDE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Derives a fresh stealth address for a recipient.
    ///
    /// `spend_pk` and `viewing_pk` are SEC1 encodings (33 or 65 bytes). A new
    /// ephemeral key is drawn for every call.
    ///
    /// # Errors
    ///
    /// - `InvalidPublicKey` for malformed keys
    /// - `InvalidDerivationIndex` if `k` exceeds the maximum
    /// - `KeyGenerationError` if the RNG fails
    pub fn generate_stealth_address(
        &self,
        spend_pk: &[u8],
        viewing_pk: &[u8],
        k: u32,
    ) -> Result<StealthDerivation> {
        self.check_index(k)?;
        let ephemeral = generate_keypair()?;
        self.generate_stealth_address_with_ephemeral(spend_pk, viewing_pk, k, &ephemeral.secret)
    }

    /// Derives a stealth address with a caller-chosen ephemeral key.
    ///
    /// Deterministic. Reusing an ephemeral key links payments, so this is
    /// meant for fixtures and reproducible tooling.
    pub fn generate_stealth_address_with_ephemeral(
        &self,
        spend_pk: &[u8],
        viewing_pk: &[u8],
        k: u32,
        ephemeral_sk: &SecpSecretKey,
    ) -> Result<StealthDerivation> {
        self.check_index(k)?;

        let spend = parse_public_key(spend_pk)?;
        let viewing = parse_public_key(viewing_pk)?;
        let ephemeral = parse_secret_key(ephemeral_sk)?;

        let secret = compute_shared_secret(&ephemeral, &viewing, k);
        let tweak = stealth_tweak(&secret)?;
        let stealth_pk = derive_stealth_public_key(&spend, &tweak)?;

        let derivation = StealthDerivation {
            stealth_address: address_from_public_key(&stealth_pk),
            stealth_public_key: to_compressed(&stealth_pk)?,
            ephemeral_public_key: to_compressed(&ephemeral.public_key())?,
            view_hint: compute_view_hint(&secret),
            k,
            ephemeral_private_key: Some(ephemeral_sk.clone()),
            shared_secret: Some(secret),
        };

        debug!(
            stealth_address = %derivation.stealth_address,
            view_hint = derivation.view_hint,
            k,
            "derived stealth address"
        );
        Ok(derivation)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // RECIPIENT SIDE: SCANNING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Prepares viewing and spend keys for repeated scanning.
    pub fn scan_keys(
        &self,
        viewing_sk: &SecpSecretKey,
        spend_pk: &SecpPublicKey,
    ) -> Result<ScanKeys> {
        ScanKeys::new(viewing_sk, spend_pk, self.params.max_derivation_index)
    }

    /// Tests one announcement against the recipient's keys.
    ///
    /// Never panics and never errors: malformed input is reported as
    /// [`ScanResult::Invalid`].
    pub fn scan_announcement(
        &self,
        viewing_sk: &SecpSecretKey,
        spend_pk: &SecpPublicKey,
        announcement: &PaymentAnnouncement,
    ) -> ScanResult {
        match self.scan_keys(viewing_sk, spend_pk) {
            Ok(keys) => keys.scan(announcement),
            Err(e) => ScanResult::Invalid(e),
        }
    }

    /// Lazily yields the announcements addressed to this recipient.
    ///
    /// Malformed announcements are skipped. The iterator is finite whenever
    /// the input is; call again with the same input to restart.
    ///
    /// # Errors
    ///
    /// Fails up front if the keys themselves are unusable.
    pub fn scan_announcements<'a, I>(
        &self,
        viewing_sk: &SecpSecretKey,
        spend_pk: &SecpPublicKey,
        announcements: I,
    ) -> Result<impl Iterator<Item = MatchedPayment> + 'a>
    where
        I: IntoIterator<Item = &'a PaymentAnnouncement>,
        I::IntoIter: 'a,
    {
        let keys = self.scan_keys(viewing_sk, spend_pk)?;
        Ok(announcements
            .into_iter()
            .filter_map(move |announcement| keys.scan(announcement).into_match()))
    }

    /// Scans eagerly, returning the matches and per-outcome counters.
    pub fn scan_with_stats<'a, I>(
        &self,
        viewing_sk: &SecpSecretKey,
        spend_pk: &SecpPublicKey,
        announcements: I,
    ) -> Result<(Vec<MatchedPayment>, ScanStats)>
    where
        I: IntoIterator<Item = &'a PaymentAnnouncement>,
    {
        let keys = self.scan_keys(viewing_sk, spend_pk)?;
        let started = std::time::Instant::now();
        let mut stats = ScanStats::new();
        let mut matches = Vec::new();

        for announcement in announcements {
            let result = keys.scan(announcement);
            stats.record(&result);
            if let Some(matched) = result.into_match() {
                matches.push(matched);
            }
        }

        stats.duration_ms = started.elapsed().as_millis() as u64;
        debug!(
            scanned = stats.total_scanned,
            matches = stats.matches,
            invalid = stats.invalid,
            "scan finished"
        );
        Ok((matches, stats))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // RECIPIENT SIDE: RECOVERY
    // ═══════════════════════════════════════════════════════════════════════════

    /// Recovers the private key of a stealth address.
    ///
    /// A wrong `k` or ephemeral key yields a key for some other address; use
    /// [`recover_and_verify`](Self::recover_and_verify) to catch that.
    pub fn recover_stealth_private_key(
        &self,
        spend_sk: &SecpSecretKey,
        viewing_sk: &SecpSecretKey,
        ephemeral_pk: &[u8],
        k: u32,
    ) -> Result<StealthPrivateKey> {
        self.check_index(k)?;

        let ephemeral = parse_public_key(ephemeral_pk)?;
        let viewing = parse_secret_key(viewing_sk)?;

        let secret = compute_shared_secret(&viewing, &ephemeral, k);
        let tweak = stealth_tweak(&secret)?;
        derive_stealth_private_key(spend_sk, &tweak)
    }

    /// Recovers the private key and checks it controls `expected_address`.
    ///
    /// # Errors
    ///
    /// `KeyMismatch` when the recovered key belongs to another address.
    pub fn recover_and_verify(
        &self,
        spend_sk: &SecpSecretKey,
        viewing_sk: &SecpSecretKey,
        ephemeral_pk: &[u8],
        k: u32,
        expected_address: &EthAddress,
    ) -> Result<StealthPrivateKey> {
        let key = self.recover_stealth_private_key(spend_sk, viewing_sk, ephemeral_pk, k)?;
        let derived = address_from_secret_key(&key)?;

        if derived != *expected_address {
            return Err(PrivatePayError::KeyMismatch {
                expected: expected_address.to_string(),
                derived: derived.to_string(),
            });
        }
        Ok(key)
    }

    /// Recovers the spending key for a matched payment.
    pub fn recover_payment(
        &self,
        keys: &MetaAddressKeys,
        matched: MatchedPayment,
    ) -> Result<DiscoveredPayment> {
        let private_key = self.recover_and_verify(
            &keys.spend.secret,
            &keys.viewing.secret,
            &matched.announcement.ephemeral_pub_key,
            matched.k,
            &matched.stealth_address,
        )?;
        Ok(DiscoveredPayment {
            matched,
            private_key,
        })
    }
}
