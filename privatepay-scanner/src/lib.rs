//! # PrivatePay Scanner
//!
//! Batch scanning of payment announcements to discover incoming stealth payments.
//!
//! ## Features
//!
//! - **Batch Processing**: Scans announcements in configurable batches
//! - **Progress Reporting**: Callbacks for UI progress updates
//! - **Resumable Scans**: Track position to resume interrupted scans
//! - **Parallel Scanning**: Fans chunks out over blocking worker threads
//! - **Chain Sources**: Pulls announcements from any [`AnnouncementSource`]
//!   in block windows
//!
//! ## Example
//!
//! ```rust,ignore
//! use privatepay_scanner::{Scanner, ScannerConfig};
//! use privatepay_registry::MemoryRegistry;
//!
//! let scanner = Scanner::from_wallet(&wallet)?;
//! let found = scanner.scan_all(&registry).await?;
//!
//! for payment in found {
//!     println!("Found payment at: {}", payment.stealth_address());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use privatepay_core::constants::{
    DEFAULT_LOG_BLOCK_WINDOW, DEFAULT_SCAN_BATCH_SIZE, MAX_SCAN_BATCH_SIZE,
};
use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::traits::{AnnouncementRegistry, AnnouncementSource};
use privatepay_core::types::{
    DiscoveredPayment, EthAddress, MatchedPayment, PaymentAnnouncement, SecpPublicKey,
    SecpSecretKey,
};
use privatepay_crypto::keys::public_key_of;
use privatepay_stealth::{
    PrivatePayWallet, ScanKeys, ScanResult, ScanStats, StealthAddressEngine, ViewingKeyExport,
};

pub use privatepay_core::traits::{ProgressCallback, ScanProgress};

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Scanner configuration.
#[derive(Clone, Debug)]
pub struct ScannerConfig {
    /// Announcements scanned between progress updates
    pub batch_size: usize,
    /// Whether to stop on first discovery
    pub stop_on_first: bool,
    /// First block to scan (inclusive)
    pub from_block: Option<u64>,
    /// Last block to scan (inclusive)
    pub to_block: Option<u64>,
    /// Minimum timestamp to scan from (inclusive)
    pub from_timestamp: Option<u64>,
    /// Maximum timestamp to scan to (inclusive)
    pub to_timestamp: Option<u64>,
    /// Only announcements addressed to this registered wallet
    pub recipient: Option<EthAddress>,
    /// Worker count for [`Scanner::scan_parallel`]
    pub parallelism: usize,
    /// Block span per fetch in [`Scanner::scan_source`]
    pub block_window: u64,
    /// Skip what the scanner's [`ScanPosition`] already covers
    pub resume: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_SCAN_BATCH_SIZE,
            stop_on_first: false,
            from_block: None,
            to_block: None,
            from_timestamp: None,
            to_timestamp: None,
            recipient: None,
            parallelism: std::thread::available_parallelism().map_or(4, |n| n.get()),
            block_window: DEFAULT_LOG_BLOCK_WINDOW,
            resume: false,
        }
    }
}

impl ScannerConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the batch size.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Enables stopping on first discovery.
    pub fn stop_on_first(mut self) -> Self {
        self.stop_on_first = true;
        self
    }

    /// Sets the block range filter.
    pub fn block_range(mut self, from: u64, to: u64) -> Self {
        self.from_block = Some(from);
        self.to_block = Some(to);
        self
    }

    /// Sets only the first block, scanning up to the latest one.
    pub fn from_block(mut self, from: u64) -> Self {
        self.from_block = Some(from);
        self
    }

    /// Sets the time range filter.
    pub fn time_range(mut self, from: u64, to: u64) -> Self {
        self.from_timestamp = Some(from);
        self.to_timestamp = Some(to);
        self
    }

    /// Restricts the scan to announcements for `recipient`.
    pub fn recipient(mut self, recipient: EthAddress) -> Self {
        self.recipient = Some(recipient);
        self
    }

    /// Sets the number of parallel workers.
    pub fn parallelism(mut self, workers: usize) -> Self {
        self.parallelism = workers;
        self
    }

    /// Sets the block span per fetch.
    pub fn block_window(mut self, blocks: u64) -> Self {
        self.block_window = blocks;
        self
    }

    /// Continues after the scanner's current position.
    pub fn resume(mut self) -> Self {
        self.resume = true;
        self
    }

    /// Checks the configuration for values that would stall a scan.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.batch_size > MAX_SCAN_BATCH_SIZE {
            return Err(PrivatePayError::config(
                "batch_size",
                format!("must be between 1 and {}", MAX_SCAN_BATCH_SIZE),
            ));
        }
        if self.parallelism == 0 {
            return Err(PrivatePayError::config("parallelism", "must be greater than 0"));
        }
        if self.block_window == 0 {
            return Err(PrivatePayError::config("block_window", "must be greater than 0"));
        }
        if let (Some(from), Some(to)) = (self.from_block, self.to_block) {
            if from > to {
                return Err(PrivatePayError::config(
                    "block_range",
                    format!("from {} is after to {}", from, to),
                ));
            }
        }
        if let (Some(from), Some(to)) = (self.from_timestamp, self.to_timestamp) {
            if from > to {
                return Err(PrivatePayError::config(
                    "time_range",
                    format!("from {} is after to {}", from, to),
                ));
            }
        }
        Ok(())
    }

    /// Returns true if `announcement` passes every filter.
    pub fn matches(&self, announcement: &PaymentAnnouncement) -> bool {
        if let Some(recipient) = self.recipient {
            if announcement.recipient != recipient {
                return false;
            }
        }
        if self.from_timestamp.map_or(false, |from| announcement.timestamp < from)
            || self.to_timestamp.map_or(false, |to| announcement.timestamp > to)
        {
            return false;
        }
        if self.from_block.is_some() || self.to_block.is_some() {
            let Some(block) = announcement.block_number else {
                return false;
            };
            if self.from_block.map_or(false, |from| block < from)
                || self.to_block.map_or(false, |to| block > to)
            {
                return false;
            }
        }
        true
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// POSITION & RESULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Scan position for resumable scanning.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPosition {
    /// Highest announcement ID scanned
    pub last_id: u64,
    /// Last block fully scanned from a chain source
    pub last_block: Option<u64>,
    /// Timestamp of the last scanned announcement
    pub last_timestamp: u64,
    /// Total announcements scanned in this session
    pub total_scanned: u64,
    /// Total discoveries in this session
    pub total_discoveries: u64,
}

impl ScanPosition {
    /// Creates a new scan position.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates position after scanning an announcement.
    pub fn update(&mut self, announcement: &PaymentAnnouncement, discovered: bool) {
        self.last_id = self.last_id.max(announcement.id);
        self.last_timestamp = announcement.timestamp;
        self.total_scanned += 1;
        if discovered {
            self.total_discoveries += 1;
        }
    }

    /// Marks every block up to `block` as scanned.
    pub fn complete_block(&mut self, block: u64) {
        self.last_block = Some(self.last_block.map_or(block, |b| b.max(block)));
    }
}

/// A payment found by the scanner.
///
/// Scanners built without the spend key can only confirm that a payment is
/// theirs; with it, the stealth private key is recovered as well.
#[derive(Clone, Debug)]
pub enum ScanMatch {
    /// Matched with the viewing key only
    Viewed(MatchedPayment),
    /// Matched and spendable
    Spendable(DiscoveredPayment),
}

impl ScanMatch {
    /// The underlying match.
    pub fn matched(&self) -> &MatchedPayment {
        match self {
            ScanMatch::Viewed(matched) => matched,
            ScanMatch::Spendable(discovered) => &discovered.matched,
        }
    }

    /// The announcement that matched.
    pub fn announcement(&self) -> &PaymentAnnouncement {
        &self.matched().announcement
    }

    /// Stealth address holding the funds.
    pub fn stealth_address(&self) -> EthAddress {
        self.matched().stealth_address
    }

    /// Announced amount in wei.
    pub fn amount(&self) -> u128 {
        self.matched().announcement.amount
    }

    /// Stealth private key, when the scanner holds the spend key.
    pub fn private_key(&self) -> Option<&SecpSecretKey> {
        match self {
            ScanMatch::Viewed(_) => None,
            ScanMatch::Spendable(discovered) => Some(&discovered.private_key),
        }
    }

    /// Converts into a spendable payment, if the key was recovered.
    pub fn into_discovered(self) -> Option<DiscoveredPayment> {
        match self {
            ScanMatch::Viewed(_) => None,
            ScanMatch::Spendable(discovered) => Some(discovered),
        }
    }
}

/// Scan result summary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Number of announcements scanned
    pub total_scanned: u64,
    /// Number of view hint matches
    pub view_hint_matches: u64,
    /// Number of payments discovered
    pub discoveries: u64,
    /// Number of malformed announcements
    pub invalid: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Scan rate (announcements per second)
    pub rate: f64,
    /// Filter efficiency (% discarded by the view hint)
    pub filter_efficiency: f64,
}

impl From<ScanStats> for ScanSummary {
    fn from(stats: ScanStats) -> Self {
        Self {
            total_scanned: stats.total_scanned,
            view_hint_matches: stats.view_hint_matches,
            discoveries: stats.matches,
            invalid: stats.invalid,
            duration_ms: stats.duration_ms,
            rate: stats.rate(),
            filter_efficiency: stats.filter_efficiency(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCANNER
// ═══════════════════════════════════════════════════════════════════════════════

/// Main scanner for discovering payments.
pub struct Scanner {
    keys: Arc<ScanKeys>,
    viewing_sk: SecpSecretKey,
    spend_pk: SecpPublicKey,
    spend_sk: Option<SecpSecretKey>,
    engine: StealthAddressEngine,
    position: RwLock<ScanPosition>,
    stats: RwLock<ScanStats>,
}

impl Scanner {
    /// Creates a view-only scanner.
    pub fn new(viewing_sk: SecpSecretKey, spend_pk: SecpPublicKey) -> Result<Self> {
        Self::with_engine(StealthAddressEngine::default(), viewing_sk, spend_pk)
    }

    /// Creates a view-only scanner using `engine`'s parameters.
    pub fn with_engine(
        engine: StealthAddressEngine,
        viewing_sk: SecpSecretKey,
        spend_pk: SecpPublicKey,
    ) -> Result<Self> {
        let keys = engine.scan_keys(&viewing_sk, &spend_pk)?;
        Ok(Self {
            keys: Arc::new(keys),
            viewing_sk,
            spend_pk,
            spend_sk: None,
            engine,
            position: RwLock::new(ScanPosition::new()),
            stats: RwLock::new(ScanStats::new()),
        })
    }

    /// Creates a spend-capable scanner from a wallet.
    pub fn from_wallet(wallet: &PrivatePayWallet) -> Result<Self> {
        let keys = wallet.keys();
        Self::new(keys.viewing.secret.clone(), keys.spend.public)?
            .with_spend_key(keys.spend.secret.clone())
    }

    /// Creates a view-only scanner from an exported viewing key.
    pub fn from_viewing_key(export: &ViewingKeyExport) -> Result<Self> {
        Self::new(
            SecpSecretKey::from_hex(&export.viewing_secret_key)?,
            SecpPublicKey::from_hex(&export.spend_public_key)?,
        )
    }

    /// Attaches the spend key so matches come back with private keys.
    ///
    /// # Errors
    ///
    /// `KeyMismatch` if `spend_sk` does not belong to the scanned spend key.
    pub fn with_spend_key(mut self, spend_sk: SecpSecretKey) -> Result<Self> {
        let derived = public_key_of(&spend_sk)?;
        if derived != self.spend_pk {
            return Err(PrivatePayError::KeyMismatch {
                expected: self.spend_pk.to_hex(),
                derived: derived.to_hex(),
            });
        }
        self.spend_sk = Some(spend_sk);
        Ok(self)
    }

    /// Restores a previously saved position.
    pub fn with_position(self, position: ScanPosition) -> Self {
        *self.position.write() = position;
        self
    }

    /// Returns true if matches include private keys.
    pub fn is_spend_capable(&self) -> bool {
        self.spend_sk.is_some()
    }

    /// Returns the current scan position.
    pub fn position(&self) -> ScanPosition {
        self.position.read().clone()
    }

    /// Returns the accumulated statistics.
    pub fn stats(&self) -> ScanStats {
        self.stats.read().clone()
    }

    /// Resets position and statistics.
    pub fn reset_position(&self) {
        *self.position.write() = ScanPosition::new();
        *self.stats.write() = ScanStats::new();
    }

    /// Scans a single announcement.
    pub fn scan_one(&self, announcement: &PaymentAnnouncement) -> ScanResult {
        let result = self.keys.scan(announcement);
        self.stats.write().record(&result);
        result
    }

    /// Scans all announcements in the registry.
    pub async fn scan_all(&self, registry: &dyn AnnouncementRegistry) -> Result<Vec<ScanMatch>> {
        self.scan_with_config(registry, ScannerConfig::default()).await
    }

    /// Scans with custom configuration.
    #[instrument(skip(self, registry, config))]
    pub async fn scan_with_config(
        &self,
        registry: &dyn AnnouncementRegistry,
        config: ScannerConfig,
    ) -> Result<Vec<ScanMatch>> {
        self.scan_registry(registry, &config, None).await
    }

    /// Scans with a progress update after every batch.
    #[instrument(skip(self, registry, config, progress_callback))]
    pub async fn scan_with_progress(
        &self,
        registry: &dyn AnnouncementRegistry,
        config: ScannerConfig,
        progress_callback: ProgressCallback,
    ) -> Result<Vec<ScanMatch>> {
        self.scan_registry(registry, &config, Some(&progress_callback))
            .await
    }

    /// Splits the candidates across `config.parallelism` blocking workers.
    ///
    /// Results come back ordered by announcement ID regardless of which
    /// worker found them.
    #[instrument(skip(self, registry, config), fields(workers = config.parallelism))]
    pub async fn scan_parallel(
        &self,
        registry: &dyn AnnouncementRegistry,
        config: ScannerConfig,
    ) -> Result<Vec<ScanMatch>> {
        config.validate()?;
        let started = Instant::now();
        let candidates = self.load_candidates(registry, &config).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_size = candidates.len().div_ceil(config.parallelism);
        let tasks = candidates.chunks(chunk_size).map(|chunk| {
            let keys = Arc::clone(&self.keys);
            let chunk = chunk.to_vec();
            tokio::task::spawn_blocking(move || {
                let mut stats = ScanStats::new();
                let mut matches = Vec::new();
                for announcement in &chunk {
                    let result = keys.scan(announcement);
                    stats.record(&result);
                    if let Some(matched) = result.into_match() {
                        matches.push(matched);
                    }
                }
                (matches, stats)
            })
        });

        let results = futures::future::try_join_all(tasks)
            .await
            .map_err(|e| PrivatePayError::InternalError(format!("scan worker failed: {}", e)))?;

        let mut stats = ScanStats::new();
        let mut matches = Vec::new();
        for (chunk_matches, chunk_stats) in results {
            stats.merge(&chunk_stats);
            matches.extend(chunk_matches);
        }
        matches.sort_by_key(|m| m.announcement.id);
        if config.stop_on_first {
            matches.truncate(1);
        }

        // Announcements past the kept match stay unread so a resumed scan sees them.
        let cutoff = matches.first().filter(|_| config.stop_on_first).map(|m| m.announcement.id);
        {
            let mut position = self.position.write();
            for announcement in &candidates {
                if cutoff.is_some_and(|id| announcement.id > id) {
                    continue;
                }
                let discovered = matches.iter().any(|m| m.announcement.id == announcement.id);
                position.update(announcement, discovered);
            }
        }
        stats.duration_ms = started.elapsed().as_millis() as u64;
        self.stats.write().merge(&stats);

        info!(
            scanned = stats.total_scanned,
            discoveries = matches.len(),
            duration_ms = stats.duration_ms,
            "Parallel scan complete"
        );
        matches.into_iter().map(|m| self.resolve(m)).collect()
    }

    /// Pulls announcements from `source` block window by block window.
    ///
    /// Stops at `config.to_block` or the source's latest block, whichever is
    /// lower. The position records the last completed block so a resumed
    /// scan continues from the next one.
    #[instrument(skip(self, source, config))]
    pub async fn scan_source(
        &self,
        source: &dyn AnnouncementSource,
        config: ScannerConfig,
    ) -> Result<Vec<ScanMatch>> {
        config.validate()?;
        let started = Instant::now();
        let latest = source.latest_block().await?;

        let mut from = config.from_block.unwrap_or(0);
        if config.resume {
            if let Some(last) = self.position.read().last_block {
                from = from.max(last.saturating_add(1));
            }
        }
        let to = config.to_block.map_or(latest, |to| to.min(latest));
        info!(from, to, window = config.block_window, "Scanning announcement source");

        let mut found = Vec::new();
        while from <= to {
            let window_end = from.saturating_add(config.block_window - 1).min(to);
            let announcements = source.fetch_announcements(from, window_end).await?;
            debug!(from, to = window_end, count = announcements.len(), "Fetched block window");

            let candidates: Vec<PaymentAnnouncement> = announcements
                .into_iter()
                .filter(|a| config.matches(a))
                .collect();
            let (_, stop) = self.scan_batch(&candidates, &config, &mut found)?;
            if stop {
                break;
            }
            self.position.write().complete_block(window_end);

            if window_end == u64::MAX {
                break;
            }
            from = window_end + 1;
        }

        self.stats.write().duration_ms += started.elapsed().as_millis() as u64;
        info!(discoveries = found.len(), "Source scan complete");
        Ok(found)
    }

    async fn scan_registry(
        &self,
        registry: &dyn AnnouncementRegistry,
        config: &ScannerConfig,
        progress_callback: Option<&ProgressCallback>,
    ) -> Result<Vec<ScanMatch>> {
        config.validate()?;
        let started = Instant::now();
        let candidates = self.load_candidates(registry, config).await?;

        let mut progress = ScanProgress {
            total: candidates.len() as u64,
            ..ScanProgress::default()
        };
        info!(total = progress.total, "Starting scan");

        let mut found = Vec::new();
        for batch in candidates.chunks(config.batch_size) {
            let (batch_stats, stop) = self.scan_batch(batch, config, &mut found)?;

            progress.scanned += batch_stats.total_scanned;
            progress.hint_matches += batch_stats.view_hint_matches;
            progress.discoveries = found.len() as u64;
            debug!(scanned = progress.scanned, total = progress.total, "Batch scanned");
            if let Some(callback) = progress_callback {
                callback(progress.clone());
            }

            if stop {
                info!("Stopping on first discovery");
                break;
            }
        }
        if candidates.is_empty() {
            if let Some(callback) = progress_callback {
                callback(progress);
            }
        }

        let mut stats = self.stats.write();
        stats.duration_ms += started.elapsed().as_millis() as u64;
        info!(
            discoveries = found.len(),
            scanned = stats.total_scanned,
            duration_ms = stats.duration_ms,
            rate = format!("{:.2}/s", stats.rate()),
            "Scan complete"
        );

        Ok(found)
    }

    /// Scans `batch` in order, appending matches to `found`.
    ///
    /// Returns the batch statistics and whether the scan should stop.
    fn scan_batch(
        &self,
        batch: &[PaymentAnnouncement],
        config: &ScannerConfig,
        found: &mut Vec<ScanMatch>,
    ) -> Result<(ScanStats, bool)> {
        let mut stats = ScanStats::new();
        let mut stop = false;

        for announcement in batch {
            let result = self.keys.scan(announcement);
            stats.record(&result);
            let matched = result.into_match();
            self.position.write().update(announcement, matched.is_some());

            if let Some(matched) = matched {
                debug!(id = announcement.id, address = %matched.stealth_address, "Found payment");
                found.push(self.resolve(matched)?);
                if config.stop_on_first {
                    stop = true;
                    break;
                }
            }
        }

        self.stats.write().merge(&stats);
        Ok((stats, stop))
    }

    /// Picks the narrowest registry index for the configured filters.
    async fn load_candidates(
        &self,
        registry: &dyn AnnouncementRegistry,
        config: &ScannerConfig,
    ) -> Result<Vec<PaymentAnnouncement>> {
        let mut candidates = match config.recipient {
            Some(recipient) => registry.get_by_recipient(&recipient).await?,
            None if config.from_block.is_some() || config.to_block.is_some() => {
                registry
                    .get_by_block_range(
                        config.from_block.unwrap_or(0),
                        config.to_block.unwrap_or(u64::MAX),
                    )
                    .await?
            }
            None => {
                registry
                    .get_by_time_range(
                        config.from_timestamp.unwrap_or(0),
                        config.to_timestamp.unwrap_or(u64::MAX),
                    )
                    .await?
            }
        };

        let after = if config.resume {
            self.position.read().last_id
        } else {
            0
        };
        candidates.retain(|a| a.id > after && config.matches(a));
        candidates.sort_by_key(|a| a.id);
        Ok(candidates)
    }

    fn resolve(&self, matched: MatchedPayment) -> Result<ScanMatch> {
        let Some(spend_sk) = &self.spend_sk else {
            return Ok(ScanMatch::Viewed(matched));
        };
        let private_key = self.engine.recover_and_verify(
            spend_sk,
            &self.viewing_sk,
            &matched.announcement.ephemeral_pub_key,
            matched.k,
            &matched.stealth_address,
        )?;
        Ok(ScanMatch::Spendable(DiscoveredPayment {
            matched,
            private_key,
        }))
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("spend_capable", &self.is_spend_capable())
            .field("position", &*self.position.read())
            .finish_non_exhaustive()
    }
}
