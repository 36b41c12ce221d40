//! In-memory announcement registry.
//!
//! Fast, thread-safe storage suitable for development, testing,
//! and single-process deployments.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, instrument};

use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::traits::AnnouncementRegistry;
use privatepay_core::types::{AnnouncementStats, EthAddress, PaymentAnnouncement, TxHash};

/// In-memory announcement registry.
///
/// # Indexing
///
/// Announcements are indexed by:
/// - ID: For direct lookup
/// - View hint: For scanning (one bucket per hint byte)
/// - Recipient: For the registered wallet a payment was addressed to
/// - Tx hash: For duplicate detection (when provided)
///
/// All operations are thread-safe and can be called concurrently.
#[derive(Debug)]
pub struct MemoryRegistry {
    /// Primary storage: ID → announcement
    announcements: DashMap<u64, PaymentAnnouncement>,
    /// View hint index: hint → [announcement IDs]
    view_hint_index: DashMap<u8, Vec<u64>>,
    /// Recipient index: wallet → [announcement IDs]
    recipient_index: DashMap<EthAddress, Vec<u64>>,
    /// Tx hash index: tx hash → announcement ID
    tx_hash_index: DashMap<TxHash, u64>,
    next_id: AtomicU64,
    stats: RwLock<AnnouncementStats>,
}

impl MemoryRegistry {
    /// Creates a new empty in-memory registry.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a registry with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            announcements: DashMap::with_capacity(capacity),
            view_hint_index: DashMap::with_capacity(256),
            recipient_index: DashMap::new(),
            tx_hash_index: DashMap::new(),
            next_id: AtomicU64::new(1),
            stats: RwLock::new(AnnouncementStats::new()),
        }
    }

    /// Returns the current statistics.
    pub fn stats(&self) -> AnnouncementStats {
        self.stats.read().clone()
    }

    /// Clears all announcements.
    pub fn clear(&self) {
        self.announcements.clear();
        self.view_hint_index.clear();
        self.recipient_index.clear();
        self.tx_hash_index.clear();
        self.next_id.store(1, Ordering::SeqCst);
        *self.stats.write() = AnnouncementStats::new();
    }

    /// Returns the number of announcements.
    pub fn len(&self) -> usize {
        self.announcements.len()
    }

    /// Returns true if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.announcements.is_empty()
    }

    /// Returns all announcements ordered by ID (for export/backup).
    pub fn all_announcements(&self) -> Vec<PaymentAnnouncement> {
        let mut all: Vec<PaymentAnnouncement> = self
            .announcements
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by_key(|a| a.id);
        all
    }

    /// Imports announcements, keeping their IDs where set.
    ///
    /// Announcements whose transaction hash is already present, or that are
    /// identical to the stored announcement with the same ID, are skipped, so
    /// importing the same export twice is harmless. A different announcement
    /// under an existing ID fails the whole batch before anything is stored.
    pub fn import(&self, announcements: Vec<PaymentAnnouncement>) -> Result<usize> {
        let mut pending = Vec::with_capacity(announcements.len());
        let mut batch_ids = HashSet::new();
        let mut max_id = 0u64;

        for ann in announcements {
            ann.validate()?;

            if let Some(hash) = ann.tx_hash {
                if self.tx_hash_index.contains_key(&hash) {
                    debug!(tx_hash = %hash, "Skipping already imported announcement");
                    continue;
                }
            }

            if ann.id != 0 {
                if let Some(existing) = self.announcements.get(&ann.id) {
                    if *existing == ann {
                        debug!(id = ann.id, "Skipping already imported announcement");
                        continue;
                    }
                    return Err(id_taken(ann.id));
                }
                if !batch_ids.insert(ann.id) {
                    return Err(PrivatePayError::RegistryError(format!(
                        "announcement {} appears twice in import",
                        ann.id
                    )));
                }
                max_id = max_id.max(ann.id);
            }
            pending.push(ann);
        }

        if max_id > 0 {
            let next = max_id.checked_add(1).ok_or_else(|| {
                PrivatePayError::RegistryError(format!("announcement id {} out of range", max_id))
            })?;
            self.next_id.fetch_max(next, Ordering::SeqCst);
        }

        let mut imported = 0;
        for mut ann in pending {
            if ann.id == 0 {
                ann.id = self.next_id.fetch_add(1, Ordering::SeqCst);
            }
            self.insert_indexed(ann)?;
            imported += 1;
        }

        Ok(imported)
    }

    fn insert_indexed(&self, announcement: PaymentAnnouncement) -> Result<()> {
        let id = announcement.id;
        let view_hint = announcement.view_hint;
        let recipient = announcement.recipient;
        let tx_hash = announcement.tx_hash;

        match self.announcements.entry(id) {
            Entry::Occupied(_) => return Err(id_taken(id)),
            Entry::Vacant(slot) => {
                self.stats.write().add(&announcement);
                slot.insert(announcement);
            }
        }

        self.view_hint_index.entry(view_hint).or_default().push(id);
        self.recipient_index.entry(recipient).or_default().push(id);
        if let Some(hash) = tx_hash {
            self.tx_hash_index.insert(hash, id);
        }
        Ok(())
    }

    fn collect_ids(&self, ids: &[u64]) -> Vec<PaymentAnnouncement> {
        ids.iter()
            .filter_map(|id| self.announcements.get(id).map(|a| a.clone()))
            .collect()
    }

    fn collect_sorted<F>(&self, keep: F) -> Vec<PaymentAnnouncement>
    where
        F: Fn(&PaymentAnnouncement) -> bool,
    {
        let mut out: Vec<PaymentAnnouncement> = self
            .announcements
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by_key(|a| a.id);
        out
    }
}

fn id_taken(id: u64) -> PrivatePayError {
    PrivatePayError::RegistryError(format!("announcement {} already exists", id))
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnnouncementRegistry for MemoryRegistry {
    #[instrument(skip(self, announcement), fields(view_hint = announcement.view_hint))]
    async fn publish(&self, mut announcement: PaymentAnnouncement) -> Result<u64> {
        announcement.validate()?;

        if let Some(hash) = announcement.tx_hash {
            if self.tx_hash_index.contains_key(&hash) {
                return Err(PrivatePayError::DuplicateAnnouncement(hash.to_hex()));
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        announcement.id = id;

        debug!(id, recipient = %announcement.recipient, "Publishing announcement");
        self.insert_indexed(announcement)?;

        Ok(id)
    }

    /// One bucket lookup, then a clone per entry in that bucket.
    #[instrument(skip(self))]
    async fn get_by_view_hint(&self, view_hint: u8) -> Result<Vec<PaymentAnnouncement>> {
        let ids = match self.view_hint_index.get(&view_hint) {
            Some(ids) => ids.clone(),
            None => return Ok(Vec::new()),
        };
        let announcements = self.collect_ids(&ids);

        debug!(view_hint, count = announcements.len(), "Retrieved by view hint");
        Ok(announcements)
    }

    #[instrument(skip(self))]
    async fn get_by_recipient(&self, recipient: &EthAddress) -> Result<Vec<PaymentAnnouncement>> {
        let ids = match self.recipient_index.get(recipient) {
            Some(ids) => ids.clone(),
            None => return Ok(Vec::new()),
        };
        Ok(self.collect_ids(&ids))
    }

    #[instrument(skip(self))]
    async fn get_by_time_range(&self, start: u64, end: u64) -> Result<Vec<PaymentAnnouncement>> {
        let mut announcements = self.collect_sorted(|a| a.timestamp >= start && a.timestamp <= end);
        announcements.sort_by_key(|a| a.timestamp);

        debug!(start, end, count = announcements.len(), "Retrieved by time range");
        Ok(announcements)
    }

    /// Announcements without a block number are never returned.
    #[instrument(skip(self))]
    async fn get_by_block_range(&self, from: u64, to: u64) -> Result<Vec<PaymentAnnouncement>> {
        let mut announcements = self.collect_sorted(|a| {
            a.block_number
                .map_or(false, |block| block >= from && block <= to)
        });
        announcements.sort_by_key(|a| a.block_number);

        debug!(from, to, count = announcements.len(), "Retrieved by block range");
        Ok(announcements)
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<PaymentAnnouncement>> {
        Ok(self.announcements.get(&id).map(|entry| entry.clone()))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.announcements.len() as u64)
    }

    async fn next_id(&self) -> Result<u64> {
        Ok(self.next_id.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use privatepay_core::constants::COMPRESSED_PUBLIC_KEY_SIZE;

    fn ephemeral_key() -> Vec<u8> {
        let mut key = vec![0x42u8; COMPRESSED_PUBLIC_KEY_SIZE];
        key[0] = 0x02;
        key
    }

    fn make_test_announcement(view_hint: u8) -> PaymentAnnouncement {
        make_for(EthAddress::from_array([1; 20]), view_hint)
    }

    fn make_for(recipient: EthAddress, view_hint: u8) -> PaymentAnnouncement {
        PaymentAnnouncement::builder()
            .recipient(recipient)
            .ephemeral_pub_key(ephemeral_key())
            .stealth_address(EthAddress::from_array([2; 20]))
            .view_hint(view_hint)
            .amount(1_000)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_publish_and_get_by_id() {
        let registry = MemoryRegistry::new();
        let id = registry.publish(make_test_announcement(0x42)).await.unwrap();
        assert_eq!(id, 1);

        let retrieved = registry.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(retrieved.view_hint, 0x42);
        assert_eq!(retrieved.id, 1);
    }

    #[tokio::test]
    async fn test_get_by_view_hint() {
        let registry = MemoryRegistry::new();

        registry.publish(make_test_announcement(0x42)).await.unwrap();
        registry.publish(make_test_announcement(0x42)).await.unwrap();
        registry.publish(make_test_announcement(0x00)).await.unwrap();

        assert_eq!(registry.get_by_view_hint(0x42).await.unwrap().len(), 2);
        assert_eq!(registry.get_by_view_hint(0x00).await.unwrap().len(), 1);
        assert!(registry.get_by_view_hint(0xFF).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_by_recipient() {
        let registry = MemoryRegistry::new();
        let alice = EthAddress::from_array([0xA1; 20]);
        let bob = EthAddress::from_array([0xB0; 20]);

        registry.publish(make_for(alice, 1)).await.unwrap();
        registry.publish(make_for(bob, 2)).await.unwrap();
        registry.publish(make_for(alice, 3)).await.unwrap();

        let for_alice = registry.get_by_recipient(&alice).await.unwrap();
        assert_eq!(for_alice.len(), 2);
        assert!(for_alice.iter().all(|a| a.recipient == alice));
        assert!(registry
            .get_by_recipient(&EthAddress::from_array([9; 20]))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_get_by_time_range() {
        let registry = MemoryRegistry::new();
        for (hint, ts) in [(0x01, 100), (0x02, 200), (0x03, 300)] {
            let mut ann = make_test_announcement(hint);
            ann.timestamp = ts;
            registry.publish(ann).await.unwrap();
        }

        let results = registry.get_by_time_range(150, 250).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].view_hint, 0x02);

        assert_eq!(registry.get_by_time_range(0, 500).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_get_by_block_range() {
        let registry = MemoryRegistry::new();
        for block in [32_784_400u64, 32_784_500, 32_784_600] {
            let mut ann = make_test_announcement(0x10);
            ann.block_number = Some(block);
            registry.publish(ann).await.unwrap();
        }
        registry.publish(make_test_announcement(0x10)).await.unwrap();

        let hits = registry
            .get_by_block_range(32_784_450, 32_784_600)
            .await
            .unwrap();
        let blocks: Vec<_> = hits.iter().filter_map(|a| a.block_number).collect();
        assert_eq!(blocks, vec![32_784_500, 32_784_600]);
    }

    #[tokio::test]
    async fn test_duplicate_tx_hash_rejected() {
        let registry = MemoryRegistry::new();
        let mut ann = make_test_announcement(0x01);
        ann.tx_hash = Some(TxHash::from_array([7; 32]));

        registry.publish(ann.clone()).await.unwrap();
        let err = registry.publish(ann).await.unwrap_err();
        assert!(matches!(err, PrivatePayError::DuplicateAnnouncement(_)));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let registry = MemoryRegistry::new();

        registry.publish(make_test_announcement(0x42)).await.unwrap();
        registry.publish(make_test_announcement(0x42)).await.unwrap();
        registry.publish(make_test_announcement(0x00)).await.unwrap();

        let stats = registry.stats();
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.view_hint_distribution[0x42], 2);
        assert_eq!(stats.view_hint_distribution[0x00], 1);
        assert_eq!(stats.total_amount, 3_000);
    }

    #[tokio::test]
    async fn test_clear() {
        let registry = MemoryRegistry::new();
        registry.publish(make_test_announcement(0x01)).await.unwrap();
        registry.publish(make_test_announcement(0x02)).await.unwrap();
        assert_eq!(registry.len(), 2);

        registry.clear();

        assert!(registry.is_empty());
        assert_eq!(registry.next_id().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_import_export() {
        let registry1 = MemoryRegistry::new();
        registry1.publish(make_test_announcement(0x01)).await.unwrap();
        let mut with_hash = make_test_announcement(0x02);
        with_hash.tx_hash = Some(TxHash::from_array([3; 32]));
        registry1.publish(with_hash).await.unwrap();

        let announcements = registry1.all_announcements();
        assert_eq!(announcements.len(), 2);

        let registry2 = MemoryRegistry::new();
        assert_eq!(registry2.import(announcements.clone()).unwrap(), 2);
        assert_eq!(registry2.len(), 2);
        assert_eq!(registry2.next_id().await.unwrap(), 3);

        // Re-importing the same export changes nothing
        assert_eq!(registry2.import(announcements).unwrap(), 0);
        assert_eq!(registry2.len(), 2);
        assert_eq!(registry2.stats().total_count, 2);
    }

    #[tokio::test]
    async fn test_import_rejects_taken_id() {
        let registry = MemoryRegistry::new();
        registry.publish(make_test_announcement(1)).await.unwrap();

        let mut conflicting = make_test_announcement(2);
        conflicting.id = 1;
        let fresh = make_test_announcement(3);
        let err = registry.import(vec![fresh, conflicting]).unwrap_err();
        assert!(matches!(err, PrivatePayError::RegistryError(_)));

        // Nothing from the failed batch is stored
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.stats().total_count, 1);
        assert_eq!(registry.get_by_id(1).await.unwrap().unwrap().view_hint, 1);
        let by_hint = registry.get_by_view_hint(1).await.unwrap();
        assert_eq!(by_hint.len(), 1);
        assert_eq!(by_hint[0].view_hint, 1);
        assert!(registry.get_by_view_hint(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_rejects_repeated_id_in_batch() {
        let registry = MemoryRegistry::new();
        let mut first = make_test_announcement(1);
        first.id = 7;
        let mut second = make_test_announcement(2);
        second.id = 7;

        assert!(registry.import(vec![first, second]).is_err());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_import_max_id_does_not_overflow() {
        let registry = MemoryRegistry::new();
        let mut ann = make_test_announcement(1);
        ann.id = u64::MAX;

        let err = registry.import(vec![ann]).unwrap_err();
        assert!(matches!(err, PrivatePayError::RegistryError(_)));
        assert!(registry.is_empty());
        assert_eq!(registry.next_id().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_import_assigns_ids_above_explicit_ones() {
        let registry = MemoryRegistry::new();
        let unnumbered = make_test_announcement(1);
        let mut numbered = make_test_announcement(2);
        numbered.id = 1;

        assert_eq!(registry.import(vec![unnumbered, numbered]).unwrap(), 2);
        let ids: Vec<u64> = registry.all_announcements().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(registry.get_by_id(1).await.unwrap().unwrap().view_hint, 2);
    }

    #[tokio::test]
    async fn test_concurrent_publish() {
        use std::sync::Arc;
        use tokio::task::JoinSet;

        let registry = Arc::new(MemoryRegistry::new());
        let mut tasks = JoinSet::new();

        for i in 0..100u8 {
            let reg = registry.clone();
            tasks.spawn(async move { reg.publish(make_test_announcement(i)).await.unwrap() });
        }

        let mut ids = Vec::new();
        while let Some(result) = tasks.join_next().await {
            ids.push(result.unwrap());
        }
        ids.sort_unstable();
        ids.dedup();

        assert_eq!(ids.len(), 100);
        assert_eq!(registry.len(), 100);
    }

    #[tokio::test]
    async fn test_invalid_announcement_rejected() {
        let registry = MemoryRegistry::new();
        let mut invalid = make_test_announcement(0x00);
        invalid.ephemeral_pub_key = vec![0u8; COMPRESSED_PUBLIC_KEY_SIZE];

        assert!(matches!(
            registry.publish(invalid).await,
            Err(PrivatePayError::InvalidPublicKey(_))
        ));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let registry = MemoryRegistry::new();
        assert!(registry.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let registry = MemoryRegistry::new();
        for expected in 1..=3 {
            let id = registry.publish(make_test_announcement(0x01)).await.unwrap();
            assert_eq!(id, expected);
        }
    }
}
