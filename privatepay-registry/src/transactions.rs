//! Off-chain transaction bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, instrument};

use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::traits::TransactionStore;
use privatepay_core::types::{current_timestamp, EthAddress, TransactionRecord, TxHash, TxStatus};

/// In-memory [`TransactionStore`] keyed by transaction hash.
///
/// Status only moves forward: a confirmed record cannot return to pending.
#[derive(Debug)]
pub struct MemoryTransactionStore {
    records: DashMap<TxHash, TransactionRecord>,
    next_id: AtomicU64,
}

impl MemoryTransactionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MemoryTransactionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    #[instrument(skip(self, record), fields(tx_hash = %record.tx_hash))]
    async fn insert(&self, mut record: TransactionRecord) -> Result<u64> {
        match self.records.entry(record.tx_hash) {
            Entry::Occupied(_) => Err(PrivatePayError::ValidationError(format!(
                "transaction {} already recorded",
                record.tx_hash
            ))),
            Entry::Vacant(entry) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                record.id = id;
                if record.created_at == 0 {
                    record.created_at = current_timestamp();
                }
                debug!(id, tx_type = ?record.tx_type, "Recorded transaction");
                entry.insert(record);
                Ok(id)
            }
        }
    }

    #[instrument(skip(self))]
    async fn update_status(
        &self,
        tx_hash: &TxHash,
        status: TxStatus,
        block_number: Option<u64>,
    ) -> Result<TransactionRecord> {
        let mut record = self
            .records
            .get_mut(tx_hash)
            .ok_or_else(|| PrivatePayError::TransactionNotFound(tx_hash.to_hex()))?;

        if record.status == TxStatus::Confirmed && status == TxStatus::Pending {
            return Err(PrivatePayError::ValidationError(format!(
                "transaction {} is already confirmed",
                tx_hash
            )));
        }

        record.status = status;
        if block_number.is_some() {
            record.block_number = block_number;
        }
        Ok(record.clone())
    }

    async fn get_by_tx_hash(&self, tx_hash: &TxHash) -> Result<Option<TransactionRecord>> {
        Ok(self.records.get(tx_hash).map(|r| r.clone()))
    }

    async fn list_for_address(&self, address: &EthAddress) -> Result<Vec<TransactionRecord>> {
        let mut records: Vec<TransactionRecord> = self
            .records
            .iter()
            .filter(|entry| entry.value().involves(address))
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }
}
