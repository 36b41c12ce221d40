//! Common traits for PrivatePay.
//!
//! These traits are the seams between the stateless stealth core and the
//! stateful collaborators around it: announcement storage, the on-chain
//! registry, the alias directory, and the off-chain transaction store.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    EthAddress, MetaAddress, PaymentAnnouncement, RegisteredMetaAddress, TransactionRecord,
    TxHash, TxStatus,
};

// ═══════════════════════════════════════════════════════════════════════════════
// ANNOUNCEMENT STORAGE
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for announcement storage and retrieval.
///
/// Implementations might use:
/// - In-memory storage (for testing/development)
/// - A local file (for the CLI)
/// - A mirror of on-chain `PaymentAnnouncement` logs
#[async_trait]
pub trait AnnouncementRegistry: Send + Sync {
    /// Publishes a new announcement to the registry.
    ///
    /// Returns the assigned announcement ID.
    async fn publish(&self, announcement: PaymentAnnouncement) -> Result<u64>;

    /// Retrieves announcements by view hint.
    async fn get_by_view_hint(&self, view_hint: u8) -> Result<Vec<PaymentAnnouncement>>;

    /// Retrieves announcements addressed to a registered wallet.
    async fn get_by_recipient(&self, recipient: &EthAddress) -> Result<Vec<PaymentAnnouncement>>;

    /// Retrieves announcements within a time range (inclusive).
    async fn get_by_time_range(&self, start: u64, end: u64) -> Result<Vec<PaymentAnnouncement>>;

    /// Retrieves announcements within a block range (inclusive).
    async fn get_by_block_range(&self, from: u64, to: u64) -> Result<Vec<PaymentAnnouncement>>;

    /// Retrieves a specific announcement by ID.
    async fn get_by_id(&self, id: u64) -> Result<Option<PaymentAnnouncement>>;

    /// Returns total announcement count.
    async fn count(&self) -> Result<u64>;

    /// Returns the next available announcement ID.
    async fn next_id(&self) -> Result<u64>;
}

/// A pull source of announcements keyed by block, such as chain logs.
#[async_trait]
pub trait AnnouncementSource: Send + Sync {
    /// Latest block the source can serve.
    async fn latest_block(&self) -> Result<u64>;

    /// Announcements emitted in `[from_block, to_block]`, in log order.
    async fn fetch_announcements(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<PaymentAnnouncement>>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// META-ADDRESS DIRECTORY
// ═══════════════════════════════════════════════════════════════════════════════

/// Read access to published meta-addresses (the registry contract surface).
#[async_trait]
pub trait MetaAddressDirectory: Send + Sync {
    /// Returns the meta-address `owner` registered at `index`.
    async fn get_meta_address(&self, owner: &EthAddress, index: u64)
        -> Result<RegisteredMetaAddress>;

    /// Number of meta-addresses `owner` has registered.
    async fn get_meta_address_count(&self, owner: &EthAddress) -> Result<u64>;

    /// Latest registered meta-address, if any.
    async fn get_latest_meta_address(
        &self,
        owner: &EthAddress,
    ) -> Result<Option<RegisteredMetaAddress>> {
        let count = self.get_meta_address_count(owner).await?;
        if count == 0 {
            return Ok(None);
        }
        self.get_meta_address(owner, count - 1).await.map(Some)
    }
}

/// Write access to a meta-address registry.
#[async_trait]
pub trait MetaAddressRegistrar: Send + Sync {
    /// Registers a new meta-address for `owner`; returns the assigned index.
    async fn register_meta_address(&self, owner: EthAddress, meta: MetaAddress) -> Result<u64>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// OFF-CHAIN STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Human-readable aliases mapped to wallet addresses.
#[async_trait]
pub trait AliasDirectory: Send + Sync {
    /// Claims `alias` for `wallet`. Fails if another wallet holds it.
    async fn register_alias(&self, alias: &str, wallet: EthAddress) -> Result<()>;

    /// Resolves an alias to its wallet.
    async fn resolve_alias(&self, alias: &str) -> Result<Option<EthAddress>>;

    /// Aliases owned by a wallet.
    async fn aliases_for(&self, wallet: &EthAddress) -> Result<Vec<String>>;
}

/// Off-chain transaction bookkeeping.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Inserts a record; returns the assigned id.
    async fn insert(&self, record: TransactionRecord) -> Result<u64>;

    /// Updates status and block number of the record for `tx_hash`.
    async fn update_status(
        &self,
        tx_hash: &TxHash,
        status: TxStatus,
        block_number: Option<u64>,
    ) -> Result<TransactionRecord>;

    /// Looks up a record by transaction hash.
    async fn get_by_tx_hash(&self, tx_hash: &TxHash) -> Result<Option<TransactionRecord>>;

    /// Records involving `address`, newest first.
    async fn list_for_address(&self, address: &EthAddress) -> Result<Vec<TransactionRecord>>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCAN PROGRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// Progress update during scanning.
#[derive(Clone, Debug, Default)]
pub struct ScanProgress {
    /// Total announcements to scan
    pub total: u64,
    /// Announcements scanned so far
    pub scanned: u64,
    /// Announcements that passed the view hint filter
    pub hint_matches: u64,
    /// Confirmed payments found so far
    pub discoveries: u64,
}

/// Callback for scan progress updates.
pub type ProgressCallback = Box<dyn Fn(ScanProgress) + Send + Sync>;
