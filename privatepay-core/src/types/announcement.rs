//! Payment announcement types.
//!
//! Announcements are emitted by the payment manager for every stealth payment
//! and mirrored off-chain. They carry the ephemeral key and view hint a
//! recipient needs to recognize the payment.

use serde::{Deserialize, Serialize};

use super::units::wei_string;
use super::{EthAddress, TxHash};
use crate::constants::{
    COMPRESSED_PUBLIC_KEY_SIZE, MAX_DERIVATION_INDEX, UNCOMPRESSED_PUBLIC_KEY_SIZE,
    VIEW_HINT_SPACE,
};
use crate::error::{PrivatePayError, Result};

/// A `PaymentAnnouncement` event.
///
/// The ephemeral key is kept as raw bytes: announcements come from the chain
/// and are untrusted until the scanner has parsed the point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAnnouncement {
    /// Unique identifier (assigned by registry)
    #[serde(default)]
    pub id: u64,
    /// Wallet whose registered meta-address was paid
    pub recipient: EthAddress,
    /// Index of the registered meta-address that was used
    pub meta_address_index: u64,
    /// Sender's ephemeral public key, SEC1 encoded
    #[serde(with = "super::hex_prefixed")]
    pub ephemeral_pub_key: Vec<u8>,
    /// One-time address that received the funds
    pub stealth_address: EthAddress,
    /// First byte of the shared secret
    pub view_hint: u8,
    /// Derivation index
    pub k: u32,
    /// Amount paid in wei
    #[serde(with = "wei_string")]
    pub amount: u128,
    /// Unix timestamp when announcement was created
    pub timestamp: u64,
    /// Block number if read from chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Transaction hash if read from chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
}

impl PaymentAnnouncement {
    /// Validates the announcement structure.
    ///
    /// Curve membership of the ephemeral key is checked later, when the
    /// scanner turns it into a point.
    pub fn validate(&self) -> Result<()> {
        let key_ok = match self.ephemeral_pub_key.len() {
            COMPRESSED_PUBLIC_KEY_SIZE => matches!(self.ephemeral_pub_key[0], 0x02 | 0x03),
            UNCOMPRESSED_PUBLIC_KEY_SIZE => self.ephemeral_pub_key[0] == 0x04,
            _ => false,
        };
        if !key_ok {
            return Err(PrivatePayError::InvalidPublicKey(format!(
                "ephemeral key is not a SEC1 point encoding ({} bytes)",
                self.ephemeral_pub_key.len()
            )));
        }

        if self.stealth_address.is_zero() {
            return Err(PrivatePayError::InvalidAddress(
                "stealth address is the zero address".into(),
            ));
        }

        if self.k > MAX_DERIVATION_INDEX {
            return Err(PrivatePayError::InvalidDerivationIndex {
                k: self.k,
                max: MAX_DERIVATION_INDEX,
            });
        }

        // Not in the future by more than 1 hour
        let now = current_timestamp();
        if self.timestamp > now + 3600 {
            return Err(PrivatePayError::InvalidAnnouncement(
                "timestamp is too far in the future".into(),
            ));
        }

        Ok(())
    }

    /// Returns a builder.
    pub fn builder() -> AnnouncementBuilder {
        AnnouncementBuilder::new()
    }
}

/// Returns current Unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Builder for creating announcements with optional fields.
#[derive(Default)]
pub struct AnnouncementBuilder {
    recipient: Option<EthAddress>,
    meta_address_index: u64,
    ephemeral_pub_key: Option<Vec<u8>>,
    stealth_address: Option<EthAddress>,
    view_hint: Option<u8>,
    k: u32,
    amount: u128,
    timestamp: Option<u64>,
    block_number: Option<u64>,
    tx_hash: Option<TxHash>,
}

impl AnnouncementBuilder {
    /// Creates a new announcement builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the recipient wallet (required).
    pub fn recipient(mut self, recipient: EthAddress) -> Self {
        self.recipient = Some(recipient);
        self
    }

    /// Sets the meta-address index (defaults to 0).
    pub fn meta_address_index(mut self, index: u64) -> Self {
        self.meta_address_index = index;
        self
    }

    /// Sets the ephemeral public key (required).
    pub fn ephemeral_pub_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.ephemeral_pub_key = Some(key.into());
        self
    }

    /// Sets the stealth address (required).
    pub fn stealth_address(mut self, address: EthAddress) -> Self {
        self.stealth_address = Some(address);
        self
    }

    /// Sets the view hint (required).
    pub fn view_hint(mut self, hint: u8) -> Self {
        self.view_hint = Some(hint);
        self
    }

    /// Sets the derivation index (defaults to 0).
    pub fn k(mut self, k: u32) -> Self {
        self.k = k;
        self
    }

    /// Sets the amount in wei (defaults to 0).
    pub fn amount(mut self, amount: u128) -> Self {
        self.amount = amount;
        self
    }

    /// Sets a custom timestamp (optional, defaults to now).
    pub fn timestamp(mut self, ts: u64) -> Self {
        self.timestamp = Some(ts);
        self
    }

    /// Sets the block number (optional).
    pub fn block_number(mut self, num: u64) -> Self {
        self.block_number = Some(num);
        self
    }

    /// Sets the transaction hash (optional).
    pub fn tx_hash(mut self, hash: TxHash) -> Self {
        self.tx_hash = Some(hash);
        self
    }

    /// Builds and validates the announcement.
    pub fn build(self) -> Result<PaymentAnnouncement> {
        let required =
            |field: &str| PrivatePayError::ValidationError(format!("{} is required", field));

        let announcement = PaymentAnnouncement {
            id: 0,
            recipient: self.recipient.ok_or_else(|| required("recipient"))?,
            meta_address_index: self.meta_address_index,
            ephemeral_pub_key: self
                .ephemeral_pub_key
                .ok_or_else(|| required("ephemeral_pub_key"))?,
            stealth_address: self
                .stealth_address
                .ok_or_else(|| required("stealth_address"))?,
            view_hint: self.view_hint.ok_or_else(|| required("view_hint"))?,
            k: self.k,
            amount: self.amount,
            timestamp: self.timestamp.unwrap_or_else(current_timestamp),
            block_number: self.block_number,
            tx_hash: self.tx_hash,
        };

        announcement.validate()?;
        Ok(announcement)
    }
}

/// Statistics about announcements in a registry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnnouncementStats {
    /// Total number of announcements
    pub total_count: u64,
    /// Announcements per view hint (for distribution analysis)
    pub view_hint_distribution: Vec<u64>,
    /// Earliest announcement timestamp
    pub earliest_timestamp: Option<u64>,
    /// Latest announcement timestamp
    pub latest_timestamp: Option<u64>,
    /// Highest block number seen
    pub latest_block: Option<u64>,
    /// Sum of announced amounts in wei
    #[serde(with = "wei_string")]
    pub total_amount: u128,
}

impl Default for AnnouncementStats {
    fn default() -> Self {
        Self {
            total_count: 0,
            view_hint_distribution: vec![0; VIEW_HINT_SPACE],
            earliest_timestamp: None,
            latest_timestamp: None,
            latest_block: None,
            total_amount: 0,
        }
    }
}

impl AnnouncementStats {
    /// Creates empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates stats with a new announcement.
    pub fn add(&mut self, announcement: &PaymentAnnouncement) {
        self.total_count += 1;
        self.view_hint_distribution[announcement.view_hint as usize] += 1;
        self.total_amount = self.total_amount.saturating_add(announcement.amount);

        self.earliest_timestamp = Some(
            self.earliest_timestamp
                .map_or(announcement.timestamp, |t| t.min(announcement.timestamp)),
        );
        self.latest_timestamp = Some(
            self.latest_timestamp
                .map_or(announcement.timestamp, |t| t.max(announcement.timestamp)),
        );
        if let Some(block) = announcement.block_number {
            self.latest_block = Some(self.latest_block.map_or(block, |b| b.max(block)));
        }
    }
}
