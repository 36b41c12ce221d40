//! DTOs for API requests and responses.

use serde::{Deserialize, Serialize};

use privatepay_core::types::{
    wei_string, EthAddress, PaymentAnnouncement, RegisteredMetaAddress, SecpPublicKey,
    TransactionRecord, TxHash, TxType,
};
use privatepay_stealth::{ParsedPaymentLink, PaymentLink, ScanStats};

// ═══════════════════════════════════════════════════════════════════════════════
// KEYS & STEALTH
// ═══════════════════════════════════════════════════════════════════════════════

/// Response for key generation.
#[derive(Debug, Serialize)]
pub struct GenerateKeysResponse {
    /// Spend public key (hex, compressed)
    pub spend_public_key: String,
    /// Spend secret key (hex) - HANDLE WITH CARE
    pub spend_secret_key: String,
    /// Viewing public key (hex, compressed)
    pub viewing_public_key: String,
    /// Viewing secret key (hex) - HANDLE WITH CARE
    pub viewing_secret_key: String,
    /// Meta-address (hex, `0x01 || spend || viewing`)
    pub meta_address: String,
}

/// Request to create a stealth payment.
///
/// The recipient is named by `alias`, by `recipient` (its registered
/// meta-address at `index`, latest if absent), or by `recipient` plus an
/// explicit `meta_address`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateStealthRequest {
    pub alias: Option<String>,
    pub recipient: Option<EthAddress>,
    pub index: Option<u64>,
    /// Meta-address (hex); skips the directory lookup
    pub meta_address: Option<String>,
    /// Derivation index, defaults to the network's default k
    pub k: Option<u32>,
    /// Amount in MNT, decimal
    pub amount: Option<String>,
}

/// Response for stealth payment creation.
#[derive(Debug, Serialize)]
pub struct CreateStealthResponse {
    /// The stealth address to send funds to (checksummed)
    pub stealth_address: String,
    /// Tweaked spend public key behind the stealth address
    pub stealth_public_key: SecpPublicKey,
    /// Ephemeral public key for the announcement
    pub ephemeral_public_key: SecpPublicKey,
    /// View hint for the announcement
    pub view_hint: u8,
    /// Derivation index
    pub k: u32,
    /// Full announcement to publish
    pub announcement: PaymentAnnouncement,
}

/// Request to scan for payments.
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    /// Viewing secret key (hex)
    pub viewing_secret_key: String,
    /// Spend public key (hex)
    pub spend_public_key: String,
    /// Spend secret key (hex); when present, stealth keys are recovered
    pub spend_secret_key: Option<String>,
    /// Optional: only scan these view hints
    pub view_hints: Option<Vec<u8>>,
    /// Optional: only announcements for this wallet
    pub recipient: Option<EthAddress>,
    /// Optional: block range start
    pub from_block: Option<u64>,
    /// Optional: block range end
    pub to_block: Option<u64>,
}

/// Response for scanning.
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    /// Payments addressed to the scanning keys
    pub payments: Vec<DiscoveryDto>,
    /// Scan statistics
    pub stats: ScanStatsDto,
}

/// A discovered payment.
#[derive(Debug, Serialize)]
pub struct DiscoveryDto {
    /// Stealth address (checksummed)
    pub stealth_address: String,
    /// Registry id of the announcement
    pub announcement_id: u64,
    /// Derivation index
    pub k: u32,
    /// Amount in wei
    #[serde(with = "wei_string")]
    pub amount: u128,
    /// Block number, if known
    pub block_number: Option<u64>,
    /// Transaction hash, if known
    pub tx_hash: Option<TxHash>,
    /// Stealth private key (hex) - HANDLE WITH CARE
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stealth_private_key: Option<String>,
}

/// Scan statistics.
#[derive(Debug, Serialize)]
pub struct ScanStatsDto {
    /// Total announcements scanned
    pub total_scanned: u64,
    /// Announcements that passed the view hint filter
    pub view_hint_matches: u64,
    /// Payments found
    pub matches: u64,
    /// Malformed announcements skipped
    pub invalid: u64,
    /// Scan duration in milliseconds
    pub duration_ms: u64,
    /// Announcements per second
    pub rate: f64,
}

impl From<&ScanStats> for ScanStatsDto {
    fn from(stats: &ScanStats) -> Self {
        Self {
            total_scanned: stats.total_scanned,
            view_hint_matches: stats.view_hint_matches,
            matches: stats.matches,
            invalid: stats.invalid,
            duration_ms: stats.duration_ms,
            rate: stats.rate(),
        }
    }
}

/// Request to recover a stealth private key.
#[derive(Debug, Deserialize)]
pub struct RecoverRequest {
    /// Spend secret key (hex)
    pub spend_secret_key: String,
    /// Viewing secret key (hex)
    pub viewing_secret_key: String,
    /// Ephemeral public key from the announcement (hex)
    pub ephemeral_public_key: String,
    /// Derivation index from the announcement
    pub k: u32,
    /// Expected stealth address; the recovered key is checked against it
    pub stealth_address: Option<EthAddress>,
}

/// Response for key recovery.
#[derive(Debug, Serialize)]
pub struct RecoverResponse {
    /// Address controlled by the recovered key (checksummed)
    pub stealth_address: String,
    /// Stealth private key (hex) - HANDLE WITH CARE
    pub stealth_private_key: String,
    /// Whether the key was checked against an expected address
    pub verified: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ANNOUNCEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Query for listing announcements. Filters apply in the order listed.
#[derive(Debug, Default, Deserialize)]
pub struct ListAnnouncementsQuery {
    /// Filter by view hint
    pub view_hint: Option<u8>,
    /// Filter by recipient wallet
    pub recipient: Option<EthAddress>,
    /// Filter: from block
    pub from_block: Option<u64>,
    /// Filter: to block
    pub to_block: Option<u64>,
    /// Filter: from timestamp
    pub from_timestamp: Option<u64>,
    /// Filter: to timestamp
    pub to_timestamp: Option<u64>,
    /// Pagination: offset
    pub offset: Option<u64>,
    /// Pagination: limit
    pub limit: Option<u64>,
}

/// Response for listing announcements.
#[derive(Debug, Serialize)]
pub struct ListAnnouncementsResponse {
    /// Announcements
    pub announcements: Vec<PaymentAnnouncement>,
    /// Total count before pagination
    pub total: u64,
}

/// Response for publishing an announcement.
#[derive(Debug, Serialize)]
pub struct PublishAnnouncementResponse {
    /// Assigned ID
    pub id: u64,
}

/// Registry statistics.
#[derive(Debug, Serialize)]
pub struct RegistryStatsResponse {
    /// Total announcements
    pub total_announcements: u64,
    /// Sum of announced amounts in wei
    #[serde(with = "wei_string")]
    pub total_amount: u128,
    /// Highest block seen
    pub latest_block: Option<u64>,
    /// Non-empty view hint buckets
    pub view_hint_distribution: Vec<ViewHintCount>,
}

/// Count for one view hint.
#[derive(Debug, Serialize)]
pub struct ViewHintCount {
    /// View hint value
    pub hint: u8,
    /// Number of announcements
    pub count: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// META-ADDRESSES & ALIASES
// ═══════════════════════════════════════════════════════════════════════════════

/// Request to register a meta-address for a wallet.
#[derive(Debug, Deserialize)]
pub struct RegisterMetaAddressRequest {
    /// Owning wallet
    pub owner: EthAddress,
    /// Meta-address (hex)
    pub meta_address: String,
}

/// Response for meta-address registration.
#[derive(Debug, Serialize)]
pub struct RegisterMetaAddressResponse {
    /// Owning wallet
    pub owner: EthAddress,
    /// Index assigned to the registration
    pub index: u64,
}

/// A registered meta-address.
#[derive(Debug, Serialize)]
pub struct MetaAddressDto {
    /// Owning wallet
    pub owner: EthAddress,
    /// Registration index
    pub index: u64,
    /// Meta-address (hex)
    pub meta_address: String,
    /// Spend public key (hex)
    pub spend_public_key: SecpPublicKey,
    /// Viewing public key (hex)
    pub viewing_public_key: SecpPublicKey,
    /// Unix seconds
    pub created_at: u64,
}

impl From<RegisteredMetaAddress> for MetaAddressDto {
    fn from(registered: RegisteredMetaAddress) -> Self {
        Self {
            owner: registered.owner,
            index: registered.index,
            meta_address: registered.meta_address.to_hex(),
            spend_public_key: registered.meta_address.spend_public_key,
            viewing_public_key: registered.meta_address.viewing_public_key,
            created_at: registered.created_at,
        }
    }
}

/// All meta-addresses of one wallet.
#[derive(Debug, Serialize)]
pub struct MetaAddressListResponse {
    /// Owning wallet
    pub owner: EthAddress,
    /// Number of registrations
    pub count: u64,
    /// Registrations by index
    pub meta_addresses: Vec<MetaAddressDto>,
}

/// Request to claim an alias.
#[derive(Debug, Deserialize)]
pub struct RegisterAliasRequest {
    /// Desired alias
    pub alias: String,
    /// Wallet the alias points to
    pub wallet: EthAddress,
}

/// An alias and what it resolves to.
#[derive(Debug, Serialize)]
pub struct AliasResponse {
    /// Normalized alias
    pub alias: String,
    /// Wallet the alias points to
    pub wallet: EthAddress,
    /// Latest meta-address of the wallet, if registered
    pub meta_address: Option<MetaAddressDto>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// PAYMENT LINKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Request to create a payment link.
#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    /// Alias of the recipient
    pub alias: String,
    /// Requested amount in MNT, decimal
    pub amount: Option<String>,
    /// Message shown to the payer
    pub message: Option<String>,
}

/// Response for link creation.
#[derive(Debug, Serialize)]
pub struct CreateLinkResponse {
    /// The link
    pub link: PaymentLink,
    /// EIP-681 transfer request for wallets
    pub uri: String,
    /// Plain-text summary
    pub shareable_text: String,
}

/// Request to parse a link or payment URI.
#[derive(Debug, Deserialize)]
pub struct ParseLinkRequest {
    /// Link or `ethereum:` URI
    pub link: String,
}

/// Response for link parsing.
#[derive(Debug, Serialize)]
pub struct ParseLinkResponse {
    /// Parsed form
    pub parsed: ParsedPaymentLink,
    /// Resolved recipient, for alias links
    pub recipient: Option<AliasResponse>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSACTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Request to record a transaction.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub tx_type: TxType,
    pub sender: EthAddress,
    pub recipient: EthAddress,
    pub stealth_address: EthAddress,
    /// Amount in wei
    #[serde(with = "wei_string")]
    pub amount: u128,
    pub tx_hash: TxHash,
}

/// Request to confirm a transaction.
#[derive(Debug, Deserialize)]
pub struct ConfirmTransactionRequest {
    /// Block the transaction was included in
    pub block_number: Option<u64>,
}

/// Transactions involving one address.
#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    /// Queried address
    pub address: EthAddress,
    /// Records, newest first
    pub transactions: Vec<TransactionRecord>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEALTH
// ═══════════════════════════════════════════════════════════════════════════════

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Crate version
    pub version: String,
    /// Seconds since the first health check
    pub uptime_seconds: u64,
    /// Announcements in the registry
    pub announcements_count: u64,
    /// Network name
    pub network: String,
    /// Chain id
    pub chain_id: u64,
}
