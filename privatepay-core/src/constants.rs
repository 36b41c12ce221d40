//! Protocol constants for PrivatePay.
//!
//! Sizes follow secp256k1 SEC1 encodings and Ethereum conventions.
//! Network defaults mirror the deployed Mantle contracts.

// ═══════════════════════════════════════════════════════════════════════════════
// SECP256K1 SIZES
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of a secp256k1 secret key (scalar) in bytes.
pub const SECRET_KEY_SIZE: usize = 32;

/// Size of a SEC1 compressed public key (`0x02`/`0x03` prefix + x).
pub const COMPRESSED_PUBLIC_KEY_SIZE: usize = 33;

/// Size of a SEC1 uncompressed public key (`0x04` prefix + x + y).
pub const UNCOMPRESSED_PUBLIC_KEY_SIZE: usize = 65;

/// Size of the ECDH-derived shared secret.
pub const SHARED_SECRET_SIZE: usize = 32;

// ═══════════════════════════════════════════════════════════════════════════════
// VIEW HINT CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of the view hint in bytes.
/// One byte rejects ~99.6% of foreign announcements before any curve math.
pub const VIEW_HINT_SIZE: usize = 1;

/// Number of possible view hint values (2^8 = 256).
pub const VIEW_HINT_SPACE: usize = 256;

/// Expected filtering efficiency as a percentage.
pub const VIEW_HINT_EFFICIENCY: f64 = 99.609375; // (255/256) * 100

// ═══════════════════════════════════════════════════════════════════════════════
// DOMAIN SEPARATORS
// ═══════════════════════════════════════════════════════════════════════════════
// Every keccak256 invocation in the derivation path carries its own domain so
// outputs from different steps never collide, even with identical inputs.

/// Domain separator for the ECDH shared secret.
pub const DOMAIN_SHARED_SECRET: &[u8] = b"PRIVATEPAY_SHARED_SECRET_V1";

/// Domain separator for the stealth scalar tweak.
pub const DOMAIN_STEALTH_TWEAK: &[u8] = b"PRIVATEPAY_STEALTH_TWEAK_V1";

/// Domain separator for seeded spend key derivation.
pub const DOMAIN_SPEND_SEED: &[u8] = b"PRIVATEPAY_SPEND_SEED_V1";

/// Domain separator for seeded viewing key derivation.
pub const DOMAIN_VIEW_SEED: &[u8] = b"PRIVATEPAY_VIEW_SEED_V1";

/// Domain separator for seeded ephemeral key derivation.
pub const DOMAIN_EPHEMERAL_SEED: &[u8] = b"PRIVATEPAY_EPHEMERAL_SEED_V1";

// ═══════════════════════════════════════════════════════════════════════════════
// PROTOCOL VERSIONING
// ═══════════════════════════════════════════════════════════════════════════════

/// Current meta-address wire format version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Minimum supported wire format version.
pub const MIN_PROTOCOL_VERSION: u8 = 1;

// ═══════════════════════════════════════════════════════════════════════════════
// DERIVATION INDEX
// ═══════════════════════════════════════════════════════════════════════════════

/// Default derivation index `k`.
pub const DEFAULT_K: u32 = 0;

/// Largest accepted derivation index (2^31 - 1).
pub const MAX_DERIVATION_INDEX: u32 = 2_147_483_647;

/// Number of attempts at drawing a valid scalar from the OS random source.
pub const MAX_KEYGEN_ATTEMPTS: usize = 16;

// ═══════════════════════════════════════════════════════════════════════════════
// ETHEREUM CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of an Ethereum address in bytes.
pub const ETH_ADDRESS_SIZE: usize = 20;

/// Size of a transaction hash in bytes.
pub const TX_HASH_SIZE: usize = 32;

/// Size of keccak256 hash output.
pub const KECCAK256_SIZE: usize = 32;

/// Decimals of the native currency (MNT).
pub const NATIVE_DECIMALS: u32 = 18;

/// Gas limit of a plain value transfer.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

// ═══════════════════════════════════════════════════════════════════════════════
// MANTLE NETWORKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Mantle Sepolia testnet chain id.
pub const MANTLE_SEPOLIA_CHAIN_ID: u64 = 5003;

/// Mantle mainnet chain id.
pub const MANTLE_MAINNET_CHAIN_ID: u64 = 5000;

/// Mantle Sepolia public RPC endpoint.
pub const MANTLE_SEPOLIA_RPC_URL: &str = "https://rpc.sepolia.mantle.xyz";

/// Mantle mainnet public RPC endpoint.
pub const MANTLE_MAINNET_RPC_URL: &str = "https://rpc.mantle.xyz";

/// Mantle Sepolia block explorer.
pub const MANTLE_SEPOLIA_EXPLORER_URL: &str = "https://sepolia.mantlescan.xyz";

/// Mantle mainnet block explorer.
pub const MANTLE_MAINNET_EXPLORER_URL: &str = "https://mantlescan.xyz";

/// StealthAddressRegistry deployment on Mantle Sepolia.
pub const SEPOLIA_REGISTRY_ADDRESS: &str = "0x6F40A56250fbB57F5a17C815BE66A36804590669";

/// Block at which the Sepolia registry was deployed.
pub const SEPOLIA_REGISTRY_DEPLOYMENT_BLOCK: u64 = 32_784_334;

/// PaymentManager deployment on Mantle Sepolia.
pub const SEPOLIA_PAYMENT_MANAGER_ADDRESS: &str = "0x95bc083e6911DeBc46b36cDCE8996fAEB28bf9A6";

/// Block at which the Sepolia payment manager was deployed.
pub const SEPOLIA_PAYMENT_MANAGER_DEPLOYMENT_BLOCK: u64 = 32_784_339;

// ═══════════════════════════════════════════════════════════════════════════════
// PAYMENT LINKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Base URL for human-readable payment links.
pub const PAYMENT_LINK_BASE_URL: &str = "https://privatepay.me";

/// Maximum length of a payment link alias.
pub const MAX_ALIAS_LENGTH: usize = 15;

// ═══════════════════════════════════════════════════════════════════════════════
// SERIALIZATION CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of a serialized MetaAddress (version + spend_pk + viewing_pk).
/// 1 + 33 + 33 = 67 bytes
pub const META_ADDRESS_SERIALIZED_SIZE: usize =
    1 + COMPRESSED_PUBLIC_KEY_SIZE + COMPRESSED_PUBLIC_KEY_SIZE;

// ═══════════════════════════════════════════════════════════════════════════════
// PERFORMANCE TUNING
// ═══════════════════════════════════════════════════════════════════════════════

/// Default batch size for scanning announcements.
pub const DEFAULT_SCAN_BATCH_SIZE: usize = 1000;

/// Maximum announcements to scan in a single request.
pub const MAX_SCAN_BATCH_SIZE: usize = 10_000;

/// Default block window for `eth_getLogs` paging.
pub const DEFAULT_LOG_BLOCK_WINDOW: u64 = 5_000;
