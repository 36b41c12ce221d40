//! Error types for PrivatePay.
//!
//! A single error hierarchy built with `thiserror`. Every variant maps to a
//! stable string code via [`PrivatePayError::code`] so API and CLI consumers
//! can branch on the kind without matching on messages.

use thiserror::Error;

/// Result type alias using `PrivatePayError`.
pub type Result<T> = std::result::Result<T, PrivatePayError>;

/// Main error type for all PrivatePay operations.
#[derive(Debug, Error)]
pub enum PrivatePayError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CRYPTOGRAPHIC ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Secure randomness unavailable; no key material was produced.
    #[error("Key generation failed: {0}")]
    KeyGenerationError(String),

    /// Input is not a valid secp256k1 point encoding.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Input is not a valid non-zero scalar below the curve order.
    #[error("Invalid secret key: {0}")]
    InvalidSecretKey(String),

    /// A recovered stealth key does not reproduce the expected address.
    #[error("Key mismatch: expected {expected}, derived {derived}")]
    KeyMismatch {
        /// Address carried by the announcement.
        expected: String,
        /// Address of the recovered private key.
        derived: String,
    },

    /// Tweak or point arithmetic produced a degenerate value.
    #[error("Stealth derivation failed: {0}")]
    StealthDerivationError(String),

    /// Signing a transaction digest failed.
    #[error("Signing failed: {0}")]
    SigningError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // STEALTH ADDRESS ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Invalid meta-address format or content.
    #[error("Invalid meta-address: {0}")]
    InvalidMetaAddress(String),

    /// Invalid 20-byte address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Derivation index above the configured maximum.
    #[error("Invalid derivation index {k}: maximum is {max}")]
    InvalidDerivationIndex {
        /// Requested index.
        k: u32,
        /// Configured maximum.
        max: u32,
    },

    /// Invalid announcement format.
    #[error("Invalid announcement: {0}")]
    InvalidAnnouncement(String),

    /// Invalid 32-byte transaction hash.
    #[error("Invalid transaction hash: {0}")]
    InvalidTxHash(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // PAYMENT LINK ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Alias does not satisfy the alias rules.
    #[error("Invalid alias '{alias}': {reason}")]
    InvalidAlias {
        /// Offending alias.
        alias: String,
        /// Rule that was violated.
        reason: String,
    },

    /// Amount could not be parsed or is out of range.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Payment link or payment URI could not be parsed or validated.
    #[error("Invalid payment link: {0}")]
    InvalidPaymentLink(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // REGISTRY ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// No meta-address registered at the requested index.
    #[error("Meta-address not found for {owner} at index {index}")]
    MetaAddressNotFound {
        /// Registering wallet.
        owner: String,
        /// Requested index.
        index: u64,
    },

    /// Announcement not found.
    #[error("Announcement not found: {0}")]
    AnnouncementNotFound(String),

    /// Transaction record not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Alias is not registered.
    #[error("Alias not found: {0}")]
    AliasNotFound(String),

    /// Alias is already registered to another wallet.
    #[error("Alias already taken: {0}")]
    AliasTaken(String),

    /// Announcement with the same transaction hash already stored.
    #[error("Duplicate announcement for transaction {0}")]
    DuplicateAnnouncement(String),

    /// Registry is corrupted or rejected the operation.
    #[error("Registry error: {0}")]
    RegistryError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // CHAIN ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Connection timeout.
    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    /// JSON-RPC call returned an error object.
    #[error("RPC call failed: {0}")]
    RpcError(String),

    /// Contract call reverted.
    #[error("Contract error: {0}")]
    ContractError(String),

    /// ABI-encoded data could not be decoded.
    #[error("ABI decode error: {0}")]
    AbiDecodeError(String),

    /// The node rejected a signed transaction.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Balance does not cover value plus gas.
    #[error("Insufficient funds: balance {balance} wei, required {required} wei")]
    InsufficientFunds {
        /// Available balance in wei.
        balance: u128,
        /// Required amount in wei.
        required: u128,
    },

    /// Connected chain differs from the configured one.
    #[error("Chain id mismatch: expected {expected}, got {actual}")]
    ChainIdMismatch {
        /// Configured chain id.
        expected: u64,
        /// Chain id reported by the node or link.
        actual: u64,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid hex encoding.
    #[error("Invalid hex encoding: {0}")]
    HexError(#[from] hex::FromHexError),

    /// Wire format version mismatch.
    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Supported version.
        expected: u8,
        /// Version found in the input.
        actual: u8,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Input validation failed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error.
    #[error("Configuration error in {field}: {reason}")]
    ConfigError {
        /// Offending configuration field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl PrivatePayError {
    /// Shorthand for a [`PrivatePayError::ConfigError`].
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PrivatePayError::ConfigError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error is recoverable (can retry).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PrivatePayError::HttpError(_)
                | PrivatePayError::ConnectionTimeout(_)
                | PrivatePayError::RpcError(_)
        )
    }

    /// Returns true if this is a cryptographic error.
    pub fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            PrivatePayError::KeyGenerationError(_)
                | PrivatePayError::InvalidPublicKey(_)
                | PrivatePayError::InvalidSecretKey(_)
                | PrivatePayError::KeyMismatch { .. }
                | PrivatePayError::StealthDerivationError(_)
                | PrivatePayError::SigningError(_)
        )
    }

    /// Returns true if this is a validation error.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            PrivatePayError::ValidationError(_)
                | PrivatePayError::InvalidMetaAddress(_)
                | PrivatePayError::InvalidAddress(_)
                | PrivatePayError::InvalidDerivationIndex { .. }
                | PrivatePayError::InvalidAnnouncement(_)
                | PrivatePayError::InvalidTxHash(_)
                | PrivatePayError::InvalidAlias { .. }
                | PrivatePayError::InvalidAmount(_)
                | PrivatePayError::InvalidPaymentLink(_)
                | PrivatePayError::VersionMismatch { .. }
        )
    }

    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            PrivatePayError::KeyGenerationError(_) => "KEY_GENERATION_ERROR",
            PrivatePayError::InvalidPublicKey(_) => "INVALID_PUBLIC_KEY",
            PrivatePayError::InvalidSecretKey(_) => "INVALID_SECRET_KEY",
            PrivatePayError::KeyMismatch { .. } => "KEY_MISMATCH",
            PrivatePayError::StealthDerivationError(_) => "STEALTH_DERIVATION_ERROR",
            PrivatePayError::SigningError(_) => "SIGNING_ERROR",
            PrivatePayError::InvalidAddress(_) => "INVALID_ADDRESS",
            PrivatePayError::InvalidMetaAddress(_)
            | PrivatePayError::InvalidDerivationIndex { .. }
            | PrivatePayError::InvalidAnnouncement(_)
            | PrivatePayError::InvalidTxHash(_)
            | PrivatePayError::InvalidAlias { .. }
            | PrivatePayError::InvalidAmount(_)
            | PrivatePayError::InvalidPaymentLink(_)
            | PrivatePayError::ValidationError(_)
            | PrivatePayError::VersionMismatch { .. }
            | PrivatePayError::JsonError(_)
            | PrivatePayError::HexError(_) => "VALIDATION_ERROR",
            PrivatePayError::MetaAddressNotFound { .. }
            | PrivatePayError::AnnouncementNotFound(_)
            | PrivatePayError::TransactionNotFound(_)
            | PrivatePayError::AliasNotFound(_) => "NOT_FOUND",
            PrivatePayError::AliasTaken(_) | PrivatePayError::DuplicateAnnouncement(_) => {
                "CONFLICT"
            }
            PrivatePayError::HttpError(_) | PrivatePayError::RpcError(_) => "NETWORK_ERROR",
            PrivatePayError::ConnectionTimeout(_) => "TIMEOUT",
            PrivatePayError::ContractError(_) | PrivatePayError::AbiDecodeError(_) => {
                "CONTRACT_ERROR"
            }
            PrivatePayError::TransactionFailed(_) => "TRANSACTION_FAILED",
            PrivatePayError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            PrivatePayError::ChainIdMismatch { .. } => "WRONG_NETWORK",
            PrivatePayError::ConfigError { .. } => "CONFIG_ERROR",
            PrivatePayError::RegistryError(_)
            | PrivatePayError::IoError(_)
            | PrivatePayError::InternalError(_) => "UNKNOWN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PrivatePayError::InvalidDerivationIndex {
            k: 4_000_000_000,
            max: 2_147_483_647,
        };
        assert!(err.to_string().contains("4000000000"));
        assert!(err.to_string().contains("2147483647"));
    }

    #[test]
    fn test_error_classification() {
        assert!(PrivatePayError::HttpError("test".into()).is_recoverable());
        assert!(PrivatePayError::ConnectionTimeout("test".into()).is_recoverable());
        assert!(!PrivatePayError::InvalidPublicKey("bad".into()).is_recoverable());

        assert!(PrivatePayError::KeyGenerationError("test".into()).is_crypto_error());
        assert!(PrivatePayError::KeyMismatch {
            expected: "a".into(),
            derived: "b".into()
        }
        .is_crypto_error());
        assert!(!PrivatePayError::HttpError("test".into()).is_crypto_error());

        assert!(PrivatePayError::InvalidAddress("x".into()).is_validation_error());
        assert!(!PrivatePayError::RpcError("x".into()).is_validation_error());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PrivatePayError::InsufficientFunds { balance: 1, required: 2 }.code(),
            "INSUFFICIENT_FUNDS"
        );
        assert_eq!(PrivatePayError::InvalidAddress("x".into()).code(), "INVALID_ADDRESS");
        assert_eq!(PrivatePayError::ConnectionTimeout("x".into()).code(), "TIMEOUT");
        assert_eq!(PrivatePayError::RpcError("x".into()).code(), "NETWORK_ERROR");
        assert_eq!(PrivatePayError::ContractError("x".into()).code(), "CONTRACT_ERROR");
        assert_eq!(
            PrivatePayError::TransactionFailed("nonce too low".into()).code(),
            "TRANSACTION_FAILED"
        );
    }

    #[test]
    fn test_config_shorthand() {
        let err = PrivatePayError::config("gas.limit", "must be positive");
        assert_eq!(
            err.to_string(),
            "Configuration error in gas.limit: must be positive"
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let json_result: std::result::Result<serde_json::Value, _> =
            serde_json::from_str("invalid");
        let result: Result<serde_json::Value> = json_result.map_err(PrivatePayError::from);
        assert!(matches!(result, Err(PrivatePayError::JsonError(_))));
    }
}
