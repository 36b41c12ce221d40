//! # PrivatePay Stealth Addresses
//!
//! High-level API for creating and discovering stealth payments.
//!
//! This crate provides:
//!
//! - **Engine**: [`StealthAddressEngine`] generates meta-addresses, derives
//!   stealth addresses, scans announcements and recovers spending keys
//! - **Payments**: Sender-side payment + announcement construction
//! - **Discovery**: Per-announcement scan results and statistics
//! - **Wallet**: Key custody, discovery and key export for recipients
//! - **Links**: Alias URLs and EIP-681 payment URIs
//! - **Resolution**: Alias -> wallet -> registered meta-address
//!
//! ## Quick Start
//!
//! ```rust
//! use privatepay_core::types::{EthAddress, RegisteredMetaAddress};
//! use privatepay_stealth::{create_stealth_payment, PrivatePayWallet, StealthAddressEngine};
//!
//! // Recipient: generate keys and publish the meta-address
//! let wallet = PrivatePayWallet::generate().unwrap();
//! let registered = RegisteredMetaAddress {
//!     owner: EthAddress::from_array([0x42; 20]),
//!     index: 0,
//!     meta_address: *wallet.meta_address(),
//!     created_at: 0,
//! };
//!
//! // Sender: derive a one-time address and the announcement
//! let engine = StealthAddressEngine::default();
//! let payment = create_stealth_payment(&engine, &registered, 0, 1_000).unwrap();
//!
//! // Recipient: recognize the announcement and recover the key
//! let found = wallet.try_discover(&payment.announcement).unwrap().unwrap();
//! assert_eq!(found.address(), payment.stealth_address());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod discovery;
pub mod engine;
pub mod link;
pub mod payment;
pub mod resolve;
pub mod wallet;

#[cfg(test)]
mod tests;

pub use discovery::{ScanKeys, ScanResult, ScanStats};
pub use engine::StealthAddressEngine;
pub use link::{
    format_ether, parse_ether, parse_payment_link, validate_alias, validate_payment_link,
    ParsedPaymentLink, PaymentLink, PaymentUri,
};
pub use payment::{create_stealth_payment, PaymentMetadata, StealthPayment, StealthPaymentBuilder};
pub use resolve::{resolve_recipient, ResolvedRecipient};
pub use wallet::{PrivatePayWallet, ViewingKeyExport, WalletExport};
