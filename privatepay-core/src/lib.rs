//! # PrivatePay Core
//!
//! Core types, errors, configuration, and traits for PrivatePay stealth payments
//! on Mantle.
//!
//! This crate provides the foundational building blocks used by all other PrivatePay crates:
//!
//! - **Types**: Keys, addresses, meta-addresses, announcements, and transaction records
//! - **Errors**: A single error enum with stable error codes
//! - **Config**: Typed network configuration validated once at startup
//! - **Traits**: Interfaces for registries, directories, and stores
//!
//! ## Example
//!
//! ```rust
//! use privatepay_core::{EthAddress, NetworkConfig};
//!
//! let config = NetworkConfig::mantle_sepolia();
//! assert!(config.validate().is_ok());
//!
//! let addr = EthAddress::from_hex("0x6F40A56250fbB57F5a17C815BE66A36804590669").unwrap();
//! assert_eq!(addr.to_string(), "0x6F40A56250fbB57F5a17C815BE66A36804590669");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod config;
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use config::*;
pub use constants::*;
pub use error::{PrivatePayError, Result};
pub use traits::*;
pub use types::*;
