//! # PrivatePay Registry
//!
//! Storage for everything the stealth flow publishes or looks up:
//!
//! - **Announcements**: [`MemoryRegistry`] and the file-backed [`FileRegistry`]
//! - **Meta-addresses**: [`MemoryMetaAddressRegistry`], a local stand-in for the
//!   registry contract
//! - **Aliases**: [`MemoryAliasDirectory`]
//! - **Transactions**: [`MemoryTransactionStore`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use privatepay_registry::{MemoryRegistry, Registry};
//!
//! let registry = MemoryRegistry::new();
//! let id = registry.publish(announcement).await?;
//!
//! // Scanning pulls one view-hint bucket at a time
//! let candidates = registry.get_by_view_hint(0x42).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod alias;
mod file;
mod memory;
mod meta;
mod transactions;

pub use alias::MemoryAliasDirectory;
pub use file::{FileRegistry, DEFAULT_AUTO_SAVE_THRESHOLD};
pub use memory::MemoryRegistry;
pub use meta::{MemoryMetaAddressRegistry, MetaAddressRegistered};
pub use transactions::MemoryTransactionStore;

pub use privatepay_core::traits::AnnouncementRegistry as Registry;
