//! # PrivatePay Chain
//!
//! Talks to the PrivatePay contracts on Mantle over JSON-RPC:
//!
//! - **ABI**: calldata for the registry and payment manager, return and log decoding
//! - **RPC**: a reqwest JSON-RPC client with timeouts and bounded retry
//! - **Client**: [`ChainClient`], a [`MetaAddressDirectory`] and
//!   [`AnnouncementSource`] backed by the deployed registry
//! - **Transactions**: EIP-155 legacy transactions signed with stealth keys
//! - **Withdrawals**: [`WithdrawalPlan`] sweeps a stealth address to a wallet and
//!   waits for the configured confirmations
//!
//! ## Example
//!
//! ```rust,ignore
//! use privatepay_chain::ChainClient;
//! use privatepay_core::{MetaAddressDirectory, NetworkConfig};
//!
//! let client = ChainClient::from_config(NetworkConfig::from_env()?)?;
//! client.verify_chain_id().await?;
//!
//! let recipient = client.get_latest_meta_address(&wallet).await?;
//! let announcements = client.get_payment_announcements(from, to, None).await?;
//! ```
//!
//! [`MetaAddressDirectory`]: privatepay_core::traits::MetaAddressDirectory
//! [`AnnouncementSource`]: privatepay_core::traits::AnnouncementSource

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod abi;
pub mod client;
pub mod rpc;
pub mod tx;
pub mod withdraw;

pub use client::{ChainClient, TransactionRequest};
pub use rpc::{LogFilter, RpcClient, RpcConfig, TransactionReceipt};
pub use tx::{LegacyTransaction, SignedTransaction};
pub use withdraw::{ConfirmedWithdrawal, WithdrawalPlan};
