//! Contract-level client for the registry and payment manager.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use privatepay_core::config::NetworkConfig;
use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::traits::{AnnouncementSource, MetaAddressDirectory, TransactionStore};
use privatepay_core::types::{
    EthAddress, MetaAddress, PaymentAnnouncement, RegisteredMetaAddress, SecpSecretKey,
    TransactionRecord, TxHash, TxStatus,
};
use privatepay_stealth::StealthPayment;

use crate::abi::{self, signatures, Token};
use crate::rpc::{LogFilter, RpcClient, RpcConfig, TransactionReceipt};
use crate::tx::{LegacyTransaction, SignedTransaction};

/// Upper bound on the delay between receipt polls.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// A contract call or transfer waiting for nonce, gas price and a signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Target contract or recipient
    pub to: EthAddress,
    /// Value in wei
    pub value: u128,
    /// Calldata
    #[serde(with = "hex::serde")]
    pub data: Vec<u8>,
    /// Gas limit
    pub gas_limit: u64,
}

impl TransactionRequest {
    /// Completes the request into an unsigned transaction.
    pub fn into_legacy(self, nonce: u64, gas_price: u128, chain_id: u64) -> LegacyTransaction {
        LegacyTransaction {
            nonce,
            gas_price,
            gas_limit: self.gas_limit,
            to: Some(self.to),
            value: self.value,
            data: self.data,
            chain_id,
        }
    }
}

/// Client for PrivatePay contracts on one network.
#[derive(Debug)]
pub struct ChainClient {
    config: NetworkConfig,
    rpc: RpcClient,
}

impl ChainClient {
    /// Creates a client for the primary RPC endpoint of `config`.
    pub fn from_config(config: NetworkConfig) -> Result<Self> {
        config.validate()?;
        let rpc = RpcClient::with_config(RpcConfig {
            url: config.rpc_url().to_string(),
            timeout_ms: config.transaction.timeout_ms,
            retries: config.transaction.retries,
        })?;
        Ok(Self { config, rpc })
    }

    /// Network configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Underlying JSON-RPC client.
    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Fails with `ChainIdMismatch` unless the node serves the configured chain.
    #[instrument(skip(self))]
    pub async fn verify_chain_id(&self) -> Result<()> {
        let actual = self.rpc.chain_id().await?;
        if actual != self.config.chain_id {
            return Err(PrivatePayError::ChainIdMismatch {
                expected: self.config.chain_id,
                actual,
            });
        }
        debug!(chain_id = actual, "Chain id verified");
        Ok(())
    }

    /// Registry contract address.
    pub fn registry_address(&self) -> Result<EthAddress> {
        self.config.contracts.registry.address.ok_or_else(|| {
            PrivatePayError::config(
                "contracts.registry.address",
                format!("not deployed on {}", self.config.network),
            )
        })
    }

    /// Payment manager contract address.
    pub fn payment_manager_address(&self) -> Result<EthAddress> {
        self.config.contracts.payment_manager.address.ok_or_else(|| {
            PrivatePayError::config(
                "contracts.payment_manager.address",
                format!("not deployed on {}", self.config.network),
            )
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // READS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Native balance of `address`.
    pub async fn get_balance(&self, address: &EthAddress) -> Result<u128> {
        self.rpc.get_balance(address).await
    }

    /// Balance the payment manager holds for a stealth address.
    #[instrument(skip(self), fields(stealth = %stealth_address))]
    pub async fn get_stealth_balance(&self, stealth_address: &EthAddress) -> Result<u128> {
        let data = abi::encode_call(
            signatures::GET_STEALTH_BALANCE,
            &[Token::Address(*stealth_address)],
        );
        let output = self.rpc.call(&self.payment_manager_address()?, &data).await?;
        abi::decode_uint(&output)
    }

    /// `PaymentAnnouncement` logs in `[from_block, to_block]`, optionally for one recipient.
    ///
    /// Logs that fail to decode are skipped with a warning so one bad entry
    /// cannot stall a scan.
    #[instrument(skip(self))]
    pub async fn get_payment_announcements(
        &self,
        from_block: u64,
        to_block: u64,
        recipient: Option<EthAddress>,
    ) -> Result<Vec<PaymentAnnouncement>> {
        let from_block = from_block.max(self.config.contracts.registry.deployment_block);
        if from_block > to_block {
            return Ok(Vec::new());
        }

        let logs = self
            .rpc
            .get_logs(&LogFilter {
                address: self.registry_address()?,
                topic0: abi::event_topic(signatures::PAYMENT_ANNOUNCEMENT_EVENT),
                topic1: recipient.as_ref().map(abi::address_word),
                from_block,
                to_block,
            })
            .await?;

        let mut announcements = Vec::with_capacity(logs.len());
        for log in &logs {
            match abi::decode_payment_announcement(log) {
                Ok(announcement) => announcements.push(announcement),
                Err(e) => warn!(
                    tx_hash = log.transaction_hash.as_deref().unwrap_or("pending"),
                    error = %e,
                    "Skipping undecodable announcement log"
                ),
            }
        }
        debug!(count = announcements.len(), "Fetched announcements");
        Ok(announcements)
    }

    /// `MetaAddressRegistered` logs in `[from_block, to_block]`.
    #[instrument(skip(self))]
    pub async fn get_meta_address_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RegisteredMetaAddress>> {
        let from_block = from_block.max(self.config.contracts.registry.deployment_block);
        if from_block > to_block {
            return Ok(Vec::new());
        }

        let logs = self
            .rpc
            .get_logs(&LogFilter {
                address: self.registry_address()?,
                topic0: abi::event_topic(signatures::META_ADDRESS_REGISTERED_EVENT),
                topic1: None,
                from_block,
                to_block,
            })
            .await?;
        logs.iter().map(abi::decode_meta_address_registered).collect()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // WRITES
    // ═══════════════════════════════════════════════════════════════════════════

    /// `registerMetaAddress(spend, viewing)` on the registry.
    pub fn register_meta_address_request(&self, meta: &MetaAddress) -> Result<TransactionRequest> {
        meta.validate()?;
        Ok(TransactionRequest {
            to: self.registry_address()?,
            value: 0,
            data: abi::encode_call(
                signatures::REGISTER_META_ADDRESS,
                &[
                    Token::Bytes(meta.spend_public_key.as_bytes().to_vec()),
                    Token::Bytes(meta.viewing_public_key.as_bytes().to_vec()),
                ],
            ),
            gas_limit: self.config.gas.limit,
        })
    }

    /// `announcePayment(..)` on the registry, for payments sent outside the manager.
    pub fn announce_payment_request(
        &self,
        announcement: &PaymentAnnouncement,
    ) -> Result<TransactionRequest> {
        announcement.validate()?;
        Ok(TransactionRequest {
            to: self.registry_address()?,
            value: 0,
            data: abi::encode_call(
                signatures::ANNOUNCE_PAYMENT,
                &[
                    Token::Address(announcement.recipient),
                    Token::Uint(u128::from(announcement.meta_address_index)),
                    Token::Bytes(announcement.ephemeral_pub_key.clone()),
                    Token::Address(announcement.stealth_address),
                    Token::Uint(u128::from(announcement.view_hint)),
                    Token::Uint(u128::from(announcement.k)),
                    Token::Uint(announcement.amount),
                ],
            ),
            gas_limit: self.config.gas.limit,
        })
    }

    /// `sendPrivatePayment(..)` on the payment manager, carrying the amount as value.
    ///
    /// The manager emits the announcement itself, so no separate
    /// `announcePayment` is needed.
    pub fn send_private_payment_request(
        &self,
        payment: &StealthPayment,
    ) -> Result<TransactionRequest> {
        let announcement = &payment.announcement;
        announcement.validate()?;
        if announcement.amount == 0 {
            return Err(PrivatePayError::InvalidAmount(
                "payment amount must be positive".into(),
            ));
        }

        Ok(TransactionRequest {
            to: self.payment_manager_address()?,
            value: announcement.amount,
            data: abi::encode_call(
                signatures::SEND_PRIVATE_PAYMENT,
                &[
                    Token::Address(announcement.recipient),
                    Token::Uint(u128::from(announcement.meta_address_index)),
                    Token::Uint(u128::from(announcement.k)),
                    Token::Bytes(announcement.ephemeral_pub_key.clone()),
                    Token::Address(announcement.stealth_address),
                    Token::Uint(u128::from(announcement.view_hint)),
                ],
            ),
            gas_limit: self.config.gas.limit,
        })
    }

    /// `withdrawFromStealth(to)` on the payment manager.
    pub fn withdraw_from_stealth_request(&self, to: &EthAddress) -> Result<TransactionRequest> {
        if to.is_zero() {
            return Err(PrivatePayError::InvalidAddress(
                "cannot withdraw to the zero address".into(),
            ));
        }
        Ok(TransactionRequest {
            to: self.payment_manager_address()?,
            value: 0,
            data: abi::encode_call(signatures::WITHDRAW_FROM_STEALTH, &[Token::Address(*to)]),
            gas_limit: self.config.gas.limit,
        })
    }

    /// Fills in nonce and gas price for a request sent from `from`.
    ///
    /// Falls back to the configured gas price when the node cannot quote one.
    pub async fn prepare(
        &self,
        request: TransactionRequest,
        from: &EthAddress,
    ) -> Result<LegacyTransaction> {
        let nonce = self.rpc.get_transaction_count(from).await?;
        let gas_price = match self.rpc.gas_price().await {
            Ok(price) => price,
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, fallback = self.config.gas.price, "Using configured gas price");
                self.config.gas.price
            }
            Err(e) => return Err(e),
        };
        Ok(request.into_legacy(nonce, gas_price, self.config.chain_id))
    }

    /// Signs and broadcasts a prepared transaction.
    #[instrument(skip(self, tx, secret), fields(nonce = tx.nonce))]
    pub async fn send_transaction(
        &self,
        tx: &LegacyTransaction,
        secret: &SecpSecretKey,
    ) -> Result<SignedTransaction> {
        let signed = tx.sign(secret)?;
        let node_hash: TxHash = self.rpc.send_raw_transaction(&signed.raw).await?;
        if node_hash != signed.hash {
            warn!(local = %signed.hash, node = %node_hash, "Node reported a different hash");
        }
        info!(tx_hash = %signed.hash, from = %signed.from, "Transaction broadcast");
        Ok(signed)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIRMATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Polls until `tx_hash` is mined with at least `confirmations` blocks,
    /// counting its own block.
    ///
    /// Fails with `TransactionFailed` if the transaction reverted and with
    /// `ConnectionTimeout` if `timeout` passes first.
    #[instrument(skip(self), fields(tx_hash = %tx_hash))]
    pub async fn wait_for_transaction(
        &self,
        tx_hash: &TxHash,
        confirmations: u64,
        timeout: Duration,
    ) -> Result<TransactionReceipt> {
        let required = confirmations.max(1);
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if let Some(receipt) = self.rpc.get_transaction_receipt(tx_hash).await? {
                if !receipt.success {
                    return Err(PrivatePayError::TransactionFailed(format!(
                        "{} reverted in block {}",
                        tx_hash, receipt.block_number
                    )));
                }
                let latest = self.rpc.block_number().await?;
                let depth = latest.saturating_sub(receipt.block_number).saturating_add(1);
                if depth >= required {
                    info!(block = receipt.block_number, depth, "Transaction confirmed");
                    return Ok(receipt);
                }
                debug!(depth, required, "Waiting for confirmations");
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Err(PrivatePayError::ConnectionTimeout(format!(
                    "{} not confirmed within {}ms",
                    tx_hash,
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// [`wait_for_transaction`](Self::wait_for_transaction) with the configured
    /// confirmation count and timeout.
    pub async fn wait_confirmed(&self, tx_hash: &TxHash) -> Result<TransactionReceipt> {
        let policy = &self.config.transaction;
        self.wait_for_transaction(
            tx_hash,
            policy.confirmations,
            Duration::from_millis(policy.confirmation_timeout_ms),
        )
        .await
    }

    /// Waits for a recorded transaction and marks it confirmed in `store`.
    pub async fn confirm_record(
        &self,
        store: &dyn TransactionStore,
        tx_hash: &TxHash,
    ) -> Result<TransactionRecord> {
        if store.get_by_tx_hash(tx_hash).await?.is_none() {
            return Err(PrivatePayError::TransactionNotFound(tx_hash.to_hex()));
        }
        let receipt = self.wait_confirmed(tx_hash).await?;
        store
            .update_status(tx_hash, TxStatus::Confirmed, Some(receipt.block_number))
            .await
    }
}

#[async_trait]
impl MetaAddressDirectory for ChainClient {
    #[instrument(skip(self), fields(owner = %owner))]
    async fn get_meta_address(
        &self,
        owner: &EthAddress,
        index: u64,
    ) -> Result<RegisteredMetaAddress> {
        let data = abi::encode_call(
            signatures::GET_META_ADDRESS,
            &[Token::Address(*owner), Token::Uint(u128::from(index))],
        );
        let output = self
            .rpc
            .call(&self.registry_address()?, &data)
            .await
            .map_err(|e| match e {
                // The registry reverts on an out-of-range index
                PrivatePayError::ContractError(_) => PrivatePayError::MetaAddressNotFound {
                    owner: owner.to_string(),
                    index,
                },
                other => other,
            })?;
        abi::decode_meta_address(&output, *owner, index)
    }

    async fn get_meta_address_count(&self, owner: &EthAddress) -> Result<u64> {
        let data = abi::encode_call(signatures::GET_META_ADDRESS_COUNT, &[Token::Address(*owner)]);
        let output = self.rpc.call(&self.registry_address()?, &data).await?;
        abi::AbiReader::new(&output).u64(0)
    }
}

#[async_trait]
impl AnnouncementSource for ChainClient {
    async fn latest_block(&self) -> Result<u64> {
        self.rpc.block_number().await
    }

    async fn fetch_announcements(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<PaymentAnnouncement>> {
        self.get_payment_announcements(from_block, to_block, None).await
    }
}
