//! Sweeping funds out of a stealth address.
//!
//! Stealth addresses hold native MNT and nothing else, so a withdrawal is a
//! plain transfer signed with the recovered stealth key. Without an explicit
//! amount the whole balance minus the transfer fee is sent. A withdrawal is
//! complete once its receipt has the configured number of confirmations.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use privatepay_core::constants::TRANSFER_GAS_LIMIT;
use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::types::{DiscoveredPayment, EthAddress, SecpSecretKey};
use privatepay_crypto::address_from_secret_key;

use crate::client::ChainClient;
use crate::rpc::TransactionReceipt;
use crate::tx::{LegacyTransaction, SignedTransaction};

/// A priced native transfer out of a stealth address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalPlan {
    /// Stealth address being emptied
    pub from: EthAddress,
    /// Destination wallet
    pub to: EthAddress,
    /// Balance when planned
    pub balance: u128,
    /// Gas price in wei
    pub gas_price: u128,
    /// Gas limit (a plain transfer)
    pub gas_limit: u64,
    /// Amount transferred
    pub value: u128,
}

impl WithdrawalPlan {
    /// Plans a withdrawal of `amount`, or of everything when `None`.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` when the balance cannot cover the fee, or the fee
    /// plus the requested amount.
    pub fn new(
        from: EthAddress,
        to: EthAddress,
        balance: u128,
        gas_price: u128,
        amount: Option<u128>,
    ) -> Result<Self> {
        if to.is_zero() {
            return Err(PrivatePayError::InvalidAddress(
                "cannot withdraw to the zero address".into(),
            ));
        }

        let fee = gas_price
            .checked_mul(u128::from(TRANSFER_GAS_LIMIT))
            .ok_or_else(|| PrivatePayError::InvalidAmount("gas fee overflows".into()))?;

        let value = match amount {
            Some(0) => {
                return Err(PrivatePayError::InvalidAmount(
                    "withdrawal amount must be positive".into(),
                ))
            }
            Some(amount) => {
                let required = amount
                    .checked_add(fee)
                    .ok_or_else(|| PrivatePayError::InvalidAmount("amount overflows".into()))?;
                if required > balance {
                    return Err(PrivatePayError::InsufficientFunds { balance, required });
                }
                amount
            }
            None if balance <= fee => {
                return Err(PrivatePayError::InsufficientFunds {
                    balance,
                    required: fee + 1,
                })
            }
            None => balance - fee,
        };

        Ok(Self {
            from,
            to,
            balance,
            gas_price,
            gas_limit: TRANSFER_GAS_LIMIT,
            value,
        })
    }

    /// Fee reserved for gas.
    pub fn fee(&self) -> u128 {
        self.gas_price.saturating_mul(u128::from(self.gas_limit))
    }

    /// Balance left at the stealth address afterwards.
    pub fn remaining(&self) -> u128 {
        self.balance.saturating_sub(self.value).saturating_sub(self.fee())
    }

    /// Unsigned transfer for this plan.
    pub fn to_transaction(&self, nonce: u64, chain_id: u64) -> LegacyTransaction {
        LegacyTransaction {
            nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: Some(self.to),
            value: self.value,
            data: Vec::new(),
            chain_id,
        }
    }
}

/// A withdrawal that reached the required confirmations.
#[derive(Clone, Debug)]
pub struct ConfirmedWithdrawal {
    /// What was sent
    pub plan: WithdrawalPlan,
    /// The broadcast transfer
    pub transaction: SignedTransaction,
    /// Receipt of the including block
    pub receipt: TransactionReceipt,
}

impl ChainClient {
    /// Plans a withdrawal from the address controlled by `stealth_key`.
    #[instrument(skip(self, stealth_key), fields(to = %to))]
    pub async fn plan_withdrawal(
        &self,
        stealth_key: &SecpSecretKey,
        to: &EthAddress,
        amount: Option<u128>,
    ) -> Result<WithdrawalPlan> {
        let from = address_from_secret_key(stealth_key)?;
        let balance = self.get_balance(&from).await?;
        let gas_price = self.rpc().gas_price().await?;
        WithdrawalPlan::new(from, *to, balance, gas_price, amount)
    }

    /// Executes a plan: fetches the nonce, signs with `stealth_key` and broadcasts.
    pub async fn execute_withdrawal(
        &self,
        plan: &WithdrawalPlan,
        stealth_key: &SecpSecretKey,
    ) -> Result<SignedTransaction> {
        let signer = address_from_secret_key(stealth_key)?;
        if signer != plan.from {
            return Err(PrivatePayError::KeyMismatch {
                expected: plan.from.to_string(),
                derived: signer.to_string(),
            });
        }

        let nonce = self.rpc().get_transaction_count(&plan.from).await?;
        let tx = plan.to_transaction(nonce, self.config().chain_id);
        let signed = self.send_transaction(&tx, stealth_key).await?;
        info!(value = plan.value, fee = plan.fee(), "Withdrawal sent");
        Ok(signed)
    }

    /// Executes a plan and waits for the configured confirmations.
    pub async fn execute_and_confirm(
        &self,
        plan: WithdrawalPlan,
        stealth_key: &SecpSecretKey,
    ) -> Result<ConfirmedWithdrawal> {
        let transaction = self.execute_withdrawal(&plan, stealth_key).await?;
        let receipt = self.wait_confirmed(&transaction.hash).await?;
        Ok(ConfirmedWithdrawal {
            plan,
            transaction,
            receipt,
        })
    }

    /// Sweeps a discovered payment to `to` and waits for confirmation.
    pub async fn withdraw_discovered(
        &self,
        payment: &DiscoveredPayment,
        to: &EthAddress,
    ) -> Result<ConfirmedWithdrawal> {
        let plan = self.plan_withdrawal(&payment.private_key, to, None).await?;
        self.execute_and_confirm(plan, &payment.private_key).await
    }
}
