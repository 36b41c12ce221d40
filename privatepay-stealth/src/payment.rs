//! Stealth payment creation (sender side).

use serde::{Deserialize, Serialize};

use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::types::{
    current_timestamp, EthAddress, PaymentAnnouncement, RegisteredMetaAddress, SecpSecretKey,
    StealthDerivation,
};

use crate::engine::StealthAddressEngine;

/// Stealth payment: address to send to and announcement to publish.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StealthPayment {
    /// Public half of the derivation (secrets are skipped by serde)
    pub derivation: StealthDerivation,
    /// The announcement to publish alongside the transfer
    pub announcement: PaymentAnnouncement,
    /// Metadata about the payment
    pub metadata: PaymentMetadata,
}

impl StealthPayment {
    /// The one-time address to send funds to.
    pub fn stealth_address(&self) -> EthAddress {
        self.derivation.stealth_address
    }
}

/// Metadata about a stealth payment. Never stored on-chain.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PaymentMetadata {
    /// Recipient alias (if resolved through one)
    pub recipient_alias: Option<String>,
    /// Optional memo
    pub memo: Option<String>,
}

/// Creates a stealth payment to a registered meta-address.
pub fn create_stealth_payment(
    engine: &StealthAddressEngine,
    recipient: &RegisteredMetaAddress,
    k: u32,
    amount: u128,
) -> Result<StealthPayment> {
    StealthPaymentBuilder::new()
        .recipient(recipient.clone())
        .k(k)
        .amount(amount)
        .build(engine)
}

/// Builder for [`StealthPayment`] with optional metadata.
#[derive(Default)]
pub struct StealthPaymentBuilder {
    recipient: Option<RegisteredMetaAddress>,
    k: Option<u32>,
    amount: u128,
    ephemeral: Option<SecpSecretKey>,
    recipient_alias: Option<String>,
    memo: Option<String>,
}

impl StealthPaymentBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the registered meta-address to pay.
    pub fn recipient(mut self, recipient: RegisteredMetaAddress) -> Self {
        self.recipient = Some(recipient);
        self
    }

    /// Sets the derivation index. Defaults to the engine's `default_k`.
    pub fn k(mut self, k: u32) -> Self {
        self.k = Some(k);
        self
    }

    /// Sets the announced amount in wei.
    pub fn amount(mut self, amount: u128) -> Self {
        self.amount = amount;
        self
    }

    /// Pins the ephemeral key. Only for reproducible fixtures.
    pub fn ephemeral_key(mut self, secret: SecpSecretKey) -> Self {
        self.ephemeral = Some(secret);
        self
    }

    /// Records the alias the recipient was resolved through.
    pub fn recipient_alias(mut self, alias: impl Into<String>) -> Self {
        self.recipient_alias = Some(alias.into());
        self
    }

    /// Attaches a memo kept off-chain.
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Derives the stealth address and assembles the announcement.
    pub fn build(self, engine: &StealthAddressEngine) -> Result<StealthPayment> {
        let recipient = self.recipient.ok_or_else(|| {
            PrivatePayError::ValidationError("recipient meta-address is required".into())
        })?;
        recipient.meta_address.validate()?;

        let k = self.k.unwrap_or(engine.params().default_k);
        let spend = recipient.meta_address.spend_public_key;
        let viewing = recipient.meta_address.viewing_public_key;

        let derivation = match &self.ephemeral {
            Some(secret) => engine.generate_stealth_address_with_ephemeral(
                spend.as_bytes(),
                viewing.as_bytes(),
                k,
                secret,
            )?,
            None => engine.generate_stealth_address(spend.as_bytes(), viewing.as_bytes(), k)?,
        };

        let announcement = PaymentAnnouncement::builder()
            .recipient(recipient.owner)
            .meta_address_index(recipient.index)
            .ephemeral_pub_key(derivation.ephemeral_public_key.as_bytes().to_vec())
            .stealth_address(derivation.stealth_address)
            .view_hint(derivation.view_hint)
            .k(k)
            .amount(self.amount)
            .timestamp(current_timestamp())
            .build()?;

        Ok(StealthPayment {
            derivation: derivation.into_public(),
            announcement,
            metadata: PaymentMetadata {
                recipient_alias: self.recipient_alias,
                memo: self.memo,
            },
        })
    }
}
