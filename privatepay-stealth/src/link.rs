//! Payment links.
//!
//! A payment link pairs a human alias (`https://privatepay.me/<alias>`) with
//! a freshly derived stealth address and an EIP-681 style URI for wallets
//! and QR codes:
//!
//! ```text
//! ethereum:<stealth_address>?chainId=<id>&value=<wei>&data=<message>
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::{form_urlencoded, Url};

use privatepay_core::config::NetworkConfig;
use privatepay_core::constants::MAX_ALIAS_LENGTH;
use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::types::{
    current_timestamp, wei_string_opt, EthAddress, MetaAddress, StealthDerivation,
};
use privatepay_crypto::keys::parse_public_key;

use crate::engine::StealthAddressEngine;

pub use privatepay_core::types::{format_ether, parse_ether};

const URI_SCHEME: &str = "ethereum:";

// ═══════════════════════════════════════════════════════════════════════════════
// ALIASES
// ═══════════════════════════════════════════════════════════════════════════════

/// Normalizes and validates an alias: trimmed, lower-cased, 1 to 15 of `[a-z0-9]`.
pub fn validate_alias(alias: &str) -> Result<String> {
    let normalized = alias.trim().to_lowercase();
    let invalid = |reason: &str| PrivatePayError::InvalidAlias {
        alias: alias.to_string(),
        reason: reason.to_string(),
    };

    if normalized.is_empty() {
        return Err(invalid("alias is empty"));
    }
    if normalized.chars().count() > MAX_ALIAS_LENGTH {
        return Err(invalid("alias is longer than 15 characters"));
    }
    if !normalized
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(invalid("only letters and digits are allowed"));
    }
    Ok(normalized)
}

// ═══════════════════════════════════════════════════════════════════════════════
// PAYMENT URI
// ═══════════════════════════════════════════════════════════════════════════════

/// EIP-681 style transfer request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentUri {
    /// Address to pay
    pub address: EthAddress,
    /// Target chain
    pub chain_id: Option<u64>,
    /// Amount in wei
    pub value: Option<u128>,
    /// Free-form message
    pub message: Option<String>,
}

impl PaymentUri {
    /// Creates a URI paying `address`.
    pub fn new(address: EthAddress) -> Self {
        Self {
            address,
            chain_id: None,
            value: None,
            message: None,
        }
    }

    /// Short form for display, e.g. `0x1234...abcd`.
    pub fn display_text(&self) -> String {
        format!("Pay to {}", self.address.short(4))
    }
}

impl fmt::Display for PaymentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", URI_SCHEME, self.address)?;

        let mut params = Vec::new();
        if let Some(chain_id) = self.chain_id {
            params.push(format!("chainId={}", chain_id));
        }
        if let Some(value) = self.value {
            params.push(format!("value={}", value));
        }
        if let Some(message) = &self.message {
            let encoded: String = form_urlencoded::byte_serialize(message.as_bytes()).collect();
            params.push(format!("data={}", encoded));
        }

        if !params.is_empty() {
            write!(f, "?{}", params.join("&"))?;
        }
        Ok(())
    }
}

impl FromStr for PaymentUri {
    type Err = PrivatePayError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: String| PrivatePayError::InvalidPaymentLink(reason);

        let rest = s
            .trim()
            .strip_prefix(URI_SCHEME)
            .ok_or_else(|| invalid(format!("missing '{}' scheme", URI_SCHEME)))?;
        let (target, query) = match rest.split_once('?') {
            Some((target, query)) => (target, Some(query)),
            None => (rest, None),
        };

        // `ethereum:<address>@<chainId>` carries the chain in the target
        let (address, mut chain_id) = match target.split_once('@') {
            Some((address, chain)) => (
                address,
                Some(
                    chain
                        .parse::<u64>()
                        .map_err(|_| invalid(format!("invalid chain id '{}'", chain)))?,
                ),
            ),
            None => (target, None),
        };
        let mut uri = PaymentUri::new(EthAddress::from_hex(address)?);

        for (key, value) in form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
            match key.as_ref() {
                "chainId" => {
                    chain_id = Some(
                        value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("invalid chain id '{}'", value)))?,
                    )
                }
                "value" => {
                    uri.value = Some(
                        value
                            .parse::<u128>()
                            .map_err(|_| invalid(format!("invalid value '{}'", value)))?,
                    )
                }
                "data" => uri.message = Some(value.into_owned()),
                _ => {}
            }
        }
        uri.chain_id = chain_id;
        Ok(uri)
    }
}

impl Serialize for PaymentUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PaymentUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PAYMENT LINK
// ═══════════════════════════════════════════════════════════════════════════════

/// A shareable payment link bound to one stealth address.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentLink {
    /// Normalized alias
    pub alias: String,
    /// `https://<base>/<alias>`
    pub url: String,
    /// Recipient wallet
    pub recipient: EthAddress,
    /// Recipient meta-address
    pub meta_address: MetaAddress,
    /// Public half of the derivation behind `uri`
    pub stealth: StealthDerivation,
    /// Wallet-readable transfer request
    pub uri: PaymentUri,
    /// Requested amount in wei
    #[serde(default, with = "wei_string_opt")]
    pub amount: Option<u128>,
    /// Optional message
    pub message: Option<String>,
    /// Chain the link is valid on
    pub chain_id: u64,
    /// Chain display name
    pub network: String,
    /// Unix seconds
    pub created_at: u64,
}

impl PaymentLink {
    /// Builds a link for `recipient` with a fresh stealth address.
    pub fn generate(
        alias: &str,
        recipient: EthAddress,
        meta_address: &MetaAddress,
        amount: Option<u128>,
        message: Option<String>,
        config: &NetworkConfig,
    ) -> Result<Self> {
        let alias = validate_alias(alias)?;
        meta_address.validate()?;
        if amount == Some(0) {
            return Err(PrivatePayError::InvalidAmount("amount must be positive".into()));
        }

        let engine = StealthAddressEngine::new(config.stealth.clone());
        let stealth = engine
            .generate_stealth_address(
                meta_address.spend_public_key.as_bytes(),
                meta_address.viewing_public_key.as_bytes(),
                config.stealth.default_k,
            )?
            .into_public();

        let uri = PaymentUri {
            address: stealth.stealth_address,
            chain_id: Some(config.chain_id),
            value: amount,
            message: message.clone(),
        };

        Ok(Self {
            url: format!("{}/{}", config.payment_links.base_url.trim_end_matches('/'), alias),
            alias,
            recipient,
            meta_address: *meta_address,
            stealth,
            uri,
            amount,
            message,
            chain_id: config.chain_id,
            network: config.chain_name.clone(),
            created_at: current_timestamp(),
        })
    }

    /// Replaces the stealth address with a new one, e.g. for each payer.
    pub fn refresh_stealth(&mut self, engine: &StealthAddressEngine) -> Result<()> {
        self.stealth = engine
            .generate_stealth_address(
                self.meta_address.spend_public_key.as_bytes(),
                self.meta_address.viewing_public_key.as_bytes(),
                engine.params().default_k,
            )?
            .into_public();
        self.uri.address = self.stealth.stealth_address;
        Ok(())
    }

    /// Plain-text summary for sharing.
    pub fn shareable_text(&self) -> String {
        let mut text = format!("{}\n", self.url);
        if let Some(amount) = self.amount {
            text.push_str(&format!("Amount: {} MNT\n", format_ether(amount)));
        }
        if let Some(message) = &self.message {
            text.push_str(&format!("Message: {}\n", message));
        }
        text.push_str(&format!("Network: {}\n", self.network));
        text
    }
}

/// Either form a payment link can take.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParsedPaymentLink {
    /// `https://privatepay.me/<alias>`
    Link {
        /// Alias from the last path segment
        alias: String,
        /// The input URL
        url: String,
    },
    /// `ethereum:<address>?...`
    Uri {
        /// Parsed transfer request
        uri: PaymentUri,
    },
}

/// Parses either an alias URL or an EIP-681 URI.
pub fn parse_payment_link(input: &str) -> Result<ParsedPaymentLink> {
    let input = input.trim();
    if input.starts_with(URI_SCHEME) {
        return Ok(ParsedPaymentLink::Uri { uri: input.parse()? });
    }

    let url = Url::parse(input)
        .map_err(|e| PrivatePayError::InvalidPaymentLink(format!("{}: {}", input, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PrivatePayError::InvalidPaymentLink(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }

    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .ok_or_else(|| PrivatePayError::InvalidPaymentLink("link has no alias".into()))?;

    Ok(ParsedPaymentLink::Link {
        alias: validate_alias(segment)?,
        url: input.to_string(),
    })
}

/// Checks a link end to end, reporting every problem at once.
pub fn validate_payment_link(link: &PaymentLink, expected_chain_id: u64) -> Result<()> {
    let mut errors = Vec::new();

    if let Err(e) = validate_alias(&link.alias) {
        errors.push(e.to_string());
    }
    if link.recipient.is_zero() {
        errors.push("recipient address is the zero address".to_string());
    }
    if let Err(e) = link.meta_address.validate() {
        errors.push(e.to_string());
    }
    for key in [
        &link.meta_address.spend_public_key,
        &link.meta_address.viewing_public_key,
    ] {
        if let Err(e) = parse_public_key(key.as_bytes()) {
            errors.push(e.to_string());
        }
    }
    if link.amount == Some(0) {
        errors.push("amount must be positive".to_string());
    }
    if link.chain_id != expected_chain_id {
        errors.push(format!(
            "invalid chain id {}, expected {}",
            link.chain_id, expected_chain_id
        ));
    }
    if link.uri.address != link.stealth.stealth_address {
        errors.push("URI does not pay the link's stealth address".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(PrivatePayError::InvalidPaymentLink(errors.join("; ")))
    }
}
