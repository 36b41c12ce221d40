//! Network configuration.
//!
//! One typed [`NetworkConfig`] replaces ad hoc configuration objects. It is
//! built from a [`Network`] preset, optionally overridden from the
//! environment, and validated once at startup.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{PrivatePayError, Result};
use crate::types::EthAddress;

// ═══════════════════════════════════════════════════════════════════════════════
// NETWORK
// ═══════════════════════════════════════════════════════════════════════════════

/// Supported networks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    /// Mantle Sepolia testnet (chain id 5003)
    MantleSepolia,
    /// Mantle mainnet (chain id 5000)
    MantleMainnet,
}

impl Network {
    /// Chain id of the network.
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::MantleSepolia => MANTLE_SEPOLIA_CHAIN_ID,
            Network::MantleMainnet => MANTLE_MAINNET_CHAIN_ID,
        }
    }

    /// Looks up a network by chain id.
    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            MANTLE_SEPOLIA_CHAIN_ID => Some(Network::MantleSepolia),
            MANTLE_MAINNET_CHAIN_ID => Some(Network::MantleMainnet),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Network::MantleSepolia => "Mantle Sepolia Testnet",
            Network::MantleMainnet => "Mantle",
        }
    }
}

impl FromStr for Network {
    type Err = PrivatePayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mantle-sepolia" | "sepolia" | "testnet" => Ok(Network::MantleSepolia),
            "mantle-mainnet" | "mantle" | "mainnet" => Ok(Network::MantleMainnet),
            other => Err(PrivatePayError::config(
                "network",
                format!("unknown network '{}'", other),
            )),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::MantleSepolia => f.write_str("mantle-sepolia"),
            Network::MantleMainnet => f.write_str("mantle-mainnet"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SECTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Native currency description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    /// Currency name
    pub name: String,
    /// Ticker
    pub symbol: String,
    /// Decimals (0..=18)
    pub decimals: u32,
}

/// A deployed contract. `address` is `None` until deployed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Deployed address
    pub address: Option<EthAddress>,
    /// Deployment block, the lower bound for log scans
    pub deployment_block: u64,
}

/// Deployed contracts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contracts {
    /// StealthAddressRegistry
    pub registry: ContractConfig,
    /// PaymentManager
    pub payment_manager: ContractConfig,
}

/// Gas defaults used when the node cannot estimate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasConfig {
    /// Gas limit for contract calls
    pub limit: u64,
    /// Legacy gas price in wei
    pub price: u128,
    /// EIP-1559 max fee per gas
    pub max_fee_per_gas: u128,
    /// EIP-1559 priority fee per gas
    pub max_priority_fee_per_gas: u128,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            limit: 8_000_000,
            price: 20_000_000,
            max_fee_per_gas: 50_000_000,
            max_priority_fee_per_gas: 1_000_000,
        }
    }
}

/// Transaction submission policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// Confirmations before a record counts as confirmed
    pub confirmations: u64,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// How long to wait for the required confirmations, in milliseconds
    #[serde(default = "default_confirmation_timeout_ms")]
    pub confirmation_timeout_ms: u64,
    /// Retries for recoverable RPC failures
    pub retries: u32,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            confirmations: 1,
            timeout_ms: 60_000,
            confirmation_timeout_ms: default_confirmation_timeout_ms(),
            retries: 3,
        }
    }
}

fn default_confirmation_timeout_ms() -> u64 {
    120_000
}

/// Stealth scheme parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StealthParams {
    /// View hint length in bytes (only 1 is supported)
    pub view_hint_bytes: usize,
    /// Largest accepted derivation index
    pub max_derivation_index: u32,
    /// Index used when the caller does not pass one
    pub default_k: u32,
}

impl Default for StealthParams {
    fn default() -> Self {
        Self {
            view_hint_bytes: VIEW_HINT_SIZE,
            max_derivation_index: MAX_DERIVATION_INDEX,
            default_k: DEFAULT_K,
        }
    }
}

/// Payment link settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLinkConfig {
    /// Base URL links are built on
    pub base_url: String,
    /// Maximum alias length
    pub max_alias_length: usize,
}

impl Default for PaymentLinkConfig {
    fn default() -> Self {
        Self {
            base_url: PAYMENT_LINK_BASE_URL.to_string(),
            max_alias_length: MAX_ALIAS_LENGTH,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NETWORK CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Complete configuration for one network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Selected network
    pub network: Network,
    /// Chain id (must match `network`)
    pub chain_id: u64,
    /// Display name
    pub chain_name: String,
    /// Native currency
    pub native_currency: NativeCurrency,
    /// RPC endpoints, first is primary
    pub rpc_urls: Vec<String>,
    /// Block explorers
    pub explorer_urls: Vec<String>,
    /// Deployed contracts
    pub contracts: Contracts,
    /// Gas defaults
    pub gas: GasConfig,
    /// Submission policy
    pub transaction: TransactionConfig,
    /// Stealth parameters
    pub stealth: StealthParams,
    /// Payment links
    pub payment_links: PaymentLinkConfig,
}

impl NetworkConfig {
    /// Preset for a network.
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::MantleSepolia => Self::mantle_sepolia(),
            Network::MantleMainnet => Self::mantle_mainnet(),
        }
    }

    /// Mantle Sepolia with the deployed registry and payment manager.
    pub fn mantle_sepolia() -> Self {
        Self {
            network: Network::MantleSepolia,
            chain_id: MANTLE_SEPOLIA_CHAIN_ID,
            chain_name: Network::MantleSepolia.display_name().to_string(),
            native_currency: mnt(),
            rpc_urls: vec![MANTLE_SEPOLIA_RPC_URL.to_string()],
            explorer_urls: vec![MANTLE_SEPOLIA_EXPLORER_URL.to_string()],
            contracts: Contracts {
                registry: ContractConfig {
                    address: EthAddress::from_hex(SEPOLIA_REGISTRY_ADDRESS).ok(),
                    deployment_block: SEPOLIA_REGISTRY_DEPLOYMENT_BLOCK,
                },
                payment_manager: ContractConfig {
                    address: EthAddress::from_hex(SEPOLIA_PAYMENT_MANAGER_ADDRESS).ok(),
                    deployment_block: SEPOLIA_PAYMENT_MANAGER_DEPLOYMENT_BLOCK,
                },
            },
            gas: GasConfig::default(),
            transaction: TransactionConfig::default(),
            stealth: StealthParams::default(),
            payment_links: PaymentLinkConfig::default(),
        }
    }

    /// Mantle mainnet. Contracts are not deployed there yet.
    pub fn mantle_mainnet() -> Self {
        Self {
            network: Network::MantleMainnet,
            chain_id: MANTLE_MAINNET_CHAIN_ID,
            chain_name: Network::MantleMainnet.display_name().to_string(),
            native_currency: mnt(),
            rpc_urls: vec![MANTLE_MAINNET_RPC_URL.to_string()],
            explorer_urls: vec![MANTLE_MAINNET_EXPLORER_URL.to_string()],
            contracts: Contracts::default(),
            gas: GasConfig::default(),
            transaction: TransactionConfig::default(),
            stealth: StealthParams::default(),
            payment_links: PaymentLinkConfig::default(),
        }
    }

    /// Loads configuration from the environment (and a `.env` file if present).
    ///
    /// | Variable | Effect |
    /// |---|---|
    /// | `PRIVATEPAY_NETWORK` | preset (`mantle-sepolia` default) |
    /// | `PRIVATEPAY_RPC_URL` | replaces the RPC list |
    /// | `PRIVATEPAY_REGISTRY_ADDRESS` | registry contract |
    /// | `PRIVATEPAY_PAYMENT_MANAGER_ADDRESS` | payment manager contract |
    /// | `PRIVATEPAY_LINK_BASE_URL` | payment link base URL |
    ///
    /// The result is validated before it is returned.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let network = match lookup("PRIVATEPAY_NETWORK") {
            Some(name) => name.parse()?,
            None => Network::MantleSepolia,
        };
        let mut config = Self::for_network(network);

        if let Some(rpc) = lookup("PRIVATEPAY_RPC_URL") {
            config.rpc_urls = vec![rpc];
        }
        if let Some(addr) = lookup("PRIVATEPAY_REGISTRY_ADDRESS") {
            config.contracts.registry.address =
                parse_contract("contracts.registry.address", &addr)?;
        }
        if let Some(addr) = lookup("PRIVATEPAY_PAYMENT_MANAGER_ADDRESS") {
            config.contracts.payment_manager.address =
                parse_contract("contracts.payment_manager.address", &addr)?;
        }
        if let Some(base) = lookup("PRIVATEPAY_LINK_BASE_URL") {
            config.payment_links.base_url = base;
        }

        config.validate()?;
        Ok(config)
    }

    /// Primary RPC endpoint.
    pub fn rpc_url(&self) -> &str {
        self.rpc_urls.first().map(String::as_str).unwrap_or_default()
    }

    /// Explorer link for a transaction.
    pub fn tx_url(&self, tx_hash: &crate::types::TxHash) -> Option<String> {
        self.explorer_urls
            .first()
            .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
    }

    /// Explorer link for an address.
    pub fn address_url(&self, address: &EthAddress) -> Option<String> {
        self.explorer_urls
            .first()
            .map(|base| format!("{}/address/{}", base.trim_end_matches('/'), address))
    }

    /// Validates every field.
    pub fn validate(&self) -> Result<()> {
        if self.chain_id == 0 {
            return Err(PrivatePayError::config("chain_id", "must be positive"));
        }
        if self.chain_id != self.network.chain_id() {
            return Err(PrivatePayError::config(
                "chain_id",
                format!(
                    "{} does not match network {} ({})",
                    self.chain_id,
                    self.network,
                    self.network.chain_id()
                ),
            ));
        }
        if self.chain_name.trim().is_empty() {
            return Err(PrivatePayError::config("chain_name", "must be non-empty"));
        }

        if self.native_currency.name.trim().is_empty() {
            return Err(PrivatePayError::config("native_currency.name", "must be non-empty"));
        }
        if self.native_currency.symbol.trim().is_empty() {
            return Err(PrivatePayError::config("native_currency.symbol", "must be non-empty"));
        }
        if self.native_currency.decimals > 18 {
            return Err(PrivatePayError::config(
                "native_currency.decimals",
                "must be between 0 and 18",
            ));
        }

        validate_urls("rpc_urls", &self.rpc_urls)?;
        validate_urls("explorer_urls", &self.explorer_urls)?;

        if self.gas.limit == 0 {
            return Err(PrivatePayError::config("gas.limit", "must be positive"));
        }
        if self.gas.max_priority_fee_per_gas > self.gas.max_fee_per_gas {
            return Err(PrivatePayError::config(
                "gas.max_priority_fee_per_gas",
                "cannot exceed max_fee_per_gas",
            ));
        }

        if self.transaction.timeout_ms == 0 {
            return Err(PrivatePayError::config("transaction.timeout_ms", "must be positive"));
        }
        if self.transaction.confirmation_timeout_ms == 0 {
            return Err(PrivatePayError::config(
                "transaction.confirmation_timeout_ms",
                "must be positive",
            ));
        }

        if self.stealth.view_hint_bytes != VIEW_HINT_SIZE {
            return Err(PrivatePayError::config(
                "stealth.view_hint_bytes",
                format!("only {} is supported", VIEW_HINT_SIZE),
            ));
        }
        if self.stealth.max_derivation_index > MAX_DERIVATION_INDEX {
            return Err(PrivatePayError::config(
                "stealth.max_derivation_index",
                format!("cannot exceed {}", MAX_DERIVATION_INDEX),
            ));
        }
        if self.stealth.default_k > self.stealth.max_derivation_index {
            return Err(PrivatePayError::config(
                "stealth.default_k",
                "cannot exceed max_derivation_index",
            ));
        }

        if self.payment_links.max_alias_length == 0 {
            return Err(PrivatePayError::config(
                "payment_links.max_alias_length",
                "must be positive",
            ));
        }
        validate_urls(
            "payment_links.base_url",
            std::slice::from_ref(&self.payment_links.base_url),
        )?;

        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::mantle_sepolia()
    }
}

fn mnt() -> NativeCurrency {
    NativeCurrency {
        name: "Mantle".to_string(),
        symbol: "MNT".to_string(),
        decimals: NATIVE_DECIMALS,
    }
}

fn validate_urls(field: &str, urls: &[String]) -> Result<()> {
    if urls.is_empty() {
        return Err(PrivatePayError::config(field, "must contain at least one URL"));
    }
    for (i, raw) in urls.iter().enumerate() {
        let parsed = url::Url::parse(raw)
            .map_err(|e| PrivatePayError::config(format!("{}[{}]", field, i), e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PrivatePayError::config(
                format!("{}[{}]", field, i),
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }
    }
    Ok(())
}

fn parse_contract(field: &str, raw: &str) -> Result<Option<EthAddress>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    EthAddress::from_hex(raw)
        .map(Some)
        .map_err(|e| PrivatePayError::config(field, e.to_string()))
}
