//! Alias directory: short human-readable names for wallet addresses.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, instrument};

use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::traits::AliasDirectory;
use privatepay_core::types::EthAddress;
use privatepay_stealth::link::validate_alias;

/// In-memory alias directory.
///
/// Aliases are normalized (trimmed, lower-cased) before every lookup, so
/// `Alice` and `alice` name the same entry. A wallet may hold several aliases.
#[derive(Debug, Default)]
pub struct MemoryAliasDirectory {
    aliases: DashMap<String, EthAddress>,
}

impl MemoryAliasDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered aliases.
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Returns true if no alias is registered.
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

#[async_trait]
impl AliasDirectory for MemoryAliasDirectory {
    /// Re-registering an alias to the wallet that already holds it is a no-op.
    #[instrument(skip(self), fields(wallet = %wallet))]
    async fn register_alias(&self, alias: &str, wallet: EthAddress) -> Result<()> {
        let alias = validate_alias(alias)?;
        if wallet.is_zero() {
            return Err(PrivatePayError::InvalidAddress(
                "alias cannot point to the zero address".into(),
            ));
        }

        match self.aliases.entry(alias) {
            Entry::Occupied(entry) if *entry.get() == wallet => Ok(()),
            Entry::Occupied(entry) => Err(PrivatePayError::AliasTaken(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!(alias = %entry.key(), "Registered alias");
                entry.insert(wallet);
                Ok(())
            }
        }
    }

    async fn resolve_alias(&self, alias: &str) -> Result<Option<EthAddress>> {
        let alias = validate_alias(alias)?;
        Ok(self.aliases.get(&alias).map(|wallet| *wallet))
    }

    async fn aliases_for(&self, wallet: &EthAddress) -> Result<Vec<String>> {
        let mut owned: Vec<String> = self
            .aliases
            .iter()
            .filter(|entry| entry.value() == wallet)
            .map(|entry| entry.key().clone())
            .collect();
        owned.sort();
        Ok(owned)
    }
}
