//! Recipient resolution: alias -> wallet address -> registered meta-address.

use serde::{Deserialize, Serialize};
use tracing::debug;

use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::traits::{AliasDirectory, MetaAddressDirectory};
use privatepay_core::types::{EthAddress, RegisteredMetaAddress};

use crate::link::validate_alias;

/// A recipient ready to be paid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRecipient {
    /// Normalized alias
    pub alias: String,
    /// Wallet the alias points to
    pub wallet: EthAddress,
    /// Meta-address registered by that wallet
    pub meta_address: RegisteredMetaAddress,
}

/// Resolves an alias to its owner's meta-address.
///
/// `index` selects a specific registration; `None` takes the latest one.
///
/// # Errors
///
/// - `InvalidAlias` for a malformed alias
/// - `AliasNotFound` if no wallet claims the alias
/// - `MetaAddressNotFound` if the wallet never registered (or lacks `index`)
pub async fn resolve_recipient(
    aliases: &dyn AliasDirectory,
    directory: &dyn MetaAddressDirectory,
    alias: &str,
    index: Option<u64>,
) -> Result<ResolvedRecipient> {
    let alias = validate_alias(alias)?;
    let wallet = aliases
        .resolve_alias(&alias)
        .await?
        .ok_or_else(|| PrivatePayError::AliasNotFound(alias.clone()))?;

    let meta_address = match index {
        Some(index) => directory.get_meta_address(&wallet, index).await?,
        None => directory
            .get_latest_meta_address(&wallet)
            .await?
            .ok_or_else(|| PrivatePayError::MetaAddressNotFound {
                owner: wallet.to_string(),
                index: 0,
            })?,
    };
    meta_address.meta_address.validate()?;

    debug!(%alias, %wallet, index = meta_address.index, "resolved recipient");
    Ok(ResolvedRecipient {
        alias,
        wallet,
        meta_address,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use privatepay_core::types::MetaAddress;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::engine::StealthAddressEngine;

    #[derive(Default)]
    struct Aliases(Mutex<HashMap<String, EthAddress>>);

    #[async_trait]
    impl AliasDirectory for Aliases {
        async fn register_alias(&self, alias: &str, wallet: EthAddress) -> Result<()> {
            self.0.lock().unwrap().insert(alias.to_string(), wallet);
            Ok(())
        }

        async fn resolve_alias(&self, alias: &str) -> Result<Option<EthAddress>> {
            Ok(self.0.lock().unwrap().get(alias).copied())
        }

        async fn aliases_for(&self, wallet: &EthAddress) -> Result<Vec<String>> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, w)| *w == wallet)
                .map(|(a, _)| a.clone())
                .collect())
        }
    }

    struct Directory(Vec<RegisteredMetaAddress>);

    #[async_trait]
    impl MetaAddressDirectory for Directory {
        async fn get_meta_address(
            &self,
            owner: &EthAddress,
            index: u64,
        ) -> Result<RegisteredMetaAddress> {
            self.0
                .iter()
                .find(|m| m.owner == *owner && m.index == index)
                .cloned()
                .ok_or(PrivatePayError::MetaAddressNotFound {
                    owner: owner.to_string(),
                    index,
                })
        }

        async fn get_meta_address_count(&self, owner: &EthAddress) -> Result<u64> {
            Ok(self.0.iter().filter(|m| m.owner == *owner).count() as u64)
        }
    }

    fn meta() -> MetaAddress {
        StealthAddressEngine::default()
            .generate_meta_address()
            .unwrap()
            .meta_address()
    }

    fn setup() -> (Aliases, Directory, EthAddress) {
        let wallet = EthAddress::from_array([0x77; 20]);
        let aliases = Aliases::default();
        aliases
            .0
            .lock()
            .unwrap()
            .insert("carol".to_string(), wallet);
        let directory = Directory(
            (0..2)
                .map(|index| RegisteredMetaAddress {
                    owner: wallet,
                    index,
                    meta_address: meta(),
                    created_at: 1_700_000_000 + index,
                })
                .collect(),
        );
        (aliases, directory, wallet)
    }

    #[tokio::test]
    async fn test_resolves_latest_by_default() {
        let (aliases, directory, wallet) = setup();
        let resolved = resolve_recipient(&aliases, &directory, "Carol", None).await.unwrap();
        assert_eq!(resolved.alias, "carol");
        assert_eq!(resolved.wallet, wallet);
        assert_eq!(resolved.meta_address.index, 1);
    }

    #[tokio::test]
    async fn test_resolves_explicit_index() {
        let (aliases, directory, _) = setup();
        let resolved = resolve_recipient(&aliases, &directory, "carol", Some(0)).await.unwrap();
        assert_eq!(resolved.meta_address.index, 0);
    }

    #[tokio::test]
    async fn test_unknown_alias() {
        let (aliases, directory, _) = setup();
        let err = resolve_recipient(&aliases, &directory, "dave", None).await.unwrap_err();
        assert!(matches!(err, PrivatePayError::AliasNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_meta_address() {
        let (aliases, directory, _) = setup();
        let err = resolve_recipient(&aliases, &directory, "carol", Some(9)).await.unwrap_err();
        assert!(matches!(err, PrivatePayError::MetaAddressNotFound { index: 9, .. }));
    }

    #[tokio::test]
    async fn test_invalid_alias() {
        let (aliases, directory, _) = setup();
        let err = resolve_recipient(&aliases, &directory, "no-dash", None).await.unwrap_err();
        assert!(matches!(err, PrivatePayError::InvalidAlias { .. }));
    }
}
