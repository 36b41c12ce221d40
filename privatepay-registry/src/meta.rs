//! In-memory meta-address registry.
//!
//! Mirrors the registry contract: each owner appends meta-addresses under
//! increasing indices and every registration emits a
//! [`MetaAddressRegistered`] event.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::traits::{MetaAddressDirectory, MetaAddressRegistrar};
use privatepay_core::types::{current_timestamp, EthAddress, MetaAddress, RegisteredMetaAddress};

/// Event emitted for every registration, in registration order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaAddressRegistered {
    /// Registering wallet
    pub user: EthAddress,
    /// Index assigned to the registration
    pub index: u64,
    /// The registered keys
    pub meta_address: MetaAddress,
    /// Registration timestamp (Unix seconds)
    pub timestamp: u64,
}

/// Per-owner, append-only meta-address storage.
#[derive(Debug, Default)]
pub struct MemoryMetaAddressRegistry {
    entries: DashMap<EthAddress, Vec<RegisteredMetaAddress>>,
    events: RwLock<Vec<MetaAddressRegistered>>,
}

impl MemoryMetaAddressRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// All registrations of `owner`, index order.
    pub fn list(&self, owner: &EthAddress) -> Vec<RegisteredMetaAddress> {
        self.entries
            .get(owner)
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Registration events emitted so far.
    pub fn events(&self) -> Vec<MetaAddressRegistered> {
        self.events.read().clone()
    }

    /// Number of distinct owners.
    pub fn owner_count(&self) -> usize {
        self.entries.len()
    }
}

#[async_trait]
impl MetaAddressRegistrar for MemoryMetaAddressRegistry {
    #[instrument(skip(self, meta), fields(owner = %owner))]
    async fn register_meta_address(&self, owner: EthAddress, meta: MetaAddress) -> Result<u64> {
        if owner.is_zero() {
            return Err(PrivatePayError::InvalidAddress(
                "owner cannot be the zero address".into(),
            ));
        }
        meta.validate()?;

        let timestamp = current_timestamp();
        // Holding the entry guard serializes registrations per owner, so the
        // index and the event order agree.
        let mut entries = self.entries.entry(owner).or_default();
        let index = entries.len() as u64;
        entries.push(RegisteredMetaAddress {
            owner,
            index,
            meta_address: meta,
            created_at: timestamp,
        });
        self.events.write().push(MetaAddressRegistered {
            user: owner,
            index,
            meta_address: meta,
            timestamp,
        });

        debug!(index, "Registered meta-address");
        Ok(index)
    }
}

#[async_trait]
impl MetaAddressDirectory for MemoryMetaAddressRegistry {
    async fn get_meta_address(
        &self,
        owner: &EthAddress,
        index: u64,
    ) -> Result<RegisteredMetaAddress> {
        self.entries
            .get(owner)
            .and_then(|entries| entries.get(index as usize).cloned())
            .ok_or_else(|| PrivatePayError::MetaAddressNotFound {
                owner: owner.to_string(),
                index,
            })
    }

    async fn get_meta_address_count(&self, owner: &EthAddress) -> Result<u64> {
        Ok(self
            .entries
            .get(owner)
            .map_or(0, |entries| entries.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use privatepay_stealth::StealthAddressEngine;

    fn meta() -> MetaAddress {
        StealthAddressEngine::default()
            .generate_meta_address()
            .unwrap()
            .meta_address()
    }

    #[tokio::test]
    async fn test_register_assigns_sequential_indices() {
        let registry = MemoryMetaAddressRegistry::new();
        let owner = EthAddress::from_array([0x11; 20]);

        assert_eq!(registry.register_meta_address(owner, meta()).await.unwrap(), 0);
        assert_eq!(registry.register_meta_address(owner, meta()).await.unwrap(), 1);
        assert_eq!(registry.get_meta_address_count(&owner).await.unwrap(), 2);

        let other = EthAddress::from_array([0x22; 20]);
        assert_eq!(registry.register_meta_address(other, meta()).await.unwrap(), 0);
        assert_eq!(registry.owner_count(), 2);
    }

    #[tokio::test]
    async fn test_get_meta_address() {
        let registry = MemoryMetaAddressRegistry::new();
        let owner = EthAddress::from_array([0x11; 20]);
        let published = meta();
        registry.register_meta_address(owner, published).await.unwrap();

        let stored = registry.get_meta_address(&owner, 0).await.unwrap();
        assert_eq!(stored.meta_address, published);
        assert_eq!(stored.owner, owner);

        let latest = registry.get_latest_meta_address(&owner).await.unwrap().unwrap();
        assert_eq!(latest.index, 0);
    }

    #[tokio::test]
    async fn test_missing_meta_address() {
        let registry = MemoryMetaAddressRegistry::new();
        let owner = EthAddress::from_array([0x11; 20]);

        assert!(matches!(
            registry.get_meta_address(&owner, 0).await,
            Err(PrivatePayError::MetaAddressNotFound { index: 0, .. })
        ));
        assert_eq!(registry.get_meta_address_count(&owner).await.unwrap(), 0);
        assert!(registry.get_latest_meta_address(&owner).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_events_logged() {
        let registry = MemoryMetaAddressRegistry::new();
        let owner = EthAddress::from_array([0x11; 20]);
        let first = meta();
        registry.register_meta_address(owner, first).await.unwrap();
        registry.register_meta_address(owner, meta()).await.unwrap();

        let events = registry.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].user, owner);
        assert_eq!(events[0].meta_address, first);
        assert_eq!(events[1].index, 1);

        let json = serde_json::to_value(&events[0]).unwrap();
        assert!(json.get("metaAddress").is_some());
    }

    #[tokio::test]
    async fn test_rejects_zero_owner() {
        let registry = MemoryMetaAddressRegistry::new();
        let result = registry
            .register_meta_address(EthAddress::from_array([0; 20]), meta())
            .await;
        assert!(matches!(result, Err(PrivatePayError::InvalidAddress(_))));
        assert!(registry.events().is_empty());
    }
}
