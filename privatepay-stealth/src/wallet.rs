//! PrivatePay wallet implementation.
//!
//! The wallet manages the meta-address key set and provides high-level
//! operations for receiving stealth payments.

use serde::{Deserialize, Serialize};
use zeroize::ZeroizeOnDrop;

use privatepay_core::constants::PROTOCOL_VERSION;
use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::types::{
    DiscoveredPayment, KeyPair, MetaAddress, MetaAddressKeys, PaymentAnnouncement, SecpPublicKey,
    SecpSecretKey,
};
use privatepay_crypto::keys::public_key_of;

use crate::discovery::ScanResult;
use crate::engine::StealthAddressEngine;

/// A PrivatePay wallet containing keys for receiving private payments.
///
/// The wallet holds:
/// - Spend keys: For deriving stealth private keys and spending funds
/// - Viewing keys: For scanning announcements (can be shared with auditors)
#[derive(ZeroizeOnDrop)]
pub struct PrivatePayWallet {
    /// The complete key set (spend + viewing)
    keys: MetaAddressKeys,
    /// Cached meta-address
    #[zeroize(skip)]
    meta_address: MetaAddress,
    #[zeroize(skip)]
    engine: StealthAddressEngine,
}

impl PrivatePayWallet {
    /// Generates a new wallet with random keys.
    ///
    /// # Example
    ///
    /// ```rust
    /// use privatepay_stealth::PrivatePayWallet;
    ///
    /// let wallet = PrivatePayWallet::generate().unwrap();
    /// println!("Meta-address: {}", wallet.meta_address().to_hex());
    /// ```
    pub fn generate() -> Result<Self> {
        let engine = StealthAddressEngine::default();
        let keys = engine.generate_meta_address()?;
        Ok(Self::with_engine(keys, engine))
    }

    /// Derives a wallet from a seed. Same seed, same wallet.
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        let engine = StealthAddressEngine::default();
        let keys = engine.generate_meta_address_from_seed(seed)?;
        Ok(Self::with_engine(keys, engine))
    }

    /// Creates a wallet from existing keys.
    pub fn from_keys(keys: MetaAddressKeys) -> Self {
        Self::with_engine(keys, StealthAddressEngine::default())
    }

    /// Creates a wallet from existing keys and a configured engine.
    pub fn with_engine(keys: MetaAddressKeys, engine: StealthAddressEngine) -> Self {
        let meta_address = keys.meta_address();
        Self {
            keys,
            meta_address,
            engine,
        }
    }

    /// Returns the meta-address for publishing.
    pub fn meta_address(&self) -> &MetaAddress {
        &self.meta_address
    }

    /// Returns the key set.
    pub fn keys(&self) -> &MetaAddressKeys {
        &self.keys
    }

    /// Returns the spend public key.
    pub fn spend_public_key(&self) -> &SecpPublicKey {
        &self.keys.spend.public
    }

    /// Returns the viewing public key.
    pub fn viewing_public_key(&self) -> &SecpPublicKey {
        &self.keys.viewing.public
    }

    /// Attempts to discover a payment from an announcement.
    ///
    /// # Returns
    ///
    /// `Ok(Some(_))` if this announcement is for us, with the spending key
    /// `Ok(None)` if the hint or address doesn't match
    /// `Err(_)` if the announcement is malformed
    pub fn try_discover(
        &self,
        announcement: &PaymentAnnouncement,
    ) -> Result<Option<DiscoveredPayment>> {
        match self
            .engine
            .scan_announcement(&self.keys.viewing.secret, &self.keys.spend.public, announcement)
        {
            ScanResult::Matched(
                matched,
            ) => self.engine.recover_payment(&self.keys, matched).map(Some),
            ScanResult::HintMismatch | ScanResult::AddressMismatch => Ok(None),
            ScanResult::Invalid(e) => Err(e),
        }
    }

    /// Discovers every payment in a batch, skipping malformed announcements.
    pub fn discover_all<'a, I>(&self, announcements: I) -> Result<Vec<DiscoveredPayment>>
    where
        I: IntoIterator<Item = &'a PaymentAnnouncement>,
        I::IntoIter: 'a,
    {
        self.engine
            .scan_announcements(&self.keys.viewing.secret, &self.keys.spend.public, announcements)?
            .map(|matched| self.engine.recover_payment(&self.keys, matched))
            .collect()
    }

    /// Exports the scanning capability for third-party auditing.
    ///
    /// The viewing key allows recognizing payments but not spending them.
    pub fn export_viewing_key(&self) -> ViewingKeyExport {
        ViewingKeyExport {
            viewing_secret_key: self.keys.viewing.secret.to_hex(),
            spend_public_key: self.keys.spend.public.to_hex(),
        }
    }

    /// Exports the full key set.
    ///
    /// # Security
    ///
    /// The result contains the spend secret. Store it encrypted.
    pub fn export_keys(&self) -> WalletExport {
        WalletExport {
            version: PROTOCOL_VERSION,
            spend_secret_key: self.keys.spend.secret.to_hex(),
            viewing_secret_key: self.keys.viewing.secret.to_hex(),
            meta_address: self.meta_address.to_hex(),
        }
    }

    /// Restores a wallet from [`WalletExport`].
    ///
    /// # Errors
    ///
    /// `VersionMismatch` for an unknown version, `KeyMismatch` if the stored
    /// meta-address disagrees with the secrets.
    pub fn import_keys(export: &WalletExport) -> Result<Self> {
        if export.version != PROTOCOL_VERSION {
            return Err(PrivatePayError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                actual: export.version,
            });
        }

        let spend = SecpSecretKey::from_hex(&export.spend_secret_key)?;
        let viewing = SecpSecretKey::from_hex(&export.viewing_secret_key)?;
        let keys = MetaAddressKeys::new(
            KeyPair::new(public_key_of(&spend)?, spend),
            KeyPair::new(public_key_of(&viewing)?, viewing),
        );

        let wallet = Self::from_keys(keys);
        let stored = MetaAddress::from_hex(&export.meta_address)?;
        if stored != wallet.meta_address {
            return Err(PrivatePayError::KeyMismatch {
                expected: export.meta_address.clone(),
                derived: wallet.meta_address.to_hex(),
            });
        }
        Ok(wallet)
    }
}

impl std::fmt::Debug for PrivatePayWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivatePayWallet")
            .field("meta_address", &self.meta_address)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

/// Exported scanning key information.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViewingKeyExport {
    /// Viewing secret key (hex)
    pub viewing_secret_key: String,
    /// Spend public key (hex)
    pub spend_public_key: String,
}

/// Serializable wallet key file.
#[derive(Clone, Serialize, Deserialize)]
pub struct WalletExport {
    /// Version for forward compatibility
    pub version: u8,
    /// Spend secret key (hex)
    pub spend_secret_key: String,
    /// Viewing secret key (hex)
    pub viewing_secret_key: String,
    /// Meta-address (hex, 67 bytes)
    pub meta_address: String,
}

impl std::fmt::Debug for WalletExport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletExport")
            .field("version", &self.version)
            .field("meta_address", &self.meta_address)
            .finish_non_exhaustive()
    }
}
