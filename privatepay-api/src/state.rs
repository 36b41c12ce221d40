//! App state: stores, stealth engine, network config.

use std::path::PathBuf;

use privatepay_core::config::NetworkConfig;
use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::traits::AnnouncementRegistry;
use privatepay_registry::{
    FileRegistry, MemoryAliasDirectory, MemoryMetaAddressRegistry, MemoryRegistry,
    MemoryTransactionStore,
};
use privatepay_stealth::StealthAddressEngine;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3001;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Allowed CORS origins; empty allows any
    pub cors_origins: Vec<String>,
    /// Announcement file; `None` keeps announcements in memory
    pub registry_path: Option<PathBuf>,
    /// Chain the server serves
    pub network: NetworkConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            cors_origins: Vec::new(),
            registry_path: None,
            network: NetworkConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Loads the server settings and the network config from the environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let network = NetworkConfig::from_env()?;
        Self::from_lookup(|key| std::env::var(key).ok(), network)
    }

    /// Builds the server settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F, network: NetworkConfig) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PRIVATEPAY_API_PORT") {
            Some(port) => port.parse().map_err(|_| {
                PrivatePayError::config("PRIVATEPAY_API_PORT", format!("'{}' is not a port", port))
            })?,
            None => DEFAULT_PORT,
        };

        let cors_origins = lookup("PRIVATEPAY_CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty() && *o != "*")
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host: lookup("PRIVATEPAY_API_HOST").unwrap_or_else(|| DEFAULT_HOST.into()),
            port,
            cors_origins,
            registry_path: lookup("PRIVATEPAY_REGISTRY_PATH").map(PathBuf::from),
            network,
        })
    }

    /// `host:port` to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Announcement storage, in memory or persisted to a file.
pub enum AnnouncementStore {
    /// Lost on restart
    Memory(MemoryRegistry),
    /// Saved to `ApiConfig::registry_path`
    File(FileRegistry),
}

impl AnnouncementStore {
    /// The store behind the common registry trait.
    pub fn registry(&self) -> &dyn AnnouncementRegistry {
        match self {
            AnnouncementStore::Memory(registry) => registry as &dyn AnnouncementRegistry,
            AnnouncementStore::File(registry) => registry,
        }
    }

    /// In-memory view, for listings and stats.
    pub fn memory(&self) -> &MemoryRegistry {
        match self {
            AnnouncementStore::Memory(registry) => registry,
            AnnouncementStore::File(registry) => registry.memory(),
        }
    }
}

/// Shared state handed to every handler.
pub struct AppState {
    /// Server settings
    pub config: ApiConfig,
    /// Engine configured from `config.network`
    pub engine: StealthAddressEngine,
    /// Published announcements
    pub announcements: AnnouncementStore,
    /// Registered meta-addresses
    pub meta_addresses: MemoryMetaAddressRegistry,
    /// Alias to wallet mapping
    pub aliases: MemoryAliasDirectory,
    /// Recorded payment transactions
    pub transactions: MemoryTransactionStore,
}

impl AppState {
    /// State with every store in memory.
    pub fn new(config: ApiConfig) -> Self {
        Self::with_announcements(config, AnnouncementStore::Memory(MemoryRegistry::new()))
    }

    /// State backed by `config.registry_path` when set.
    pub async fn open(config: ApiConfig) -> Result<Self> {
        let store = match &config.registry_path {
            Some(path) => AnnouncementStore::File(FileRegistry::new(path).await?),
            None => AnnouncementStore::Memory(MemoryRegistry::new()),
        };
        Ok(Self::with_announcements(config, store))
    }

    fn with_announcements(config: ApiConfig, announcements: AnnouncementStore) -> Self {
        Self {
            engine: StealthAddressEngine::new(config.network.stealth.clone()),
            config,
            announcements,
            meta_addresses: MemoryMetaAddressRegistry::new(),
            aliases: MemoryAliasDirectory::new(),
            transactions: MemoryTransactionStore::new(),
        }
    }
}
