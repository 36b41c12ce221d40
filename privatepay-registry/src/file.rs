//! File-backed announcement registry.
//!
//! Keeps everything in a [`MemoryRegistry`] and rewrites a single file on
//! save. Good enough for the CLI and single-node API deployments.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::traits::AnnouncementRegistry;
use privatepay_core::types::{AnnouncementStats, EthAddress, PaymentAnnouncement};

use crate::MemoryRegistry;

/// File format magic bytes
const MAGIC: &[u8; 4] = b"PPAY";
/// Current file format version
const VERSION: u8 = 1;
/// magic + version + count
const HEADER_LEN: usize = 4 + 1 + 8;
/// Default number of writes between automatic saves
pub const DEFAULT_AUTO_SAVE_THRESHOLD: u64 = 100;

/// JSON body written after the header.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    saved_at: DateTime<Utc>,
    announcements: Vec<PaymentAnnouncement>,
}

/// File-based announcement registry.
///
/// # File Format
///
/// ```text
/// magic (4 bytes): "PPAY"
/// version (1 byte): 1
/// count (8 bytes, LE): number of announcements
/// body (variable): JSON { saved_at, announcements }
/// ```
///
/// Saves write a sibling `.tmp` file and rename it over the target, so a
/// crash mid-save leaves the previous snapshot intact.
pub struct FileRegistry {
    path: PathBuf,
    memory: MemoryRegistry,
    dirty: AtomicBool,
    auto_save_threshold: u64,
    writes_since_save: AtomicU64,
}

impl FileRegistry {
    /// Opens the registry at `path`, loading it if the file exists.
    ///
    /// The file is only created on the first save.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_auto_save(path, DEFAULT_AUTO_SAVE_THRESHOLD).await
    }

    /// Opens the registry with a custom auto-save threshold.
    pub async fn with_auto_save(path: impl AsRef<Path>, threshold: u64) -> Result<Self> {
        let registry = Self {
            path: path.as_ref().to_path_buf(),
            memory: MemoryRegistry::new(),
            dirty: AtomicBool::new(false),
            auto_save_threshold: threshold,
            writes_since_save: AtomicU64::new(0),
        };

        if fs::try_exists(&registry.path).await? {
            registry.load().await?;
        }

        Ok(registry)
    }

    #[instrument(skip(self), fields(path = ?self.path))]
    async fn load(&self) -> Result<()> {
        let contents = fs::read(&self.path).await?;
        let (count, snapshot) = decode(&contents)?;

        info!(count, saved_at = %snapshot.saved_at, "Loading announcements from file");
        self.memory.import(snapshot.announcements)?;
        self.dirty.store(false, Ordering::SeqCst);

        debug!("Registry loaded");
        Ok(())
    }

    /// Writes the current contents to disk.
    #[instrument(skip(self), fields(path = ?self.path))]
    pub async fn save(&self) -> Result<()> {
        let snapshot = Snapshot {
            saved_at: Utc::now(),
            announcements: self.memory.all_announcements(),
        };
        let contents = encode(&snapshot)?;
        info!(count = snapshot.announcements.len(), "Saving registry to file");

        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&contents).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, &self.path).await?;

        self.dirty.store(false, Ordering::SeqCst);
        self.writes_since_save.store(0, Ordering::SeqCst);
        Ok(())
    }

    /// Checks if there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Saves if dirty.
    pub async fn flush(&self) -> Result<()> {
        if self.is_dirty() {
            self.save().await?;
        }
        Ok(())
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the underlying memory registry.
    pub fn memory(&self) -> &MemoryRegistry {
        &self.memory
    }

    /// Returns statistics.
    pub fn stats(&self) -> AnnouncementStats {
        self.memory.stats()
    }

    /// Returns the number of announcements.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    async fn maybe_auto_save(&self) -> Result<()> {
        let writes = self.writes_since_save.fetch_add(1, Ordering::SeqCst);
        if writes >= self.auto_save_threshold {
            self.save().await?;
        }
        Ok(())
    }
}

fn encode(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(snapshot)?;
    let count = snapshot.announcements.len() as u64;

    let mut contents = Vec::with_capacity(HEADER_LEN + body.len());
    contents.extend_from_slice(MAGIC);
    contents.push(VERSION);
    contents.extend_from_slice(&count.to_le_bytes());
    contents.extend_from_slice(&body);
    Ok(contents)
}

fn decode(contents: &[u8]) -> Result<(u64, Snapshot)> {
    if contents.len() < HEADER_LEN {
        return Err(PrivatePayError::RegistryError("registry file too short".into()));
    }
    let (header, body) = contents.split_at(HEADER_LEN);

    if &header[0..4] != MAGIC {
        return Err(PrivatePayError::RegistryError("invalid magic bytes".into()));
    }
    if header[4] != VERSION {
        return Err(PrivatePayError::VersionMismatch {
            expected: VERSION,
            actual: header[4],
        });
    }

    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&header[5..HEADER_LEN]);
    let count = u64::from_le_bytes(count_bytes);

    let snapshot: Snapshot = serde_json::from_slice(body)?;
    if snapshot.announcements.len() as u64 != count {
        return Err(PrivatePayError::RegistryError(format!(
            "header announces {} entries, body holds {}",
            count,
            snapshot.announcements.len()
        )));
    }
    Ok((count, snapshot))
}

impl Drop for FileRegistry {
    fn drop(&mut self) {
        if self.is_dirty() {
            warn!(path = ?self.path, "FileRegistry dropped with unsaved changes");
        }
    }
}

#[async_trait]
impl AnnouncementRegistry for FileRegistry {
    async fn publish(&self, announcement: PaymentAnnouncement) -> Result<u64> {
        let id = self.memory.publish(announcement).await?;
        self.dirty.store(true, Ordering::SeqCst);
        self.maybe_auto_save().await?;
        Ok(id)
    }

    async fn get_by_view_hint(&self, view_hint: u8) -> Result<Vec<PaymentAnnouncement>> {
        self.memory.get_by_view_hint(view_hint).await
    }

    async fn get_by_recipient(&self, recipient: &EthAddress) -> Result<Vec<PaymentAnnouncement>> {
        self.memory.get_by_recipient(recipient).await
    }

    async fn get_by_time_range(&self, start: u64, end: u64) -> Result<Vec<PaymentAnnouncement>> {
        self.memory.get_by_time_range(start, end).await
    }

    async fn get_by_block_range(&self, from: u64, to: u64) -> Result<Vec<PaymentAnnouncement>> {
        self.memory.get_by_block_range(from, to).await
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<PaymentAnnouncement>> {
        self.memory.get_by_id(id).await
    }

    async fn count(&self) -> Result<u64> {
        self.memory.count().await
    }

    async fn next_id(&self) -> Result<u64> {
        self.memory.next_id().await
    }
}
