//! Storage Backend Module
//!
//! Raw string-keyed byte stores used by the persistent cache.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::BackendError;

// == Storage Backend ==
/// Raw asynchronous key-value storage over opaque payloads.
///
/// A missing key is a normal outcome: `read` returns `Ok(None)` and `delete`
/// returns `Ok(())`. Only genuine storage failures are errors.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// A name for tracing.
    fn name(&self) -> &'static str;

    /// Reads the payload stored under `key`.
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError>;

    /// Stores `payload` under `key`, replacing any previous payload.
    async fn write(&self, key: &str, payload: Vec<u8>) -> Result<(), BackendError>;

    /// Deletes whatever is stored under `key`.
    async fn delete(&self, key: &str) -> Result<(), BackendError>;
}

// == File Backend ==
/// Longest hex file stem used as-is; longer keys are hashed.
const MAX_PLAIN_STEM: usize = 200;

/// Length of the hex key prefix kept in a hashed file stem.
const HASHED_STEM_PREFIX: usize = 64;

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Device-local storage with one file per key under a root directory.
///
/// File names are the hex encoding of the key bytes. Keys too long for that
/// to fit a file name are named by a hex prefix plus the SHA-256 of the
/// whole key instead. Every file starts with the key it belongs to, and
/// a file holding another key is treated as absent.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Opens (creating if needed) a storage directory.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        info!("File storage opened at {}", root.display());
        Ok(Self { root })
    }

    /// Returns the storage directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let mut stem = hex(key.as_bytes());
        if stem.len() > MAX_PLAIN_STEM {
            stem.truncate(HASHED_STEM_PREFIX);
            stem.push('-');
            stem.push_str(&hex(&Sha256::digest(key.as_bytes())));
        }
        self.root.join(format!("{stem}.entry"))
    }

    /// Reads the entry file at `path` and splits it into key and payload.
    async fn read_entry(&self, path: &Path) -> Result<Option<(String, Vec<u8>)>, BackendError> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let (owner, payload) = split_entry(&bytes).ok_or_else(|| BackendError::Malformed {
            path: path.to_path_buf(),
        })?;
        Ok(Some((owner.to_string(), payload.to_vec())))
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Lays out an entry file: key length (u64 big-endian), key bytes, payload.
fn join_entry(key: &str, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + key.len() + payload.len());
    bytes.extend_from_slice(&(key.len() as u64).to_be_bytes());
    bytes.extend_from_slice(key.as_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

fn split_entry(bytes: &[u8]) -> Option<(&str, &[u8])> {
    let header: [u8; 8] = bytes.get(..8)?.try_into().ok()?;
    let key_len = usize::try_from(u64::from_be_bytes(header)).ok()?;
    let rest = &bytes[8..];
    let key = rest.get(..key_len)?;
    Some((std::str::from_utf8(key).ok()?, &rest[key_len..]))
}

#[async_trait]
impl StorageBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        match self.read_entry(&self.entry_path(key)).await? {
            Some((owner, payload)) if owner == key => Ok(Some(payload)),
            Some((owner, _)) => {
                debug!(key, owner = %owner, "file backend name collision");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn write(&self, key: &str, payload: Vec<u8>) -> Result<(), BackendError> {
        let path = self.entry_path(key);
        let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        let staging = path.with_extension(format!("{}-{seq}.tmp", process::id()));

        // Readers only ever see a complete file
        let bytes = join_entry(key, &payload);
        let staged = match fs::write(&staging, &bytes).await {
            Ok(()) => fs::rename(&staging, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = staged {
            let _ = fs::remove_file(&staging).await;
            return Err(e.into());
        }

        debug!(key, bytes = payload.len(), "file backend write");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        let path = self.entry_path(key);
        match self.read_entry(&path).await {
            Ok(None) => return Ok(()),
            Ok(Some((owner, _))) if owner != key => return Ok(()),
            // Unreadable entries still belong to whoever maps here
            Ok(Some(_)) | Err(BackendError::Malformed { .. }) => {}
            Err(e) => return Err(e),
        }

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// == Volatile Backend ==
/// Backend that keeps payloads in process memory.
///
/// Same contract as [`FileBackend`] without touching the disk; data is lost
/// when the process exits.
#[derive(Debug, Default)]
pub struct VolatileBackend {
    payloads: RwLock<HashMap<String, Vec<u8>>>,
}

impl VolatileBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw physical keys currently stored.
    pub async fn keys(&self) -> Vec<String> {
        self.payloads.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl StorageBackend for VolatileBackend {
    fn name(&self) -> &'static str {
        "volatile"
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        Ok(self.payloads.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, payload: Vec<u8>) -> Result<(), BackendError> {
        self.payloads.write().await.insert(key.to_string(), payload);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        self.payloads.write().await.remove(key);
        Ok(())
    }
}
