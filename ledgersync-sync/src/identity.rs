//! Device identity.
//!
//! Each installation has one stable [`DeviceId`], generated on first use and
//! persisted in a [`DeviceIdSlot`]. Core calls never read it from ambient
//! state; the composition root loads it once (see [`device_id`]) and passes
//! it explicitly to the analyzer and tombstone operations.

use crate::error::{SyncError, SyncResult};
use ledgersync_types::DeviceId;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};
use tracing::info;

/// A durable slot holding a single string value: the device id.
pub trait DeviceIdSlot: Send + Sync {
    /// Reads the stored value, if any.
    fn load(&self) -> SyncResult<Option<String>>;

    /// Stores a value, replacing any previous one.
    fn store(&self, value: &str) -> SyncResult<()>;
}

/// A slot backed by a file on disk.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl DeviceIdSlot for FileSlot {
    fn load(&self) -> SyncResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SyncError::Identity(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    /// Writes to a sibling temp file, syncs it, then renames it over the
    /// slot so a crash never leaves a truncated id behind.
    fn store(&self, value: &str) -> SyncResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = self.temp_path();
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
            fs::rename(&temp_path, &self.path)
        };
        write().map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            SyncError::Identity(format!("failed to write {}: {e}", self.path.display()))
        })
    }
}

/// A slot kept in memory; lost when the process exits.
#[derive(Debug, Default)]
pub struct MemorySlot {
    value: Mutex<Option<String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceIdSlot for MemorySlot {
    fn load(&self) -> SyncResult<Option<String>> {
        let value = self
            .value
            .lock()
            .map_err(|_| SyncError::Identity("slot lock poisoned".to_string()))?;
        Ok(value.clone())
    }

    fn store(&self, value: &str) -> SyncResult<()> {
        let mut slot = self
            .value
            .lock()
            .map_err(|_| SyncError::Identity("slot lock poisoned".to_string()))?;
        *slot = Some(value.to_string());
        Ok(())
    }
}

/// Loads the device id from `slot`, generating and storing one if the slot
/// is empty or blank.
pub fn load_or_create(slot: &dyn DeviceIdSlot) -> SyncResult<DeviceId> {
    if let Some(stored) = slot.load()? {
        if let Ok(id) = DeviceId::from_str(&stored) {
            return Ok(id);
        }
    }
    let id = DeviceId::generate();
    slot.store(id.as_str())?;
    info!("Generated new device id {id}");
    Ok(id)
}

static DEVICE_ID: OnceLock<DeviceId> = OnceLock::new();
static DEVICE_ID_INIT: Mutex<()> = Mutex::new(());

/// Process-wide device id, loaded from `slot` on first call and cached.
///
/// Only the composition root should call this. Later calls ignore `slot`.
pub fn device_id(slot: &dyn DeviceIdSlot) -> SyncResult<DeviceId> {
    match DEVICE_ID.get() {
        Some(id) => Ok(id.clone()),
        None => init_device_id(slot),
    }
}

/// Loads the device id into the process-wide cache, typically at startup.
///
/// Concurrent callers block until the first one has loaded the slot; the
/// cache is never overwritten.
pub fn init_device_id(slot: &dyn DeviceIdSlot) -> SyncResult<DeviceId> {
    let _guard = DEVICE_ID_INIT
        .lock()
        .map_err(|_| SyncError::Identity("device id init lock poisoned".to_string()))?;
    if let Some(id) = DEVICE_ID.get() {
        return Ok(id.clone());
    }
    let id = load_or_create(slot)?;
    let _ = DEVICE_ID.set(id.clone());
    Ok(id)
}

/// The cached device id, if [`device_id`] has run.
pub fn cached_device_id() -> Option<DeviceId> {
    DEVICE_ID.get().cloned()
}
