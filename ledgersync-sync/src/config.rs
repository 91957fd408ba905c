use crate::error::{SyncError, SyncResult};
use ledgersync_model::DeletePolicy;
use serde::{Deserialize, Serialize};

/// Default cap on entries processed from one remote batch.
pub const MAX_BATCH_SIZE: usize = 100;

/// Configuration for the sync analyzer.
///
/// All devices syncing the same dataset must agree on `delete_policy`,
/// otherwise they resolve tombstones differently and never converge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Device name recorded in resolution reports.
    pub device_name: String,
    /// Maximum entries processed per batch; the rest are reported skipped.
    pub max_batch_size: usize,
    /// How `deleted_at` is settled between concurrent snapshots.
    pub delete_policy: DeletePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            device_name: "LedgerSync Device".to_string(),
            max_batch_size: MAX_BATCH_SIZE,
            delete_policy: DeletePolicy::Lww,
        }
    }
}

impl SyncConfig {
    /// Parses a config from JSON; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> SyncResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        if config.max_batch_size == 0 {
            return Err(SyncError::Config("max_batch_size must be at least 1".to_string()));
        }
        Ok(config)
    }
}
