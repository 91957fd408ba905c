//! Remote batches as received from transport.

use crate::error::{SyncError, SyncResult};
use ledgersync_model::Record;
use ledgersync_types::EntityId;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// One entry of a remote batch.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEntry<T> {
    /// A well-formed snapshot.
    Valid(Record<T>),
    /// An entry that failed to decode. It is reported and skipped; the rest
    /// of the batch still applies.
    Rejected {
        id: Option<EntityId>,
        error: String,
    },
}

impl<T> RemoteEntry<T> {
    /// The entity id, if known.
    pub fn id(&self) -> Option<&EntityId> {
        match self {
            Self::Valid(record) => Some(&record.id),
            Self::Rejected { id, .. } => id.as_ref(),
        }
    }
}

/// An ordered batch of remote snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteBatch<T> {
    entries: Vec<RemoteEntry<T>>,
}

impl<T> Default for RemoteBatch<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> RemoteBatch<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A batch of already-decoded records.
    pub fn from_records(records: impl IntoIterator<Item = Record<T>>) -> Self {
        Self {
            entries: records.into_iter().map(RemoteEntry::Valid).collect(),
        }
    }

    pub fn push(&mut self, record: Record<T>) {
        self.entries.push(RemoteEntry::Valid(record));
    }

    /// Appends an entry that could not be decoded.
    pub fn reject(&mut self, id: Option<EntityId>, error: impl Into<String>) {
        self.entries.push(RemoteEntry::Rejected {
            id,
            error: error.into(),
        });
    }

    pub fn entries(&self) -> &[RemoteEntry<T>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: DeserializeOwned> RemoteBatch<T> {
    /// Decodes a wire batch (a JSON array of records) entry by entry.
    ///
    /// Only a batch that is not a JSON array fails as a whole. Entries with a
    /// malformed version vector or missing fields become
    /// [`RemoteEntry::Rejected`].
    pub fn from_json(json: &str) -> SyncResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        let Value::Array(items) = value else {
            return Err(SyncError::InvalidBatch(
                "remote batch must be a JSON array".to_string(),
            ));
        };

        let mut batch = Self::new();
        for item in &items {
            match Record::from_json(item) {
                Ok(record) => batch.push(record),
                Err(e) => {
                    let id = item.get("id").and_then(Value::as_str).map(EntityId::from);
                    warn!("Rejected remote entry {id:?}: {e}");
                    batch.reject(id, e.to_string());
                }
            }
        }
        Ok(batch)
    }
}
