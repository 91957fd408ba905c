//! The replicated record envelope.

use ledgersync_crdt::{Stamp, VersionVector};
use ledgersync_types::{DeviceId, EntityId, Error, Result, Timestamp};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A replicated record.
///
/// The four causal control fields (`id`, `version_vector`, `updated_at`,
/// `deleted_at`) are what the storage collaborator must persist for every
/// record. `updated_by` names the device of the last mutation and breaks
/// LWW ties. `payload` is the domain data (an account, a transaction, a
/// contact...) and is opaque to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: EntityId,
    pub version_vector: VersionVector,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub deleted_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_by: DeviceId,
    pub payload: T,
}

impl<T> Record<T> {
    /// Creates a record on `device` at `at`; its vector starts at `{device: 1}`.
    pub fn create(id: impl Into<EntityId>, payload: T, device: &DeviceId, at: Timestamp) -> Self {
        Self {
            id: id.into(),
            version_vector: VersionVector::created_by(device),
            updated_at: at,
            deleted_at: None,
            updated_by: device.clone(),
            payload,
        }
    }

    /// Creates a record on `device` stamped with the current time.
    pub fn create_now(id: impl Into<EntityId>, payload: T, device: &DeviceId) -> Self {
        Self::create(id, payload, device, Timestamp::now())
    }

    /// The LWW ordering key of this snapshot.
    #[must_use]
    pub fn stamp(&self) -> Stamp {
        Stamp::new(self.updated_at, self.updated_by.clone())
    }

    /// Returns true unless the record is a tombstone.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Marks a local mutation by `device` at `at`: bumps the device's counter
    /// and restamps the record. Every local write goes through here.
    pub fn touch(&mut self, device: &DeviceId, at: Timestamp) {
        self.version_vector.increment(device);
        self.updated_at = self.updated_at.max(at);
        self.updated_by = device.clone();
    }
}

impl<T: Clone> Record<T> {
    /// Returns a copy edited by `device` at `at`.
    #[must_use]
    pub fn edit_at(&self, device: &DeviceId, at: Timestamp, edit: impl FnOnce(&mut T)) -> Self {
        let mut next = self.clone();
        edit(&mut next.payload);
        next.touch(device, at);
        next
    }

    /// Returns a copy edited by `device`, stamped with the current time (never
    /// earlier than the previous stamp).
    #[must_use]
    pub fn edit(&self, device: &DeviceId, edit: impl FnOnce(&mut T)) -> Self {
        self.edit_at(device, Timestamp::now_after(self.updated_at), edit)
    }
}

impl<T: DeserializeOwned> Record<T> {
    /// Decodes a record from its wire form.
    ///
    /// The version vector is checked first so a bad counter is reported as
    /// [`Error::MalformedVersionVector`] rather than a generic decode error.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value.get("version_vector") {
            Some(vector) => {
                VersionVector::from_json(vector)?;
            }
            None => {
                return Err(Error::MalformedVersionVector(
                    "missing version_vector".to_string(),
                ));
            }
        }
        Ok(serde_json::from_value(value.clone())?)
    }
}
