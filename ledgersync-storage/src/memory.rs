//! In-process [`EntityStore`] backed by hash maps.

use crate::{EntityStore, StorageError, StorageResult, UpdateUnit};
use ledgersync_model::Record;
use ledgersync_types::EntityId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

type Key = (String, EntityId);

/// In-memory [`EntityStore`].
///
/// Holds one mutex per entity so `update` serializes read-merge-write on the
/// same entity while leaving other entities free.
pub struct MemoryStore<T> {
    records: RwLock<HashMap<Key, Record<T>>>,
    locks: Mutex<HashMap<Key, Arc<Mutex<()>>>>,
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> MemoryStore<T> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across all types, tombstones included.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entity_lock(&self, key: &Key) -> StorageResult<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(locks.entry(key.clone()).or_default().clone())
    }

    /// Drops the entity's mutex from the map once nobody else holds it.
    fn release_entity_lock(&self, key: &Key, lock: Arc<Mutex<()>>) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        // One reference in the map, one in `lock`.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
    }

    /// Number of entities with a live update lock.
    pub fn locked_entities(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }
}

impl<T: Clone + Send + Sync> EntityStore<T> for MemoryStore<T> {
    fn get(&self, entity_type: &str, id: &EntityId) -> StorageResult<Option<Record<T>>> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.get(&(entity_type.to_string(), id.clone())).cloned())
    }

    fn put(&self, entity_type: &str, record: &Record<T>) -> StorageResult<()> {
        let mut records = self.records.write().map_err(|_| StorageError::LockPoisoned)?;
        records.insert((entity_type.to_string(), record.id.clone()), record.clone());
        Ok(())
    }

    fn list(&self, entity_type: &str, include_deleted: bool) -> StorageResult<Vec<Record<T>>> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut out: Vec<_> = records
            .iter()
            .filter(|((ty, _), r)| ty == entity_type && (include_deleted || r.is_active()))
            .map(|(_, r)| r.clone())
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    fn update(
        &self,
        entity_type: &str,
        id: &EntityId,
        unit: &mut UpdateUnit<'_, T>,
    ) -> StorageResult<Option<Record<T>>> {
        let key = (entity_type.to_string(), id.clone());
        let lock = self.entity_lock(&key)?;
        let result = match lock.lock() {
            Ok(_guard) => self.update_locked(entity_type, id, unit),
            Err(_) => Err(StorageError::LockPoisoned),
        };
        self.release_entity_lock(&key, lock);
        result
    }
}

impl<T: Clone + Send + Sync> MemoryStore<T> {
    fn update_locked(
        &self,
        entity_type: &str,
        id: &EntityId,
        unit: &mut UpdateUnit<'_, T>,
    ) -> StorageResult<Option<Record<T>>> {
        let current = self.get(entity_type, id)?;
        let Some(next) = unit(current.as_ref()) else {
            return Ok(None);
        };
        if next.id != *id {
            return Err(StorageError::InvalidData(format!(
                "update of {id} tried to write {}",
                next.id
            )));
        }
        self.put(entity_type, &next)?;
        debug!("Wrote {entity_type}/{id}");
        Ok(Some(next))
    }
}
