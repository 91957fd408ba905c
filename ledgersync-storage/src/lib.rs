//! Storage boundary for LedgerSync.
//!
//! The conflict-resolution core never talks to a database directly. It
//! consumes the [`EntityStore`] trait, which the embedding application
//! implements on top of its durable key-value/document store.
//!
//! # Contract
//!
//! - Records are keyed by `(entity_type, id)` and persisted in the shape of
//!   [`ledgersync_model::Record`].
//! - [`EntityStore::update`] is the per-entity scoped transaction: the read,
//!   the merge computed by the caller and the write happen while the entity's
//!   write lock is held, and the lock is released on every exit path.
//!   Different entities may be updated concurrently.
//!
//! [`MemoryStore`] is an in-process implementation used by tests and by
//! devices that keep their working set in memory.

mod error;
mod memory;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;

use ledgersync_model::Record;
use ledgersync_types::EntityId;

/// A unit of work run inside [`EntityStore::update`].
///
/// Receives the current snapshot (if any) and returns the record to write,
/// or `None` to leave storage untouched.
pub type UpdateUnit<'a, T> = dyn FnMut(Option<&Record<T>>) -> Option<Record<T>> + 'a;

/// Durable storage of replicated records.
pub trait EntityStore<T>: Send + Sync {
    /// Reads one record, tombstones included.
    fn get(&self, entity_type: &str, id: &EntityId) -> StorageResult<Option<Record<T>>>;

    /// Writes one record, replacing any previous snapshot.
    fn put(&self, entity_type: &str, record: &Record<T>) -> StorageResult<()>;

    /// Lists the records of a type, hiding tombstones unless asked for.
    fn list(&self, entity_type: &str, include_deleted: bool) -> StorageResult<Vec<Record<T>>>;

    /// Runs a read-modify-write unit atomically for one entity.
    ///
    /// Returns the record written, if the unit produced one.
    fn update(
        &self,
        entity_type: &str,
        id: &EntityId,
        unit: &mut UpdateUnit<'_, T>,
    ) -> StorageResult<Option<Record<T>>>;
}
