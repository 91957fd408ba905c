//! Replicated record model for LedgerSync.
//!
//! Defines the types every replicated ledger record flows through:
//! - [`Record`] — causal control fields (id, version vector, timestamps) around an opaque payload
//! - [`tombstone`] — soft delete / restore as ordinary version-vector-incrementing mutations
//! - [`MergeStrategy`] — how the payloads of two concurrent snapshots are combined
//! - [`EntitySchema`] — per entity type field rules for JSON payloads (counters, unions, ...)
//!
//! These types are consumed by the sync layer and by the storage collaborator,
//! which persists records in exactly this shape.

mod record;
mod schema;
mod strategy;
pub mod tombstone;

pub use record::Record;
pub use schema::{EntitySchema, FieldMergeRule, FieldRule, SchemaMerge, SchemaRegistry};
pub use strategy::{FieldChoice, FieldSource, MergeStrategy, MergedPayload, Side, WholeRecord};
pub use tombstone::{DeletePolicy, Restore};
