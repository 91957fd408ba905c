//! Soft delete and restore.
//!
//! A tombstone is a record with `deleted_at` set. It keeps its id, payload
//! and version vector so it can be reconciled with concurrent edits or
//! restored later. Both transitions are ordinary mutations: they bump the
//! acting device's counter, so a stale delete from another replica can never
//! override a restore it has not seen.
//!
//! Deletion is not special-cased when comparing causality. Queries hide
//! tombstones by default ([`active_only`]).

use crate::Record;
use ledgersync_types::{DeviceId, Error, Result, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How `deleted_at` is settled when a tombstone meets a concurrent snapshot.
///
/// Every device taking part in sync must use the same policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// `deleted_at` follows the whole-record LWW winner like any other field.
    #[default]
    Lww,
    /// A concurrent delete always sticks; the latest delete time is kept.
    DeleteWins,
    /// A concurrent edit always revives the record.
    EditWins,
}

impl DeletePolicy {
    /// Settles `deleted_at` given the winning and losing snapshots' markers.
    #[must_use]
    pub fn settle(self, winner: Option<Timestamp>, loser: Option<Timestamp>) -> Option<Timestamp> {
        match self {
            Self::Lww => winner,
            Self::DeleteWins => match (winner, loser) {
                (Some(w), Some(l)) => Some(w.max(l)),
                (Some(t), None) | (None, Some(t)) => Some(t),
                (None, None) => None,
            },
            Self::EditWins => match (winner, loser) {
                (Some(w), Some(_)) => Some(w),
                _ => None,
            },
        }
    }
}

/// Outcome of [`restore_from_tombstone`].
#[derive(Debug, Clone, PartialEq)]
pub enum Restore<T> {
    /// The tombstone was cleared and the restore recorded as a mutation.
    Restored(Record<T>),
    /// The record was already active; returned unchanged.
    AlreadyActive(Record<T>),
}

impl<T> Restore<T> {
    /// The resulting record, whether or not anything changed.
    pub fn into_record(self) -> Record<T> {
        match self {
            Self::Restored(record) | Self::AlreadyActive(record) => record,
        }
    }

    /// Returns true if the call was a no-op.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::AlreadyActive(_))
    }

    /// Treats restoring an active record as a hard failure.
    pub fn strict(self) -> Result<Record<T>> {
        match self {
            Self::Restored(record) => Ok(record),
            Self::AlreadyActive(record) => Err(Error::RestoreOfActiveEntity(record.id)),
        }
    }
}

/// Returns true unless the record is a tombstone.
#[must_use]
pub fn is_active<T>(record: &Record<T>) -> bool {
    record.is_active()
}

/// Soft-deletes a record on `device` at time `at`.
///
/// The payload is left untouched so a later restore recovers it. Deleting a
/// tombstone again is still a mutation and restamps it.
#[must_use]
pub fn create_tombstone_at<T: Clone>(record: &Record<T>, device: &DeviceId, at: Timestamp) -> Record<T> {
    let mut next = record.clone();
    next.touch(device, at);
    next.deleted_at = Some(next.updated_at);
    next
}

/// Soft-deletes a record on `device` now.
#[must_use]
pub fn create_tombstone<T: Clone>(record: &Record<T>, device: &DeviceId) -> Record<T> {
    create_tombstone_at(record, device, Timestamp::now_after(record.updated_at))
}

/// Restores a tombstone on `device` at time `at`.
pub fn restore_from_tombstone_at<T: Clone>(
    record: &Record<T>,
    device: &DeviceId,
    at: Timestamp,
) -> Restore<T> {
    if record.is_active() {
        warn!("Restore requested for active entity {}, ignoring", record.id);
        return Restore::AlreadyActive(record.clone());
    }
    let mut next = record.clone();
    next.touch(device, at);
    next.deleted_at = None;
    Restore::Restored(next)
}

/// Restores a tombstone on `device` now.
pub fn restore_from_tombstone<T: Clone>(record: &Record<T>, device: &DeviceId) -> Restore<T> {
    restore_from_tombstone_at(record, device, Timestamp::now_after(record.updated_at))
}

/// Filters tombstones out of a query result.
pub fn active_only<'a, T: 'a>(
    records: impl IntoIterator<Item = &'a Record<T>>,
) -> impl Iterator<Item = &'a Record<T>> {
    records.into_iter().filter(|r| r.is_active())
}
