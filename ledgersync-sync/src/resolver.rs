//! Deterministic merge of two concurrent snapshots.
//!
//! Every device must reach the same result for the same pair, whatever the
//! argument order, so nothing here may depend on which side is local:
//!
//! 1. The version vectors are merged (entrywise max).
//! 2. A whole-record winner is picked by [`Stamp`] (`updated_at`, then
//!    `updated_by`). Identical stamps fall back to comparing the canonical
//!    JSON of `(deleted_at, payload)`.
//! 3. The entity type's [`MergeStrategy`] combines the payloads; fields
//!    without a rule keep the winner's value.
//! 4. `deleted_at` is settled by the configured [`DeletePolicy`].
//! 5. The result carries `updated_at = max` and the winner's `updated_by`.

use crate::comparator::ensure_same_id;
use ledgersync_crdt::{Stamp, VersionVector};
use ledgersync_model::{DeletePolicy, FieldChoice, MergeStrategy, Record, Side, WholeRecord};
use ledgersync_types::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// Audit description of one resolved conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Side whose snapshot won whole-record LWW.
    pub winner: Side,
    /// Fields handled by a registered field rule, with their source.
    pub fields: Vec<FieldChoice>,
    /// Whether the merged record is a tombstone.
    pub deleted: bool,
}

/// Output of [`ConflictResolver::resolve_conflict`].
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub record: Record<T>,
    pub resolution: Resolution,
}

impl<T> Resolved<T> {
    /// The merged version vector.
    pub fn merged_vector(&self) -> &VersionVector {
        &self.record.version_vector
    }
}

/// Resolves concurrent snapshots of one entity type.
pub struct ConflictResolver<T> {
    strategy: Arc<dyn MergeStrategy<T>>,
    delete_policy: DeletePolicy,
}

impl<T: Clone + Serialize + 'static> ConflictResolver<T> {
    /// A resolver using whole-record LWW for every field.
    pub fn whole_record() -> Self {
        Self::new(Arc::new(WholeRecord), DeletePolicy::Lww)
    }
}

impl<T: Clone + Serialize> ConflictResolver<T> {
    pub fn new(strategy: Arc<dyn MergeStrategy<T>>, delete_policy: DeletePolicy) -> Self {
        Self {
            strategy,
            delete_policy,
        }
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    /// Merges two snapshots of the same entity.
    ///
    /// Intended for concurrent pairs, but total: any pair with equal ids
    /// yields a deterministic result.
    pub fn resolve_conflict(&self, local: &Record<T>, remote: &Record<T>) -> Result<Resolved<T>> {
        ensure_same_id(local, remote)?;

        let merged_vector = local.version_vector.merged(&remote.version_vector);
        let winner_side = pick_winner(local, remote)?;
        let (winner, loser) = match winner_side {
            Side::Local => (local, remote),
            Side::Remote => (remote, local),
        };

        let merged = self
            .strategy
            .merge_payload(&winner.payload, &loser.payload, winner_side);
        let deleted_at = self.delete_policy.settle(winner.deleted_at, loser.deleted_at);

        let record = Record {
            id: winner.id.clone(),
            version_vector: merged_vector,
            updated_at: local.updated_at.max(remote.updated_at),
            deleted_at,
            updated_by: winner.updated_by.clone(),
            payload: merged.payload,
        };

        Ok(Resolved {
            record,
            resolution: Resolution {
                winner: winner_side,
                fields: merged.fields,
                deleted: deleted_at.is_some(),
            },
        })
    }
}

/// Whole-record LWW winner of a pair.
fn pick_winner<T: Serialize>(local: &Record<T>, remote: &Record<T>) -> Result<Side> {
    let local_stamp: Stamp = local.stamp();
    let remote_stamp: Stamp = remote.stamp();
    let order = match local_stamp.cmp(&remote_stamp) {
        Ordering::Equal => canonical(local)?.cmp(&canonical(remote)?),
        other => other,
    };
    // On a full tie both snapshots are the same content, so either side will do.
    Ok(if order == Ordering::Greater {
        Side::Local
    } else {
        Side::Remote
    })
}

fn canonical<T: Serialize>(record: &Record<T>) -> Result<String> {
    Ok(serde_json::to_string(&(record.deleted_at, &record.payload))?)
}
