//! Payload merge strategies.
//!
//! The resolver picks the whole-record winner; a [`MergeStrategy`] then
//! decides what the merged payload looks like.

use serde::{Deserialize, Serialize};

/// Which replica a snapshot came from during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Local,
    Remote,
}

impl Side {
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Local => Self::Remote,
            Self::Remote => Self::Local,
        }
    }
}

/// Where a merged field's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    Local,
    Remote,
    /// Combined from both sides by a field rule (counter, union).
    Both,
}

impl From<Side> for FieldSource {
    fn from(side: Side) -> Self {
        match side {
            Side::Local => Self::Local,
            Side::Remote => Self::Remote,
        }
    }
}

/// Audit note for one field touched by a field-level merge rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChoice {
    pub field: String,
    pub source: FieldSource,
}

/// The payload produced by a [`MergeStrategy`] plus per-field audit notes.
///
/// `fields` only lists fields handled by a registered rule; everything else
/// came from the whole-record winner.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedPayload<T> {
    pub payload: T,
    pub fields: Vec<FieldChoice>,
}

/// Combines the payloads of two concurrent snapshots of one entity type.
///
/// `winner` is the whole-record last-writer-wins winner, already chosen by the
/// resolver; `winner_side` says which replica it came from. The result must
/// depend only on the two payloads and which one won, never on which one is
/// local, or replicas stop converging. Implementations must be commutative
/// and idempotent.
///
/// Most entity types do NOT need a custom strategy. [`WholeRecord`] keeps
/// the winner's payload verbatim.
pub trait MergeStrategy<T>: Send + Sync {
    fn merge_payload(&self, winner: &T, loser: &T, winner_side: Side) -> MergedPayload<T>;
}

/// Whole-record last-writer-wins: the winner's payload replaces the loser's.
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeRecord;

impl<T: Clone> MergeStrategy<T> for WholeRecord {
    fn merge_payload(&self, winner: &T, _loser: &T, _winner_side: Side) -> MergedPayload<T> {
        MergedPayload {
            payload: winner.clone(),
            fields: Vec::new(),
        }
    }
}
