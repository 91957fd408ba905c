//! Last-writer-wins ordering.
//!
//! Concurrent snapshots of a record are ordered by the wall-clock time of
//! their last mutation. Equal times are broken by the writing device's id
//! (larger id wins), which is arbitrary but the same on every device.

use ledgersync_types::{DeviceId, Timestamp};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The LWW ordering key of a write: when it happened and who made it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stamp {
    pub at: Timestamp,
    pub by: DeviceId,
}

impl Stamp {
    #[must_use]
    pub fn new(at: Timestamp, by: DeviceId) -> Self {
        Self { at, by }
    }

    /// Returns true if a write stamped `self` beats one stamped `other`.
    #[must_use]
    pub fn wins_over(&self, other: &Self) -> bool {
        self > other
    }
}

impl PartialOrd for Stamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Stamp {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.at.cmp(&other.at) {
            // Tie-breaker: compare device ids (arbitrary but deterministic)
            Ordering::Equal => self.by.cmp(&other.by),
            other => other,
        }
    }
}
