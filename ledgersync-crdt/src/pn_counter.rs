//! Positive-Negative Counter.
//!
//! Used for payload fields that accumulate (e.g. a running count of posted
//! entries) where concurrent edits must add up instead of overwriting each
//! other. Each device tracks its own increments and decrements; merge takes
//! the per-device maximum, so re-merging the same state never double counts.
//!
//! Wire form: `{"p": {device: n, ...}, "n": {device: n, ...}}`.

use ledgersync_types::DeviceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A Positive-Negative Counter.
///
/// The value is the sum of all increments minus the sum of all decrements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnCounter {
    #[serde(rename = "p", default)]
    positive: BTreeMap<DeviceId, u64>,
    #[serde(rename = "n", default)]
    negative: BTreeMap<DeviceId, u64>,
}

impl PnCounter {
    /// Creates a new counter with value 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the counter by `amount` on behalf of `device`.
    pub fn increment(&mut self, device: &DeviceId, amount: u64) {
        let entry = self.positive.entry(device.clone()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Decrements the counter by `amount` on behalf of `device`.
    pub fn decrement(&mut self, device: &DeviceId, amount: u64) {
        let entry = self.negative.entry(device.clone()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Returns the current value (may be negative).
    #[must_use]
    pub fn value(&self) -> i64 {
        let pos: u64 = self.positive.values().sum();
        let neg: u64 = self.negative.values().sum();
        pos as i64 - neg as i64
    }

    /// Merges another counter into this one (per-device max).
    pub fn merge(&mut self, other: &Self) {
        for (device, &count) in &other.positive {
            let entry = self.positive.entry(device.clone()).or_insert(0);
            *entry = (*entry).max(count);
        }
        for (device, &count) in &other.negative {
            let entry = self.negative.entry(device.clone()).or_insert(0);
            *entry = (*entry).max(count);
        }
    }

    /// Returns a new counter that is the merge of this and another.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.merge(other);
        result
    }
}
