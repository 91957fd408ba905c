//! Version vectors for per-entity causality tracking.
//!
//! Every replicated record owns one vector mapping device id to the number
//! of mutations that device has made to the record. Comparing two vectors
//! tells whether one snapshot has seen everything the other has (it
//! dominates) or whether both were edited without seeing each other
//! (concurrent).
//!
//! Counters never decrease and entries are never removed. A device missing
//! from a vector is treated as counter 0.

use ledgersync_types::{DeviceId, Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Causal relationship of `self` to `other` in [`VersionVector::compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CausalOrder {
    /// Every entry matches.
    Equal,
    /// `self >= other` everywhere and strictly greater somewhere.
    Dominates,
    /// `other >= self` everywhere and strictly greater somewhere.
    DominatedBy,
    /// Neither contains the other.
    Concurrent,
}

impl CausalOrder {
    /// The same relationship seen from the other side.
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            Self::Dominates => Self::DominatedBy,
            Self::DominatedBy => Self::Dominates,
            other => other,
        }
    }
}

/// A version vector: device id → mutation counter.
///
/// Keys are kept sorted so the serialized form is canonical.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct VersionVector {
    counters: BTreeMap<DeviceId, u64>,
}

impl VersionVector {
    /// Creates an empty vector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The vector of a freshly created record: `{device: 1}`.
    #[must_use]
    pub fn created_by(device: &DeviceId) -> Self {
        let mut counters = BTreeMap::new();
        counters.insert(device.clone(), 1);
        Self { counters }
    }

    /// Builds a vector from explicit entries; later duplicates keep the max.
    pub fn from_entries<I, D>(entries: I) -> Self
    where
        I: IntoIterator<Item = (D, u64)>,
        D: Into<DeviceId>,
    {
        let mut vector = Self::new();
        for (device, counter) in entries {
            vector.observe(device.into(), counter);
        }
        vector
    }

    /// Parses a vector from its wire form, a JSON object of device → counter.
    ///
    /// Negative, fractional or non-numeric counters and empty device keys are
    /// rejected rather than guessed at.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            Error::MalformedVersionVector(format!("expected an object, got {value}"))
        })?;

        let mut counters = BTreeMap::new();
        for (device, counter) in object {
            if device.is_empty() {
                return Err(Error::MalformedVersionVector("empty device id".to_string()));
            }
            let counter = counter.as_u64().ok_or_else(|| {
                Error::MalformedVersionVector(format!(
                    "counter for device {device} is not a non-negative integer: {counter}"
                ))
            })?;
            counters.insert(DeviceId::new(device.as_str()), counter);
        }
        Ok(Self { counters })
    }

    /// Returns the counter for a device (0 if absent).
    #[must_use]
    pub fn get(&self, device: &DeviceId) -> u64 {
        self.counters.get(device).copied().unwrap_or(0)
    }

    /// Iterates devices and counters in device order.
    pub fn entries(&self) -> impl Iterator<Item = (&DeviceId, u64)> {
        self.counters.iter().map(|(d, c)| (d, *c))
    }

    /// Number of devices with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Returns true if no device has an entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Records one more mutation by `device` and returns its new counter.
    pub fn increment(&mut self, device: &DeviceId) -> u64 {
        let entry = self.counters.entry(device.clone()).or_insert(0);
        *entry = entry.saturating_add(1);
        *entry
    }

    /// Copy-on-write form of [`increment`](Self::increment).
    #[must_use]
    pub fn incremented(&self, device: &DeviceId) -> Self {
        let mut next = self.clone();
        next.increment(device);
        next
    }

    /// Raises a device's counter to `counter` if it is behind.
    pub fn observe(&mut self, device: DeviceId, counter: u64) {
        let entry = self.counters.entry(device).or_insert(0);
        if counter > *entry {
            *entry = counter;
        }
    }

    /// Merges another vector into this one: entrywise maximum over the union
    /// of devices.
    pub fn merge(&mut self, other: &Self) {
        for (device, &counter) in &other.counters {
            self.observe(device.clone(), counter);
        }
    }

    /// Creates a new vector that is the merge of this and another.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.merge(other);
        result
    }

    /// Compares this vector with another.
    #[must_use]
    pub fn compare(&self, other: &Self) -> CausalOrder {
        let mut self_ahead = false;
        let mut other_ahead = false;

        let devices = self.counters.keys().chain(other.counters.keys());
        for device in devices {
            let mine = self.get(device);
            let theirs = other.get(device);
            if mine > theirs {
                self_ahead = true;
            } else if theirs > mine {
                other_ahead = true;
            }
            if self_ahead && other_ahead {
                return CausalOrder::Concurrent;
            }
        }

        match (self_ahead, other_ahead) {
            (false, false) => CausalOrder::Equal,
            (true, false) => CausalOrder::Dominates,
            (false, true) => CausalOrder::DominatedBy,
            (true, true) => CausalOrder::Concurrent,
        }
    }

    /// Returns true if this vector has seen everything `other` has.
    #[must_use]
    pub fn descends_from(&self, other: &Self) -> bool {
        matches!(self.compare(other), CausalOrder::Dominates | CausalOrder::Equal)
    }

    /// Returns true if neither vector contains the other.
    #[must_use]
    pub fn is_concurrent(&self, other: &Self) -> bool {
        self.compare(other) == CausalOrder::Concurrent
    }
}

impl PartialEq for VersionVector {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == CausalOrder::Equal
    }
}

impl Eq for VersionVector {}

impl<'de> Deserialize<'de> for VersionVector {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&raw).map_err(serde::de::Error::custom)
    }
}
