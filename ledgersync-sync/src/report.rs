//! Per-pass audit report.
//!
//! The report is handed to the audit collaborator as JSON; the core does not
//! persist it.

use crate::comparator::Causality;
use crate::resolver::Resolution;
use ledgersync_types::{DeviceId, EntityId, Timestamp};
use serde::{Deserialize, Serialize};

/// What a sync pass did with one remote entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Entity was unknown locally; remote stored as-is.
    Insert,
    /// Nothing to write (identical, or local already newer).
    NoOp,
    /// Remote causally newer; replaced local verbatim.
    FastForward,
    /// Concurrent edits merged by the resolver.
    ConflictResolved,
    /// Entry rejected or its unit failed; see `error`.
    Failed,
    /// Not processed (batch cap or cancellation).
    Skipped,
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// `None` when a malformed entry had no readable id.
    pub entity_id: Option<EntityId>,
    pub classification: Classification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causality: Option<Causality>,
    pub recorded_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReportEntry {
    pub(crate) fn classified(
        entity_id: EntityId,
        classification: Classification,
        causality: Option<Causality>,
        resolution: Option<Resolution>,
    ) -> Self {
        Self {
            entity_id: Some(entity_id),
            classification,
            causality,
            recorded_at: Timestamp::now(),
            resolution,
            error: None,
        }
    }

    pub(crate) fn failed(entity_id: Option<EntityId>, error: impl Into<String>) -> Self {
        Self {
            entity_id,
            classification: Classification::Failed,
            causality: None,
            recorded_at: Timestamp::now(),
            resolution: None,
            error: Some(error.into()),
        }
    }

    pub(crate) fn skipped(entity_id: Option<EntityId>, reason: &str) -> Self {
        Self {
            entity_id,
            classification: Classification::Skipped,
            causality: None,
            recorded_at: Timestamp::now(),
            resolution: None,
            error: Some(reason.to_string()),
        }
    }
}

/// Audit report of one sync pass, one entry per remote batch entry in batch
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub device_id: DeviceId,
    pub device_name: String,
    pub entries: Vec<ReportEntry>,
}

impl ResolutionReport {
    pub fn new(device_id: DeviceId, device_name: impl Into<String>) -> Self {
        Self {
            device_id,
            device_name: device_name.into(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    /// Entries for one entity, in batch order.
    pub fn entries_for<'a>(&'a self, id: &'a EntityId) -> impl Iterator<Item = &'a ReportEntry> {
        self.entries
            .iter()
            .filter(move |e| e.entity_id.as_ref() == Some(id))
    }

    /// The last classification recorded for an entity.
    pub fn classification_of(&self, id: &EntityId) -> Option<Classification> {
        self.entries_for(id).last().map(|e| e.classification)
    }

    /// Counts per classification.
    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for entry in &self.entries {
            match entry.classification {
                Classification::Insert => summary.inserted += 1,
                Classification::NoOp => summary.no_op += 1,
                Classification::FastForward => summary.fast_forwarded += 1,
                Classification::ConflictResolved => summary.conflicts_resolved += 1,
                Classification::Failed => summary.failed += 1,
                Classification::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    /// Serializes the report for the audit collaborator.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Counts of a [`ResolutionReport`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub inserted: usize,
    pub no_op: usize,
    pub fast_forwarded: usize,
    pub conflicts_resolved: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ReportSummary {
    pub fn total(&self) -> usize {
        self.inserted
            + self.no_op
            + self.fast_forwarded
            + self.conflicts_resolved
            + self.failed
            + self.skipped
    }
}
