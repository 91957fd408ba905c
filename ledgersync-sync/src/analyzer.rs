//! Batch-level sync analysis.
//!
//! For every entry of a remote batch the analyzer pairs the remote snapshot
//! with the local one by id, classifies the pair and decides what to write:
//!
//! - no local record → `Insert` (remote as-is)
//! - identical vectors → `NoOp`
//! - remote newer → `FastForward` (remote verbatim)
//! - local newer → `NoOp`
//! - concurrent → `ConflictResolved` through the [`ConflictResolver`]
//!
//! Entries are processed in batch order. A second entry for the same id is
//! folded against the result of the first. Per-entry failures are reported
//! and never abort the batch.

use crate::batch::{RemoteBatch, RemoteEntry};
use crate::comparator::{Causality, compare_records};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::report::{Classification, ReportEntry, ResolutionReport};
use crate::resolver::{ConflictResolver, Resolution};
use ledgersync_model::{MergeStrategy, Record, WholeRecord};
use ledgersync_storage::{EntityStore, StorageError};
use ledgersync_types::{DeviceId, EntityId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Cooperative cancellation flag for [`SyncAnalyzer::resolve_all_conflicts`].
///
/// Checked before each entity's unit starts; a started unit always completes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Result of [`SyncAnalyzer::analyze_sync_operation`].
#[derive(Debug, Clone)]
pub struct SyncPlan<T> {
    pub report: ResolutionReport,
    /// Final snapshot of every entity that needs writing, in order of first
    /// write.
    pub writes: Vec<Record<T>>,
}

/// An entity whose unit failed during [`SyncAnalyzer::resolve_all_conflicts`].
#[derive(Debug)]
pub struct EntityFailure {
    pub entity_id: EntityId,
    pub error: SyncError,
}

/// Result of [`SyncAnalyzer::resolve_all_conflicts`].
#[derive(Debug)]
pub struct SyncOutcome<T> {
    /// Records written to the store, in batch order.
    pub merged: Vec<Record<T>>,
    pub report: ResolutionReport,
    pub failures: Vec<EntityFailure>,
}

/// What to do with one remote snapshot given the current local one.
struct Step<T> {
    classification: Classification,
    causality: Option<Causality>,
    write: Option<Record<T>>,
    resolution: Option<Resolution>,
}

/// Classifies and merges remote batches for one entity type.
pub struct SyncAnalyzer<T> {
    device_id: DeviceId,
    config: SyncConfig,
    resolver: ConflictResolver<T>,
}

impl<T: Clone + Serialize + 'static> SyncAnalyzer<T> {
    /// An analyzer merging payloads by whole-record LWW.
    pub fn whole_record(device_id: DeviceId, config: SyncConfig) -> Self {
        Self::new(device_id, config, Arc::new(WholeRecord))
    }
}

impl<T: Clone + Serialize> SyncAnalyzer<T> {
    /// Creates an analyzer for the local device. The resolver uses the
    /// config's delete policy.
    pub fn new(device_id: DeviceId, config: SyncConfig, strategy: Arc<dyn MergeStrategy<T>>) -> Self {
        let resolver = ConflictResolver::new(strategy, config.delete_policy);
        Self {
            device_id,
            config,
            resolver,
        }
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn resolver(&self) -> &ConflictResolver<T> {
        &self.resolver
    }

    /// Plans a sync pass against an in-memory local set. Nothing is written.
    pub fn analyze_sync_operation(&self, local: &[Record<T>], remote: &RemoteBatch<T>) -> SyncPlan<T> {
        let mut working: HashMap<EntityId, Record<T>> =
            local.iter().map(|r| (r.id.clone(), r.clone())).collect();
        let mut write_order: Vec<EntityId> = Vec::new();
        let mut report = self.new_report();

        for (index, entry) in remote.entries().iter().enumerate() {
            if index >= self.config.max_batch_size {
                report.push(ReportEntry::skipped(entry.id().cloned(), "batch size limit reached"));
                continue;
            }
            let record = match entry {
                RemoteEntry::Valid(record) => record,
                RemoteEntry::Rejected { id, error } => {
                    report.push(ReportEntry::failed(id.clone(), error.clone()));
                    continue;
                }
            };

            match self.step(working.get(&record.id), record) {
                Ok(step) => {
                    if let Some(write) = &step.write {
                        if !write_order.contains(&write.id) {
                            write_order.push(write.id.clone());
                        }
                        working.insert(write.id.clone(), write.clone());
                    }
                    report.push(ReportEntry::classified(
                        record.id.clone(),
                        step.classification,
                        step.causality,
                        step.resolution,
                    ));
                }
                Err(e) => {
                    warn!("Failed to analyze entity {}: {e}", record.id);
                    report.push(ReportEntry::failed(Some(record.id.clone()), e.to_string()));
                }
            }
        }

        let writes = write_order
            .iter()
            .filter_map(|id| working.get(id).cloned())
            .collect();
        self.log_summary(&report);
        SyncPlan { report, writes }
    }

    /// Classifies a batch against the local set without merging anything.
    ///
    /// Concurrent pairs are reported as `ConflictResolved` with the
    /// resolution the resolver would pick.
    pub fn detect_conflicts(&self, local: &[Record<T>], remote: &RemoteBatch<T>) -> ResolutionReport {
        self.analyze_sync_operation(local, remote).report
    }

    /// Applies a batch to `store`, one scoped unit per entity.
    ///
    /// Each entity's read, compare, merge and write run inside
    /// [`EntityStore::update`] so no local write can interleave. Storage
    /// errors are collected in `failures` unchanged; the batch continues.
    pub fn resolve_all_conflicts(
        &self,
        store: &dyn EntityStore<T>,
        entity_type: &str,
        remote: &RemoteBatch<T>,
        cancel: &CancelToken,
    ) -> SyncResult<SyncOutcome<T>> {
        let mut report = self.new_report();
        let mut merged = Vec::new();
        let mut failures = Vec::new();
        let mut cancelled = false;

        for (index, entry) in remote.entries().iter().enumerate() {
            if !cancelled && cancel.is_cancelled() {
                warn!("Sync pass for {entity_type} cancelled after {index} entries");
                cancelled = true;
            }
            if cancelled {
                report.push(ReportEntry::skipped(entry.id().cloned(), "sync pass cancelled"));
                continue;
            }
            if index >= self.config.max_batch_size {
                report.push(ReportEntry::skipped(entry.id().cloned(), "batch size limit reached"));
                continue;
            }
            let record = match entry {
                RemoteEntry::Valid(record) => record,
                RemoteEntry::Rejected { id, error } => {
                    report.push(ReportEntry::failed(id.clone(), error.clone()));
                    continue;
                }
            };

            let mut outcome: Option<ledgersync_types::Result<Step<T>>> = None;
            let written = store.update(entity_type, &record.id, &mut |current: Option<&Record<T>>| {
                match self.step(current, record) {
                    Ok(mut step) => {
                        let write = step.write.take();
                        outcome = Some(Ok(step));
                        write
                    }
                    Err(e) => {
                        outcome = Some(Err(e));
                        None
                    }
                }
            });

            match (written, outcome) {
                (Ok(written), Some(Ok(step))) => {
                    merged.extend(written);
                    report.push(ReportEntry::classified(
                        record.id.clone(),
                        step.classification,
                        step.causality,
                        step.resolution,
                    ));
                }
                (Ok(_), Some(Err(e))) => {
                    warn!("Failed to resolve entity {}: {e}", record.id);
                    report.push(ReportEntry::failed(Some(record.id.clone()), e.to_string()));
                    failures.push(EntityFailure {
                        entity_id: record.id.clone(),
                        error: e.into(),
                    });
                }
                (Ok(_), None) => {
                    let error = SyncError::Storage(StorageError::Backend(format!(
                        "store did not run the update unit for {}",
                        record.id
                    )));
                    warn!("{error}");
                    report.push(ReportEntry::failed(Some(record.id.clone()), error.to_string()));
                    failures.push(EntityFailure {
                        entity_id: record.id.clone(),
                        error,
                    });
                }
                (Err(e), _) => {
                    warn!("Storage failed for entity {}: {e}", record.id);
                    report.push(ReportEntry::failed(Some(record.id.clone()), e.to_string()));
                    failures.push(EntityFailure {
                        entity_id: record.id.clone(),
                        error: e.into(),
                    });
                }
            }
        }

        self.log_summary(&report);
        Ok(SyncOutcome {
            merged,
            report,
            failures,
        })
    }

    fn new_report(&self) -> ResolutionReport {
        ResolutionReport::new(self.device_id.clone(), self.config.device_name.clone())
    }

    fn step(&self, local: Option<&Record<T>>, remote: &Record<T>) -> ledgersync_types::Result<Step<T>> {
        let Some(local) = local else {
            debug!("Entity {} unknown locally, inserting", remote.id);
            return Ok(Step {
                classification: Classification::Insert,
                causality: None,
                write: Some(remote.clone()),
                resolution: None,
            });
        };

        let causality = compare_records(local, remote)?;
        debug!("Entity {} classified as {causality:?}", remote.id);
        let step = match causality {
            Causality::Identical | Causality::LocalNewer => Step {
                classification: Classification::NoOp,
                causality: Some(causality),
                write: None,
                resolution: None,
            },
            Causality::RemoteNewer => Step {
                classification: Classification::FastForward,
                causality: Some(causality),
                write: Some(remote.clone()),
                resolution: None,
            },
            Causality::Concurrent => {
                let resolved = self.resolver.resolve_conflict(local, remote)?;
                Step {
                    classification: Classification::ConflictResolved,
                    causality: Some(causality),
                    write: Some(resolved.record),
                    resolution: Some(resolved.resolution),
                }
            }
        };
        Ok(step)
    }

    fn log_summary(&self, report: &ResolutionReport) {
        let s = report.summary();
        info!(
            "Sync pass on {}: {} inserted, {} fast-forwarded, {} resolved, {} unchanged, {} failed, {} skipped",
            self.device_id,
            s.inserted,
            s.fast_forwarded,
            s.conflicts_resolved,
            s.no_op,
            s.failed,
            s.skipped
        );
    }
}
