//! Conflict-resolution and sync analysis engine for LedgerSync.
//!
//! Devices edit the same ledger independently and exchange batches of
//! changed records from time to time. This crate decides, for every
//! replicated entity, what the merged state is once two copies meet.
//!
//! # Architecture
//!
//! Causality is tracked per record with version vectors, not with a global
//! log. Deletes are tombstones, ordinary mutations that merge like any other
//! edit. Concurrent edits are settled by whole-record last-writer-wins plus
//! optional field rules, so every device reaches the same result with no
//! coordinator.
//!
//! ## Components
//!
//! - **Identity**: Stable per-installation device id, loaded once at startup
//! - **Comparator**: Classifies a local/remote pair by causality
//! - **Resolver**: Deterministic merge of concurrent snapshots
//! - **Analyzer**: Applies a remote batch and builds the audit report
//!
//! ## Sync Process
//!
//! 1. **Decode**: Parse the wire batch entry by entry ([`RemoteBatch::from_json`])
//! 2. **Pair**: Match every remote snapshot with the local one by id
//! 3. **Classify**: Insert, no-op, fast-forward or conflict
//! 4. **Merge**: Resolve concurrent pairs and write inside one unit per entity
//! 5. **Report**: Hand the [`ResolutionReport`] to the audit collaborator
//!
//! # Example
//!
//! ```
//! use ledgersync_sync::{RemoteBatch, SyncAnalyzer, SyncConfig};
//! use ledgersync_model::Record;
//! use ledgersync_types::{DeviceId, Timestamp};
//! use serde_json::json;
//!
//! let device = DeviceId::new("laptop");
//! let analyzer: SyncAnalyzer<serde_json::Value> =
//!     SyncAnalyzer::whole_record(device, SyncConfig::default());
//!
//! let remote = Record::create(
//!     "acct-1",
//!     json!({"name": "Cash"}),
//!     &DeviceId::new("phone"),
//!     Timestamp::from_millis(1_000),
//! );
//! let plan = analyzer.analyze_sync_operation(&[], &RemoteBatch::from_records([remote]));
//! assert_eq!(plan.writes.len(), 1);
//! ```

mod analyzer;
mod batch;
mod comparator;
mod config;
mod error;
pub mod identity;
mod report;
mod resolver;

pub use analyzer::{CancelToken, EntityFailure, SyncAnalyzer, SyncOutcome, SyncPlan};
pub use batch::{RemoteBatch, RemoteEntry};
pub use comparator::{Causality, compare_records};
pub use config::{MAX_BATCH_SIZE, SyncConfig};
pub use error::{SyncError, SyncResult};
pub use report::{Classification, ReportEntry, ReportSummary, ResolutionReport};
pub use resolver::{ConflictResolver, Resolution, Resolved};

/// Errors raised by classification and resolution.
pub use ledgersync_types::Error as CoreError;

/// Result type of classification and resolution.
pub type CoreResult<T> = ledgersync_types::Result<T>;
