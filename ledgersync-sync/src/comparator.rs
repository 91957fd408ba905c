//! Entity-level causal comparison.

use ledgersync_crdt::CausalOrder;
use ledgersync_model::Record;
use ledgersync_types::{Error, Result};
use serde::{Deserialize, Serialize};

/// How a remote snapshot relates to the local one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Causality {
    /// Same version vector. Field contents are not re-checked: a device never
    /// mutates without incrementing its own counter.
    Identical,
    /// Remote has seen everything local has, and more; it replaces local.
    RemoteNewer,
    /// Local is already ahead; nothing to write.
    LocalNewer,
    /// Edited independently on both sides; must be resolved.
    Concurrent,
}

/// Classifies a local/remote pair of snapshots of the same entity.
pub fn compare_records<T>(local: &Record<T>, remote: &Record<T>) -> Result<Causality> {
    ensure_same_id(local, remote)?;
    Ok(match local.version_vector.compare(&remote.version_vector) {
        CausalOrder::Equal => Causality::Identical,
        CausalOrder::DominatedBy => Causality::RemoteNewer,
        CausalOrder::Dominates => Causality::LocalNewer,
        CausalOrder::Concurrent => Causality::Concurrent,
    })
}

pub(crate) fn ensure_same_id<T>(local: &Record<T>, remote: &Record<T>) -> Result<()> {
    if local.id != remote.id {
        return Err(Error::IdentifierMismatch {
            local: local.id.clone(),
            remote: remote.id.clone(),
        });
    }
    Ok(())
}
