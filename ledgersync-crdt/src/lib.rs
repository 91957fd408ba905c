//! Merge primitives for LedgerSync.
//!
//! - [`VersionVector`] — per-entity causal clock (device → counter)
//! - [`CausalOrder`] — outcome of comparing two version vectors
//! - [`Stamp`] — last-writer-wins ordering key (`updated_at`, `updated_by`)
//! - [`PnCounter`] — per-device counter for fields that accumulate
//!
//! Every merge in this crate is:
//! - **Commutative**: merge(a, b) == merge(b, a)
//! - **Associative**: merge(merge(a, b), c) == merge(a, merge(b, c))
//! - **Idempotent**: merge(a, a) == a
//!
//! so replicas converge regardless of the order in which batches arrive.

mod lww;
mod pn_counter;
mod version_vector;

pub use lww::Stamp;
pub use pn_counter::PnCounter;
pub use version_vector::{CausalOrder, VersionVector};
