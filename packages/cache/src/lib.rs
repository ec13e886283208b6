#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Tiered caching for displacement data.
//!
//! Lookup order, stopping at the first hit: process-local memory map,
//! pre-generated read-only snapshot files, persisted disk store with a
//! per-source TTL, live fetch. Results are written back into the memory
//! tier always and into the disk tier only when produced by a live fetch,
//! so snapshot-served data never masquerades as freshly fetched.
//!
//! There is deliberately no per-key locking: two concurrent fetches for
//! the same scope may both run and both write, and last write wins. The
//! writes are idempotent for a given scope and year, so this wastes a
//! request at worst.

pub mod disk;
pub mod key;
pub mod memory;
pub mod snapshot;
pub mod tiered;

pub use disk::{DiskEntry, DiskStore};
pub use key::{CacheKey, DataSource, ScopeKey};
pub use memory::MemoryCache;
pub use snapshot::SnapshotStore;
pub use tiered::TieredCache;

/// Errors from cache tiers and the live-fetch fall-through.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Disk tier I/O failure (not corruption, which degrades to a miss).
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Serialization failure while writing a tier.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// The live fetch failed and no degraded fallback was available.
    #[error(transparent)]
    Fetch(#[from] displacement_globe_source::SourceError),
}
