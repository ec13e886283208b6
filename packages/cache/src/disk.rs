//! Persisted disk tier.
//!
//! Each entry is one JSON file holding a `{data, timestamp}` envelope.
//! Freshness is judged strictly: an entry exactly as old as the TTL is
//! already stale. Stale entries are not deleted on read because the
//! tiered manager hands them out as a degraded fallback when the live
//! fetch fails; corrupt entries are deleted immediately and reported as
//! a miss.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{CacheError, CacheKey};

/// Outcome of a disk-tier lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskEntry<T> {
    /// Entry present and within its TTL.
    Fresh(T),
    /// Entry present but at or beyond its TTL. Usable only as a
    /// fallback.
    Stale(T),
    /// No usable entry.
    Miss,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    data: T,
    /// Unix epoch milliseconds at write time.
    timestamp: i64,
}

/// On-disk JSON store, one file per cache key.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Creates a store rooted at `root`. The directory is created lazily
    /// on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reads and freshness-classifies the entry for `key`.
    ///
    /// Any read or parse failure degrades to [`DiskEntry::Miss`]; a
    /// parse failure also evicts the offending file so it cannot keep
    /// wasting a read per lookup.
    #[must_use]
    pub fn read<T: DeserializeOwned>(&self, key: &CacheKey) -> DiskEntry<T> {
        let path = self.entry_path(key);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("cache read failed for {key}: {e}");
                }
                return DiskEntry::Miss;
            }
        };

        let envelope: Envelope<T> = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::warn!("evicting corrupt cache entry {key}: {e}");
                if let Err(e) = std::fs::remove_file(&path) {
                    log::warn!("failed to evict {key}: {e}");
                }
                return DiskEntry::Miss;
            }
        };

        let age_ms = now_ms().saturating_sub(envelope.timestamp);
        let ttl_ms = i64::try_from(key.source.ttl().as_millis()).unwrap_or(i64::MAX);
        if age_ms < ttl_ms {
            DiskEntry::Fresh(envelope.data)
        } else {
            DiskEntry::Stale(envelope.data)
        }
    }

    /// Writes the entry for `key`, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the directory cannot be created or the
    /// file cannot be written.
    pub fn write<T: Serialize>(&self, key: &CacheKey, data: &T) -> Result<(), CacheError> {
        self.write_with_timestamp(key, data, now_ms())
    }

    pub(crate) fn write_with_timestamp<T: Serialize>(
        &self,
        key: &CacheKey,
        data: &T,
        timestamp: i64,
    ) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.root)?;
        let envelope = Envelope { data, timestamp };
        let json = serde_json::to_string(&envelope)?;
        std::fs::write(self.entry_path(key), json)?;
        Ok(())
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}.json", key.storage_key()))
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use crate::{DataSource, ScopeKey};

    use super::*;

    fn temp_store() -> DiskStore {
        DiskStore::new(std::env::temp_dir().join(format!("dg-cache-test-{}", uuid::Uuid::new_v4())))
    }

    fn key(year: i32) -> CacheKey {
        CacheKey {
            source: DataSource::Conflict,
            scope: ScopeKey::Country {
                iso3: "SYR".to_owned(),
                year,
            },
        }
    }

    #[test]
    fn missing_entry_is_a_miss() {
        let store = temp_store();
        assert_eq!(store.read::<Vec<u64>>(&key(2023)), DiskEntry::Miss);
    }

    #[test]
    fn fresh_entry_round_trips() {
        let store = temp_store();
        store.write(&key(2023), &vec![1u64, 2]).unwrap();
        assert_eq!(
            store.read::<Vec<u64>>(&key(2023)),
            DiskEntry::Fresh(vec![1, 2])
        );
    }

    #[test]
    fn entry_exactly_at_ttl_is_stale() {
        let store = temp_store();
        let ttl_ms = i64::try_from(DataSource::Conflict.ttl().as_millis()).unwrap();
        let written_at = chrono::Utc::now().timestamp_millis() - ttl_ms;
        store
            .write_with_timestamp(&key(2023), &vec![7u64], written_at)
            .unwrap();
        assert_eq!(store.read::<Vec<u64>>(&key(2023)), DiskEntry::Stale(vec![7]));
    }

    #[test]
    fn entry_just_under_ttl_is_fresh() {
        let store = temp_store();
        let ttl_ms = i64::try_from(DataSource::Conflict.ttl().as_millis()).unwrap();
        let written_at = chrono::Utc::now().timestamp_millis() - ttl_ms + 60_000;
        store
            .write_with_timestamp(&key(2023), &vec![7u64], written_at)
            .unwrap();
        assert_eq!(store.read::<Vec<u64>>(&key(2023)), DiskEntry::Fresh(vec![7]));
    }

    #[test]
    fn corrupt_entry_is_evicted_and_missed() {
        let store = temp_store();
        let k = key(2023);
        store.write(&k, &vec![1u64]).unwrap();

        let path = store.root().join(format!("{}.json", k.storage_key()));
        std::fs::write(&path, "{not json").unwrap();

        assert_eq!(store.read::<Vec<u64>>(&k), DiskEntry::Miss);
        assert!(!path.exists());
    }
}
