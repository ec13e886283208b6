//! Tier orchestration.

use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{CacheError, CacheKey, DiskEntry, DiskStore, MemoryCache};

/// Tiered cache for one record type.
///
/// The snapshot tier is injected per lookup as a closure because snapshot
/// file layouts differ per source; the memory and disk tiers are owned.
/// See the crate docs for the lookup order and write-back rules.
#[derive(Debug)]
pub struct TieredCache<T> {
    memory: MemoryCache<T>,
    disk: DiskStore,
}

impl<T> TieredCache<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    /// Creates a cache persisting to `disk`.
    #[must_use]
    pub fn new(disk: DiskStore) -> Self {
        Self {
            memory: MemoryCache::new(),
            disk,
        }
    }

    /// Resolves `key` through the tiers.
    ///
    /// `snapshot` is consulted after the memory tier; its hits are
    /// written back to memory only. `fetch` runs last; its result is
    /// written back to memory and disk. If the live fetch fails and the
    /// disk tier held a stale entry, that entry is returned as a
    /// degraded fallback instead of the error.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if every tier misses and the live fetch
    /// fails with no stale fallback available.
    pub async fn get<S, F, Fut>(&self, key: &CacheKey, snapshot: S, fetch: F) -> Result<T, CacheError>
    where
        S: FnOnce() -> Option<T>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CacheError>>,
    {
        if let Some(value) = self.memory.get(key) {
            log::debug!("cache {key}: memory hit");
            return Ok(value);
        }

        if let Some(value) = snapshot() {
            log::debug!("cache {key}: snapshot hit");
            self.memory.insert(key, value.clone());
            return Ok(value);
        }

        let stale = match self.disk.read::<T>(key) {
            DiskEntry::Fresh(value) => {
                log::debug!("cache {key}: disk hit");
                self.memory.insert(key, value.clone());
                return Ok(value);
            }
            DiskEntry::Stale(value) => Some(value),
            DiskEntry::Miss => None,
        };

        match fetch().await {
            Ok(value) => {
                log::debug!("cache {key}: live fetch");
                self.memory.insert(key, value.clone());
                if let Err(e) = self.disk.write(key, &value) {
                    log::warn!("cache {key}: disk write-back failed: {e}");
                }
                Ok(value)
            }
            Err(e) => {
                if let Some(value) = stale {
                    log::warn!("cache {key}: live fetch failed ({e}), serving stale entry");
                    return Ok(value);
                }
                Err(e)
            }
        }
    }

    /// Persisted-tier store, for tests and maintenance tooling.
    #[must_use]
    pub fn disk(&self) -> &DiskStore {
        &self.disk
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::DataSource;

    use super::*;

    fn temp_cache() -> TieredCache<Vec<u64>> {
        TieredCache::new(DiskStore::new(
            std::env::temp_dir().join(format!("dg-tiered-test-{}", uuid::Uuid::new_v4())),
        ))
    }

    fn key() -> CacheKey {
        CacheKey::country(DataSource::Conflict, "SYR", 2023)
    }

    fn fetch_err() -> CacheError {
        CacheError::Fetch(displacement_globe_source::SourceError::RateLimited)
    }

    #[tokio::test]
    async fn live_fetch_populates_memory_and_disk() {
        let cache = temp_cache();
        let fetches = AtomicU32::new(0);

        let fetch = || {
            fetches.fetch_add(1, Ordering::SeqCst);
            async { Ok(vec![1, 2, 3]) }
        };
        let value = cache.get(&key(), || None, fetch).await.unwrap();
        assert_eq!(value, vec![1, 2, 3]);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        // Second lookup is served from memory.
        let value = cache
            .get(&key(), || None, || async { Err(fetch_err()) })
            .await
            .unwrap();
        assert_eq!(value, vec![1, 2, 3]);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        // The disk tier got the live result too.
        assert_eq!(
            cache.disk().read::<Vec<u64>>(&key()),
            DiskEntry::Fresh(vec![1, 2, 3])
        );
    }

    #[tokio::test]
    async fn snapshot_hit_skips_disk_write() {
        let cache = temp_cache();

        let value = cache
            .get(&key(), || Some(vec![9]), || async { Err(fetch_err()) })
            .await
            .unwrap();
        assert_eq!(value, vec![9]);

        // Snapshot-served data must not be stamped as freshly fetched.
        assert_eq!(cache.disk().read::<Vec<u64>>(&key()), DiskEntry::Miss);

        // But it is held in memory.
        let value = cache
            .get(&key(), || None, || async { Err(fetch_err()) })
            .await
            .unwrap();
        assert_eq!(value, vec![9]);
    }

    #[tokio::test]
    async fn fresh_disk_entry_avoids_fetch() {
        let cache = temp_cache();
        cache.disk().write(&key(), &vec![5u64]).unwrap();

        let value = cache
            .get(&key(), || None, || async { Err(fetch_err()) })
            .await
            .unwrap();
        assert_eq!(value, vec![5]);
    }

    #[tokio::test]
    async fn stale_disk_entry_is_degraded_fallback() {
        let cache = temp_cache();
        let ttl_ms = i64::try_from(DataSource::Conflict.ttl().as_millis()).unwrap();
        let written_at = chrono::Utc::now().timestamp_millis() - ttl_ms - 1;
        cache
            .disk()
            .write_with_timestamp(&key(), &vec![4u64], written_at)
            .unwrap();

        // Stale alone does not satisfy the lookup; the fetch still runs.
        let value = cache
            .get(&key(), || None, || async { Ok(vec![6]) })
            .await
            .unwrap();
        assert_eq!(value, vec![6]);
    }

    #[tokio::test]
    async fn stale_entry_served_when_fetch_fails() {
        let cache = temp_cache();
        let ttl_ms = i64::try_from(DataSource::Conflict.ttl().as_millis()).unwrap();
        let written_at = chrono::Utc::now().timestamp_millis() - ttl_ms - 1;
        cache
            .disk()
            .write_with_timestamp(&key(), &vec![4u64], written_at)
            .unwrap();

        let value = cache
            .get(&key(), || None, || async { Err(fetch_err()) })
            .await
            .unwrap();
        assert_eq!(value, vec![4]);
    }

    #[tokio::test]
    async fn fetch_error_propagates_without_fallback() {
        let cache = temp_cache();
        let result = cache
            .get(&key(), || None, || async { Err(fetch_err()) })
            .await;
        assert!(matches!(
            result,
            Err(CacheError::Fetch(
                displacement_globe_source::SourceError::RateLimited
            ))
        ));
    }
}
