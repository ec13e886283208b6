//! Process-local memory tier.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::CacheKey;

/// In-memory cache map, scoped to the running process.
///
/// Entries never expire here; the memory tier lives as long as the
/// process and is always refreshed by whichever lower tier resolved a
/// miss.
#[derive(Debug, Default)]
pub struct MemoryCache<T> {
    entries: RwLock<HashMap<String, T>>,
}

impl<T: Clone> MemoryCache<T> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a clone of the cached value, if present.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<T> {
        match self.entries.read() {
            Ok(entries) => entries.get(&key.to_string()).cloned(),
            Err(poisoned) => poisoned.into_inner().get(&key.to_string()).cloned(),
        }
    }

    /// Stores a value, replacing any existing entry. Last write wins.
    pub fn insert(&self, key: &CacheKey, value: T) {
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(key.to_string(), value);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(key.to_string(), value);
            }
        }
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(entries) => entries.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use crate::DataSource;

    use super::*;

    #[test]
    fn get_after_insert_round_trips() {
        let cache = MemoryCache::new();
        let key = CacheKey::country(DataSource::Conflict, "SYR", 2023);

        assert!(cache.get(&key).is_none());
        cache.insert(&key, vec![1u64, 2, 3]);
        assert_eq!(cache.get(&key), Some(vec![1, 2, 3]));
    }

    #[test]
    fn last_write_wins() {
        let cache = MemoryCache::new();
        let key = CacheKey::global(DataSource::Displacement, 2023);

        cache.insert(&key, 1u64);
        cache.insert(&key, 2u64);
        assert_eq!(cache.get(&key), Some(2));
        assert_eq!(cache.len(), 1);
    }
}
