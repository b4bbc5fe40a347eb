//! Query cache for read endpoints.
//!
//! Entries are keyed by resource type and scope (usually a patient id).
//! A read is fresh within `stale_after` of the store, stale afterwards.
//! Stale entries are refetched and served only if the refetch fails.
//! Writes invalidate every entry of the resource types they touch, and a
//! read that was in flight across such a write is returned but not stored.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::ports::GatewayError;

/// Resource families a cached read belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Patients,
    History,
    Ekg,
    Documents,
    Treatments,
    Examinations,
    TrainingStats,
    Admin,
}

/// Cache key: resource family plus scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub resource: Resource,
    pub scope: String,
}

impl QueryKey {
    #[must_use]
    pub fn new(resource: Resource, scope: impl Into<String>) -> Self {
        Self {
            resource,
            scope: scope.into(),
        }
    }

    /// Key for an unscoped listing.
    #[must_use]
    pub fn all(resource: Resource) -> Self {
        Self::new(resource, "")
    }
}

/// Cache tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Age after which an entry is served only as a fallback
    pub stale_after: Duration,

    /// Maximum number of entries; the oldest is evicted first
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(30),
            max_entries: 256,
        }
    }
}

impl CacheConfig {
    /// Load config overrides from environment (best-effort).
    ///
    /// Supported:
    /// - CARDIOLENS_CACHE_STALE_SECS
    /// - CARDIOLENS_CACHE_MAX_ENTRIES
    #[must_use]
    pub fn from_env_or_default() -> Self {
        let mut cfg = Self::default();

        if let Some(secs) = env_number("CARDIOLENS_CACHE_STALE_SECS") {
            cfg.stale_after = Duration::from_secs(secs);
        }
        if let Some(max) = env_number("CARDIOLENS_CACHE_MAX_ENTRIES").filter(|&n| n > 0) {
            cfg.max_entries = usize::try_from(max).unwrap_or(usize::MAX);
        }

        cfg
    }
}

fn env_number(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.trim().parse().ok()
}

/// Result of a cache read.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Fresh(T),
    Stale(T),
    Miss,
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    stored_at: Instant,
}

#[derive(Default)]
struct State {
    entries: HashMap<QueryKey, Entry>,
    /// Bumped by every invalidation of the resource
    epochs: HashMap<Resource, u64>,
}

impl State {
    fn epoch(&self, resource: Resource) -> u64 {
        self.epochs.get(&resource).copied().unwrap_or(0)
    }

    fn insert(&mut self, max_entries: usize, key: QueryKey, value: Arc<dyn Any + Send + Sync>) {
        if !self.entries.contains_key(&key) && self.entries.len() >= max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
                tracing::trace!(resource = ?oldest.resource, "evicted oldest cache entry");
            }
        }

        self.entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }
}

/// Bounded in-memory cache shared by the application services.
pub struct QueryCache {
    config: CacheConfig,
    state: Mutex<State>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl QueryCache {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read an entry. A value stored under another type reads as a miss.
    #[must_use]
    pub fn lookup<T>(&self, key: &QueryKey) -> Lookup<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let state = self.state();
        let Some(entry) = state.entries.get(key) else {
            return Lookup::Miss;
        };
        let Some(value) = entry.value.downcast_ref::<T>() else {
            return Lookup::Miss;
        };

        if entry.stored_at.elapsed() < self.config.stale_after {
            Lookup::Fresh(value.clone())
        } else {
            Lookup::Stale(value.clone())
        }
    }

    /// Store a value, evicting the oldest entry when full.
    pub fn store<T>(&self, key: QueryKey, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.state().insert(self.config.max_entries, key, Arc::new(value));
    }

    /// Store a value only if its resource was not invalidated since `epoch`.
    fn store_if_current<T>(&self, key: QueryKey, value: T, epoch: u64) -> bool
    where
        T: Send + Sync + 'static,
    {
        let mut state = self.state();
        if state.epoch(key.resource) != epoch {
            tracing::debug!(resource = ?key.resource, "invalidated during fetch, result not cached");
            return false;
        }
        state.insert(self.config.max_entries, key, Arc::new(value));
        true
    }

    /// Drop every entry of `resource`. Returns the number removed.
    ///
    /// Reads of `resource` already in flight will not be cached.
    pub fn invalidate(&self, resource: Resource) -> usize {
        let mut state = self.state();
        *state.epochs.entry(resource).or_insert(0) += 1;
        let before = state.entries.len();
        state.entries.retain(|key, _| key.resource != resource);
        let removed = before - state.entries.len();
        tracing::debug!(?resource, removed, "cache invalidated");
        removed
    }

    /// Drop every entry of each listed resource.
    pub fn invalidate_all(&self, resources: &[Resource]) -> usize {
        resources.iter().map(|r| self.invalidate(*r)).sum()
    }

    pub fn clear(&self) {
        self.state().entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state().entries.is_empty()
    }

    /// Serve `key` from cache or call `fetch`.
    ///
    /// Fresh entries are returned without calling `fetch`. Stale entries are
    /// refetched; if the refetch fails the stale value is returned instead.
    /// A fetched value is not stored if `key.resource` was invalidated while
    /// the fetch was running.
    ///
    /// # Errors
    /// Returns the fetch error on a miss.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T, GatewayError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let epoch = self.state().epoch(key.resource);
        match self.lookup::<T>(&key) {
            Lookup::Fresh(value) => Ok(value),
            Lookup::Stale(stale) => match fetch().await {
                Ok(value) => {
                    self.store_if_current(key, value.clone(), epoch);
                    Ok(value)
                }
                Err(e) => {
                    tracing::warn!(resource = ?key.resource, error = %e, "refetch failed, serving stale data");
                    Ok(stale)
                }
            },
            Lookup::Miss => {
                let value = fetch().await?;
                self.store_if_current(key, value.clone(), epoch);
                Ok(value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache(stale_secs: u64, max_entries: usize) -> QueryCache {
        QueryCache::new(CacheConfig {
            stale_after: Duration::from_secs(stale_secs),
            max_entries,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_entry_skips_fetch() {
        let cache = cache(30, 8);
        let calls = AtomicUsize::new(0);
        let key = QueryKey::all(Resource::Patients);

        for _ in 0..3 {
            let value = cache
                .fetch(key.clone(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, GatewayError>(vec![1, 2, 3])
                })
                .await
                .expect("Should fetch");
            assert_eq!(value, vec![1, 2, 3]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_refetched() {
        let cache = cache(30, 8);
        let key = QueryKey::new(Resource::History, "BN-2024-0001");
        cache.store(key.clone(), 1_u32);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cache.lookup::<u32>(&key), Lookup::Stale(1));

        let value = cache
            .fetch(key.clone(), || async { Ok::<_, GatewayError>(2_u32) })
            .await
            .expect("Should refetch");
        assert_eq!(value, 2);
        assert_eq!(cache.lookup::<u32>(&key), Lookup::Fresh(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_served_when_refetch_fails() {
        let cache = cache(30, 8);
        let key = QueryKey::all(Resource::Treatments);
        cache.store(key.clone(), "catalogue".to_string());

        tokio::time::advance(Duration::from_secs(60)).await;
        let value = cache
            .fetch(key, || async {
                Err::<String, _>(GatewayError::Client("offline".to_string()))
            })
            .await
            .expect("Should fall back to stale value");
        assert_eq!(value, "catalogue");
    }

    #[tokio::test]
    async fn test_miss_propagates_error() {
        let cache = cache(30, 8);
        let result = cache
            .fetch(QueryKey::all(Resource::Admin), || async {
                Err::<u32, _>(GatewayError::Client("offline".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_by_resource() {
        let cache = cache(30, 8);
        cache.store(QueryKey::all(Resource::Patients), 1_u32);
        cache.store(QueryKey::new(Resource::Patients, "BN-2024-0001"), 2_u32);
        cache.store(QueryKey::new(Resource::History, "BN-2024-0001"), 3_u32);

        assert_eq!(cache.invalidate(Resource::Patients), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.lookup::<u32>(&QueryKey::all(Resource::Patients)),
            Lookup::Miss
        );
    }

    #[tokio::test]
    async fn test_invalidate_during_fetch_not_stored() {
        let cache = cache(30, 8);
        let key = QueryKey::all(Resource::Patients);
        let (release, held) = tokio::sync::oneshot::channel::<()>();

        let read = cache.fetch(key.clone(), || async move {
            held.await.expect("Should be released");
            Ok::<_, GatewayError>(vec!["before-create".to_string()])
        });
        let write = async {
            tokio::task::yield_now().await;
            cache.invalidate(Resource::Patients);
            release.send(()).expect("Reader should be waiting");
        };

        let (value, ()) = tokio::join!(read, write);
        assert_eq!(value.expect("Should fetch"), vec!["before-create".to_string()]);
        assert_eq!(cache.lookup::<Vec<String>>(&key), Lookup::Miss);

        // The next read after the write is cached again.
        cache
            .fetch(key.clone(), || async { Ok::<_, GatewayError>(vec!["after-create".to_string()]) })
            .await
            .expect("Should fetch");
        assert_eq!(
            cache.lookup::<Vec<String>>(&key),
            Lookup::Fresh(vec!["after-create".to_string()])
        );
    }

    #[tokio::test]
    async fn test_other_resource_invalidation_keeps_fetch() {
        let cache = cache(30, 8);
        let key = QueryKey::new(Resource::History, "BN-2024-0001");

        let value = cache
            .fetch(key.clone(), || async {
                cache.invalidate(Resource::Patients);
                Ok::<_, GatewayError>(5_u32)
            })
            .await
            .expect("Should fetch");
        assert_eq!(value, 5);
        assert_eq!(cache.lookup::<u32>(&key), Lookup::Fresh(5));
    }

    #[test]
    fn test_type_mismatch_is_miss() {
        let cache = cache(30, 8);
        let key = QueryKey::all(Resource::Ekg);
        cache.store(key.clone(), 7_u32);
        assert_eq!(cache.lookup::<String>(&key), Lookup::Miss);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_eviction() {
        let cache = cache(30, 2);
        cache.store(QueryKey::new(Resource::History, "a"), 1_u32);
        tokio::time::advance(Duration::from_millis(10)).await;
        cache.store(QueryKey::new(Resource::History, "b"), 2_u32);
        tokio::time::advance(Duration::from_millis(10)).await;
        cache.store(QueryKey::new(Resource::History, "c"), 3_u32);

        assert_eq!(cache.len(), 2);
        assert_eq!(
            cache.lookup::<u32>(&QueryKey::new(Resource::History, "a")),
            Lookup::Miss
        );
        assert_eq!(
            cache.lookup::<u32>(&QueryKey::new(Resource::History, "c")),
            Lookup::Fresh(3)
        );
    }
}
