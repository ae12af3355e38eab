//! Cache layer that orchestrates caching logic with network fetching.

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use super::storage::{CacheEntry, CacheStorage, MemoryStorage, NoopStorage};
use super::traits::{CacheResult, QueryKey};
use crate::api::ApiError;

type SharedFetch = Shared<BoxFuture<'static, Result<Value, ApiError>>>;

/// Cache layer that manages caching logic and network fetching.
///
/// This layer sits between the resource client and its callers. For every
/// read it either answers from a fresh entry or runs exactly one fetch per
/// key, no matter how many callers ask concurrently: later callers join the
/// pending fetch and receive the same value or the same error.
pub struct CacheLayer {
  storage: Arc<dyn CacheStorage>,
  inflight: Arc<Mutex<HashMap<String, SharedFetch>>>,
}

impl CacheLayer {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
    Self {
      storage,
      inflight: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// In-memory cache.
  pub fn in_memory() -> Self {
    Self::new(Arc::new(MemoryStorage::new()))
  }

  /// Cache that never stores anything. Concurrent fetches are still coalesced.
  pub fn disabled() -> Self {
    Self::new(Arc::new(NoopStorage))
  }

  fn inflight(&self) -> MutexGuard<'_, HashMap<String, SharedFetch>> {
    self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Fetch with cache-first strategy.
  ///
  /// 1. Fresh entry for `key` - return it without fetching
  /// 2. Fetch already running for `key` - wait for it
  /// 3. Otherwise start `fetcher`, store its result on success
  ///
  /// A failed fetch leaves any existing entry untouched; the error goes to
  /// the callers of that fetch only. The fetch runs on its own task, so
  /// callers that stop waiting do not cancel it for the others.
  ///
  /// `fetcher` is called under the in-flight lock. It must only build the
  /// future and leave all I/O to it.
  pub async fn fetch<K, T, F, Fut>(
    &self,
    key: &K,
    stale_time: Duration,
    fetcher: F,
  ) -> Result<CacheResult<T>, ApiError>
  where
    K: QueryKey,
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let hash = key.cache_hash();

    let pending = {
      // Checked under the in-flight lock so a fetch cannot complete between
      // the cache miss and joining it
      let mut inflight = self.inflight();

      if let Some(entry) = self.storage.get(&hash) {
        if entry.is_fresh() {
          let data = decode_cached(entry.data)?;
          return Ok(CacheResult::from_cache(data, entry.cached_at, false));
        }
      }

      match inflight.get(&hash) {
        Some(existing) => {
          debug!(key = %key.description(), "joining in-flight fetch");
          existing.clone()
        }
        None => {
          debug!(key = %key.description(), "fetching");
          let pending = self.start_fetch(hash.clone(), key.segments(), stale_time, fetcher());
          inflight.insert(hash, pending.clone());
          pending
        }
      }
    };

    let value = pending.await?;
    Ok(CacheResult::from_network(decode_cached(value)?))
  }

  fn start_fetch<T, Fut>(
    &self,
    hash: String,
    segments: Vec<Value>,
    stale_time: Duration,
    fut: Fut,
  ) -> SharedFetch
  where
    T: Serialize + Send + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let storage = Arc::clone(&self.storage);
    let inflight = Arc::clone(&self.inflight);

    // Runs as its own task so it completes and leaves `inflight` even when
    // every caller has gone away
    let task = tokio::spawn(async move {
      let result = fut.await.and_then(|data| {
        serde_json::to_value(data)
          .map_err(|e| ApiError::internal(format!("Failed to cache query result: {}", e)))
      });

      let mut inflight = inflight.lock().unwrap_or_else(PoisonError::into_inner);
      if let Ok(value) = &result {
        storage.put(&hash, CacheEntry::new(segments, value.clone(), stale_time));
      }
      inflight.remove(&hash);

      result
    });

    async move {
      task
        .await
        .unwrap_or_else(|e| Err(ApiError::internal(format!("Query fetch task failed: {}", e))))
    }
    .boxed()
    .shared()
  }

  /// Read the entry for `key` without fetching, fresh or stale.
  pub fn get_query_data<K, T>(&self, key: &K) -> Option<CacheResult<T>>
  where
    K: QueryKey,
    T: DeserializeOwned,
  {
    let entry = self.storage.get(&key.cache_hash())?;
    let is_stale = !entry.is_fresh();
    let data = serde_json::from_value(entry.data).ok()?;
    Some(CacheResult::from_cache(data, entry.cached_at, is_stale))
  }

  /// Store `data` under `key` as if it had just been fetched.
  pub fn set_query_data<K, T>(&self, key: &K, data: &T, stale_time: Duration) -> Result<(), ApiError>
  where
    K: QueryKey,
    T: Serialize,
  {
    let value = serde_json::to_value(data)
      .map_err(|e| ApiError::internal(format!("Failed to cache query result: {}", e)))?;
    self.storage.put(
      &key.cache_hash(),
      CacheEntry::new(key.segments(), value, stale_time),
    );
    Ok(())
  }

  /// Drop every entry under `prefix`, e.g. all list queries.
  pub fn invalidate<K: QueryKey>(&self, prefix: &K) -> usize {
    let removed = self.storage.remove_prefix(&prefix.segments());
    info!(prefix = %prefix.description(), removed, "invalidated cache entries");
    removed
  }

  pub fn clear(&self) {
    self.storage.clear();
  }

  /// Number of stored entries.
  pub fn len(&self) -> usize {
    self.storage.len()
  }

  pub fn is_empty(&self) -> bool {
    self.storage.is_empty()
  }

  /// Number of fetches currently running.
  pub fn in_flight(&self) -> usize {
    self.inflight().len()
  }
}

impl Clone for CacheLayer {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      inflight: Arc::clone(&self.inflight),
    }
  }
}

fn decode_cached<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
  serde_json::from_value(value)
    .map_err(|e| ApiError::internal(format!("Cached value has unexpected shape: {}", e)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CacheSource;
  use serde_json::json;
  use std::sync::atomic::{AtomicU32, Ordering};

  struct TestKey(Vec<Value>);

  impl QueryKey for TestKey {
    fn segments(&self) -> Vec<Value> {
      self.0.clone()
    }

    fn description(&self) -> String {
      Value::Array(self.0.clone()).to_string()
    }
  }

  fn key(id: &str) -> TestKey {
    TestKey(vec![json!("orders"), json!("detail"), json!(id)])
  }

  fn counting_fetcher(
    counter: &Arc<AtomicU32>,
    result: Result<Value, ApiError>,
  ) -> impl FnOnce() -> BoxFuture<'static, Result<Value, ApiError>> {
    let counter = Arc::clone(counter);
    move || {
      async move {
        counter.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        result
      }
      .boxed()
    }
  }

  #[tokio::test]
  async fn test_fresh_entry_skips_fetch() {
    let cache = CacheLayer::in_memory();
    let calls = Arc::new(AtomicU32::new(0));
    let ttl = Duration::from_secs(60);

    let first = cache
      .fetch(&key("1"), ttl, counting_fetcher(&calls, Ok(json!({"id": "1"}))))
      .await
      .unwrap();
    assert_eq!(first.source, CacheSource::Network);

    let second: CacheResult<Value> = cache
      .fetch(&key("1"), ttl, counting_fetcher(&calls, Ok(json!("unused"))))
      .await
      .unwrap();
    assert_eq!(second.source, CacheSource::CacheFresh);
    assert_eq!(second.data, json!({"id": "1"}));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_concurrent_reads_share_one_fetch() {
    let cache = CacheLayer::in_memory();
    let calls = Arc::new(AtomicU32::new(0));
    let ttl = Duration::from_secs(60);

    let k = key("7");
    let reads = (0..5).map(|_| {
      cache.fetch::<_, Value, _, _>(&k, ttl, counting_fetcher(&calls, Ok(json!(7))))
    });
    let results = futures::future::join_all(reads).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for result in results {
      assert_eq!(result.unwrap().data, json!(7));
    }
    assert_eq!(cache.in_flight(), 0);
  }

  #[tokio::test]
  async fn test_concurrent_reads_share_one_error() {
    let cache = CacheLayer::in_memory();
    let calls = Arc::new(AtomicU32::new(0));
    let ttl = Duration::from_secs(60);

    let k = key("9");
    let reads = (0..3).map(|_| {
      cache.fetch::<_, Value, _, _>(
        &k,
        ttl,
        counting_fetcher(&calls, Err(ApiError::http(503, "busy"))),
      )
    });
    let results = futures::future::join_all(reads).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for result in results {
      assert_eq!(result.unwrap_err(), ApiError::http(503, "busy"));
    }
    assert!(cache.is_empty());
  }

  #[tokio::test]
  async fn test_distinct_keys_fetch_independently() {
    let cache = CacheLayer::in_memory();
    let calls = Arc::new(AtomicU32::new(0));
    let ttl = Duration::from_secs(60);

    let (ka, kb) = (key("a"), key("b"));
    let (a, b) = futures::join!(
      cache.fetch::<_, Value, _, _>(&ka, ttl, counting_fetcher(&calls, Ok(json!("a")))),
      cache.fetch::<_, Value, _, _>(&kb, ttl, counting_fetcher(&calls, Ok(json!("b")))),
    );

    assert_eq!(a.unwrap().data, json!("a"));
    assert_eq!(b.unwrap().data, json!("b"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_stale_window_triggers_refetch() {
    let cache = CacheLayer::in_memory();
    let calls = Arc::new(AtomicU32::new(0));
    let ttl = Duration::from_secs(300);

    cache
      .fetch::<_, Value, _, _>(&key("s"), ttl, counting_fetcher(&calls, Ok(json!(1))))
      .await
      .unwrap();
    tokio::time::advance(Duration::from_secs(299)).await;

    let hit = cache
      .fetch::<_, Value, _, _>(&key("s"), ttl, counting_fetcher(&calls, Ok(json!(2))))
      .await
      .unwrap();
    assert_eq!(hit.source, CacheSource::CacheFresh);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    let refetched = cache
      .fetch::<_, Value, _, _>(&key("s"), ttl, counting_fetcher(&calls, Ok(json!(2))))
      .await
      .unwrap();
    assert_eq!(refetched.source, CacheSource::Network);
    assert_eq!(refetched.data, json!(2));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_failed_refetch_keeps_stale_entry() {
    let cache = CacheLayer::in_memory();
    let calls = Arc::new(AtomicU32::new(0));
    let ttl = Duration::from_secs(60);

    cache
      .fetch::<_, Value, _, _>(&key("x"), ttl, counting_fetcher(&calls, Ok(json!("old"))))
      .await
      .unwrap();
    tokio::time::advance(Duration::from_secs(120)).await;

    let err = cache
      .fetch::<_, Value, _, _>(
        &key("x"),
        ttl,
        counting_fetcher(&calls, Err(ApiError::transport("offline"))),
      )
      .await
      .unwrap_err();
    assert_eq!(err.status(), 0);

    let stale: CacheResult<Value> = cache.get_query_data(&key("x")).unwrap();
    assert_eq!(stale.data, json!("old"));
    assert_eq!(stale.source, CacheSource::CacheStale);
  }

  #[tokio::test]
  async fn test_invalidate_prefix() {
    let cache = CacheLayer::in_memory();
    let ttl = Duration::from_secs(60);
    cache.set_query_data(&key("1"), &json!(1), ttl).unwrap();
    cache.set_query_data(&key("2"), &json!(2), ttl).unwrap();
    cache
      .set_query_data(&TestKey(vec![json!("orders"), json!("stats")]), &json!({}), ttl)
      .unwrap();

    let removed = cache.invalidate(&TestKey(vec![json!("orders"), json!("detail")]));
    assert_eq!(removed, 2);
    assert_eq!(cache.len(), 1);
    assert!(cache.get_query_data::<_, Value>(&key("1")).is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn test_dropped_caller_does_not_cancel_shared_fetch() {
    let cache = CacheLayer::in_memory();
    let calls = Arc::new(AtomicU32::new(0));
    let ttl = Duration::from_secs(60);
    let k = key("c");

    let impatient = tokio::time::timeout(
      Duration::from_millis(5),
      cache.fetch::<_, Value, _, _>(&k, ttl, counting_fetcher(&calls, Ok(json!(1)))),
    );
    let patient = async {
      tokio::time::sleep(Duration::from_millis(1)).await;
      cache
        .fetch::<_, Value, _, _>(&k, ttl, counting_fetcher(&calls, Ok(json!(2))))
        .await
    };
    let (impatient, patient) = tokio::join!(impatient, patient);

    assert!(impatient.is_err());
    assert_eq!(patient.unwrap().data, json!(1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_abandoned_fetch_still_completes() {
    let cache = CacheLayer::in_memory();
    let calls = Arc::new(AtomicU32::new(0));
    let ttl = Duration::from_secs(60);
    let k = key("d");

    let abandoned = tokio::time::timeout(
      Duration::from_millis(1),
      cache.fetch::<_, Value, _, _>(&k, ttl, counting_fetcher(&calls, Ok(json!(3)))),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(cache.in_flight(), 1);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(cache.in_flight(), 0);
    let stored: CacheResult<Value> = cache.get_query_data(&k).unwrap();
    assert_eq!(stored.data, json!(3));
    assert_eq!(stored.source, CacheSource::CacheFresh);
  }

  #[tokio::test]
  async fn test_disabled_cache_always_fetches() {
    let cache = CacheLayer::disabled();
    let calls = Arc::new(AtomicU32::new(0));
    let ttl = Duration::from_secs(60);

    for _ in 0..2 {
      cache
        .fetch::<_, Value, _, _>(&key("1"), ttl, counting_fetcher(&calls, Ok(json!(1))))
        .await
        .unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }
}
