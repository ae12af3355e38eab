//! Cache storage trait and in-memory implementation.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// A single cached query result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  /// Key segments, kept for prefix invalidation
  pub segments: Vec<Value>,
  /// Serialized query result
  pub data: Value,
  /// When the value was fetched (runtime clock)
  pub fetched_at: Instant,
  /// When the value was fetched (wall clock, for display)
  pub cached_at: DateTime<Utc>,
  /// How long the value stays fresh
  pub stale_time: Duration,
}

impl CacheEntry {
  pub fn new(segments: Vec<Value>, data: Value, stale_time: Duration) -> Self {
    Self {
      segments,
      data,
      fetched_at: Instant::now(),
      cached_at: Utc::now(),
      stale_time,
    }
  }

  /// Fresh while `now - fetched_at < stale_time`.
  pub fn is_fresh(&self) -> bool {
    self.fetched_at.elapsed() < self.stale_time
  }
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Get the entry stored under `hash`.
  fn get(&self, hash: &str) -> Option<CacheEntry>;

  /// Store or replace the entry under `hash`.
  fn put(&self, hash: &str, entry: CacheEntry);

  /// Remove every entry whose segments start with `prefix`. Returns the count.
  fn remove_prefix(&self, prefix: &[Value]) -> usize;

  /// Remove everything.
  fn clear(&self);

  /// Number of stored entries.
  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _hash: &str) -> Option<CacheEntry> {
    None // Always miss
  }

  fn put(&self, _hash: &str, _entry: CacheEntry) {}

  fn remove_prefix(&self, _prefix: &[Value]) -> usize {
    0
  }

  fn clear(&self) {}

  fn len(&self) -> usize {
    0
  }
}

/// Process-local storage. Entries live until invalidated or cleared.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
    // Entries are replaced whole, so a poisoned map is still consistent
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, hash: &str) -> Option<CacheEntry> {
    self.entries().get(hash).cloned()
  }

  fn put(&self, hash: &str, entry: CacheEntry) {
    self.entries().insert(hash.to_string(), entry);
  }

  fn remove_prefix(&self, prefix: &[Value]) -> usize {
    let mut entries = self.entries();
    let before = entries.len();
    entries.retain(|_, entry| !entry.segments.starts_with(prefix));
    before - entries.len()
  }

  fn clear(&self) {
    self.entries().clear();
  }

  fn len(&self) -> usize {
    self.entries().len()
  }
}
