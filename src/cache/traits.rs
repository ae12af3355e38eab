//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// A hierarchical query key.
///
/// Keys render to an ordered list of JSON segments, e.g.
/// `["orders", "detail", "123"]`. Two keys whose segments are structurally
/// equal address the same cache slot and share in-flight fetches.
pub trait QueryKey {
  /// Ordered key segments, most general first.
  fn segments(&self) -> Vec<Value>;

  /// Human readable description for logs.
  fn description(&self) -> String;

  /// Stable, fixed-length slot identifier derived from the segments.
  fn cache_hash(&self) -> String {
    hash_segments(&self.segments())
  }
}

/// SHA-256 hex digest of the canonical JSON rendering of `segments`.
pub fn hash_segments(segments: &[Value]) -> String {
  let input = Value::Array(segments.to_vec()).to_string();
  let mut hasher = Sha256::new();
  hasher.update(input.as_bytes());
  hex::encode(hasher.finalize())
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was stored (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>, is_stale: bool) -> Self {
    Self {
      data,
      source: if is_stale {
        CacheSource::CacheStale
      } else {
        CacheSource::CacheFresh
      },
      cached_at: Some(cached_at),
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still considered fresh
  CacheFresh,
  /// Data from cache, past its stale window
  CacheStale,
}
