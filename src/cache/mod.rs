//! Generic query cache with request de-duplication.
//!
//! This module provides an API-agnostic caching mechanism that:
//! - Addresses entries by hierarchical query keys
//! - Applies a stale window per entry, chosen by the caller per query kind
//! - Coalesces concurrent fetches of the same key into one request
//! - Keeps stale entries readable until they are replaced or invalidated
//!
//! Entries are never evicted automatically; call [`CacheLayer::invalidate`]
//! or [`CacheLayer::clear`].

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheEntry, CacheStorage, MemoryStorage, NoopStorage};
pub use traits::{hash_segments, CacheResult, CacheSource, QueryKey};
