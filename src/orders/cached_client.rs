//! Cached orders client that wraps OrdersClient with transparent caching.

use std::time::Duration;

use crate::api::{ApiError, ClientBuildError};
use crate::cache::CacheLayer;
use crate::config::{CacheConfig, Config};
use crate::query::InfiniteQuery;
use crate::retry::{retry_with_backoff, RetryPolicy};

use super::cache::OrderKey;
use super::client::OrdersClient;
use super::filters::OrderFilters;
use super::types::{OrderResponse, OrderStats, OrdersResponse};

/// Infinite list of executive orders, one [`OrdersResponse`] per page.
pub type InfiniteOrders = InfiniteQuery<OrdersResponse>;

/// How long each kind of query stays fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleTimes {
  pub list: Duration,
  pub detail: Duration,
  pub latest: Duration,
  pub related: Duration,
  pub stats: Duration,
  pub infinite: Duration,
}

impl Default for StaleTimes {
  fn default() -> Self {
    Self::from(&CacheConfig::default())
  }
}

impl From<&CacheConfig> for StaleTimes {
  fn from(config: &CacheConfig) -> Self {
    Self {
      list: Duration::from_secs(config.list_stale_secs),
      detail: Duration::from_secs(config.detail_stale_secs),
      latest: Duration::from_secs(config.latest_stale_secs),
      related: Duration::from_secs(config.related_stale_secs),
      stats: Duration::from_secs(config.stats_stale_secs),
      infinite: Duration::from_secs(config.infinite_stale_secs),
    }
  }
}

/// Orders client with transparent caching support.
///
/// This wraps the underlying OrdersClient and provides the same API, but
/// answers from the cache while an entry is fresh, shares one request between
/// concurrent callers of the same query, and retries transient failures.
#[derive(Clone)]
pub struct CachedOrdersClient {
  inner: OrdersClient,
  cache: CacheLayer,
  stale: StaleTimes,
  retry: RetryPolicy,
}

impl CachedOrdersClient {
  pub fn new(inner: OrdersClient, cache: CacheLayer, stale: StaleTimes, retry: RetryPolicy) -> Self {
    Self {
      inner,
      cache,
      stale,
      retry,
    }
  }

  /// Create a new cached client from configuration.
  pub fn from_config(config: &Config) -> Result<Self, ClientBuildError> {
    let inner = OrdersClient::from_config(&config.api)?;
    let cache = if config.cache.enabled {
      CacheLayer::in_memory()
    } else {
      CacheLayer::disabled()
    };

    Ok(Self::new(
      inner,
      cache,
      StaleTimes::from(&config.cache),
      config.retry_policy(),
    ))
  }

  pub fn inner(&self) -> &OrdersClient {
    &self.inner
  }

  pub fn cache(&self) -> &CacheLayer {
    &self.cache
  }

  /// List executive orders with caching.
  pub async fn list_orders(&self, filters: &OrderFilters) -> Result<OrdersResponse, ApiError> {
    let query_key = OrderKey::List(filters.clone());

    let result = self
      .cache
      .fetch(&query_key, self.stale.list, || {
        let inner = self.inner.clone();
        let retry = self.retry;
        let filters = filters.clone();
        async move { retry_with_backoff(&retry, || inner.list_orders(&filters)).await }
      })
      .await?;

    Ok(result.data)
  }

  /// Get a single order by id with caching.
  pub async fn get_order(&self, id: &str) -> Result<OrderResponse, ApiError> {
    let query_key = OrderKey::Detail(id.to_string());

    let result = self
      .cache
      .fetch(&query_key, self.stale.detail, || {
        let inner = self.inner.clone();
        let retry = self.retry;
        let id = id.to_string();
        async move { retry_with_backoff(&retry, || inner.get_order(&id)).await }
      })
      .await?;

    Ok(result.data)
  }

  /// Get the latest orders with caching.
  pub async fn latest_orders(&self, limit: u32) -> Result<OrdersResponse, ApiError> {
    let result = self
      .cache
      .fetch(&OrderKey::Latest(limit), self.stale.latest, || {
        let inner = self.inner.clone();
        let retry = self.retry;
        async move { retry_with_backoff(&retry, || inner.latest_orders(limit)).await }
      })
      .await?;

    Ok(result.data)
  }

  /// Get related orders with caching.
  pub async fn related_orders(&self, id: &str) -> Result<OrdersResponse, ApiError> {
    let query_key = OrderKey::Related(id.to_string());

    let result = self
      .cache
      .fetch(&query_key, self.stale.related, || {
        let inner = self.inner.clone();
        let retry = self.retry;
        let id = id.to_string();
        async move { retry_with_backoff(&retry, || inner.related_orders(&id)).await }
      })
      .await?;

    Ok(result.data)
  }

  /// Get aggregate statistics with caching.
  pub async fn order_stats(&self) -> Result<OrderStats, ApiError> {
    let result = self
      .cache
      .fetch(&OrderKey::Stats, self.stale.stats, || {
        let inner = self.inner.clone();
        let retry = self.retry;
        async move { retry_with_backoff(&retry, || inner.order_stats()).await }
      })
      .await?;

    Ok(result.data)
  }

  /// One page of an infinite list. Pagination in `filters` is ignored.
  pub async fn orders_page(
    &self,
    filters: &OrderFilters,
    page_size: u32,
    page: u32,
  ) -> Result<OrdersResponse, ApiError> {
    let base = filters.without_pagination();
    let query_key = OrderKey::InfinitePage {
      filters: base.clone(),
      page_size,
      page,
    };

    let result = self
      .cache
      .fetch(&query_key, self.stale.infinite, || {
        let inner = self.inner.clone();
        let retry = self.retry;
        let paged = base.with_page(page, page_size);
        async move { retry_with_backoff(&retry, || inner.list_orders(&paged)).await }
      })
      .await?;

    Ok(result.data)
  }

  /// Infinite list starting at page 1, every page going through the cache.
  pub fn infinite_orders(&self, filters: &OrderFilters, page_size: u32) -> InfiniteOrders {
    let client = self.clone();
    let filters = filters.without_pagination();

    InfiniteQuery::new(move |page| {
      let client = client.clone();
      let filters = filters.clone();
      async move { client.orders_page(&filters, page_size, page).await }
    })
  }

  /// Drop every cached list, latest and infinite query.
  pub fn invalidate_lists(&self) -> usize {
    self.cache.invalidate(&OrderKey::Lists)
  }

  /// Drop the cached order and its related orders.
  pub fn invalidate_order(&self, id: &str) -> usize {
    self.cache.invalidate(&OrderKey::Detail(id.to_string()))
  }

  /// Drop everything cached for executive orders.
  pub fn invalidate_all(&self) -> usize {
    self.cache.invalidate(&OrderKey::All)
  }

  /// Seed the cache with an order, e.g. one taken from a list response.
  pub fn prime_order(&self, order: &OrderResponse) -> Result<(), ApiError> {
    let key = OrderKey::Detail(order.order.id.clone());
    self.cache.set_query_data(&key, order, self.stale.detail)
  }

  /// Whether `key` currently has a cache entry, fresh or stale.
  pub fn is_cached(&self, key: &OrderKey) -> bool {
    self
      .cache
      .get_query_data::<_, serde_json::Value>(key)
      .is_some()
  }
}
