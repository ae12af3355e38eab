use std::sync::Arc;

use tracing::warn;

use crate::api::{ApiClient, ApiError, ClientBuildError};
use crate::config::ApiConfig;

use super::filters::OrderFilters;
use super::types::{OrderResponse, OrderStats, OrdersResponse};

/// Number of orders returned by [`OrdersClient::latest_orders`] when the caller has no preference.
pub const DEFAULT_LATEST_LIMIT: u32 = 10;

/// Executive orders API client
#[derive(Clone)]
pub struct OrdersClient {
  api: Arc<ApiClient>,
}

impl OrdersClient {
  pub fn new(api: Arc<ApiClient>) -> Self {
    Self { api }
  }

  pub fn from_config(config: &ApiConfig) -> Result<Self, ClientBuildError> {
    Ok(Self::new(Arc::new(ApiClient::from_config(config)?)))
  }

  /// The underlying generic client, e.g. to register interceptors
  pub fn api(&self) -> &ApiClient {
    &self.api
  }

  /// List executive orders matching `filters`
  pub async fn list_orders(&self, filters: &OrderFilters) -> Result<OrdersResponse, ApiError> {
    let query = filters.query_string();
    let endpoint = if query.is_empty() {
      "/executive-orders".to_string()
    } else {
      format!("/executive-orders?{}", query)
    };

    self.api.get(&endpoint).await.map_err(|e| {
      warn!(status = e.status(), "Failed to fetch executive orders: {}", e);
      e
    })
  }

  /// Get a single executive order by id
  pub async fn get_order(&self, id: &str) -> Result<OrderResponse, ApiError> {
    require_id(id)?;

    self
      .api
      .get(&format!("/executive-orders/{}", id))
      .await
      .map_err(|e| {
        if e.status() == 404 {
          return e.with_message(format!("Executive order with ID {} not found", id));
        }
        warn!(status = e.status(), "Failed to fetch executive order {}: {}", id, e);
        e
      })
  }

  /// Get the most recently signed orders. `limit` is passed through as-is.
  pub async fn latest_orders(&self, limit: u32) -> Result<OrdersResponse, ApiError> {
    self
      .api
      .get(&format!("/latest-executive-orders?limit={}", limit))
      .await
      .map_err(|e| {
        warn!(status = e.status(), "Failed to fetch latest executive orders: {}", e);
        e
      })
  }

  /// Get orders related to the order with `id`
  pub async fn related_orders(&self, id: &str) -> Result<OrdersResponse, ApiError> {
    require_id(id)?;

    self
      .api
      .get(&format!("/executive-orders/{}/related", id))
      .await
      .map_err(|e| {
        warn!(status = e.status(), "Failed to fetch related orders for {}: {}", id, e);
        e
      })
  }

  /// Get aggregate statistics
  pub async fn order_stats(&self) -> Result<OrderStats, ApiError> {
    self.api.get("/executive-orders/stats").await.map_err(|e| {
      warn!(status = e.status(), "Failed to fetch executive order stats: {}", e);
      e
    })
  }
}

/// Reject a blank id before anything is sent.
fn require_id(id: &str) -> Result<(), ApiError> {
  if id.trim().is_empty() {
    return Err(ApiError::bad_request("Executive order ID is required"));
  }
  Ok(())
}
