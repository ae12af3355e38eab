//! Executive orders resource: typed client, cache keys and cached facade.
//!
//! - [`OrdersClient`] maps the five endpoints onto typed calls and turns
//!   HTTP failures into order-specific errors
//! - [`CachedOrdersClient`] puts the query cache and retry policy in front
//!   of it and drives infinite pagination

mod cache;
mod cached_client;
mod client;
mod filters;
mod types;

pub use cache::OrderKey;
pub use cached_client::{CachedOrdersClient, InfiniteOrders, StaleTimes};
pub use client::{OrdersClient, DEFAULT_LATEST_LIMIT};
pub use filters::{format_api_date, OrderFilters, SortBy, SortDirection};
pub use types::{ExecutiveOrder, OrderResponse, OrderStats, OrderStatus, OrdersResponse};
