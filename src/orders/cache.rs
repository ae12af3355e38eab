//! Cache keys for executive order queries.

use serde_json::{json, Value};

use crate::cache::QueryKey;

use super::filters::OrderFilters;

const DOMAIN: &str = "orders";

/// Query key types for executive order API calls.
///
/// Keys form a hierarchy so whole groups can be invalidated at once:
///
/// ```text
/// ["orders"]
/// ["orders", "list"]
/// ["orders", "list", {filters}]
/// ["orders", "list", "latest", limit]
/// ["orders", "list", "infinite", {filters, pageSize}]
/// ["orders", "list", "infinite", {filters, pageSize}, page]
/// ["orders", "detail"]
/// ["orders", "detail", id]
/// ["orders", "detail", id, "related"]
/// ["orders", "stats"]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum OrderKey {
  /// Every executive order query
  All,
  /// Every list-shaped query
  Lists,
  /// Filtered list
  List(OrderFilters),
  /// Latest orders
  Latest(u32),
  /// An infinite list, all pages
  Infinite { filters: OrderFilters, page_size: u32 },
  /// One page of an infinite list
  InfinitePage {
    filters: OrderFilters,
    page_size: u32,
    page: u32,
  },
  /// Every single-order query
  Details,
  /// A single order
  Detail(String),
  /// Orders related to one order
  Related(String),
  /// Aggregate statistics
  Stats,
}

impl QueryKey for OrderKey {
  fn segments(&self) -> Vec<Value> {
    match self {
      Self::All => vec![json!(DOMAIN)],
      Self::Lists => vec![json!(DOMAIN), json!("list")],
      Self::List(filters) => vec![json!(DOMAIN), json!("list"), filters_value(filters)],
      Self::Latest(limit) => vec![json!(DOMAIN), json!("list"), json!("latest"), json!(limit)],
      Self::Infinite { filters, page_size } => infinite_segments(filters, *page_size),
      Self::InfinitePage {
        filters,
        page_size,
        page,
      } => {
        let mut segments = infinite_segments(filters, *page_size);
        segments.push(json!(page));
        segments
      }
      Self::Details => vec![json!(DOMAIN), json!("detail")],
      Self::Detail(id) => vec![json!(DOMAIN), json!("detail"), json!(id)],
      Self::Related(id) => vec![json!(DOMAIN), json!("detail"), json!(id), json!("related")],
      Self::Stats => vec![json!(DOMAIN), json!("stats")],
    }
  }

  fn description(&self) -> String {
    match self {
      Self::All => "all orders".to_string(),
      Self::Lists => "all order lists".to_string(),
      Self::List(filters) => format!("orders: {}", filters_value(filters)),
      Self::Latest(limit) => format!("latest {} orders", limit),
      Self::Infinite { filters, page_size } => {
        format!("infinite orders ({} per page): {}", page_size, filters_value(filters))
      }
      Self::InfinitePage {
        filters,
        page_size,
        page,
      } => format!(
        "infinite orders page {} ({} per page): {}",
        page,
        page_size,
        filters_value(filters)
      ),
      Self::Details => "all order details".to_string(),
      Self::Detail(id) => format!("order {}", id),
      Self::Related(id) => format!("orders related to {}", id),
      Self::Stats => "order stats".to_string(),
    }
  }
}

fn filters_value(filters: &OrderFilters) -> Value {
  serde_json::to_value(filters.normalized()).unwrap_or(Value::Null)
}

fn infinite_segments(filters: &OrderFilters, page_size: u32) -> Vec<Value> {
  let base = OrderFilters {
    page_size: Some(page_size),
    ..filters.without_pagination()
  };
  vec![
    json!(DOMAIN),
    json!("list"),
    json!("infinite"),
    filters_value(&base),
  ]
}
