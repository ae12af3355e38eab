//! Executive order entities and the response envelopes of the API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::query::{PageCursor, Paginated};

/// Legal status of an executive order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
  Active,
  Revoked,
  Superseded,
  Amended,
}

impl OrderStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Active => "Active",
      Self::Revoked => "Revoked",
      Self::Superseded => "Superseded",
      Self::Amended => "Amended",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "active" => Ok(Self::Active),
      "revoked" => Ok(Self::Revoked),
      "superseded" => Ok(Self::Superseded),
      "amended" => Ok(Self::Amended),
      _ => Err(format!(
        "unknown status '{}' (expected active, revoked, superseded or amended)",
        s
      )),
    }
  }
}

/// A single executive order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveOrder {
  pub id: String,
  pub number: String,
  pub title: String,
  #[serde(default)]
  pub president_name: String,
  #[serde(default)]
  pub signed_date: String,
  #[serde(default)]
  pub federal_register_url: String,
  pub status: OrderStatus,
  #[serde(default)]
  pub summary: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub full_text: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub revoked_by: Option<String>,
  #[serde(default)]
  pub amended_by: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub superseded_by: Option<String>,
  #[serde(default)]
  pub related_orders: Vec<String>,
  #[serde(default)]
  pub policy_areas: Vec<String>,
  #[serde(default)]
  pub citations: Vec<String>,
  #[serde(default)]
  pub created_at: String,
  #[serde(default)]
  pub updated_at: String,
}

/// One page of executive orders with pagination metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersResponse {
  pub orders: Vec<ExecutiveOrder>,
  pub total: u64,
  pub page: u32,
  pub page_size: u32,
  pub total_pages: u32,
}

impl Paginated for OrdersResponse {
  type Item = ExecutiveOrder;

  fn cursor(&self) -> PageCursor {
    PageCursor::new(self.page, self.page_size, self.total)
  }

  fn items(&self) -> &[ExecutiveOrder] {
    &self.orders
  }
}

/// A single executive order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResponse {
  pub order: ExecutiveOrder,
}

/// Aggregate counts. Passed through as the API reports them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderStats {
  pub total_orders: u64,
  pub by_president: BTreeMap<String, u64>,
  pub by_status: BTreeMap<String, u64>,
  pub by_year: BTreeMap<String, u64>,
  pub by_policy_area: BTreeMap<String, u64>,
}
