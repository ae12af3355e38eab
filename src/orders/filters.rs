//! Filter, sort and pagination parameters for `GET /executive-orders`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::types::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
  Date,
  Number,
  Title,
}

impl SortBy {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Date => "date",
      Self::Number => "number",
      Self::Title => "title",
    }
  }
}

impl FromStr for SortBy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "date" => Ok(Self::Date),
      "number" => Ok(Self::Number),
      "title" => Ok(Self::Title),
      _ => Err(format!("unknown sort field '{}' (expected date, number or title)", s)),
    }
  }
}

impl fmt::Display for SortBy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
  Asc,
  Desc,
}

impl SortDirection {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Asc => "asc",
      Self::Desc => "desc",
    }
  }
}

impl FromStr for SortDirection {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "asc" => Ok(Self::Asc),
      "desc" => Ok(Self::Desc),
      _ => Err(format!("unknown sort direction '{}' (expected asc or desc)", s)),
    }
  }
}

impl fmt::Display for SortDirection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Query parameters for listing executive orders.
///
/// Unset and empty-string fields are left out of both the query string and
/// the cache key, so two filters that send the same request address the same
/// cached result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilters {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub president: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<OrderStatus>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub start_date: Option<NaiveDate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub end_date: Option<NaiveDate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub policy_area: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub search: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sort_by: Option<SortBy>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sort_direction: Option<SortDirection>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub page: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub page_size: Option<u32>,
}

impl OrderFilters {
  /// The same filters without pagination.
  pub fn without_pagination(&self) -> Self {
    Self {
      page: None,
      page_size: None,
      ..self.clone()
    }
  }

  /// The same filters pointed at one page.
  pub fn with_page(&self, page: u32, page_size: u32) -> Self {
    Self {
      page: Some(page),
      page_size: Some(page_size),
      ..self.clone()
    }
  }

  /// The same filters with empty text fields unset.
  pub fn normalized(&self) -> Self {
    fn non_empty(value: &Option<String>) -> Option<String> {
      value.clone().filter(|v| !v.is_empty())
    }

    Self {
      president: non_empty(&self.president),
      policy_area: non_empty(&self.policy_area),
      search: non_empty(&self.search),
      ..self.clone()
    }
  }

  /// Query parameters in API order. Unset and empty values are dropped.
  pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
    let candidates = [
      ("president", self.president.clone()),
      ("startDate", self.start_date.map(format_api_date)),
      ("endDate", self.end_date.map(format_api_date)),
      ("status", self.status.map(|s| s.as_str().to_string())),
      ("policyArea", self.policy_area.clone()),
      ("search", self.search.clone()),
      ("sortBy", self.sort_by.map(|s| s.as_str().to_string())),
      (
        "sortDirection",
        self.sort_direction.map(|d| d.as_str().to_string()),
      ),
      ("page", self.page.map(|p| p.to_string())),
      ("pageSize", self.page_size.map(|p| p.to_string())),
    ];

    candidates
      .into_iter()
      .filter_map(|(name, value)| value.filter(|v| !v.is_empty()).map(|v| (name, v)))
      .collect()
  }

  /// URL-encoded query string, without the leading `?`.
  pub fn query_string(&self) -> String {
    url::form_urlencoded::Serializer::new(String::new())
      .extend_pairs(self.query_pairs())
      .finish()
  }
}

/// Dates go over the wire as `YYYY-MM-DD`.
pub fn format_api_date(date: NaiveDate) -> String {
  date.format("%Y-%m-%d").to_string()
}
