//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::api::{HttpRequest, HttpResponse, Transport, TransportError};

/// Transport that records requests and replays canned responses in order.
#[derive(Default)]
pub struct MockTransport {
  responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
  requests: Mutex<Vec<HttpRequest>>,
  delay: Option<Duration>,
}

impl MockTransport {
  pub fn new() -> Self {
    Self::default()
  }

  /// Hold every response for `delay` before answering.
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  pub fn push_json(&self, status: u16, body: Value) {
    self.push_response(HttpResponse::new(status, body.to_string()));
  }

  pub fn push_response(&self, response: HttpResponse) {
    self.responses.lock().unwrap().push_back(Ok(response));
  }

  pub fn push_failure(&self, error: TransportError) {
    self.responses.lock().unwrap().push_back(Err(error));
  }

  pub fn requests(&self) -> Vec<HttpRequest> {
    self.requests.lock().unwrap().clone()
  }

  pub fn call_count(&self) -> usize {
    self.requests.lock().unwrap().len()
  }
}

impl Transport for MockTransport {
  fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
    self.requests.lock().unwrap().push(request);
    Box::pin(async move {
      if let Some(delay) = self.delay {
        tokio::time::sleep(delay).await;
      }
      self
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(TransportError::Other("no canned response left".into())))
    })
  }
}

/// Minimal executive order as the API returns it.
pub fn order_json(id: &str) -> Value {
  serde_json::json!({
    "id": id,
    "number": id,
    "title": format!("Order {}", id),
    "presidentName": "Joseph R. Biden",
    "signedDate": "2021-01-20",
    "federalRegisterUrl": "",
    "status": "Active",
    "summary": "",
    "amendedBy": [],
    "relatedOrders": [],
    "policyAreas": [],
    "citations": [],
    "createdAt": "",
    "updatedAt": ""
  })
}

/// One page envelope holding `ids`.
pub fn page_json(ids: &[&str], total: u64, page: u32, page_size: u32) -> Value {
  let total_pages = if page_size == 0 {
    0
  } else {
    total.div_ceil(u64::from(page_size))
  };
  serde_json::json!({
    "orders": ids.iter().map(|id| order_json(id)).collect::<Vec<_>>(),
    "total": total,
    "page": page,
    "pageSize": page_size,
    "totalPages": total_pages
  })
}
