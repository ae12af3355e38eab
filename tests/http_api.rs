//! End-to-end tests over real HTTP against a local mock server.

use eo_archive::api::ErrorClass;
use eo_archive::config::Config;
use eo_archive::orders::{CachedOrdersClient, OrderFilters, OrderKey, OrderStatus};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn order(id: &str) -> Value {
  json!({
    "id": id,
    "number": id,
    "title": format!("Order {}", id),
    "presidentName": "Joseph R. Biden",
    "signedDate": "2021-01-20",
    "federalRegisterUrl": "",
    "status": "Active",
    "summary": "",
    "createdAt": "",
    "updatedAt": ""
  })
}

fn config_for(server: &MockServer, retries: u32) -> Config {
  config_at(format!("{}/api/v1", server.uri()), retries)
}

/// Serve `status_line` with a body shorter than its Content-Length, counting
/// connections. Returns the API base URL.
async fn truncated_body_server(status_line: &'static str) -> (String, Arc<AtomicUsize>) {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  let hits = Arc::new(AtomicUsize::new(0));
  let counter = Arc::clone(&hits);

  tokio::spawn(async move {
    while let Ok((mut socket, _)) = listener.accept().await {
      counter.fetch_add(1, Ordering::SeqCst);
      tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        let response = format!(
          "{}\r\nContent-Type: application/json\r\nContent-Length: 100\r\nConnection: close\r\n\r\n{{\"ord",
          status_line
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
      });
    }
  });

  (format!("http://{}/api/v1", addr), hits)
}

fn config_at(base_url: String, retries: u32) -> Config {
  let mut config = Config::default();
  config.api.base_url = base_url;
  config.api.timeout_secs = 5;
  config.retry.retries = retries;
  config.retry.initial_delay_ms = 10;
  config
}

#[tokio::test]
async fn test_truncated_not_found_keeps_status_and_is_not_retried() {
  let (base_url, hits) = truncated_body_server("HTTP/1.1 404 Not Found").await;
  let client = CachedOrdersClient::from_config(&config_at(base_url, 3)).unwrap();

  let err = client.get_order("12345").await.unwrap_err();

  assert_eq!(err.status(), 404);
  assert_eq!(err.class(), ErrorClass::Client);
  assert_eq!(err.message(), "Executive order with ID 12345 not found");
  assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_truncated_success_body_is_decode_failure() {
  let (base_url, hits) = truncated_body_server("HTTP/1.1 200 OK").await;
  let client = CachedOrdersClient::from_config(&config_at(base_url, 0)).unwrap();

  let err = client.order_stats().await.unwrap_err();

  assert_eq!(err.status(), 200);
  assert_eq!(err.class(), ErrorClass::Decode);
  assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_list_orders_round_trip_and_cache() {
  let server = MockServer::start().await;
  let envelope = json!({
    "orders": [order("14001"), order("14002")],
    "total": 45,
    "page": 1,
    "pageSize": 20,
    "totalPages": 3
  });

  Mock::given(method("GET"))
    .and(path("/api/v1/executive-orders"))
    .and(query_param("president", "Biden"))
    .and(query_param("page", "1"))
    .and(query_param("pageSize", "20"))
    .and(header("Accept", "application/json"))
    .respond_with(ResponseTemplate::new(200).set_body_json(&envelope))
    .expect(1)
    .mount(&server)
    .await;

  let client = CachedOrdersClient::from_config(&config_for(&server, 0)).unwrap();
  let filters = OrderFilters {
    president: Some("Biden".to_string()),
    page: Some(1),
    page_size: Some(20),
    ..OrderFilters::default()
  };

  let response = client.list_orders(&filters).await.unwrap();
  assert_eq!(response.total, 45);
  assert_eq!(response.total_pages, 3);
  assert_eq!(response.orders[1].number, "14002");
  assert_eq!(response.orders[0].status, OrderStatus::Active);

  // Served from the cache; the mock verifies a single hit on drop
  client.list_orders(&filters).await.unwrap();
  assert!(client.is_cached(&OrderKey::List(filters)));
}

#[tokio::test]
async fn test_get_order_not_found_is_not_retried() {
  let server = MockServer::start().await;

  Mock::given(method("GET"))
    .and(path("/api/v1/executive-orders/12345"))
    .respond_with(ResponseTemplate::new(404).set_body_json(json!({
      "error": "Not Found",
      "message": "No executive order 12345",
      "status": 404
    })))
    .expect(1)
    .mount(&server)
    .await;

  let client = CachedOrdersClient::from_config(&config_for(&server, 3)).unwrap();
  let err = client.get_order("12345").await.unwrap_err();

  assert_eq!(err.status(), 404);
  assert_eq!(err.class(), ErrorClass::Client);
  assert_eq!(err.message(), "Executive order with ID 12345 not found");
}

#[tokio::test]
async fn test_server_error_is_retried_until_success() {
  let server = MockServer::start().await;

  Mock::given(method("GET"))
    .and(path("/api/v1/executive-orders/stats"))
    .respond_with(ResponseTemplate::new(503).set_body_json(json!({"message": "warming up"})))
    .up_to_n_times(2)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/api/v1/executive-orders/stats"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "totalOrders": 2,
      "byStatus": {"Active": 2}
    })))
    .expect(1)
    .mount(&server)
    .await;

  let client = CachedOrdersClient::from_config(&config_for(&server, 3)).unwrap();
  let stats = client.order_stats().await.unwrap();

  assert_eq!(stats.total_orders, 2);
  assert_eq!(stats.by_status["Active"], 2);
  assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_undecodable_error_body_falls_back_to_status() {
  let server = MockServer::start().await;

  Mock::given(method("GET"))
    .and(path("/api/v1/latest-executive-orders"))
    .and(query_param("limit", "5"))
    .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
    .mount(&server)
    .await;

  let client = CachedOrdersClient::from_config(&config_for(&server, 0)).unwrap();
  let err = client.latest_orders(5).await.unwrap_err();

  assert_eq!(err.status(), 500);
  assert_eq!(err.class(), ErrorClass::Server);
  assert_eq!(err.message(), "API error: 500 Internal Server Error");
}

#[tokio::test]
async fn test_malformed_success_body_is_decode_failure() {
  let server = MockServer::start().await;

  Mock::given(method("GET"))
    .and(path("/api/v1/executive-orders/7/related"))
    .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
    .mount(&server)
    .await;

  let client = CachedOrdersClient::from_config(&config_for(&server, 0)).unwrap();
  let err = client.related_orders("7").await.unwrap_err();

  assert_eq!(err.class(), ErrorClass::Decode);
  assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unreachable_server_is_transport_failure() {
  let mut config = Config::default();
  config.api.base_url = "http://127.0.0.1:1/api/v1".to_string();
  config.api.timeout_secs = 2;
  config.retry.retries = 0;

  let client = CachedOrdersClient::from_config(&config).unwrap();
  let err = client.order_stats().await.unwrap_err();

  assert_eq!(err.status(), 0);
  assert_eq!(err.class(), ErrorClass::Transport);
  assert!(err.message().starts_with("Network error or unable to reach API"));
}

#[tokio::test]
async fn test_configured_headers_are_sent() {
  let server = MockServer::start().await;

  Mock::given(method("GET"))
    .and(path("/api/v1/executive-orders/1"))
    .and(header("X-Client", "eo-tests"))
    .and(header("Content-Type", "application/json"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"order": order("1")})))
    .expect(1)
    .mount(&server)
    .await;

  let mut config = config_for(&server, 0);
  config
    .api
    .headers
    .insert("X-Client".to_string(), "eo-tests".to_string());

  let client = CachedOrdersClient::from_config(&config).unwrap();
  let response = client.get_order("1").await.unwrap();
  assert_eq!(response.order.id, "1");
}

#[tokio::test]
async fn test_infinite_orders_follow_total_pages() {
  let server = MockServer::start().await;

  for (page, ids) in [(1, vec!["1", "2"]), (2, vec!["3"])] {
    let orders: Vec<Value> = ids.iter().map(|id| order(id)).collect();
    Mock::given(method("GET"))
      .and(path("/api/v1/executive-orders"))
      .and(query_param("policyArea", "Energy"))
      .and(query_param("page", page.to_string()))
      .and(query_param("pageSize", "2"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "orders": orders,
        "total": 3,
        "page": page,
        "pageSize": 2,
        "totalPages": 2
      })))
      .expect(1)
      .mount(&server)
      .await;
  }

  let client = CachedOrdersClient::from_config(&config_for(&server, 0)).unwrap();
  let filters = OrderFilters {
    policy_area: Some("Energy".to_string()),
    ..OrderFilters::default()
  };

  let mut query = client.infinite_orders(&filters, 2);
  while query.fetch_next_page().await.unwrap().is_some() {}

  let ids: Vec<&str> = query.items().map(|o| o.id.as_str()).collect();
  assert_eq!(ids, vec!["1", "2", "3"]);
  assert!(!query.has_next_page());
}
