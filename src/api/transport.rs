//! Transport collaborator: sends one HTTP request and returns the raw response.
//!
//! The generic client never touches the network directly. It hands a fully
//! built [`HttpRequest`] to a [`Transport`] and interprets the
//! [`HttpResponse`] it gets back. Production code uses [`ReqwestTransport`].

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::header::HeaderMap;
use reqwest::Method;
use thiserror::Error;
use tracing::debug;

/// A request ready to go on the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
  pub method: Method,
  pub url: String,
  pub headers: HeaderMap,
  pub body: Option<String>,
}

/// A response as received from the server.
#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: u16,
  pub status_text: String,
  pub body: String,
  /// Set when the status line arrived but the body could not be read
  pub body_error: Option<String>,
}

impl HttpResponse {
  /// Build a response whose status text is the canonical reason phrase.
  pub fn new(status: u16, body: impl Into<String>) -> Self {
    let status_text = reqwest::StatusCode::from_u16(status)
      .ok()
      .and_then(|s| s.canonical_reason())
      .unwrap_or_default()
      .to_string();
    Self {
      status,
      status_text,
      body: body.into(),
      body_error: None,
    }
  }

  /// A response whose body was cut off or failed to read.
  pub fn unreadable(status: u16, error: impl Into<String>) -> Self {
    Self {
      body_error: Some(error.into()),
      ..Self::new(status, "")
    }
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Failure before any HTTP response was received.
#[derive(Debug, Error)]
pub enum TransportError {
  #[error("request timed out")]
  Timeout,
  #[error("connection failed: {0}")]
  Connect(String),
  #[error("{0}")]
  Other(String),
}

/// Sends HTTP requests.
pub trait Transport: Send + Sync {
  fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  pub fn new(timeout: Duration) -> Result<Self, TransportError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| TransportError::Other(format!("Failed to build HTTP client: {}", e)))?;
    Ok(Self { client })
  }
}

impl Transport for ReqwestTransport {
  fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
    Box::pin(async move {
      let mut builder = self
        .client
        .request(request.method, &request.url)
        .headers(request.headers);
      if let Some(body) = request.body {
        builder = builder.body(body);
      }

      let resp = builder.send().await.map_err(classify_reqwest_error)?;
      let status = resp.status().as_u16();

      // A status line was received, so a body failure is not a transport failure
      match resp.text().await {
        Ok(body) => Ok(HttpResponse::new(status, body)),
        Err(e) => {
          debug!(status, error = %e, "failed to read response body");
          Ok(HttpResponse::unreadable(status, e.to_string()))
        }
      }
    })
  }
}

fn classify_reqwest_error(e: reqwest::Error) -> TransportError {
  if e.is_timeout() {
    TransportError::Timeout
  } else if e.is_connect() {
    TransportError::Connect(e.to_string())
  } else {
    TransportError::Other(e.to_string())
  }
}
