//! Ordered request and response interceptor chains.
//!
//! Request interceptors transform a [`RequestDescriptor`] before it is sent.
//! Response interceptors transform the decoded JSON body of a successful
//! response. Both chains run in registration order as a left fold. The lists
//! are append-only: interceptors can be added after construction but never
//! removed.
//!
//! An interceptor that returns an error aborts the call and the error is
//! returned to the caller unchanged.

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::error::ApiError;
use super::transport::HttpResponse;

/// One logical request before base URL resolution.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
  /// Path relative to the base URL, starting with `/`
  pub endpoint: String,
  pub method: Method,
  /// Header names are case-insensitive and unique
  pub headers: HeaderMap,
  pub body: Option<String>,
}

/// Transforms an outgoing request.
pub type RequestInterceptor =
  Arc<dyn Fn(RequestDescriptor) -> Result<RequestDescriptor, ApiError> + Send + Sync>;

/// Transforms a decoded response body.
pub type ResponseInterceptor = Arc<dyn Fn(Value) -> Result<Value, ApiError> + Send + Sync>;

/// Error envelope returned by the API on failure.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
  error: Option<String>,
  message: Option<String>,
}

/// Both interceptor chains of a client.
#[derive(Default)]
pub struct InterceptorPipeline {
  request: RwLock<Vec<RequestInterceptor>>,
  response: RwLock<Vec<ResponseInterceptor>>,
}

impl InterceptorPipeline {
  pub fn new(request: Vec<RequestInterceptor>, response: Vec<ResponseInterceptor>) -> Self {
    Self {
      request: RwLock::new(request),
      response: RwLock::new(response),
    }
  }

  pub fn add_request_interceptor(&self, interceptor: RequestInterceptor) {
    self
      .request
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .push(interceptor);
  }

  pub fn add_response_interceptor(&self, interceptor: ResponseInterceptor) {
    self
      .response
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .push(interceptor);
  }

  /// Fold the request chain over `descriptor`.
  pub fn apply_request(&self, descriptor: RequestDescriptor) -> Result<RequestDescriptor, ApiError> {
    // Snapshot so the lock is not held while user code runs
    let chain = self
      .request
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone();
    chain
      .iter()
      .try_fold(descriptor, |descriptor, interceptor| interceptor(descriptor))
  }

  /// Validate the status, decode the body, then fold the response chain.
  pub fn apply_response(&self, response: HttpResponse) -> Result<Value, ApiError> {
    if !response.is_success() {
      return Err(error_from_response(&response));
    }

    let decoded = decode_body(&response)?;

    let chain = self
      .response
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone();
    chain
      .iter()
      .try_fold(decoded, |value, interceptor| interceptor(value))
  }
}

fn decode_body(response: &HttpResponse) -> Result<Value, ApiError> {
  if let Some(e) = &response.body_error {
    return Err(ApiError::decode(
      response.status,
      format!("Failed to read API response body: {}", e),
    ));
  }
  if response.body.trim().is_empty() {
    return Ok(Value::Null);
  }
  serde_json::from_str(&response.body).map_err(|e| {
    ApiError::decode(
      response.status,
      format!("Failed to decode API response: {}", e),
    )
  })
}

/// Build the classified error for a non-success response.
fn error_from_response(response: &HttpResponse) -> ApiError {
  let message = match serde_json::from_str::<ApiErrorBody>(&response.body) {
    Ok(body) => body
      .message
      .filter(|m| !m.is_empty())
      .or(body.error.filter(|e| !e.is_empty()))
      .unwrap_or_else(|| format!("API error: {}", response.status)),
    Err(_) => format!(
      "API error: {} {}",
      response.status, response.status_text
    ),
  };
  ApiError::http(response.status, message)
}

/// Development tracing of outgoing requests. Returns its input unchanged.
pub fn log_request() -> RequestInterceptor {
  Arc::new(|descriptor: RequestDescriptor| -> Result<RequestDescriptor, ApiError> {
    debug!(
      method = %descriptor.method,
      endpoint = %descriptor.endpoint,
      headers = ?descriptor.headers,
      "API request"
    );
    Ok(descriptor)
  })
}

/// Development tracing of decoded responses. Returns its input unchanged.
pub fn log_response() -> ResponseInterceptor {
  Arc::new(|value: Value| -> Result<Value, ApiError> {
    debug!(response = %value, "API response");
    Ok(value)
  })
}
