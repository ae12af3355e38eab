//! Generic JSON API client.
//!
//! [`ApiClient`] executes one logical request at a time:
//!
//! 1. merge default headers with per-call headers (per-call wins)
//! 2. run the request interceptors
//! 3. send through the [`Transport`]
//! 4. validate the status, decode the body, run the response interceptors
//!
//! Every failure leaves this type as an [`ApiError`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::config::ApiConfig;

use super::error::ApiError;
use super::interceptor::{
  log_request, log_response, InterceptorPipeline, RequestDescriptor, RequestInterceptor,
  ResponseInterceptor,
};
use super::transport::{HttpRequest, ReqwestTransport, Transport, TransportError};

/// Per-call request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
  pub method: Method,
  pub headers: HeaderMap,
  pub body: Option<String>,
}

impl RequestOptions {
  pub fn method(method: Method) -> Self {
    Self {
      method,
      ..Self::default()
    }
  }
}

/// Errors raised while constructing a client.
#[derive(Debug, Error)]
pub enum ClientBuildError {
  #[error("invalid header {name}: {reason}")]
  InvalidHeader { name: String, reason: String },
  #[error(transparent)]
  Transport(#[from] TransportError),
}

/// Interceptor-based JSON client bound to one base URL.
pub struct ApiClient {
  base_url: String,
  default_headers: HeaderMap,
  pipeline: InterceptorPipeline,
  transport: Arc<dyn Transport>,
}

impl ApiClient {
  pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
    ApiClientBuilder::new(base_url)
  }

  /// Build the default client from configuration.
  ///
  /// Sends `Accept: application/json` plus any configured headers. Request
  /// and response tracing interceptors are installed in debug builds or when
  /// `dev_logging` is set.
  pub fn from_config(config: &ApiConfig) -> Result<Self, ClientBuildError> {
    let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))?;

    let mut builder = Self::builder(&config.base_url)
      .transport(Arc::new(transport))
      .header(
        reqwest::header::ACCEPT,
        HeaderValue::from_static("application/json"),
      );

    for (name, value) in &config.headers {
      let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| ClientBuildError::InvalidHeader {
          name: name.clone(),
          reason: e.to_string(),
        })?;
      let header_value =
        HeaderValue::from_str(value).map_err(|e| ClientBuildError::InvalidHeader {
          name: name.clone(),
          reason: e.to_string(),
        })?;
      builder = builder.header(header_name, header_value);
    }

    if cfg!(debug_assertions) || config.dev_logging {
      builder = builder
        .request_interceptor(log_request())
        .response_interceptor(log_response());
    }

    builder.build()
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// Append a request interceptor. It runs after all existing ones.
  pub fn add_request_interceptor(&self, interceptor: RequestInterceptor) {
    self.pipeline.add_request_interceptor(interceptor);
  }

  /// Append a response interceptor. It runs after all existing ones.
  pub fn add_response_interceptor(&self, interceptor: ResponseInterceptor) {
    self.pipeline.add_response_interceptor(interceptor);
  }

  /// Execute one request against `endpoint` and decode the result as `T`.
  pub async fn execute<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    options: RequestOptions,
  ) -> Result<T, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    merge_headers(&mut headers, &self.default_headers);
    merge_headers(&mut headers, &options.headers);

    let descriptor = self.pipeline.apply_request(RequestDescriptor {
      endpoint: endpoint.to_string(),
      method: options.method,
      headers,
      body: options.body,
    })?;

    let request = HttpRequest {
      url: format!("{}{}", self.base_url, descriptor.endpoint),
      method: descriptor.method,
      headers: descriptor.headers,
      body: descriptor.body,
    };

    let response = self.transport.send(request).await.map_err(|e| {
      ApiError::transport(format!("Network error or unable to reach API: {}", e))
    })?;
    let status = response.status;

    let value = self.pipeline.apply_response(response)?;

    serde_json::from_value(value).map_err(|e| {
      ApiError::decode(status, format!("Unexpected API response shape: {}", e))
    })
  }

  pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
    self.execute(endpoint, RequestOptions::method(Method::GET)).await
  }

  pub async fn post<T: DeserializeOwned, B: Serialize>(
    &self,
    endpoint: &str,
    body: Option<&B>,
  ) -> Result<T, ApiError> {
    self.send_with_body(Method::POST, endpoint, body).await
  }

  pub async fn put<T: DeserializeOwned, B: Serialize>(
    &self,
    endpoint: &str,
    body: Option<&B>,
  ) -> Result<T, ApiError> {
    self.send_with_body(Method::PUT, endpoint, body).await
  }

  pub async fn patch<T: DeserializeOwned, B: Serialize>(
    &self,
    endpoint: &str,
    body: Option<&B>,
  ) -> Result<T, ApiError> {
    self.send_with_body(Method::PATCH, endpoint, body).await
  }

  pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
    self
      .execute(endpoint, RequestOptions::method(Method::DELETE))
      .await
  }

  async fn send_with_body<T: DeserializeOwned, B: Serialize>(
    &self,
    method: Method,
    endpoint: &str,
    body: Option<&B>,
  ) -> Result<T, ApiError> {
    let body = body
      .map(serde_json::to_string)
      .transpose()
      .map_err(|e| ApiError::bad_request(format!("Failed to encode request body: {}", e)))?;

    self
      .execute(
        endpoint,
        RequestOptions {
          method,
          body,
          ..RequestOptions::default()
        },
      )
      .await
  }
}

fn merge_headers(target: &mut HeaderMap, overrides: &HeaderMap) {
  for (name, value) in overrides {
    target.insert(name.clone(), value.clone());
  }
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
  base_url: String,
  headers: HeaderMap,
  request_interceptors: Vec<RequestInterceptor>,
  response_interceptors: Vec<ResponseInterceptor>,
  transport: Option<Arc<dyn Transport>>,
}

impl ApiClientBuilder {
  fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into().trim_end_matches('/').to_string(),
      headers: HeaderMap::new(),
      request_interceptors: Vec::new(),
      response_interceptors: Vec::new(),
      transport: None,
    }
  }

  /// Add a default header sent with every request.
  pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
    self.headers.insert(name, value);
    self
  }

  pub fn request_interceptor(mut self, interceptor: RequestInterceptor) -> Self {
    self.request_interceptors.push(interceptor);
    self
  }

  pub fn response_interceptor(mut self, interceptor: ResponseInterceptor) -> Self {
    self.response_interceptors.push(interceptor);
    self
  }

  pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
    self.transport = Some(transport);
    self
  }

  /// Finish the client. Without an explicit transport a reqwest transport
  /// with a 30 second timeout is used.
  pub fn build(self) -> Result<ApiClient, ClientBuildError> {
    let transport = match self.transport {
      Some(t) => t,
      None => Arc::new(ReqwestTransport::new(Duration::from_secs(30))?),
    };

    Ok(ApiClient {
      base_url: self.base_url,
      default_headers: self.headers,
      pipeline: InterceptorPipeline::new(self.request_interceptors, self.response_interceptors),
      transport,
    })
  }
}
