//! Generic HTTP access layer.
//!
//! - [`ApiClient`] - interceptor-based JSON client bound to a base URL
//! - [`InterceptorPipeline`] - ordered request/response transform chains
//! - [`Transport`] - the network collaborator, [`ReqwestTransport`] in production
//! - [`ApiError`] - the classified error every layer returns

mod client;
mod error;
mod interceptor;
mod transport;

pub use client::{ApiClient, ApiClientBuilder, ClientBuildError, RequestOptions};
pub use error::{ApiError, ErrorClass};
pub use interceptor::{
  log_request, log_response, InterceptorPipeline, RequestDescriptor, RequestInterceptor,
  ResponseInterceptor,
};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
