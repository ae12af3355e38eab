//! Classified error type shared by every layer of the client.
//!
//! Every failure that leaves the generic client, the resource client, the
//! retry policy or the query cache is an [`ApiError`]: a human-readable
//! message plus an integer status classification.
//!
//! - status `0`: no HTTP response was received (DNS, connect, timeout)
//! - status `400..=499`: client error, never retried
//! - any other status: server-side or decode failure, retry-eligible

use thiserror::Error;

/// Failure class derived from an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  /// No response reached us
  Transport,
  /// Malformed request or missing resource (4xx)
  Client,
  /// Server-side failure (5xx or any other non-success status)
  Server,
  /// A response arrived but its body could not be decoded
  Decode,
}

/// The uniform error returned by the API client stack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
  message: String,
  status: u16,
  decode: bool,
}

impl ApiError {
  /// Create an error with an explicit status classification.
  pub fn new(message: impl Into<String>, status: u16) -> Self {
    Self {
      message: message.into(),
      status,
      decode: false,
    }
  }

  /// No HTTP response was received.
  pub fn transport(message: impl Into<String>) -> Self {
    Self::new(message, 0)
  }

  /// The server answered with a non-success status.
  pub fn http(status: u16, message: impl Into<String>) -> Self {
    Self::new(message, status)
  }

  /// A response with the given status arrived but could not be decoded.
  pub fn decode(status: u16, message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      status,
      decode: true,
    }
  }

  pub fn bad_request(message: impl Into<String>) -> Self {
    Self::new(message, 400)
  }

  pub fn not_found(message: impl Into<String>) -> Self {
    Self::new(message, 404)
  }

  pub fn internal(message: impl Into<String>) -> Self {
    Self::new(message, 500)
  }

  pub fn message(&self) -> &str {
    &self.message
  }

  pub fn status(&self) -> u16 {
    self.status
  }

  pub fn class(&self) -> ErrorClass {
    if self.decode {
      return ErrorClass::Decode;
    }
    match self.status {
      0 => ErrorClass::Transport,
      400..=499 => ErrorClass::Client,
      _ => ErrorClass::Server,
    }
  }

  /// Client errors are not transient; everything else may be retried.
  pub fn is_retryable(&self) -> bool {
    !(400..500).contains(&self.status)
  }

  /// Replace the message, keeping the classification.
  pub fn with_message(self, message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      ..self
    }
  }
}
