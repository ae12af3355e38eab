//! Client library for the Executive Orders Archive API.
//!
//! Requests flow through three layers:
//!
//! 1. [`orders::CachedOrdersClient`] - keyed query cache, retry and pagination
//! 2. [`orders::OrdersClient`] - typed endpoints and order-specific errors
//! 3. [`api::ApiClient`] - interceptors, transport and error classification
//!
//! Every failure surfaces as one [`api::ApiError`].

pub mod api;
pub mod cache;
pub mod config;
pub mod log;
pub mod orders;
pub mod query;
pub mod retry;

#[cfg(test)]
pub mod testing;
