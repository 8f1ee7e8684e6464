//! HTTP client module
//!
//! Provides the HTTP client with retry, rate limiting, and authentication.
//!
//! # Features
//!
//! - **Fixed-interval retries**: bounded attempts with a constant wait, see [`RetryPolicy`]
//! - **Rate Limiting**: optional token bucket rate limiter using governor
//! - **Authentication**: static token header from the auth module

mod client;
mod rate_limit;
mod retry;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_WAIT};

#[cfg(test)]
mod tests;
