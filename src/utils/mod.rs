//! Utility modules shared by the digest pipeline.
//!
//! - [`HttpClient`]: shared HTTP client with a configured timeout and user agent
//! - [`to_yyyymmdd`], [`parse_yyyymmdd`], [`days_before`]: search date handling
//! - [`RetryPolicy`], [`with_retry`]: whole-operation retry with per-kind delays
//!
//! # Retry
//!
//! ```rust,no_run
//! use pubmed_digest::utils::{with_retry, Classify, FailureKind, RetryPolicy, RetryResult};
//!
//! #[derive(Debug)]
//! struct Busy;
//!
//! impl std::fmt::Display for Busy {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "busy")
//!     }
//! }
//!
//! impl Classify for Busy {
//!     fn failure_kind(&self) -> FailureKind {
//!         FailureKind::RateLimit
//!     }
//! }
//!
//! # async fn example() {
//! let policy = RetryPolicy::default().max_attempts(3);
//! let result = with_retry(&policy, |_attempt| async { Err::<(), _>(Busy) }).await;
//! assert!(matches!(result, RetryResult::Exhausted { attempts: 3, .. }));
//! # }
//! ```

mod date;
mod http;
mod retry;

pub use date::{days_before, parse_yyyymmdd, to_yyyymmdd};
pub use http::{HttpClient, DEFAULT_TIMEOUT};
pub use retry::{
    with_retry, Classify, FailureKind, RetryPolicy, RetryResult, DEFAULT_FAILURE_DELAY,
    DEFAULT_RATE_LIMIT_DELAY,
};
