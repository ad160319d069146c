//! Retry and backoff policy.
//!
//! Every failed download attempt is retried after a fixed delay until the
//! attempt budget is spent. The policy is a plain value handed to the fetcher.

mod error;
mod policy;
mod run;

pub use error::FetchError;
pub use policy::{RetryDecision, RetryPolicy};
pub use run::run_with_retry;
