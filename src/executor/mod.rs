//! 执行器模块：带超时的单次执行与指数退避重试。
//!
//! # Executor Module
//!
//! Two layers drive every upstream call:
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BoundedExecutor`] | One attempt raced against a deadline, failures classified |
//! | [`RetryingExecutor`] | Exponential-backoff retry over the bounded executor |
//! | [`RetryPolicy`] | Attempt budget, backoff schedule and [`RetryCondition`] |
//! | [`RetryState`] | Explicit `Attempting` / `Backoff` / `Terminal` state machine |
//! | [`AttemptObserver`] | Per-attempt diagnostics hook (never alters control flow) |
//!
//! ## Backoff
//!
//! The delay before attempt *k* (k >= 2) is `base_delay * 2^(k-2)`. With the
//! defaults (3 attempts, 1s base) a call that keeps failing is tried at
//! t=0, after a 1s pause, and after a further 2s pause.
//!
//! ```rust,no_run
//! use upstream_relay::executor::{BoundedExecutor, RetryingExecutor, RetryPolicy};
//! use upstream_relay::transport::HttpUpstream;
//! use upstream_relay::types::RequestSpec;
//! use std::time::Duration;
//!
//! # async fn run() -> upstream_relay::Result<()> {
//! let upstream = HttpUpstream::new()?.with_base_url("http://localhost:8080")?;
//! let executor = RetryingExecutor::new(
//!     BoundedExecutor::new(upstream).with_default_timeout(Duration::from_secs(5)),
//! )
//! .with_policy(RetryPolicy::new().with_max_attempts(4));
//!
//! let revenue = executor
//!     .execute_with_retry(&RequestSpec::get("/api/revenue"))
//!     .await?;
//! println!("{revenue}");
//! # Ok(())
//! # }
//! ```

mod bounded;
mod observer;
mod policy;
mod retry;

pub use bounded::{classify, BoundedExecutor, DEFAULT_TIMEOUT};
pub use observer::{
    noop_observer, AttemptObserver, AttemptRecord, InMemoryObserver, NoopObserver,
    TracingObserver,
};
pub use policy::{RetryCondition, RetryPolicy, RetryState};
pub use retry::RetryingExecutor;
